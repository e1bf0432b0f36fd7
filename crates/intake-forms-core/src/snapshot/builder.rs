//! Snapshot builder.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use super::{SnapshotError, SnapshotResult};
use crate::models::{
    AnswerOption, Category, ConsultType, Question, QuestionOrigin, QuestionType, Template,
};

/// Current snapshot layout version.
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

/// Identity of the template a snapshot was taken from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SnapshotTemplateRef {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub consult_type: ConsultType,
    #[serde(default)]
    pub config: Map<String, Value>,
}

/// One question as it looked at capture time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SnapshotQuestion {
    pub question_id: String,
    pub text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub code: Option<String>,
    pub unit: Option<String>,
    #[serde(default)]
    pub options: Vec<AnswerOption>,
    pub order: usize,
    pub visible: bool,
    /// Effective required flag
    pub required: bool,
    /// The question's own required flag
    pub base_required: bool,
    pub category_id: Option<String>,
    #[serde(default)]
    pub extra: Map<String, Value>,
    #[serde(default)]
    pub custom: bool,
}

impl SnapshotQuestion {
    /// Capture a question outside any template.
    pub(crate) fn from_question(
        question: &Question,
        order: usize,
        visible: bool,
        required: bool,
    ) -> Self {
        Self {
            question_id: question.id.clone(),
            text: question.text.clone(),
            question_type: question.question_type,
            code: question.code.clone(),
            unit: question.unit.clone(),
            options: question.options.clone(),
            order,
            visible,
            required,
            base_required: question.required,
            category_id: None,
            extra: Map::new(),
            custom: question.origin == QuestionOrigin::Custom,
        }
    }
}

/// An offered question in a manual (template-less) selection.
#[derive(Debug, Clone, PartialEq)]
pub struct ManualSelection {
    pub question: Question,
    pub selected: bool,
}

/// What a snapshot is built from.
#[derive(Debug, Clone, Copy)]
pub enum SnapshotSource<'a> {
    /// A template plus the resolved definitions of its questions
    Template {
        template: &'a Template,
        questions: &'a [Question],
    },
    /// A manual selection of questions
    Manual(&'a [ManualSelection]),
}

/// Immutable copy of the questions a consultation was captured with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TemplateSnapshot {
    schema_version: u32,
    template: Option<SnapshotTemplateRef>,
    categories: Vec<Category>,
    questions: Vec<SnapshotQuestion>,
    captured_at: String,
    digest: String,
}

/// Build a snapshot. The same inputs always give an equal snapshot.
pub fn build_snapshot(
    source: SnapshotSource<'_>,
    captured_at: DateTime<Utc>,
) -> SnapshotResult<TemplateSnapshot> {
    let (template, categories, questions) = match source {
        SnapshotSource::Template {
            template,
            questions,
        } => {
            let mut configs: Vec<_> = template.question_configs.iter().collect();
            configs.sort_by_key(|c| c.order);

            let captured = configs
                .into_iter()
                .map(|config| {
                    let question = questions
                        .iter()
                        .find(|q| q.id == config.question_id)
                        .ok_or_else(|| {
                            SnapshotError::UnresolvedQuestion(config.question_id.clone())
                        })?;
                    let mut snap = SnapshotQuestion::from_question(
                        question,
                        config.order,
                        config.visible,
                        config.required_override,
                    );
                    snap.category_id = config.category_key();
                    snap.extra = config.extra.clone();
                    Ok(snap)
                })
                .collect::<SnapshotResult<Vec<_>>>()?;

            let identity = SnapshotTemplateRef {
                id: template.id.clone(),
                name: template.name.clone(),
                description: template.description.clone(),
                consult_type: template.consult_type,
                config: template.config.clone(),
            };
            (Some(identity), template.effective_categories(), captured)
        }
        SnapshotSource::Manual(selection) => {
            let captured = selection
                .iter()
                .enumerate()
                .map(|(order, item)| {
                    SnapshotQuestion::from_question(
                        &item.question,
                        order,
                        item.selected,
                        item.question.required,
                    )
                })
                .collect();
            (None, Vec::new(), captured)
        }
    };

    let mut snapshot = TemplateSnapshot {
        schema_version: SNAPSHOT_SCHEMA_VERSION,
        template,
        categories,
        questions,
        captured_at: captured_at.to_rfc3339(),
        digest: String::new(),
    };
    snapshot.digest = snapshot.compute_digest()?;
    Ok(snapshot)
}

impl TemplateSnapshot {
    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    /// Source template identity (None for manual selections).
    pub fn template(&self) -> Option<&SnapshotTemplateRef> {
        self.template.as_ref()
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Every captured question, hidden ones included, in order.
    pub fn questions(&self) -> &[SnapshotQuestion] {
        &self.questions
    }

    pub fn captured_at(&self) -> &str {
        &self.captured_at
    }

    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn question(&self, question_id: &str) -> Option<&SnapshotQuestion> {
        self.questions.iter().find(|q| q.question_id == question_id)
    }

    /// Visible questions, the ones the answer collector renders.
    pub fn answerable(&self) -> impl Iterator<Item = &SnapshotQuestion> {
        self.questions.iter().filter(|q| q.visible)
    }

    /// SHA-256 over the canonical JSON with the digest field blanked.
    pub fn compute_digest(&self) -> SnapshotResult<String> {
        let mut unsigned = self.clone();
        unsigned.digest.clear();
        let canonical = serde_json::to_vec(&unsigned)?;

        let mut hasher = Sha256::new();
        hasher.update(&canonical);
        Ok(hex::encode(hasher.finalize()))
    }

    /// Whether the stored digest still matches the content.
    pub fn verify_digest(&self) -> bool {
        self.compute_digest()
            .map(|digest| digest == self.digest)
            .unwrap_or(false)
    }
}

//! Consultation models: answers and the append-only consultation record.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::question::QuestionType;
use super::template::ConsultType;
use crate::snapshot::TemplateSnapshot;

/// A captured answer value. Shape depends on the question type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(untagged)]
pub enum AnswerValue {
    /// No value (serialized as null)
    #[default]
    Empty,
    /// Boolean answer
    Boolean(bool),
    /// Integer answer
    Integer(i64),
    /// Decimal answer
    Decimal(f64),
    /// Text, ISO date, single option value, or free text fallback
    Text(String),
    /// Selected option values of a multi question
    Choices(Vec<String>),
}

impl AnswerValue {
    /// A value is empty iff it is absent, whitespace-only text, or an empty selection.
    pub fn is_empty(&self) -> bool {
        match self {
            AnswerValue::Empty => true,
            AnswerValue::Text(s) => s.trim().is_empty(),
            AnswerValue::Choices(values) => values.is_empty(),
            AnswerValue::Boolean(_) | AnswerValue::Integer(_) | AnswerValue::Decimal(_) => false,
        }
    }

    /// Numeric view (integers widen, numeric text is parsed).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AnswerValue::Integer(i) => Some(*i as f64),
            AnswerValue::Decimal(d) => Some(*d),
            AnswerValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            AnswerValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_choices(&self) -> Option<&[String]> {
        match self {
            AnswerValue::Choices(values) => Some(values),
            _ => None,
        }
    }
}

/// One recorded answer, self-describing so it survives question edits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Answer {
    /// Question ID at capture time (not a live reference)
    pub question_id: String,
    /// Question text at capture time
    pub question_text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub code: Option<String>,
    pub unit: Option<String>,
    pub value: AnswerValue,
    /// Trimmed observation; never an empty string
    pub observation: Option<String>,
    /// Effective required flag when the answer was captured
    pub required_at_capture: bool,
    /// Ad-hoc or practitioner-authored question
    #[serde(default)]
    pub custom: bool,
}

/// Who the consultation is for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PatientRef {
    /// A patient already known to the server
    Existing { id: String },
    /// Intake fields for a patient created together with the initial consultation
    Intake { fields: Map<String, Value> },
}

/// Metrics derived from answers at capture time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ConsultationMetrics {
    /// Body-mass index, two decimals
    pub bmi: Option<f64>,
}

/// Request body for the consultation create endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewConsultation {
    pub patient: PatientRef,
    pub practitioner: Option<String>,
    pub consult_type: ConsultType,
    pub template_used_ref: Option<String>,
    pub template_snapshot: TemplateSnapshot,
    pub answers: Vec<Answer>,
    #[serde(default)]
    pub metrics: ConsultationMetrics,
    #[serde(default)]
    pub notes: String,
}

/// A recorded consultation. Written once; there are no mutators.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Consultation {
    id: String,
    patient_ref: String,
    practitioner: Option<String>,
    consult_type: ConsultType,
    template_used_ref: Option<String>,
    template_snapshot: TemplateSnapshot,
    answers: Vec<Answer>,
    metrics: ConsultationMetrics,
    notes: String,
    created_at: String,
}

impl Consultation {
    /// Record a consultation for a resolved patient.
    pub fn record(request: NewConsultation, patient_ref: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            patient_ref,
            practitioner: request.practitioner,
            consult_type: request.consult_type,
            template_used_ref: request.template_used_ref,
            template_snapshot: request.template_snapshot,
            answers: request.answers,
            metrics: request.metrics,
            notes: request.notes,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Rebuild a stored record (store use only).
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        id: String,
        patient_ref: String,
        practitioner: Option<String>,
        consult_type: ConsultType,
        template_used_ref: Option<String>,
        template_snapshot: TemplateSnapshot,
        answers: Vec<Answer>,
        metrics: ConsultationMetrics,
        notes: String,
        created_at: String,
    ) -> Self {
        Self {
            id,
            patient_ref,
            practitioner,
            consult_type,
            template_used_ref,
            template_snapshot,
            answers,
            metrics,
            notes,
            created_at,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn patient_ref(&self) -> &str {
        &self.patient_ref
    }

    pub fn practitioner(&self) -> Option<&str> {
        self.practitioner.as_deref()
    }

    pub fn consult_type(&self) -> ConsultType {
        self.consult_type
    }

    /// Source template, if it still exists.
    pub fn template_used_ref(&self) -> Option<&str> {
        self.template_used_ref.as_deref()
    }

    pub fn template_snapshot(&self) -> &TemplateSnapshot {
        &self.template_snapshot
    }

    pub fn answers(&self) -> &[Answer] {
        &self.answers
    }

    pub fn metrics(&self) -> &ConsultationMetrics {
        &self.metrics
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn created_at(&self) -> &str {
        &self.created_at
    }

    /// Answer recorded for a question code.
    pub fn answer_by_code(&self, code: &str) -> Option<&Answer> {
        self.answers
            .iter()
            .find(|a| a.code.as_deref() == Some(code))
    }
}

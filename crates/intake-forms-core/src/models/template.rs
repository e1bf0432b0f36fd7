//! Template models.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::question::Question;

/// Legacy per-question category tag keys, in lookup order.
pub const LEGACY_CATEGORY_KEYS: [&str; 2] = ["categoria", "category"];

/// Legacy per-question category label keys, in lookup order.
pub const LEGACY_CATEGORY_LABEL_KEYS: [&str; 4] = [
    "categoria_nombre",
    "categoriaNombre",
    "categoria_label",
    "categoriaLabel",
];

/// Kind of visit a template applies to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ConsultType {
    /// First visit
    #[serde(rename = "INITIAL", alias = "INICIAL")]
    Initial,
    /// Subsequent visit
    #[serde(rename = "FOLLOWUP", alias = "SEGUIMIENTO")]
    FollowUp,
}

impl ConsultType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsultType::Initial => "INITIAL",
            ConsultType::FollowUp => "FOLLOWUP",
        }
    }

    /// Parse the stored spelling (accepts legacy Spanish spellings).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "INITIAL" | "INICIAL" => Some(ConsultType::Initial),
            "FOLLOWUP" | "SEGUIMIENTO" => Some(ConsultType::FollowUp),
            _ => None,
        }
    }
}

/// A named grouping of template questions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub id: String,
    pub name: String,
    /// Dense, zero-based position
    pub order: usize,
}

/// Per-template configuration of one question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TemplateQuestionConfig {
    /// Referenced question ID
    pub question_id: String,
    /// Dense, zero-based position within the template
    pub order: usize,
    /// Hidden questions are kept in snapshots but not answered
    pub visible: bool,
    /// Template-level required flag
    pub required_override: bool,
    /// Category this question is filed under (None = root)
    pub category_id: Option<String>,
    /// Free-form settings (placeholder, default value, legacy category tags)
    #[serde(default)]
    pub extra: Map<String, Value>,
}

impl TemplateQuestionConfig {
    /// Create a config for a freshly added question.
    pub fn for_question(question: &Question, order: usize) -> Self {
        Self {
            question_id: question.id.clone(),
            order,
            visible: true,
            required_override: question.required,
            category_id: None,
            extra: Map::new(),
        }
    }

    /// Legacy category tag stored in `extra`, trimmed and non-empty.
    pub fn legacy_category_tag(&self) -> Option<String> {
        LEGACY_CATEGORY_KEYS
            .iter()
            .filter_map(|key| self.extra.get(*key))
            .find_map(value_to_key)
    }

    /// Legacy category label stored in `extra`, trimmed and non-empty.
    pub fn legacy_category_label(&self) -> Option<String> {
        LEGACY_CATEGORY_LABEL_KEYS
            .iter()
            .filter_map(|key| self.extra.get(*key))
            .find_map(value_to_key)
    }

    /// Move this config to the root, dropping the explicit ref and any legacy tag.
    pub fn clear_category(&mut self) {
        self.category_id = None;
        for key in LEGACY_CATEGORY_KEYS.iter().chain(LEGACY_CATEGORY_LABEL_KEYS.iter()) {
            self.extra.remove(*key);
        }
    }

    /// Category key used for grouping: explicit ref first, then the legacy tag.
    pub fn category_key(&self) -> Option<String> {
        self.category_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .or_else(|| self.legacy_category_tag())
    }
}

/// A named, reusable, ordered collection of question references.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Template {
    pub id: String,
    /// Owning practitioner (None = system template)
    pub owner: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub consult_type: ConsultType,
    /// Used automatically for new consultations of this type
    pub is_default: bool,
    pub active: bool,
    /// Free-form template settings
    #[serde(default)]
    pub config: Map<String, Value>,
    /// Explicit category list (may be empty for legacy templates)
    #[serde(default)]
    pub categories: Vec<Category>,
    /// Question configs, kept sorted by `order`
    #[serde(default)]
    pub question_configs: Vec<TemplateQuestionConfig>,
    pub created_at: String,
    pub updated_at: String,
}

impl Template {
    /// Create an empty template.
    pub fn new(owner: Option<String>, name: impl Into<String>, consult_type: ConsultType) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            owner,
            name: name.into(),
            description: None,
            consult_type,
            is_default: false,
            active: true,
            config: Map::new(),
            categories: Vec::new(),
            question_configs: Vec::new(),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Find a question config by question ID.
    pub fn config(&self, question_id: &str) -> Option<&TemplateQuestionConfig> {
        self.question_configs
            .iter()
            .find(|c| c.question_id == question_id)
    }

    pub(crate) fn config_mut(&mut self, question_id: &str) -> Option<&mut TemplateQuestionConfig> {
        self.question_configs
            .iter_mut()
            .find(|c| c.question_id == question_id)
    }

    /// Whether a question is already part of this template.
    pub fn contains(&self, question_id: &str) -> bool {
        self.config(question_id).is_some()
    }

    /// Find an explicit category by ID.
    pub fn category(&self, category_id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == category_id)
    }

    /// Touch the updated_at timestamp.
    pub fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().to_rfc3339();
    }
}

/// Stringify a loosely typed identifier (strings are trimmed, numbers printed).
pub(crate) fn value_to_key(value: &Value) -> Option<String> {
    let key = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if key.is_empty() {
        None
    } else {
        Some(key)
    }
}

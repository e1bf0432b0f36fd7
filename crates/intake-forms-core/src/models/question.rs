//! Question bank models.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Closed vocabulary of question types.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    /// Free text
    Text,
    /// Whole number
    Integer,
    /// Floating point number
    Decimal,
    /// Yes / no (tri-state while editing)
    Boolean,
    /// ISO calendar date
    Date,
    /// One option out of a list
    Single,
    /// Any number of options out of a list
    Multi,
}

impl QuestionType {
    /// Wire spelling of the type.
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Text => "text",
            QuestionType::Integer => "integer",
            QuestionType::Decimal => "decimal",
            QuestionType::Boolean => "boolean",
            QuestionType::Date => "date",
            QuestionType::Single => "single",
            QuestionType::Multi => "multi",
        }
    }

    /// Whether answer options are meaningful for this type.
    pub fn uses_options(&self) -> bool {
        matches!(self, QuestionType::Single | QuestionType::Multi)
    }

    /// All canonical types.
    pub fn all() -> [QuestionType; 7] {
        [
            QuestionType::Text,
            QuestionType::Integer,
            QuestionType::Decimal,
            QuestionType::Boolean,
            QuestionType::Date,
            QuestionType::Single,
            QuestionType::Multi,
        ]
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a question comes from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum QuestionOrigin {
    /// Shipped with the system, read-only
    System,
    /// Authored by a practitioner
    Custom,
}

/// A selectable answer option. Unique by `value` within a question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct AnswerOption {
    /// Slug stored in answers
    pub value: String,
    /// Human label
    pub label: String,
}

impl AnswerOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// A reusable question definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Question {
    /// Unique question ID
    pub id: String,
    /// Prompt shown to the practitioner
    pub text: String,
    /// Canonical type
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    /// Measurement unit (e.g., "kg", "cm")
    pub unit: Option<String>,
    /// Stable machine code (e.g., "peso_kg")
    pub code: Option<String>,
    /// Options for single/multi questions
    #[serde(default)]
    pub options: Vec<AnswerOption>,
    /// Whether the question is required by default
    pub required: bool,
    /// System-provided or practitioner-authored
    pub origin: QuestionOrigin,
    /// Owning practitioner (None for system questions)
    pub owner: Option<String>,
    /// Whether the question is offered in the bank
    pub active: bool,
    /// Creation timestamp
    pub created_at: String,
}

impl Question {
    /// Create a system question.
    pub fn system(id: impl Into<String>, text: impl Into<String>, question_type: QuestionType) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            question_type,
            unit: None,
            code: None,
            options: Vec::new(),
            required: false,
            origin: QuestionOrigin::System,
            owner: None,
            active: true,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Create a custom question owned by a practitioner.
    pub fn custom(owner: impl Into<String>, text: impl Into<String>, question_type: QuestionType) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            text: text.into(),
            question_type,
            unit: None,
            code: None,
            options: Vec::new(),
            required: false,
            origin: QuestionOrigin::Custom,
            owner: Some(owner.into()),
            active: true,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_options(mut self, options: Vec<AnswerOption>) -> Self {
        self.options = options;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Whether this question is read-only to practitioners.
    pub fn is_system(&self) -> bool {
        self.origin == QuestionOrigin::System
    }

    /// Whether a practitioner may place this question in their own template.
    pub fn usable_by(&self, owner: Option<&str>) -> bool {
        match (&self.owner, owner) {
            (Some(question_owner), Some(template_owner)) => question_owner == template_owner,
            _ => true,
        }
    }

    /// Look up an option by value.
    pub fn option(&self, value: &str) -> Option<&AnswerOption> {
        self.options.iter().find(|o| o.value == value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_wire_spelling() {
        let json = serde_json::to_string(&QuestionType::Multi).unwrap();
        assert_eq!(json, "\"multi\"");
        let parsed: QuestionType = serde_json::from_str("\"decimal\"").unwrap();
        assert_eq!(parsed, QuestionType::Decimal);
    }

    #[test]
    fn test_question_serializes_type_field() {
        let q = Question::system("q1", "Peso", QuestionType::Decimal).with_unit("kg");
        let value = serde_json::to_value(&q).unwrap();
        assert_eq!(value["type"], "decimal");
        assert_eq!(value["origin"], "SYSTEM");
    }

    #[test]
    fn test_usable_by() {
        let mine = Question::custom("nutri-1", "Mine", QuestionType::Text);
        let system = Question::system("q1", "Peso", QuestionType::Decimal);

        assert!(mine.usable_by(Some("nutri-1")));
        assert!(!mine.usable_by(Some("nutri-2")));
        assert!(mine.usable_by(None));
        assert!(system.usable_by(Some("nutri-2")));
    }

    #[test]
    fn test_custom_question_gets_uuid() {
        let q = Question::custom("nutri-1", "Hábitos", QuestionType::Text);
        assert_eq!(q.id.len(), 36);
        assert!(!q.is_system());
    }
}

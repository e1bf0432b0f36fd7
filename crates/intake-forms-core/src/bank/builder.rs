//! Custom question authoring.

use serde::{Deserialize, Serialize};

use super::{QuestionBuildError, QuestionBuildResult};
use crate::models::{Question, QuestionType};
use crate::normalize::{normalize_options, RawOption, TypeNormalizer};

/// A question as typed by a practitioner, before normalization.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NewQuestion {
    pub text: String,
    /// Free-form type name, normalized on build
    #[serde(rename = "type", alias = "tipo", default)]
    pub raw_type: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub options: Vec<RawOption>,
}

impl NewQuestion {
    pub fn new(text: impl Into<String>, raw_type: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            raw_type: raw_type.into(),
            ..Default::default()
        }
    }

    pub fn with_options<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.options = labels
            .into_iter()
            .map(|label| RawOption::from(label.as_ref()))
            .collect();
        self
    }

    /// Validate and normalize into a custom question owned by `owner`.
    pub fn build(&self, owner: &str, types: &TypeNormalizer) -> QuestionBuildResult<Question> {
        let text = self.text.trim();
        if text.is_empty() {
            return Err(QuestionBuildError::EmptyText);
        }

        let question_type = types.normalize(&self.raw_type);
        let options = if question_type.uses_options() {
            normalize_options(&self.options)
        } else {
            Vec::new()
        };
        if question_type == QuestionType::Multi && options.is_empty() {
            return Err(QuestionBuildError::MissingOptions);
        }

        let mut question = Question::custom(owner, text, question_type).with_options(options);
        question.required = self.required;
        question.unit = trimmed(self.unit.as_deref());
        question.code = trimmed(self.code.as_deref());
        Ok(question)
    }
}

fn trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

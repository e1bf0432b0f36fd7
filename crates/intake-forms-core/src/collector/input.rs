//! Per-type input dispatch and parsing.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{InputError, InputResult};
use crate::models::{AnswerValue, QuestionType};
use crate::snapshot::SnapshotQuestion;

/// Input affordance a question is edited with.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    FreeText,
    Integer,
    Decimal,
    /// Unset, true or false
    TriState,
    Date,
    SingleChoice,
    /// Toggle semantics over option values
    MultiChoice,
}

impl InputKind {
    /// Choice questions without options degrade to free text.
    pub fn for_type(question_type: QuestionType, option_count: usize) -> Self {
        match question_type {
            QuestionType::Text => InputKind::FreeText,
            QuestionType::Integer => InputKind::Integer,
            QuestionType::Decimal => InputKind::Decimal,
            QuestionType::Boolean => InputKind::TriState,
            QuestionType::Date => InputKind::Date,
            QuestionType::Single if option_count > 0 => InputKind::SingleChoice,
            QuestionType::Multi if option_count > 0 => InputKind::MultiChoice,
            QuestionType::Single | QuestionType::Multi => InputKind::FreeText,
        }
    }

    pub fn for_question(question: &SnapshotQuestion) -> Self {
        Self::for_type(question.question_type, question.options.len())
    }
}

pub fn parse_integer(raw: &str) -> InputResult<AnswerValue> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(AnswerValue::Empty);
    }
    raw.parse::<i64>()
        .map(AnswerValue::Integer)
        .map_err(|_| InputError::InvalidInteger(raw.to_string()))
}

/// Accepts a comma as decimal separator.
pub fn parse_decimal(raw: &str) -> InputResult<AnswerValue> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(AnswerValue::Empty);
    }
    match raw.replace(',', ".").parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(AnswerValue::Decimal(value)),
        _ => Err(InputError::InvalidDecimal(raw.to_string())),
    }
}

/// ISO `YYYY-MM-DD`; stored as the normalized string.
pub fn parse_date(raw: &str) -> InputResult<AnswerValue> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(AnswerValue::Empty);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|date| AnswerValue::Text(date.format("%Y-%m-%d").to_string()))
        .map_err(|_| InputError::InvalidDate(raw.to_string()))
}

pub fn parse_tri_state(raw: &str) -> InputResult<Option<bool>> {
    match raw.trim().to_lowercase().as_str() {
        "" => Ok(None),
        "true" | "si" | "sí" | "yes" | "1" => Ok(Some(true)),
        "false" | "no" | "0" => Ok(Some(false)),
        other => Err(InputError::InvalidBoolean(other.to_string())),
    }
}

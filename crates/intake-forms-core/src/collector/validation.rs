//! Required-answer validation.

use super::{ValidationError, ValidationResult};
use crate::models::Answer;

/// Fail fast on the first required answer that is empty.
pub fn validate_required(answers: &[Answer]) -> ValidationResult<()> {
    if answers.is_empty() {
        return Err(ValidationError::NoQuestions);
    }
    match answers
        .iter()
        .find(|a| a.required_at_capture && a.value.is_empty())
    {
        Some(missing) => Err(ValidationError::MissingRequired {
            question_id: missing.question_id.clone(),
            question_text: missing.question_text.clone(),
        }),
        None => Ok(()),
    }
}

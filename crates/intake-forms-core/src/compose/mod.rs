//! Template composition: categories, question configs, display grouping.
//!
//! Every mutating operation keeps `question_configs` sorted with a dense,
//! zero-based `order` and free of duplicate question references.

mod categories;
mod composer;
mod grouping;

pub use categories::*;
pub use composer::*;
pub use grouping::*;

use thiserror::Error;

/// Errors raised by local template edits. None of these reach the server.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompositionError {
    #[error("Category name cannot be empty")]
    EmptyCategoryName,

    #[error("A category named '{0}' already exists")]
    DuplicateCategoryName(String),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Question {0} is not part of this template")]
    QuestionNotInTemplate(String),

    #[error("Question {0} is filed under a category and cannot be reordered at the root")]
    NotRootQuestion(String),

    #[error("Template name cannot be empty")]
    EmptyTemplateName,

    #[error("Template has no questions")]
    NoQuestions,

    #[error("Question {0} appears more than once")]
    DuplicateQuestion(String),

    #[error("Question order is not dense at position {0}")]
    NonDenseOrder(usize),
}

pub type CompositionResult<T> = Result<T, CompositionError>;

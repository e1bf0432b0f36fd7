//! Question bank: custom question authoring, listing filters and search.

mod builder;
mod search;

pub use builder::*;
pub use search::*;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuestionBuildError {
    #[error("Question text cannot be empty")]
    EmptyText,

    #[error("A multiple choice question needs at least one option")]
    MissingOptions,
}

pub type QuestionBuildResult<T> = Result<T, QuestionBuildError>;

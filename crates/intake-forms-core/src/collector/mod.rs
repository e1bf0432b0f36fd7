//! Answer collection and consultation drafting.
//!
//! ```text
//! Template / ManualSelection ──▶ ConsultationDraft ──▶ AnswerSheet (typed input)
//!                                       │
//!                                    submit
//!                                       │
//!        Editing ──▶ Validating ──▶ Submitting ──▶ Succeeded
//!           ▲            │               │
//!           └────────────┘               ▼
//!           └──────────────────────── Failed
//! ```

mod draft;
mod followup;
mod input;
mod metrics;
mod sheet;
mod validation;

pub use draft::*;
pub use followup::*;
pub use input::*;
pub use metrics::*;
pub use sheet::*;
pub use validation::*;

use thiserror::Error;

use crate::api::ApiError;
use crate::bank::QuestionBuildError;
use crate::snapshot::SnapshotError;

/// Rejected edits to a single answer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("Unknown question: {0}")]
    UnknownQuestion(String),

    #[error("Question {question_id} does not take {kind:?} input")]
    WrongKind { question_id: String, kind: InputKind },

    #[error("Not an integer: {0}")]
    InvalidInteger(String),

    #[error("Not a number: {0}")]
    InvalidDecimal(String),

    #[error("Not a date (expected YYYY-MM-DD): {0}")]
    InvalidDate(String),

    #[error("Not a yes/no value: {0}")]
    InvalidBoolean(String),

    #[error("Question {question_id} has no option '{value}'")]
    UnknownOption { question_id: String, value: String },
}

pub type InputResult<T> = Result<T, InputError>;

/// Client-side submission checks. These never reach the server.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("'{question_text}' is required")]
    MissingRequired {
        question_id: String,
        question_text: String,
    },

    #[error("There are no questions to answer")]
    NoQuestions,
}

pub type ValidationResult<T> = Result<T, ValidationError>;

#[derive(Error, Debug)]
pub enum DraftError {
    #[error("Draft was already submitted")]
    AlreadySubmitted,

    #[error("Draft cannot be edited while {0}")]
    Busy(DraftState),

    #[error("Only manual drafts can change their question selection")]
    NotManual,

    #[error("Ad-hoc questions need a practitioner")]
    MissingPractitioner,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Question(#[from] QuestionBuildError),
}

pub type DraftResult<T> = Result<T, DraftError>;

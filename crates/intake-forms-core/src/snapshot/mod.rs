//! Template snapshots embedded in consultations.
//!
//! A snapshot is a self-contained, versioned copy of the questions a
//! consultation was captured with. Building one is a pure function of its
//! inputs; once attached to a consultation it is never mutated, and its
//! SHA-256 digest lets readers check that it was not altered.
//!
//! ## Building
//!
//! ```text
//! SnapshotSource::Template { template, questions }   SnapshotSource::Manual(selection)
//!                 │                                            │
//!                 └────────────── build_snapshot ──────────────┘
//!                                       │
//!                                TemplateSnapshot ──▶ answerable() ──▶ AnswerSheet
//! ```

mod builder;
mod grouping;

pub use builder::*;
pub use grouping::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Question {0} referenced by the template could not be resolved")]
    UnresolvedQuestion(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type SnapshotResult<T> = Result<T, SnapshotError>;

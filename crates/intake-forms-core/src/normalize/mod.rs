//! Question Bank Adapter normalization.
//!
//! Free-form type names and answer options arrive from several historical
//! call sites. Everything here is total: unknown input degrades to a safe
//! default instead of failing, so the rest of the engine only ever sees
//! [`QuestionType`](crate::models::QuestionType) and
//! [`AnswerOption`](crate::models::AnswerOption).

mod options;
mod types;

pub use options::*;
pub use types::*;

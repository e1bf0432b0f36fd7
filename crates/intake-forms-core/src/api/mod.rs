//! Collaborator contracts consumed by the engine.
//!
//! The engine never talks to a transport directly. Whatever owns persistence
//! (a REST client, or the bundled SQLite store in [`crate::db`]) implements
//! these traits, and is the source of truth for uniqueness and
//! default-template rules across owners.

use thiserror::Error;

use crate::bank::QuestionFilter;
use crate::models::{ConsultType, Consultation, NewConsultation, Question, Template};

/// Message shown when a failure carries no server detail.
pub const GENERIC_FAILURE_MESSAGE: &str = "The request could not be completed. Please try again.";

/// Errors reported by a collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("Request rejected{}", detail_suffix(.detail))]
    Rejected { detail: Option<String> },

    #[error("Conflict{}", detail_suffix(.detail))]
    Conflict { detail: Option<String> },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail
        .as_deref()
        .map(|d| format!(": {}", d))
        .unwrap_or_default()
}

impl ApiError {
    pub fn rejected(detail: impl Into<String>) -> Self {
        ApiError::Rejected {
            detail: Some(detail.into()),
        }
    }

    pub fn conflict(detail: impl Into<String>) -> Self {
        ApiError::Conflict {
            detail: Some(detail.into()),
        }
    }

    /// Single user-visible message: server detail when there is one.
    pub fn user_message(&self) -> String {
        let detail = match self {
            ApiError::Rejected { detail } | ApiError::Conflict { detail } => detail.as_deref(),
            ApiError::NotFound(_) | ApiError::Transport(_) => None,
        };
        detail
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .unwrap_or(GENERIC_FAILURE_MESSAGE)
            .to_string()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Question bank. System questions are read-only.
pub trait QuestionBank {
    fn list_questions(&self, filter: &QuestionFilter) -> ApiResult<Vec<Question>>;

    fn get_question(&self, id: &str) -> ApiResult<Question>;

    fn create_question(&self, question: &Question) -> ApiResult<Question>;

    fn update_question(&self, question: &Question) -> ApiResult<Question>;

    fn delete_question(&self, id: &str) -> ApiResult<()>;

    /// Resolve question definitions in the given order.
    fn resolve_questions(&self, ids: &[String]) -> ApiResult<Vec<Question>> {
        ids.iter().map(|id| self.get_question(id)).collect()
    }
}

/// Template store.
pub trait TemplateApi {
    /// Templates visible to `owner` (system ones plus their own).
    fn list_templates(
        &self,
        owner: Option<&str>,
        consult_type: Option<ConsultType>,
    ) -> ApiResult<Vec<Template>>;

    fn get_template(&self, id: &str) -> ApiResult<Template>;

    fn create_template(&self, template: &Template) -> ApiResult<Template>;

    /// Last write wins.
    fn update_template(&self, template: &Template) -> ApiResult<Template>;

    fn delete_template(&self, id: &str) -> ApiResult<()>;

    /// Deep copy under a new ID and name, optionally re-owned. Never default.
    fn duplicate_template(&self, id: &str, name: &str, owner: Option<&str>) -> ApiResult<Template>;
}

/// Consultation store. Records are append-only.
pub trait ConsultationApi {
    /// Create an initial consultation, registering the patient from intake fields if needed.
    fn create_initial(&self, request: &NewConsultation) -> ApiResult<Consultation>;

    /// Create a follow-up for an existing patient.
    fn create_followup(&self, request: &NewConsultation) -> ApiResult<Consultation>;

    /// Consultations of a patient, oldest first.
    fn list_for_patient(&self, patient_ref: &str) -> ApiResult<Vec<Consultation>>;

    fn get_consultation(&self, id: &str) -> ApiResult<Consultation>;

    /// The patient's first initial consultation, if any.
    fn initial_for_patient(&self, patient_ref: &str) -> ApiResult<Option<Consultation>> {
        Ok(self
            .list_for_patient(patient_ref)?
            .into_iter()
            .find(|c| c.consult_type() == ConsultType::Initial))
    }
}

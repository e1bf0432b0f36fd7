//! Intake Forms Core Library
//!
//! Template-driven dynamic questionnaire engine for clinical consultations.
//!
//! # Architecture
//!
//! ```text
//!   Question Bank ──▶ normalize (types, options)
//!         │
//!         ▼
//!   Template Composer ◀── Category Manager
//!         │
//!         ▼
//!   ConsultationDraft ──▶ AnswerSheet (typed input, observations)
//!         │
//!       submit: validate required ──▶ build snapshot ──▶ Consultation API
//!                                            │
//!                            ┌───────────────▼───────────────┐
//!                            │   consultation (append-only)  │
//!                            │   template_snapshot + digest  │
//!                            │   answers, metrics            │
//!                            └───────────────────────────────┘
//! ```
//!
//! # Core Principle
//!
//! **A consultation's snapshot and answers are written once.** Editing or
//! deleting the source template later never changes what was recorded.
//!
//! # Modules
//!
//! - [`models`]: Domain types (Question, Template, Consultation, Answer)
//! - [`normalize`]: Type and option normalization
//! - [`bank`]: Custom question authoring and question search
//! - [`compose`]: Category manager and template composer
//! - [`snapshot`]: Snapshot builder and historical grouping
//! - [`collector`]: Answer collection and the drafting state machine
//! - [`api`]: Collaborator contracts
//! - [`db`]: SQLite store implementing the collaborator contracts
//! - [`config`]: Engine configuration

pub mod api;
pub mod bank;
pub mod collector;
pub mod compose;
pub mod config;
pub mod db;
pub mod models;
pub mod normalize;
pub mod snapshot;

// Re-export commonly used types
pub use api::{ApiError, ConsultationApi, QuestionBank, TemplateApi};
pub use bank::{NewQuestion, QuestionFilter, QuestionScope};
pub use collector::{AnswerSheet, ConsultationDraft, DraftState};
pub use config::EngineConfig;
pub use db::Database;
pub use models::{
    Answer, AnswerOption, AnswerValue, Category, ConsultType, Consultation, PatientRef, Question,
    QuestionType, Template, TemplateQuestionConfig,
};
pub use normalize::{normalize_options, normalize_type, TypeNormalizer};
pub use snapshot::{build_snapshot, SnapshotSource, TemplateSnapshot};

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};

use tracing::info;

// =========================================================================
// Error Type
// =========================================================================

#[derive(Debug, thiserror::Error)]
pub enum IntakeFormsError {
    #[error("Database error: {0}")]
    Database(#[from] db::DbError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Draft(#[from] collector::DraftError),

    #[error(transparent)]
    Composition(#[from] compose::CompositionError),

    #[error(transparent)]
    QuestionBuild(#[from] bank::QuestionBuildError),

    #[error(transparent)]
    Snapshot(#[from] snapshot::SnapshotError),

    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error("Lock poisoned: {0}")]
    Lock(String),
}

impl<T> From<std::sync::PoisonError<T>> for IntakeFormsError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        IntakeFormsError::Lock(e.to_string())
    }
}

pub type IntakeFormsResult<T> = Result<T, IntakeFormsError>;

// =========================================================================
// Factory Functions
// =========================================================================

/// Open or create a store at the given path.
pub fn open_store<P: AsRef<Path>>(
    path: P,
    config: EngineConfig,
) -> IntakeFormsResult<Arc<IntakeFormsCore>> {
    let db = Database::open(path)?;
    Ok(Arc::new(IntakeFormsCore::new(db, config)))
}

/// Create an in-memory store (for testing).
pub fn open_store_in_memory(config: EngineConfig) -> IntakeFormsResult<Arc<IntakeFormsCore>> {
    let db = Database::open_in_memory()?;
    Ok(Arc::new(IntakeFormsCore::new(db, config)))
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe engine over a local store.
pub struct IntakeFormsCore {
    db: Arc<Mutex<Database>>,
    config: EngineConfig,
}

impl IntakeFormsCore {
    pub fn new(db: Database, config: EngineConfig) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // =========================================================================
    // Question Bank
    // =========================================================================

    /// Validate, normalize and store a practitioner's question.
    pub fn create_custom_question(
        &self,
        owner: &str,
        draft: &NewQuestion,
    ) -> IntakeFormsResult<Question> {
        let question = draft.build(owner, &self.config.type_normalizer())?;
        let db = self.db.lock()?;
        Ok(db.create_question(&question)?)
    }

    /// Store a system question.
    pub fn register_system_question(&self, question: &Question) -> IntakeFormsResult<Question> {
        let db = self.db.lock()?;
        Ok(db.create_question(question)?)
    }

    pub fn list_questions(&self, filter: &QuestionFilter) -> IntakeFormsResult<Vec<Question>> {
        let db = self.db.lock()?;
        Ok(db.list_questions(filter)?)
    }

    /// Search the questions visible to `owner`, skipping already selected ones.
    pub fn search_questions(
        &self,
        owner: Option<&str>,
        query: &str,
        exclude_ids: &HashSet<String>,
    ) -> IntakeFormsResult<Vec<Question>> {
        let filter = QuestionFilter {
            owner: owner.map(str::to_string),
            ..Default::default()
        };
        let available = self.list_questions(&filter)?;
        Ok(bank::search_questions(
            &available,
            query,
            exclude_ids,
            self.config.fuzzy_search_threshold,
        )
        .into_iter()
        .cloned()
        .collect())
    }

    pub fn delete_question(&self, id: &str) -> IntakeFormsResult<()> {
        let db = self.db.lock()?;
        Ok(db.delete_question(id)?)
    }

    // =========================================================================
    // Templates
    // =========================================================================

    pub fn create_template(&self, template: &Template) -> IntakeFormsResult<Template> {
        template.validate()?;
        let db = self.db.lock()?;
        Ok(db.create_template(template)?)
    }

    /// Save edits. Last write wins.
    pub fn update_template(&self, template: &Template) -> IntakeFormsResult<Template> {
        template.validate()?;
        let db = self.db.lock()?;
        Ok(db.update_template(template)?)
    }

    pub fn get_template(&self, id: &str) -> IntakeFormsResult<Template> {
        let db = self.db.lock()?;
        Ok(db.get_template(id)?)
    }

    pub fn list_templates(
        &self,
        owner: Option<&str>,
        consult_type: Option<ConsultType>,
    ) -> IntakeFormsResult<Vec<Template>> {
        let db = self.db.lock()?;
        Ok(db.list_templates(owner, consult_type)?)
    }

    /// The owner's default template for a consult type, else the system default.
    pub fn default_template(
        &self,
        owner: Option<&str>,
        consult_type: ConsultType,
    ) -> IntakeFormsResult<Option<Template>> {
        let templates = self.list_templates(owner, Some(consult_type))?;
        let defaults = || templates.iter().filter(|t| t.is_default && t.active);
        Ok(defaults()
            .find(|t| t.owner.is_some() && t.owner.as_deref() == owner)
            .or_else(|| defaults().find(|t| t.owner.is_none()))
            .cloned())
    }

    /// Copy a template. Without a name the copy is called `name + copy_suffix`.
    pub fn duplicate_template(
        &self,
        id: &str,
        name: Option<&str>,
        owner: Option<&str>,
    ) -> IntakeFormsResult<Template> {
        let db = self.db.lock()?;
        let name = match name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => name.to_string(),
            None => format!("{}{}", db.get_template(id)?.name, self.config.copy_suffix),
        };
        Ok(db.duplicate_template(id, &name, owner)?)
    }

    pub fn delete_template(&self, id: &str) -> IntakeFormsResult<()> {
        let db = self.db.lock()?;
        Ok(db.delete_template(id)?)
    }

    // =========================================================================
    // Drafts and Consultations
    // =========================================================================

    /// Start a draft that renders a stored template.
    pub fn start_template_draft(
        &self,
        patient: PatientRef,
        practitioner: Option<String>,
        template_id: &str,
    ) -> IntakeFormsResult<ConsultationDraft> {
        let db = self.db.lock()?;
        let template = db.get_template(template_id)?;
        let ids: Vec<String> = template
            .question_configs
            .iter()
            .map(|c| c.question_id.clone())
            .collect();
        let questions = db.resolve_questions(&ids)?;
        Ok(ConsultationDraft::from_template(
            patient,
            practitioner,
            template,
            questions,
            &self.config,
        )?)
    }

    /// Start an initial-visit draft over the practitioner's question bank.
    pub fn start_initial_draft(
        &self,
        patient: PatientRef,
        practitioner: Option<String>,
    ) -> IntakeFormsResult<ConsultationDraft> {
        let filter = QuestionFilter {
            owner: practitioner.clone(),
            ..Default::default()
        };
        let offered = self.list_questions(&filter)?;
        let selection = collector::preselect(offered, &self.config.preselected_codes);
        Ok(ConsultationDraft::manual(
            patient,
            practitioner,
            ConsultType::Initial,
            selection,
            &self.config,
        )?)
    }

    /// Start a follow-up draft offering the initial visit's questions and the
    /// practitioner's custom ones.
    pub fn start_followup_draft(
        &self,
        patient_id: &str,
        practitioner: Option<String>,
    ) -> IntakeFormsResult<ConsultationDraft> {
        let db = self.db.lock()?;
        let initial = db.initial_for_patient(patient_id)?;
        let custom = match practitioner.as_deref() {
            Some(owner) => db.list_questions(
                &QuestionFilter::for_owner(owner).with_scope(QuestionScope::Custom),
            )?,
            None => Vec::new(),
        };
        let candidates = collector::followup_candidates(initial.as_ref(), &custom);
        let selection = collector::preselect(candidates, &[]);
        Ok(ConsultationDraft::manual(
            PatientRef::Existing {
                id: patient_id.to_string(),
            },
            practitioner,
            ConsultType::FollowUp,
            selection,
            &self.config,
        )?)
    }

    /// Submit a draft. On failure the draft keeps its answers for a retry.
    pub fn submit_draft(&self, draft: &mut ConsultationDraft) -> IntakeFormsResult<Consultation> {
        let db = self.db.lock()?;
        let consultation = draft.submit(&*db, &*db, chrono::Utc::now())?;
        info!(consultation_id = consultation.id(), "draft submitted");
        Ok(consultation)
    }

    pub fn consultations_for_patient(&self, patient_ref: &str) -> IntakeFormsResult<Vec<Consultation>> {
        let db = self.db.lock()?;
        Ok(db.list_for_patient(patient_ref)?)
    }

    pub fn get_consultation(&self, id: &str) -> IntakeFormsResult<Consultation> {
        let db = self.db.lock()?;
        Ok(db.get_consultation(id)?)
    }
}

//! Consultation drafting state machine.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::followup::adhoc_question;
use super::metrics::derive_metrics;
use super::sheet::AnswerSheet;
use super::validation::validate_required;
use super::{DraftError, DraftResult, InputError};
use crate::api::{ApiError, ConsultationApi, TemplateApi};
use crate::config::EngineConfig;
use crate::models::{ConsultType, Consultation, NewConsultation, PatientRef, Question, Template};
use crate::snapshot::{
    build_snapshot, ManualSelection, SnapshotError, SnapshotQuestion, SnapshotResult,
    SnapshotSource, TemplateSnapshot,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DraftState {
    Editing,
    Validating,
    Submitting,
    Succeeded,
    Failed,
}

impl fmt::Display for DraftState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DraftState::Editing => "editing",
            DraftState::Validating => "validating",
            DraftState::Submitting => "submitting",
            DraftState::Succeeded => "succeeded",
            DraftState::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
enum DraftSource {
    Template(Box<Template>),
    Manual,
}

/// A consultation being filled in. Nothing is persisted until `submit` succeeds.
#[derive(Debug, Clone)]
pub struct ConsultationDraft {
    patient: PatientRef,
    practitioner: Option<String>,
    consult_type: ConsultType,
    source: DraftSource,
    /// Resolved definitions of every rendered question
    questions: Vec<Question>,
    sheet: AnswerSheet,
    notes: String,
    state: DraftState,
    last_error: Option<String>,
}

impl ConsultationDraft {
    /// Draft rendering a template with its resolved questions.
    pub fn from_template(
        patient: PatientRef,
        practitioner: Option<String>,
        template: Template,
        questions: Vec<Question>,
        config: &EngineConfig,
    ) -> DraftResult<Self> {
        let rendered = build_snapshot(
            SnapshotSource::Template {
                template: &template,
                questions: &questions,
            },
            Utc::now(),
        )?;
        debug!(template_id = %template.id, questions = questions.len(), "template draft started");
        Ok(Self {
            patient,
            practitioner,
            consult_type: template.consult_type,
            sheet: AnswerSheet::from_snapshot(&rendered, config.observation_max_chars),
            source: DraftSource::Template(Box::new(template)),
            questions,
            notes: String::new(),
            state: DraftState::Editing,
            last_error: None,
        })
    }

    /// Draft over a manual question selection.
    pub fn manual(
        patient: PatientRef,
        practitioner: Option<String>,
        consult_type: ConsultType,
        selection: Vec<ManualSelection>,
        config: &EngineConfig,
    ) -> DraftResult<Self> {
        let rendered = build_snapshot(SnapshotSource::Manual(&selection), Utc::now())?;
        debug!(consult_type = consult_type.as_str(), offered = selection.len(), "manual draft started");
        Ok(Self {
            patient,
            practitioner,
            consult_type,
            source: DraftSource::Manual,
            questions: selection.into_iter().map(|s| s.question).collect(),
            sheet: AnswerSheet::from_snapshot(&rendered, config.observation_max_chars),
            notes: String::new(),
            state: DraftState::Editing,
            last_error: None,
        })
    }

    pub fn state(&self) -> DraftState {
        self.state
    }

    /// Message of the last rejected submission, if any.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn consult_type(&self) -> ConsultType {
        self.consult_type
    }

    pub fn patient(&self) -> &PatientRef {
        &self.patient
    }

    /// Source template ID, for template drafts.
    pub fn template_id(&self) -> Option<&str> {
        match &self.source {
            DraftSource::Template(template) => Some(template.id.as_str()),
            DraftSource::Manual => None,
        }
    }

    pub fn sheet(&self) -> &AnswerSheet {
        &self.sheet
    }

    /// Mutable access to the answers. Editing a failed draft returns it to `Editing`.
    pub fn sheet_mut(&mut self) -> DraftResult<&mut AnswerSheet> {
        self.begin_edit()?;
        Ok(&mut self.sheet)
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn set_notes(&mut self, notes: &str) -> DraftResult<()> {
        self.begin_edit()?;
        self.notes = notes.trim().to_string();
        Ok(())
    }

    /// Select or deselect an offered question. Returns the new selection state.
    pub fn toggle_selection(&mut self, question_id: &str) -> DraftResult<bool> {
        self.ensure_manual()?;
        self.begin_edit()?;
        let selected = !self
            .sheet
            .entry(question_id)
            .map(|e| e.question.visible)
            .ok_or_else(|| InputError::UnknownQuestion(question_id.to_string()))?;
        self.sheet.set_visible(question_id, selected)?;
        Ok(selected)
    }

    /// Offer another bank question in a manual draft, selected.
    pub fn add_question(&mut self, question: Question) -> DraftResult<()> {
        self.ensure_manual()?;
        self.begin_edit()?;
        if self.questions.iter().any(|q| q.id == question.id) {
            self.sheet.set_visible(&question.id, true)?;
            return Ok(());
        }
        self.sheet
            .push(SnapshotQuestion::from_question(&question, 0, true, question.required));
        self.questions.push(question);
        Ok(())
    }

    /// Add an inline free-text question to a manual draft. Returns its ID.
    pub fn add_adhoc_question(&mut self, text: &str) -> DraftResult<String> {
        let owner = self
            .practitioner
            .clone()
            .ok_or(DraftError::MissingPractitioner)?;
        let question = adhoc_question(&owner, text)?;
        let id = question.id.clone();
        self.add_question(question)?;
        Ok(id)
    }

    /// Validate and submit. On success the recorded consultation is returned;
    /// on any failure the draft keeps every entered value.
    pub fn submit(
        &mut self,
        templates: &dyn TemplateApi,
        consultations: &dyn ConsultationApi,
        now: DateTime<Utc>,
    ) -> DraftResult<Consultation> {
        match self.state {
            DraftState::Editing | DraftState::Failed => {}
            DraftState::Succeeded => return Err(DraftError::AlreadySubmitted),
            busy => return Err(DraftError::Busy(busy)),
        }

        self.transition(DraftState::Validating);
        let answers = self.sheet.answers();
        if let Err(err) = validate_required(&answers) {
            warn!(error = %err, "draft validation failed");
            self.last_error = Some(err.to_string());
            self.transition(DraftState::Editing);
            return Err(err.into());
        }

        self.transition(DraftState::Submitting);
        let (snapshot, template_used_ref) = match self.final_snapshot(templates, now) {
            Ok(built) => built,
            Err(err) => {
                let message = match &err {
                    DraftError::Api(api) => api.user_message(),
                    other => other.to_string(),
                };
                self.fail(message);
                return Err(err);
            }
        };

        let request = NewConsultation {
            patient: self.patient.clone(),
            practitioner: self.practitioner.clone(),
            consult_type: self.consult_type,
            template_used_ref,
            template_snapshot: snapshot,
            metrics: derive_metrics(&answers),
            answers,
            notes: self.notes.clone(),
        };
        let result = match self.consult_type {
            ConsultType::Initial => consultations.create_initial(&request),
            ConsultType::FollowUp => consultations.create_followup(&request),
        };

        match result {
            Ok(consultation) => {
                self.last_error = None;
                self.transition(DraftState::Succeeded);
                info!(consultation_id = consultation.id(), "consultation recorded");
                Ok(consultation)
            }
            Err(err) => {
                self.fail(err.user_message());
                Err(err.into())
            }
        }
    }

    /// Snapshot to store: the template when it still exists, else the rendered list.
    fn final_snapshot(
        &self,
        templates: &dyn TemplateApi,
        now: DateTime<Utc>,
    ) -> DraftResult<(TemplateSnapshot, Option<String>)> {
        match &self.source {
            DraftSource::Template(template) => match templates.get_template(&template.id) {
                Ok(_) => {
                    let snapshot = build_snapshot(
                        SnapshotSource::Template {
                            template: template.as_ref(),
                            questions: &self.questions,
                        },
                        now,
                    )?;
                    Ok((snapshot, Some(template.id.clone())))
                }
                Err(ApiError::NotFound(_)) => {
                    warn!(template_id = %template.id, "template no longer available, snapshotting rendered questions");
                    Ok((self.rendered_snapshot(now)?, None))
                }
                Err(err) => Err(err.into()),
            },
            DraftSource::Manual => Ok((self.rendered_snapshot(now)?, None)),
        }
    }

    /// Manual snapshot of the rendered questions, keeping their effective required flags.
    fn rendered_snapshot(&self, now: DateTime<Utc>) -> SnapshotResult<TemplateSnapshot> {
        let selection = self
            .sheet
            .entries()
            .iter()
            .map(|entry| {
                let mut question = self
                    .questions
                    .iter()
                    .find(|q| q.id == entry.question.question_id)
                    .cloned()
                    .ok_or_else(|| {
                        SnapshotError::UnresolvedQuestion(entry.question.question_id.clone())
                    })?;
                question.required = entry.question.required;
                Ok(ManualSelection {
                    question,
                    selected: entry.question.visible,
                })
            })
            .collect::<SnapshotResult<Vec<_>>>()?;
        build_snapshot(SnapshotSource::Manual(&selection), now)
    }

    fn begin_edit(&mut self) -> DraftResult<()> {
        match self.state {
            DraftState::Editing => Ok(()),
            DraftState::Failed => {
                self.transition(DraftState::Editing);
                Ok(())
            }
            DraftState::Succeeded => Err(DraftError::AlreadySubmitted),
            busy => Err(DraftError::Busy(busy)),
        }
    }

    fn ensure_manual(&self) -> DraftResult<()> {
        match self.source {
            DraftSource::Manual => Ok(()),
            DraftSource::Template(_) => Err(DraftError::NotManual),
        }
    }

    fn fail(&mut self, message: String) {
        warn!(error = %message, "consultation submission failed");
        self.last_error = Some(message);
        self.transition(DraftState::Failed);
    }

    fn transition(&mut self, next: DraftState) {
        debug!(from = %self.state, to = %next, "draft state");
        self.state = next;
    }
}

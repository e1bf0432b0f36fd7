//! Answer sheet: values and observations for the rendered questions.

use tracing::debug;

use super::input::{parse_date, parse_decimal, parse_integer, parse_tri_state, InputKind};
use super::{InputError, InputResult};
use crate::models::{Answer, AnswerValue};
use crate::snapshot::{SnapshotQuestion, TemplateSnapshot};

/// One rendered question and what has been entered for it.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetEntry {
    pub question: SnapshotQuestion,
    pub value: AnswerValue,
    pub observation: Option<String>,
}

impl SheetEntry {
    pub fn kind(&self) -> InputKind {
        InputKind::for_question(&self.question)
    }
}

/// Answers being collected for a draft. Entries keep snapshot order.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerSheet {
    entries: Vec<SheetEntry>,
    observation_max_chars: usize,
}

impl AnswerSheet {
    /// Sheet over every question of a snapshot; hidden ones stay unanswerable.
    pub fn from_snapshot(snapshot: &TemplateSnapshot, observation_max_chars: usize) -> Self {
        let mut questions = snapshot.questions().to_vec();
        questions.sort_by_key(|q| q.order);
        Self {
            entries: questions
                .into_iter()
                .map(|question| SheetEntry {
                    question,
                    value: AnswerValue::Empty,
                    observation: None,
                })
                .collect(),
            observation_max_chars,
        }
    }

    pub fn entries(&self) -> &[SheetEntry] {
        &self.entries
    }

    pub fn entry(&self, question_id: &str) -> Option<&SheetEntry> {
        self.entries.iter().find(|e| e.question.question_id == question_id)
    }

    /// Entries the practitioner can answer.
    pub fn answerable(&self) -> impl Iterator<Item = &SheetEntry> {
        self.entries.iter().filter(|e| e.question.visible)
    }

    pub fn value(&self, question_id: &str) -> Option<&AnswerValue> {
        self.entry(question_id).map(|e| &e.value)
    }

    fn entry_mut(&mut self, question_id: &str) -> InputResult<&mut SheetEntry> {
        self.entries
            .iter_mut()
            .find(|e| e.question.question_id == question_id)
            .ok_or_else(|| InputError::UnknownQuestion(question_id.to_string()))
    }

    fn entry_of_kind(&mut self, question_id: &str, allowed: &[InputKind]) -> InputResult<&mut SheetEntry> {
        let entry = self.entry_mut(question_id)?;
        let kind = entry.kind();
        if !allowed.contains(&kind) {
            return Err(InputError::WrongKind {
                question_id: question_id.to_string(),
                kind,
            });
        }
        Ok(entry)
    }

    /// Append a question added while editing (ad-hoc or newly selected).
    pub(crate) fn push(&mut self, mut question: SnapshotQuestion) {
        if self.entry(&question.question_id).is_some() {
            return;
        }
        question.order = self.entries.len();
        self.entries.push(SheetEntry {
            question,
            value: AnswerValue::Empty,
            observation: None,
        });
    }

    /// Show or hide a question. Entered values are kept.
    pub(crate) fn set_visible(&mut self, question_id: &str, visible: bool) -> InputResult<()> {
        self.entry_mut(question_id)?.question.visible = visible;
        Ok(())
    }

    /// Free text for text questions and choice questions without options.
    pub fn set_text(&mut self, question_id: &str, text: &str) -> InputResult<()> {
        let entry = self.entry_of_kind(question_id, &[InputKind::FreeText])?;
        entry.value = AnswerValue::Text(text.to_string());
        Ok(())
    }

    pub fn set_integer(&mut self, question_id: &str, raw: &str) -> InputResult<()> {
        let value = parse_integer(raw)?;
        self.entry_of_kind(question_id, &[InputKind::Integer])?.value = value;
        Ok(())
    }

    pub fn set_decimal(&mut self, question_id: &str, raw: &str) -> InputResult<()> {
        let value = parse_decimal(raw)?;
        self.entry_of_kind(question_id, &[InputKind::Decimal])?.value = value;
        Ok(())
    }

    /// Tri-state: None clears the answer.
    pub fn set_boolean(&mut self, question_id: &str, value: Option<bool>) -> InputResult<()> {
        self.entry_of_kind(question_id, &[InputKind::TriState])?.value =
            value.map_or(AnswerValue::Empty, AnswerValue::Boolean);
        Ok(())
    }

    pub fn set_date(&mut self, question_id: &str, raw: &str) -> InputResult<()> {
        let value = parse_date(raw)?;
        self.entry_of_kind(question_id, &[InputKind::Date])?.value = value;
        Ok(())
    }

    /// Select one option value; an empty value clears the answer.
    pub fn select_single(&mut self, question_id: &str, value: &str) -> InputResult<()> {
        let entry = self.entry_of_kind(question_id, &[InputKind::SingleChoice])?;
        let value = value.trim();
        if value.is_empty() {
            entry.value = AnswerValue::Empty;
            return Ok(());
        }
        ensure_option(entry, value)?;
        entry.value = AnswerValue::Text(value.to_string());
        Ok(())
    }

    /// Add the option value if absent, remove it if present.
    pub fn toggle_multi(&mut self, question_id: &str, value: &str) -> InputResult<()> {
        let entry = self.entry_of_kind(question_id, &[InputKind::MultiChoice])?;
        let value = value.trim();
        ensure_option(entry, value)?;

        let mut selected = entry.value.as_choices().map(<[String]>::to_vec).unwrap_or_default();
        match selected.iter().position(|v| v == value) {
            Some(index) => {
                selected.remove(index);
            }
            None => selected.push(value.to_string()),
        }
        entry.value = AnswerValue::Choices(selected);
        Ok(())
    }

    /// Set a value from raw text, dispatching on the question's input kind.
    /// Multi-choice input toggles the given option.
    pub fn set_input(&mut self, question_id: &str, raw: &str) -> InputResult<()> {
        let kind = self.entry_mut(question_id)?.kind();
        match kind {
            InputKind::FreeText => self.set_text(question_id, raw),
            InputKind::Integer => self.set_integer(question_id, raw),
            InputKind::Decimal => self.set_decimal(question_id, raw),
            InputKind::TriState => self.set_boolean(question_id, parse_tri_state(raw)?),
            InputKind::Date => self.set_date(question_id, raw),
            InputKind::SingleChoice => self.select_single(question_id, raw),
            InputKind::MultiChoice => self.toggle_multi(question_id, raw),
        }
    }

    pub fn clear(&mut self, question_id: &str) -> InputResult<()> {
        self.entry_mut(question_id)?.value = AnswerValue::Empty;
        Ok(())
    }

    /// Trimmed observation; empty clears it, overlong text is truncated.
    pub fn set_observation(&mut self, question_id: &str, text: &str) -> InputResult<()> {
        let max = self.observation_max_chars;
        let entry = self.entry_mut(question_id)?;
        let trimmed = text.trim();
        entry.observation = if trimmed.is_empty() {
            None
        } else if trimmed.chars().count() > max {
            debug!(question_id, max, "observation truncated");
            Some(trimmed.chars().take(max).collect::<String>().trim_end().to_string())
        } else {
            Some(trimmed.to_string())
        };
        Ok(())
    }

    /// Answers for the visible questions, in order.
    pub fn answers(&self) -> Vec<Answer> {
        self.answerable()
            .map(|entry| {
                let q = &entry.question;
                Answer {
                    question_id: q.question_id.clone(),
                    question_text: q.text.clone(),
                    question_type: q.question_type,
                    code: q.code.clone(),
                    unit: q.unit.clone(),
                    value: entry.value.clone(),
                    observation: entry.observation.clone(),
                    required_at_capture: q.required,
                    custom: q.custom,
                }
            })
            .collect()
    }
}

fn ensure_option(entry: &SheetEntry, value: &str) -> InputResult<()> {
    if entry.question.options.iter().any(|o| o.value == value) {
        Ok(())
    } else {
        Err(InputError::UnknownOption {
            question_id: entry.question.question_id.clone(),
            value: value.to_string(),
        })
    }
}

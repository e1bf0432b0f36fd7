//! Template composer operations.

use std::collections::HashSet;

use tracing::debug;

use super::{CompositionError, CompositionResult};
use crate::models::{Question, Template, TemplateQuestionConfig};

/// Boolean flag of a question config that can be toggled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFlag {
    Visible,
    RequiredOverride,
}

impl Template {
    /// Append a question. Returns false (no-op) if it is already present.
    pub fn add_question(&mut self, question: &Question) -> bool {
        if self.contains(&question.id) {
            return false;
        }
        let order = self.question_configs.len();
        self.question_configs
            .push(TemplateQuestionConfig::for_question(question, order));
        true
    }

    /// Remove a question and renumber the remaining configs densely.
    pub fn remove_question(&mut self, question_id: &str) -> CompositionResult<()> {
        // Stored configs may be dense but out of vector order
        self.sort_by_order();
        let before = self.question_configs.len();
        self.question_configs.retain(|c| c.question_id != question_id);
        if self.question_configs.len() == before {
            return Err(CompositionError::QuestionNotInTemplate(question_id.to_string()));
        }
        self.renumber_questions();
        Ok(())
    }

    /// Flip a boolean flag of one question config.
    pub fn toggle_flag(&mut self, question_id: &str, flag: ConfigFlag) -> CompositionResult<bool> {
        let config = self
            .config_mut(question_id)
            .ok_or_else(|| CompositionError::QuestionNotInTemplate(question_id.to_string()))?;
        let value = match flag {
            ConfigFlag::Visible => &mut config.visible,
            ConfigFlag::RequiredOverride => &mut config.required_override,
        };
        *value = !*value;
        Ok(*value)
    }

    /// File a question under a category (None = root). Ordering is unchanged.
    pub fn set_category(&mut self, question_id: &str, category_id: Option<&str>) -> CompositionResult<()> {
        if let Some(id) = category_id {
            if !self.effective_categories().iter().any(|c| c.id == id) {
                return Err(CompositionError::UnknownCategory(id.to_string()));
            }
        }
        let config = self
            .config_mut(question_id)
            .ok_or_else(|| CompositionError::QuestionNotInTemplate(question_id.to_string()))?;
        config.category_id = category_id.map(str::to_string);
        Ok(())
    }

    /// Move a root question to just before `dest` (or to the end of the root
    /// subset when `dest` is None). Categorized questions keep their slots.
    pub fn reorder_root(&mut self, source: &str, dest: Option<&str>) -> CompositionResult<()> {
        self.sort_by_order();
        let filed = self.category_ids();
        self.ensure_root(source, &filed)?;
        if let Some(dest) = dest {
            self.ensure_root(dest, &filed)?;
            if dest == source {
                return Ok(());
            }
        }

        let root_slots: Vec<usize> = self
            .question_configs
            .iter()
            .enumerate()
            .filter(|(_, c)| is_root(c, &filed))
            .map(|(i, _)| i)
            .collect();

        let mut root: Vec<_> = root_slots
            .iter()
            .map(|&i| self.question_configs[i].clone())
            .collect();
        let from = root
            .iter()
            .position(|c| c.question_id == source)
            .ok_or_else(|| CompositionError::QuestionNotInTemplate(source.to_string()))?;
        let moved = root.remove(from);
        let to = match dest {
            Some(dest) => root
                .iter()
                .position(|c| c.question_id == dest)
                .ok_or_else(|| CompositionError::QuestionNotInTemplate(dest.to_string()))?,
            None => root.len(),
        };
        root.insert(to, moved);

        for (slot, config) in root_slots.into_iter().zip(root) {
            self.question_configs[slot] = config;
        }
        self.renumber_questions();
        debug!(template_id = %self.id, source, dest = ?dest, "root question moved");
        Ok(())
    }

    /// Check everything a save needs before it leaves the client.
    pub fn validate(&self) -> CompositionResult<()> {
        if self.name.trim().is_empty() {
            return Err(CompositionError::EmptyTemplateName);
        }
        if self.question_configs.is_empty() {
            return Err(CompositionError::NoQuestions);
        }

        let mut orders: Vec<usize> = self.question_configs.iter().map(|c| c.order).collect();
        orders.sort_unstable();
        if let Some(gap) = orders.iter().enumerate().position(|(i, order)| i != *order) {
            return Err(CompositionError::NonDenseOrder(gap));
        }

        let mut seen = HashSet::new();
        for config in &self.question_configs {
            if !seen.insert(config.question_id.as_str()) {
                return Err(CompositionError::DuplicateQuestion(config.question_id.clone()));
            }
        }

        let categories = self.effective_categories();
        for config in &self.question_configs {
            if let Some(id) = config.category_id.as_deref() {
                if !categories.iter().any(|c| c.id == id) {
                    return Err(CompositionError::UnknownCategory(id.to_string()));
                }
            }
        }

        let mut names = HashSet::new();
        for category in &self.categories {
            if !names.insert(category.name.trim().to_lowercase()) {
                return Err(CompositionError::DuplicateCategoryName(category.name.clone()));
            }
        }

        Ok(())
    }

    fn ensure_root(&self, question_id: &str, filed: &HashSet<String>) -> CompositionResult<()> {
        let config = self
            .config(question_id)
            .ok_or_else(|| CompositionError::QuestionNotInTemplate(question_id.to_string()))?;
        if !is_root(config, filed) {
            return Err(CompositionError::NotRootQuestion(question_id.to_string()));
        }
        Ok(())
    }

    fn category_ids(&self) -> HashSet<String> {
        self.effective_categories().into_iter().map(|c| c.id).collect()
    }

    fn sort_by_order(&mut self) {
        self.question_configs.sort_by_key(|c| c.order);
    }

    /// Renumber configs densely, keeping their current relative sequence.
    pub(crate) fn renumber_questions(&mut self) {
        for (order, config) in self.question_configs.iter_mut().enumerate() {
            config.order = order;
        }
    }
}

/// A config sits at the root unless it is filed under a listed category,
/// matching what `grouping` shows as uncategorized.
fn is_root(config: &TemplateQuestionConfig, filed: &HashSet<String>) -> bool {
    config
        .category_key()
        .map_or(true, |key| !filed.contains(&key))
}

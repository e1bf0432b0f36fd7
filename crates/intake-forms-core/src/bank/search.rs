//! Question bank filtering and search.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use strsim::jaro_winkler;

use crate::models::{Question, QuestionType};

/// Which part of the bank to list.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QuestionScope {
    /// System questions plus the owner's custom questions
    #[default]
    All,
    System,
    Custom,
}

/// Listing filter for the question bank.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct QuestionFilter {
    /// Practitioner whose custom questions are visible
    pub owner: Option<String>,
    pub scope: QuestionScope,
    pub question_type: Option<QuestionType>,
    pub include_inactive: bool,
}

impl QuestionFilter {
    pub fn for_owner(owner: impl Into<String>) -> Self {
        Self {
            owner: Some(owner.into()),
            ..Default::default()
        }
    }

    pub fn with_scope(mut self, scope: QuestionScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_type(mut self, question_type: QuestionType) -> Self {
        self.question_type = Some(question_type);
        self
    }

    pub fn matches(&self, question: &Question) -> bool {
        if !self.include_inactive && !question.active {
            return false;
        }
        if self.question_type.is_some_and(|t| t != question.question_type) {
            return false;
        }
        let own = !question.is_system() && question.owner == self.owner;
        match self.scope {
            QuestionScope::All => question.is_system() || own,
            QuestionScope::System => question.is_system(),
            QuestionScope::Custom => own,
        }
    }
}

/// Best Jaro-Winkler score of the query against the text or any of its words.
fn fuzzy_score(query: &str, text: &str) -> f64 {
    text.split_whitespace()
        .map(|word| jaro_winkler(query, word))
        .fold(jaro_winkler(query, text), f64::max)
}

/// Search available questions by text.
///
/// Substring matches come first in bank order; fuzzy matches at or above
/// `threshold` follow, best score first. Questions in `exclude_ids` are skipped.
pub fn search_questions<'a>(
    available: &'a [Question],
    query: &str,
    exclude_ids: &HashSet<String>,
    threshold: f64,
) -> Vec<&'a Question> {
    let query = query.trim().to_lowercase();
    let candidates = available
        .iter()
        .filter(|q| !exclude_ids.contains(&q.id));

    if query.is_empty() {
        return candidates.collect();
    }

    let mut exact = Vec::new();
    let mut fuzzy = Vec::new();
    for question in candidates {
        let text = question.text.to_lowercase();
        if text.contains(&query) {
            exact.push(question);
            continue;
        }
        let score = fuzzy_score(&query, &text);
        if score >= threshold {
            fuzzy.push((score, question));
        }
    }

    fuzzy.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    exact.extend(fuzzy.into_iter().map(|(_, q)| q));
    exact
}

//! Grouping of a stored snapshot for viewing past consultations.

use std::collections::HashSet;

use super::{SnapshotQuestion, TemplateSnapshot};
use crate::models::Category;

/// A captured question with its 1-based display position.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayQuestion<'a> {
    pub index: usize,
    pub question: &'a SnapshotQuestion,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotSection<'a> {
    pub category: Category,
    pub questions: Vec<DisplayQuestion<'a>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotGrouping<'a> {
    pub by_category: Vec<SnapshotSection<'a>>,
    pub uncategorized: Vec<DisplayQuestion<'a>>,
}

impl SnapshotGrouping<'_> {
    /// Number of buckets, counting the uncategorized one only when non-empty.
    pub fn bucket_count(&self) -> usize {
        self.by_category.len() + usize::from(!self.uncategorized.is_empty())
    }
}

impl TemplateSnapshot {
    /// Categories recorded in the snapshot, or inferred from question tags.
    pub fn display_categories(&self) -> Vec<Category> {
        if !self.categories().is_empty() {
            let mut categories = self.categories().to_vec();
            categories.sort_by_key(|c| c.order);
            return categories;
        }

        let mut seen = HashSet::new();
        let mut inferred = Vec::new();
        for question in self.questions() {
            let Some(id) = question.category_id.as_deref() else {
                continue;
            };
            if seen.insert(id) {
                inferred.push(Category {
                    id: id.to_string(),
                    name: id.to_string(),
                    order: inferred.len(),
                });
            }
        }
        inferred
    }

    /// Group every captured question by category, numbering them in order.
    pub fn grouping(&self) -> SnapshotGrouping<'_> {
        let mut questions: Vec<&SnapshotQuestion> = self.questions().iter().collect();
        questions.sort_by_key(|q| q.order);

        let mut by_category: Vec<SnapshotSection<'_>> = self
            .display_categories()
            .into_iter()
            .map(|category| SnapshotSection {
                category,
                questions: Vec::new(),
            })
            .collect();
        let mut uncategorized = Vec::new();

        for (position, question) in questions.into_iter().enumerate() {
            let entry = DisplayQuestion {
                index: position + 1,
                question,
            };
            let section = question
                .category_id
                .as_deref()
                .and_then(|id| by_category.iter_mut().find(|s| s.category.id == id));
            match section {
                Some(section) => section.questions.push(entry),
                None => uncategorized.push(entry),
            }
        }

        SnapshotGrouping {
            by_category,
            uncategorized,
        }
    }
}

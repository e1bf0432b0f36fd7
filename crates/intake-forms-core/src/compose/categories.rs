//! Category manager.
//!
//! Category lists reach the engine in several shapes (bare labels, partial
//! records with `id`/`temp_id`/`key`, Spanish or English field names). They
//! are normalized into a deduplicated list with a dense zero-based `order`.
//! Templates without an explicit list fall back to categories inferred from
//! legacy per-question tags; the two sources are never merged. The first
//! edit of an inferred list adopts it as the explicit list.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{CompositionError, CompositionResult};
use crate::models::{value_to_key, Category, Template, TemplateQuestionConfig};

/// A category as received from older call sites.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RawCategory {
    Label(String),
    Record(RawCategoryRecord),
}

/// Partial category record. Every field is optional; both spellings of a
/// field may be present at once.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawCategoryRecord {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub temp_id: Option<Value>,
    #[serde(default)]
    pub key: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nombre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub titulo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orden: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
}

impl From<&str> for RawCategory {
    fn from(label: &str) -> Self {
        RawCategory::Label(label.to_string())
    }
}

impl From<&Category> for RawCategory {
    fn from(category: &Category) -> Self {
        RawCategory::Record(RawCategoryRecord {
            id: Some(Value::String(category.id.clone())),
            name: Some(category.name.clone()),
            order: Some(category.order as i64),
            ..Default::default()
        })
    }
}

impl RawCategoryRecord {
    fn raw_name(&self) -> Option<&str> {
        [&self.nombre, &self.label, &self.titulo, &self.name, &self.title]
            .into_iter()
            .filter_map(|field| field.as_deref())
            .map(str::trim)
            .find(|name| !name.is_empty())
    }

    fn raw_id(&self) -> Option<String> {
        [&self.id, &self.temp_id, &self.key]
            .into_iter()
            .flatten()
            .find_map(value_to_key)
    }

    fn raw_order(&self) -> Option<i64> {
        self.orden.or(self.order)
    }
}

/// Resolve one raw entry into (id, name, sort key). None drops the entry.
fn resolve(raw: &RawCategory, index: usize) -> Option<(String, String, i64)> {
    match raw {
        RawCategory::Label(text) => {
            let name = text.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), name.to_string(), index as i64))
        }
        RawCategory::Record(record) => {
            // Without an id or a name there is nothing to key or show
            let name = record.raw_name().map(str::to_string);
            let id = record.raw_id().or_else(|| name.clone())?;
            let name = name.unwrap_or_else(|| id.clone());
            Some((id, name, record.raw_order().unwrap_or(index as i64)))
        }
    }
}

/// Normalize a raw category list: derive ids and names, drop empty names,
/// dedupe by id (first wins), sort by supplied order, renumber densely.
pub fn normalize_categories<'a, I>(raw: I) -> Vec<Category>
where
    I: IntoIterator<Item = &'a RawCategory>,
{
    let mut seen = HashSet::new();
    let mut resolved: Vec<(String, String, i64)> = raw
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| resolve(entry, index))
        .filter(|(id, _, _)| seen.insert(id.clone()))
        .collect();

    // Stable sort keeps encounter order for ties
    resolved.sort_by_key(|(_, _, order)| *order);

    resolved
        .into_iter()
        .enumerate()
        .map(|(order, (id, name, _))| Category { id, name, order })
        .collect()
}

/// Infer categories from legacy per-question tags, in first-seen order.
pub fn infer_from_question_configs(configs: &[TemplateQuestionConfig]) -> Vec<Category> {
    let mut seen = HashSet::new();
    let mut inferred = Vec::new();

    for config in configs {
        let Some(tag) = config.legacy_category_tag() else {
            continue;
        };
        if !seen.insert(tag.clone()) {
            continue;
        }
        let name = config.legacy_category_label().unwrap_or_else(|| tag.clone());
        inferred.push(Category {
            id: tag,
            name,
            order: inferred.len(),
        });
    }

    inferred
}

/// Renumber category orders densely, keeping their relative sequence.
pub(crate) fn renumber(categories: &mut [Category]) {
    categories.sort_by_key(|c| c.order);
    for (order, category) in categories.iter_mut().enumerate() {
        category.order = order;
    }
}

fn name_taken(categories: &[Category], name: &str, except_id: Option<&str>) -> bool {
    let wanted = name.to_lowercase();
    categories
        .iter()
        .filter(|c| Some(c.id.as_str()) != except_id)
        .any(|c| c.name.trim().to_lowercase() == wanted)
}

impl Template {
    /// Effective category list: explicit if non-empty, otherwise inferred.
    pub fn effective_categories(&self) -> Vec<Category> {
        if self.categories.is_empty() {
            let inferred = infer_from_question_configs(&self.question_configs);
            let raw: Vec<RawCategory> = inferred.iter().map(RawCategory::from).collect();
            normalize_categories(&raw)
        } else {
            let raw: Vec<RawCategory> = self.categories.iter().map(RawCategory::from).collect();
            normalize_categories(&raw)
        }
    }

    /// Adopt the inferred list as the explicit one before editing it.
    fn materialize_categories(&mut self) {
        if self.categories.is_empty() {
            self.categories = self.effective_categories();
        }
    }

    /// Append a new category. Names must be unique case-insensitively.
    pub fn add_category(&mut self, name: &str) -> CompositionResult<&Category> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CompositionError::EmptyCategoryName);
        }
        self.materialize_categories();
        if name_taken(&self.categories, name, None) {
            return Err(CompositionError::DuplicateCategoryName(name.to_string()));
        }

        let order = self.categories.len();
        self.categories.push(Category {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            order,
        });
        debug!(template_id = %self.id, category = name, "category added");
        Ok(&self.categories[order])
    }

    /// Rename a category in place. Rejected (list unchanged) on a collision.
    pub fn rename_category(&mut self, category_id: &str, new_name: &str) -> CompositionResult<()> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(CompositionError::EmptyCategoryName);
        }
        self.materialize_categories();
        if !self.categories.iter().any(|c| c.id == category_id) {
            return Err(CompositionError::UnknownCategory(category_id.to_string()));
        }
        if name_taken(&self.categories, new_name, Some(category_id)) {
            return Err(CompositionError::DuplicateCategoryName(new_name.to_string()));
        }

        if let Some(category) = self.categories.iter_mut().find(|c| c.id == category_id) {
            category.name = new_name.to_string();
        }
        Ok(())
    }

    /// Delete a category. Its questions move to the root; questions are never deleted.
    ///
    /// Returns the number of question configs that were moved.
    pub fn delete_category(&mut self, category_id: &str) -> CompositionResult<usize> {
        self.materialize_categories();
        let before = self.categories.len();
        self.categories.retain(|c| c.id != category_id);
        if self.categories.len() == before {
            return Err(CompositionError::UnknownCategory(category_id.to_string()));
        }
        renumber(&mut self.categories);

        let mut moved = 0;
        for config in &mut self.question_configs {
            if config.category_key().as_deref() == Some(category_id) {
                config.clear_category();
                moved += 1;
            }
        }
        debug!(template_id = %self.id, category_id, moved, "category deleted");
        Ok(moved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConsultType, Question, QuestionType};
    use serde_json::json;

    fn raw(json: Value) -> Vec<RawCategory> {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_normalize_mixed_inputs() {
        let input = raw(json!([
            "Hábitos",
            {"id": 12, "nombre": "Antropometría", "orden": -1},
            {"temp_id": "tmp-1", "title": "Laboratorio"},
            {"label": "  "},
            "   ",
            {"key": "hábitos", "name": "Duplicado"},
        ]));
        let categories = normalize_categories(&input);

        let names: Vec<&str> = categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Antropometría", "Hábitos", "Laboratorio", "Duplicado"]);
        assert_eq!(categories[0].id, "12");
        assert_eq!(categories[2].id, "tmp-1");
        for (i, c) in categories.iter().enumerate() {
            assert_eq!(c.order, i);
        }
    }

    #[test]
    fn test_id_only_record_uses_id_as_name() {
        let input = raw(json!([{"orden": 3}, {"key": 7, "orden": 1}]));
        let categories = normalize_categories(&input);
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].id, "7");
        assert_eq!(categories[0].name, "7");
        assert_eq!(categories[0].order, 0);
    }

    #[test]
    fn test_record_with_both_spellings() {
        let input = raw(json!([
            {"id": "a", "nombre": "Hábitos", "name": "Habits", "orden": 2, "order": 0},
            {"id": "b", "name": "Name", "label": "Label"},
            "Sueño",
        ]));
        let categories = normalize_categories(&input);

        let names: Vec<&str> = categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Label", "Hábitos", "Sueño"]);
        assert_eq!(categories[1].id, "a");
    }

    #[test]
    fn test_dedupe_first_wins() {
        let input = raw(json!([
            {"id": "a", "name": "First"},
            {"id": "a", "name": "Second"},
        ]));
        let categories = normalize_categories(&input);
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].name, "First");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let input = raw(json!(["B", {"id": "x", "name": "A", "order": -5}, "C"]));
        let once = normalize_categories(&input);
        let again: Vec<RawCategory> = once.iter().map(RawCategory::from).collect();
        assert_eq!(normalize_categories(&again), once);
    }

    #[test]
    fn test_infer_from_legacy_tags() {
        let q1 = Question::system("q1", "Peso", QuestionType::Decimal);
        let q2 = Question::system("q2", "Altura", QuestionType::Decimal);
        let q3 = Question::system("q3", "Sueño", QuestionType::Text);

        let mut c1 = TemplateQuestionConfig::for_question(&q1, 0);
        c1.extra.insert("categoria".into(), json!("antropo"));
        c1.extra.insert("categoria_label".into(), json!("Antropometría"));
        let mut c2 = TemplateQuestionConfig::for_question(&q2, 1);
        c2.extra.insert("categoria".into(), json!("antropo"));
        let mut c3 = TemplateQuestionConfig::for_question(&q3, 2);
        c3.extra.insert("categoria".into(), json!("habitos"));

        let inferred = infer_from_question_configs(&[c1, c2, c3]);
        assert_eq!(inferred.len(), 2);
        assert_eq!(inferred[0].id, "antropo");
        assert_eq!(inferred[0].name, "Antropometría");
        assert_eq!(inferred[1].name, "habitos");
        assert_eq!(inferred[1].order, 1);
    }

    #[test]
    fn test_explicit_list_wins_over_inferred() {
        let q1 = Question::system("q1", "Peso", QuestionType::Decimal);
        let mut template = Template::new(None, "Inicial", ConsultType::Initial);
        let mut config = TemplateQuestionConfig::for_question(&q1, 0);
        config.extra.insert("categoria".into(), json!("legacy"));
        template.question_configs.push(config);

        assert_eq!(template.effective_categories()[0].id, "legacy");

        template.categories = vec![Category {
            id: "x".into(),
            name: "Hábitos".into(),
            order: 0,
        }];
        let effective = template.effective_categories();
        assert_eq!(effective.len(), 1);
        assert_eq!(effective[0].name, "Hábitos");
    }

    fn legacy_template() -> Template {
        let mut template = Template::new(None, "Inicial", ConsultType::Initial);
        for (id, tag) in [("a", Some("habitos")), ("b", None), ("c", Some("antropo"))] {
            let question = Question::system(id, id, QuestionType::Text);
            template.add_question(&question);
            if let Some(tag) = tag {
                let config = template.config_mut(id).unwrap();
                config.extra.insert("categoria".into(), json!(tag));
                config.extra.insert("categoria_label".into(), json!(format!("Etiqueta {tag}")));
            }
        }
        template
    }

    #[test]
    fn test_first_edit_adopts_inferred_list() {
        let mut template = legacy_template();
        assert!(template.categories.is_empty());

        template.add_category("Sueño").unwrap();
        let ids: Vec<&str> = template.categories.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(&ids[..2], ["habitos", "antropo"]);
        assert_eq!(template.categories[2].name, "Sueño");
        assert_eq!(template.categories[2].order, 2);
    }

    #[test]
    fn test_rename_inferred_category() {
        let mut template = legacy_template();
        template.rename_category("antropo", "Antropometría").unwrap();

        assert_eq!(template.category("antropo").unwrap().name, "Antropometría");
        let grouping = template.grouping();
        assert_eq!(grouping.by_category[1].category.name, "Antropometría");
        assert_eq!(grouping.by_category[1].configs[0].question_id, "c");
    }

    #[test]
    fn test_delete_inferred_category_clears_every_ref() {
        let mut template = legacy_template();
        template.set_category("b", Some("habitos")).unwrap();

        assert_eq!(template.delete_category("habitos").unwrap(), 2);
        assert_eq!(template.categories.len(), 1);
        assert_eq!(template.categories[0].id, "antropo");
        for id in ["a", "b"] {
            let config = template.config(id).unwrap();
            assert!(config.category_key().is_none());
            assert!(!config.extra.contains_key("categoria_label"));
        }

        let uncategorized: Vec<&str> = template
            .grouping()
            .uncategorized
            .iter()
            .map(|c| c.question_id.as_str())
            .collect();
        assert_eq!(uncategorized, vec!["a", "b"]);
        template.validate().unwrap();
    }

    #[test]
    fn test_rename_rejects_collision() {
        let mut template = Template::new(None, "Inicial", ConsultType::Initial);
        template.add_category("Hábitos").unwrap();
        let id = template.add_category("Antropometría").unwrap().id.clone();
        let before = template.categories.clone();

        let err = template.rename_category(&id, "  hÁbitos ").unwrap_err();
        assert!(matches!(err, CompositionError::DuplicateCategoryName(_)));
        assert_eq!(template.categories, before);

        template.rename_category(&id, "Medidas").unwrap();
        assert_eq!(template.category(&id).unwrap().name, "Medidas");

        // Renaming to its own name (different case) is fine
        template.rename_category(&id, "MEDIDAS").unwrap();
    }

    #[test]
    fn test_add_rejects_duplicate_and_empty() {
        let mut template = Template::new(None, "Inicial", ConsultType::Initial);
        template.add_category("Hábitos").unwrap();
        assert!(matches!(
            template.add_category("HÁBITOS"),
            Err(CompositionError::DuplicateCategoryName(_))
        ));
        assert!(matches!(
            template.add_category("   "),
            Err(CompositionError::EmptyCategoryName)
        ));
    }

    #[test]
    fn test_delete_moves_questions_to_root() {
        let mut template = Template::new(None, "Inicial", ConsultType::Initial);
        let habitos = template.add_category("Hábitos").unwrap().id.clone();
        let antropo = template.add_category("Antropometría").unwrap().id.clone();

        let q1 = Question::system("q1", "Peso", QuestionType::Decimal);
        let q2 = Question::system("q2", "Altura", QuestionType::Decimal);
        template.add_question(&q1);
        template.add_question(&q2);
        template.set_category("q1", Some(&habitos)).unwrap();
        template.set_category("q2", Some(&habitos)).unwrap();

        let moved = template.delete_category(&habitos).unwrap();
        assert_eq!(moved, 2);
        assert_eq!(template.categories.len(), 1);
        assert_eq!(template.categories[0].id, antropo);
        assert_eq!(template.categories[0].order, 0);
        assert_eq!(template.question_configs.len(), 2);
        assert!(template.question_configs.iter().all(|c| c.category_id.is_none()));
    }
}

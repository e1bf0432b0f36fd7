//! Display grouping of a template's question configs.
//!
//! A pure projection of `question_configs`; nothing here is persisted.

use crate::models::{Category, Template, TemplateQuestionConfig};

/// Configs filed under one category, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryBucket<'a> {
    pub category: Category,
    pub configs: Vec<&'a TemplateQuestionConfig>,
}

/// Template configs partitioned by category.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateGrouping<'a> {
    /// One bucket per effective category, in category order (may be empty)
    pub by_category: Vec<CategoryBucket<'a>>,
    /// Configs with no category, or whose category is not in the list
    pub uncategorized: Vec<&'a TemplateQuestionConfig>,
}

impl Template {
    /// Partition question configs for display.
    pub fn grouping(&self) -> TemplateGrouping<'_> {
        let mut configs: Vec<&TemplateQuestionConfig> = self.question_configs.iter().collect();
        configs.sort_by_key(|c| c.order);

        let mut categories = self.effective_categories();
        categories.sort_by_key(|c| c.order);

        let mut by_category: Vec<CategoryBucket<'_>> = categories
            .into_iter()
            .map(|category| CategoryBucket {
                category,
                configs: Vec::new(),
            })
            .collect();
        let mut uncategorized = Vec::new();

        for config in configs {
            let bucket = config
                .category_key()
                .and_then(|key| by_category.iter_mut().find(|b| b.category.id == key));
            match bucket {
                Some(bucket) => bucket.configs.push(config),
                None => uncategorized.push(config),
            }
        }

        TemplateGrouping {
            by_category,
            uncategorized,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::models::{ConsultType, Question, QuestionType, Template};
    use serde_json::json;

    #[test]
    fn test_grouping_partitions_in_order() {
        let mut template = Template::new(None, "Inicial", ConsultType::Initial);
        let habitos = template.add_category("Hábitos").unwrap().id.clone();
        let antropo = template.add_category("Antropometría").unwrap().id.clone();

        for id in ["altura_cm", "actividad", "peso_kg", "sueno"] {
            template.add_question(&Question::system(id, id, QuestionType::Decimal));
        }
        template.set_category("altura_cm", Some(&antropo)).unwrap();
        template.set_category("peso_kg", Some(&antropo)).unwrap();
        template.set_category("sueno", Some(&habitos)).unwrap();

        let grouping = template.grouping();
        assert_eq!(grouping.by_category.len(), 2);
        assert_eq!(grouping.by_category[0].category.name, "Hábitos");

        let ids: Vec<&str> = grouping.by_category[1]
            .configs
            .iter()
            .map(|c| c.question_id.as_str())
            .collect();
        assert_eq!(ids, vec!["altura_cm", "peso_kg"]);
        assert_eq!(grouping.uncategorized.len(), 1);
        assert_eq!(grouping.uncategorized[0].question_id, "actividad");
    }

    #[test]
    fn test_grouping_uses_legacy_tags() {
        let mut template = Template::new(None, "Legacy", ConsultType::FollowUp);
        template.add_question(&Question::system("a", "a", QuestionType::Text));
        template.add_question(&Question::system("b", "b", QuestionType::Text));
        template.question_configs[1]
            .extra
            .insert("category".into(), json!("Sueño"));

        let grouping = template.grouping();
        assert_eq!(grouping.by_category.len(), 1);
        assert_eq!(grouping.by_category[0].configs[0].question_id, "b");
        assert_eq!(grouping.uncategorized[0].question_id, "a");
    }
}

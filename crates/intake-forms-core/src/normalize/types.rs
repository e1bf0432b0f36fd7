//! Question type normalizer.
//!
//! Maps the free-form type names accepted from older call sites
//! (`"opcion_multiple"`, `"checkbox"`, `"si_no"`, `"numero"`, ...) onto the
//! closed [`QuestionType`] vocabulary. Unknown names fall back to `text`.

use std::collections::HashMap;

use crate::models::QuestionType;

/// Normalizer for raw question type names.
#[derive(Debug, Clone)]
pub struct TypeNormalizer {
    /// Synonym map: lowercase raw name → canonical type
    synonyms: HashMap<String, QuestionType>,
}

impl Default for TypeNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeNormalizer {
    /// Create a normalizer with the built-in synonym table.
    pub fn new() -> Self {
        Self {
            synonyms: Self::default_synonyms(),
        }
    }

    /// Create a normalizer with extra synonyms layered over the built-in table.
    pub fn with_synonyms<'a, I>(extra: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a QuestionType)>,
    {
        let mut normalizer = Self::new();
        for (raw, canonical) in extra {
            normalizer.add_synonym(raw, *canonical);
        }
        normalizer
    }

    /// Normalize a raw type name. Total: never fails.
    pub fn normalize(&self, raw: &str) -> QuestionType {
        let key = raw.trim().to_lowercase();
        self.synonyms
            .get(&key)
            .copied()
            .unwrap_or(QuestionType::Text)
    }

    /// Add a custom synonym.
    pub fn add_synonym(&mut self, raw: &str, canonical: QuestionType) {
        self.synonyms.insert(raw.trim().to_lowercase(), canonical);
    }

    /// Whether a raw name is known (as opposed to falling back to text).
    pub fn is_known(&self, raw: &str) -> bool {
        self.synonyms.contains_key(&raw.trim().to_lowercase())
    }

    /// Default synonym table.
    fn default_synonyms() -> HashMap<String, QuestionType> {
        let mut map = HashMap::new();

        // Multiple choice
        map.insert("multi".into(), QuestionType::Multi);
        map.insert("opcion_multiple".into(), QuestionType::Multi);
        map.insert("multi_choice".into(), QuestionType::Multi);
        map.insert("checkbox".into(), QuestionType::Multi);

        // Single choice
        map.insert("single".into(), QuestionType::Single);
        map.insert("opcion_unica".into(), QuestionType::Single);
        map.insert("single_choice".into(), QuestionType::Single);
        map.insert("radio".into(), QuestionType::Single);
        map.insert("select".into(), QuestionType::Single);

        // Yes / no
        map.insert("boolean".into(), QuestionType::Boolean);
        map.insert("si_no".into(), QuestionType::Boolean);
        map.insert("yes_no".into(), QuestionType::Boolean);

        // Text
        map.insert("text".into(), QuestionType::Text);
        map.insert("short_text".into(), QuestionType::Text);
        map.insert("long_text".into(), QuestionType::Text);
        map.insert("texto".into(), QuestionType::Text);
        map.insert("texto_corto".into(), QuestionType::Text);
        map.insert("texto_largo".into(), QuestionType::Text);

        // Numbers
        map.insert("integer".into(), QuestionType::Integer);
        map.insert("entero".into(), QuestionType::Integer);
        map.insert("decimal".into(), QuestionType::Decimal);
        map.insert("float".into(), QuestionType::Decimal);
        map.insert("number".into(), QuestionType::Decimal);
        map.insert("numeric".into(), QuestionType::Decimal);
        map.insert("numero".into(), QuestionType::Decimal);

        // Dates
        map.insert("date".into(), QuestionType::Date);
        map.insert("fecha".into(), QuestionType::Date);

        map
    }
}

/// Normalize a raw type name with the built-in table.
pub fn normalize_type(raw: &str) -> QuestionType {
    TypeNormalizer::new().normalize(raw)
}

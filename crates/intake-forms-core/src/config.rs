//! Engine configuration.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::QuestionType;
use crate::normalize::TypeNormalizer;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Tunables for normalization, answer collection and template copies.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Extra raw type names layered over the built-in synonyms
    pub type_synonyms: HashMap<String, QuestionType>,
    pub observation_max_chars: usize,
    /// Appended to a duplicated template's name when none is given
    pub copy_suffix: String,
    /// Codes preselected in a manual initial-visit selection
    pub preselected_codes: Vec<String>,
    pub fuzzy_search_threshold: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            type_synonyms: HashMap::new(),
            observation_max_chars: 1000,
            copy_suffix: " (copy)".to_string(),
            preselected_codes: vec!["peso_kg".to_string(), "altura_cm".to_string()],
            fuzzy_search_threshold: 0.88,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.observation_max_chars == 0 {
            return Err(ConfigError::Invalid {
                field: "observation_max_chars",
                reason: "must be positive".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.fuzzy_search_threshold) {
            return Err(ConfigError::Invalid {
                field: "fuzzy_search_threshold",
                reason: format!("{} is outside 0..=1", self.fuzzy_search_threshold),
            });
        }
        Ok(())
    }

    /// Type normalizer with the configured synonyms applied.
    pub fn type_normalizer(&self) -> TypeNormalizer {
        TypeNormalizer::with_synonyms(&self.type_synonyms)
    }
}

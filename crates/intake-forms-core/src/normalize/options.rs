//! Answer option normalization.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::models::AnswerOption;

/// Value used when a label slugs to nothing.
pub const FALLBACK_OPTION_VALUE: &str = "opt";

/// An option as received from older call sites: a bare label or a partial record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RawOption {
    Label(String),
    Record {
        #[serde(default, alias = "valor")]
        value: Option<String>,
        #[serde(default, alias = "etiqueta")]
        label: Option<String>,
    },
}

impl From<&str> for RawOption {
    fn from(label: &str) -> Self {
        RawOption::Label(label.to_string())
    }
}

impl From<&AnswerOption> for RawOption {
    fn from(option: &AnswerOption) -> Self {
        RawOption::Record {
            value: Some(option.value.clone()),
            label: Some(option.label.clone()),
        }
    }
}

/// Lowercase, whitespace runs to `_`, drop anything outside `[a-z0-9_-]`.
pub fn slugify(raw: &str) -> String {
    let lower = raw.trim().to_lowercase();
    let mut slug = String::with_capacity(lower.len());
    let mut in_whitespace = false;

    for c in lower.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                slug.push('_');
            }
            in_whitespace = true;
            continue;
        }
        in_whitespace = false;
        if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-' {
            slug.push(c);
        }
    }

    slug
}

fn non_empty(s: Option<&String>) -> Option<&str> {
    s.map(|s| s.trim()).filter(|s| !s.is_empty())
}

/// Resolve one raw option, or None when its label is empty.
fn resolve(raw: &RawOption) -> Option<AnswerOption> {
    let (value, label) = match raw {
        RawOption::Label(text) => {
            let label = text.trim().to_string();
            (slugify(&label), label)
        }
        RawOption::Record { value, label } => {
            let explicit_value = non_empty(value.as_ref());
            let explicit_label = non_empty(label.as_ref());
            let value = match explicit_value {
                Some(v) => v.to_string(),
                None => slugify(explicit_label.unwrap_or_default()),
            };
            let label = explicit_label.or(explicit_value).unwrap_or_default().to_string();
            (value, label)
        }
    };

    if label.is_empty() {
        return None;
    }
    let value = if value.is_empty() {
        FALLBACK_OPTION_VALUE.to_string()
    } else {
        value
    };
    Some(AnswerOption { value, label })
}

/// Normalize raw options, dropping empty labels and collapsing duplicate values
/// (first occurrence wins).
pub fn normalize_options<'a, I>(raw: I) -> Vec<AnswerOption>
where
    I: IntoIterator<Item = &'a RawOption>,
{
    let mut seen = HashSet::new();
    raw.into_iter()
        .filter_map(resolve)
        .filter(|option| seen.insert(option.value.clone()))
        .collect()
}

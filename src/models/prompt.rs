//! Prompt template models.
//!
//! Prompts may contain `{{variable}}` placeholders. Variable names are word
//! characters only; anything else between braces is left untouched.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::BuildHasher;
use std::sync::LazyLock;

use super::PromptId;
use crate::{Error, Result};

/// Creates a compile-time verified regex wrapped in [`LazyLock`].
macro_rules! lazy_regex {
    ($pattern:expr) => {
        LazyLock::new(|| Regex::new($pattern).unwrap_or_else(|_| unreachable!()))
    };
}

/// Regex pattern for extracting template variables: `{{variable_name}}`.
static VARIABLE_PATTERN: LazyLock<Regex> = lazy_regex!(r"\{\{\s*(\w+)\s*\}\}");

/// A saved prompt template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prompt {
    /// Unique identifier.
    pub id: PromptId,
    /// Display title.
    pub title: String,
    /// Template body.
    pub content: String,
    /// Tags for categorization.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Prompt {
    /// Creates a prompt with a generated id.
    #[must_use]
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: PromptId::generate(),
            title: title.into(),
            content: content.into(),
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the tags.
    #[must_use]
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Returns the unique variable names in order of first appearance.
    #[must_use]
    pub fn variables(&self) -> Vec<String> {
        extract_variables(&self.content)
    }

    /// Renders the template with the given values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] listing every variable without a value.
    pub fn render<S: BuildHasher>(&self, values: &HashMap<String, String, S>) -> Result<String> {
        substitute_variables(&self.content, values)
    }
}

/// Extracts unique `{{name}}` variables in order of first appearance.
#[must_use]
pub fn extract_variables(content: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for cap in VARIABLE_PATTERN.captures_iter(content) {
        if let Some(name) = cap.get(1).map(|m| m.as_str()) {
            if !names.iter().any(|existing| existing == name) {
                names.push(name.to_string());
            }
        }
    }
    names
}

/// Substitutes `{{name}}` placeholders with values.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if any placeholder has no value.
pub fn substitute_variables<S: BuildHasher>(
    content: &str,
    values: &HashMap<String, String, S>,
) -> Result<String> {
    let missing: Vec<String> = extract_variables(content)
        .into_iter()
        .filter(|name| !values.contains_key(name))
        .collect();
    if !missing.is_empty() {
        return Err(Error::InvalidInput(format!(
            "missing prompt variables: {}",
            missing.join(", ")
        )));
    }

    let rendered = VARIABLE_PATTERN
        .replace_all(content, |caps: &regex::Captures| {
            caps.get(1)
                .and_then(|m| values.get(m.as_str()))
                .map_or_else(|| caps[0].to_string(), String::clone)
        })
        .to_string();

    Ok(rendered)
}

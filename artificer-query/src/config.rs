use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Tunables of the compiler. Every field has a default, so `{}` is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Upper bound on the literal list of one `IN` constraint.
    #[serde(default = "default_in_list_chunk_size")]
    pub in_list_chunk_size: usize,

    /// chrono format used for timestamp literals.
    #[serde(default = "default_date_format")]
    pub date_format: String,

    /// Relationship name meaning "the document this artifact was derived from".
    #[serde(default = "default_derived_relationship")]
    pub derived_relationship: String,

    /// Live artifacts are stored below this path; anything else is in the trash.
    #[serde(default = "default_artifact_root_path")]
    pub artifact_root_path: String,

    /// Fields handed to the full-text index.
    #[serde(default = "default_full_text_fields")]
    pub full_text_fields: Vec<String>,
}

fn default_in_list_chunk_size() -> usize {
    1000
}

fn default_date_format() -> String {
    "%Y-%m-%d".to_string()
}

fn default_derived_relationship() -> String {
    "relatedDocument".to_string()
}

fn default_artifact_root_path() -> String {
    "/s-ramp".to_string()
}

fn default_full_text_fields() -> Vec<String> {
    ["description", "name", "comments.text", "properties.key", "properties.value"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            in_list_chunk_size: default_in_list_chunk_size(),
            date_format: default_date_format(),
            derived_relationship: default_derived_relationship(),
            artifact_root_path: default_artifact_root_path(),
            full_text_fields: default_full_text_fields(),
        }
    }
}

impl CompilerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.in_list_chunk_size == 0 {
            return Err(Error::InvalidConfig(
                "in_list_chunk_size must be at least 1".into(),
            ));
        }
        if self.derived_relationship.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "derived_relationship must not be empty".into(),
            ));
        }
        if !self.artifact_root_path.starts_with('/') {
            return Err(Error::InvalidConfig(format!(
                "artifact_root_path must be absolute, got {:?}",
                self.artifact_root_path
            )));
        }
        Ok(())
    }

    pub fn is_derived_relationship(&self, relationship_type: &str) -> bool {
        relationship_type.eq_ignore_ascii_case(&self.derived_relationship)
    }
}

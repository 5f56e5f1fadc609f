use std::fs;
use std::path::Path;

use artificer_query::CompilerConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

/// Engine configuration, read from JSON.
///
/// ```json
/// { "compiler": { "in_list_chunk_size": 500, "artifact_root_path": "/s-ramp" } }
/// ```
///
/// Missing sections and fields take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub compiler: CompilerConfig,
}

impl Config {
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(text)?;
        config.compiler.validate()?;
        Ok(config)
    }

    /// Reads and validates the configuration at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let config = Self::from_json(&text)?;
        debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Like [`Config::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "no configuration file, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }
}

use std::path::Path;

use serde::Deserialize;

use crate::error::Result;

/// Store configuration. Every field has a default, so an empty TOML
/// document is a valid config.
///
/// ```toml
/// metadata_dir = "__meta"
/// fragment_suffix = "meta"
/// sync_on_write = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory under the array URI holding metadata fragments.
    pub metadata_dir: String,
    /// File extension of fragment blobs.
    pub fragment_suffix: String,
    /// fsync uploads before publishing them (local filesystem only).
    pub sync_on_write: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            metadata_dir: "__meta".to_string(),
            fragment_suffix: "meta".to_string(),
            sync_on_write: true,
        }
    }
}

impl Config {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::store::{CategoryType, FALLBACK_CATEGORY};

/// The Portuguese keyword set shipped with the crate.
pub const BUNDLED_KEYWORDS: &str = include_str!("../keywords.toml");

const DEFAULT_PRIORITY: i32 = 5;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read keyword file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse keyword TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid keyword configuration: {0}")]
    Invalid(String),
}

/// Numeric knobs of the scoring and contextual passes.
///
/// Every key is optional in the TOML file and falls back to its own default.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// A scored match must strictly exceed this to be accepted.
    pub min_score: f64,
    pub high_value: f64,
    pub low_value: f64,
    /// Unmatched amounts above this are treated as investments.
    pub investment: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_score: 0.3,
            high_value: 1000.0,
            low_value: 50.0,
            investment: 5000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryConfig {
    pub name: String,
    #[serde(default = "default_priority")]
    pub priority: i32,
    #[serde(default, rename = "type")]
    pub category_type: CategoryType,
    #[serde(default)]
    pub exact_match: bool,
    #[serde(default)]
    pub keywords: Vec<String>,
}

fn default_priority() -> i32 {
    DEFAULT_PRIORITY
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeywordConfig {
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub categories: Vec<CategoryConfig>,
}

impl KeywordConfig {
    pub fn from_toml(toml_content: &str) -> Result<Self, ConfigError> {
        let config: KeywordConfig = toml::from_str(toml_content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn bundled() -> Result<Self, ConfigError> {
        Self::from_toml(BUNDLED_KEYWORDS)
    }

    /// Reads `path` when given, otherwise the bundled keyword set.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Self::bundled(),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.categories.iter().all(|c| c.name == FALLBACK_CATEGORY) {
            return Err(ConfigError::Invalid("no categories defined".to_string()));
        }
        if let Some(pos) = self.categories.iter().position(|c| c.name.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "category #{} has an empty name",
                pos + 1
            )));
        }
        Ok(())
    }
}

//! Engine configuration.
//!
//! Every field has a default, so an empty file (or no file at all) yields the
//! stock engine: `"@type"` / `"@version"` tags, a `"0.0.0"` default context
//! version, suggestion thresholds of 2 (parameters) and 3 (builders), and the
//! in-process parser with a 5 second cache.
//!
//! ```yaml
//! tags:
//!   type_tag: "@type"
//! parser:
//!   command: ["cue-scope", "--json"]
//!   timeout_ms: 2000
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::catalog::suggest::{BUILDER_DISTANCE, MAX_SUGGESTIONS, PARAMETER_DISTANCE};
use crate::diagnostics::ConfigError;

// ============================================================================
// SECTIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub tags: TagConfig,
    pub suggestions: SuggestionConfig,
    pub parser: ParserConfig,
}

/// Reserved field names that mark builder invocations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TagConfig {
    pub type_tag: String,
    pub version_tag: String,
    /// Always a valid name, never a parameter.
    pub mode_marker: String,
    /// Version given to contexts without a version tag.
    pub default_version: String,
}

impl Default for TagConfig {
    fn default() -> Self {
        Self {
            type_tag: "@type".to_string(),
            version_tag: "@version".to_string(),
            mode_marker: "@mode".to_string(),
            default_version: "0.0.0".to_string(),
        }
    }
}

impl TagConfig {
    pub fn is_reserved(&self, name: &str) -> bool {
        name == self.type_tag || name == self.version_tag || name == self.mode_marker
    }
}

/// Edit-distance thresholds for "did you mean" hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SuggestionConfig {
    pub parameter_distance: usize,
    pub builder_distance: usize,
    pub max_suggestions: usize,
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self {
            parameter_distance: PARAMETER_DISTANCE,
            builder_distance: BUILDER_DISTANCE,
            max_suggestions: MAX_SUGGESTIONS,
        }
    }
}

/// How documents are turned into scope reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParserConfig {
    /// External scanner: program followed by its arguments. `None` selects the
    /// in-process parser.
    pub command: Option<Vec<String>>,
    pub timeout_ms: u64,
    pub cache_ttl_ms: u64,
    pub cache_capacity: u64,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            command: None,
            timeout_ms: 5_000,
            cache_ttl_ms: 5_000,
            cache_capacity: 256,
        }
    }
}

impl ParserConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }
}

// ============================================================================
// LOADING
// ============================================================================

impl EngineConfig {
    /// Loads a configuration file; the format follows the extension.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        match extension.as_str() {
            "yaml" | "yml" => Self::from_yaml_str(&content),
            "json" => Self::from_json_str(&content),
            _ => Err(ConfigError::UnsupportedFormat { extension }),
        }
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        // serde_yaml rejects an empty document.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
//! Harness configuration.
//!
//! Stored as RON. Every field has a default, so a partial file (or no file
//! at all) is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Current configuration format version
pub const CONFIG_FORMAT_VERSION: u32 = 1;

/// Log filter used when neither the configuration nor `RUST_LOG` names one
pub const DEFAULT_LOG_FILTER: &str = "nodeflow=info";

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read or written
    #[error("Configuration I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// File is not valid RON for [`CliConfig`]
    #[error("Invalid configuration: {0}")]
    Parse(String),

    /// Written by a newer harness
    #[error("Configuration version {found} is newer than supported version {supported}")]
    Version {
        /// Version stored in the file
        found: u32,
        /// Newest version this build reads
        supported: u32,
    },
}

/// Settings shared by all subcommands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Format version
    pub version: u32,
    /// `tracing` filter directives; `RUST_LOG` takes precedence
    pub log_filter: String,
    /// Indent JSON reports
    pub pretty_json: bool,
    /// Padding around group frames in `inspect`
    pub group_padding: f64,
    /// Page size of the viewer built by `demo`
    pub viewer_lines: u32,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_FORMAT_VERSION,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            pretty_json: true,
            group_padding: 8.0,
            viewer_lines: 5,
        }
    }
}

impl CliConfig {
    /// Parse from RON text
    pub fn from_ron(content: &str) -> Result<Self, ConfigError> {
        let config: CliConfig =
            ron::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        if config.version > CONFIG_FORMAT_VERSION {
            return Err(ConfigError::Version {
                found: config.version,
                supported: CONFIG_FORMAT_VERSION,
            });
        }
        Ok(config)
    }

    /// Load from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_ron(&content)
    }

    /// Load from `path` when given, otherwise use the defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        path.map_or_else(|| Ok(Self::default()), Self::load)
    }

    /// Render as pretty RON
    pub fn to_ron(&self) -> Result<String, ConfigError> {
        let config = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        ron::ser::to_string_pretty(self, config).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Save to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_ron()?)?;
        Ok(())
    }
}

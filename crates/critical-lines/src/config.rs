//! Session configuration loaded from `critical-lines.toml`.

use chess_analysis::{ExplorationConfig, UciEngineConfig};
use chess_explorer::ExplorerConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur when loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse the TOML content.
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// How the report is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

fn default_diagram_dir() -> PathBuf {
    PathBuf::from("diagrams")
}

fn default_board_size() -> u32 {
    360
}

fn default_diagrams() -> bool {
    true
}

/// Where and how results are written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving the SVG diagrams.
    #[serde(default = "default_diagram_dir")]
    pub diagram_dir: PathBuf,
    /// Board edge length in pixels.
    #[serde(default = "default_board_size")]
    pub board_size: u32,
    #[serde(default = "default_diagrams")]
    pub diagrams: bool,
    #[serde(default)]
    pub format: OutputFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            diagram_dir: default_diagram_dir(),
            board_size: default_board_size(),
            diagrams: default_diagrams(),
            format: OutputFormat::default(),
        }
    }
}

/// Root configuration structure for a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub engine: UciEngineConfig,
    #[serde(default)]
    pub analysis: ExplorationConfig,
    #[serde(default)]
    pub explorer: ExplorerConfig,
    #[serde(default)]
    pub output: OutputConfig,
    /// JSON opening dictionary merged over the built-in openings.
    #[serde(default)]
    pub openings_file: Option<PathBuf>,
    /// JSON move book keyed by position, consulted before the opening lines.
    #[serde(default)]
    pub book_file: Option<PathBuf>,
}

impl SessionConfig {
    /// Load configuration from `path`.
    ///
    /// Returns the default configuration if the file doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Default config file location.
    pub fn config_path() -> PathBuf {
        PathBuf::from("critical-lines.toml")
    }
}

//! Exploration settings.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors in exploration settings.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid exploration setting: {0}")]
    Invalid(String),
}

/// Where sibling candidates come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidatePolicy {
    /// Moves from the candidate source only.
    #[default]
    Explorer,
    /// The engine's second and later lines only.
    Engine,
    /// Candidate source moves followed by engine lines not already listed.
    Combined,
}

impl fmt::Display for CandidatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CandidatePolicy::Explorer => write!(f, "explorer"),
            CandidatePolicy::Engine => write!(f, "engine"),
            CandidatePolicy::Combined => write!(f, "combined"),
        }
    }
}

fn default_threshold_cp() -> u32 {
    50
}

fn default_max_depth() -> u32 {
    5
}

fn default_max_branching() -> usize {
    3
}

fn default_line_count() -> usize {
    3
}

fn default_search_depth() -> u32 {
    18
}

/// Bounds and thresholds for building a variation tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplorationConfig {
    /// A move is critical when the alternative loses more than this.
    #[serde(default = "default_threshold_cp")]
    pub threshold_cp: u32,
    /// Plies below the root at which exploration stops.
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,
    /// Children per node, main line included.
    #[serde(default = "default_max_branching")]
    pub max_branching: usize,
    /// Engine lines requested per position.
    #[serde(default = "default_line_count")]
    pub line_count: usize,
    /// Engine search depth per query.
    #[serde(default = "default_search_depth")]
    pub search_depth: u32,
    #[serde(default)]
    pub candidate_policy: CandidatePolicy,
    /// Expand sibling branches on the rayon thread pool.
    #[serde(default)]
    pub parallel: bool,
}

impl Default for ExplorationConfig {
    fn default() -> Self {
        Self {
            threshold_cp: default_threshold_cp(),
            max_depth: default_max_depth(),
            max_branching: default_max_branching(),
            line_count: default_line_count(),
            search_depth: default_search_depth(),
            candidate_policy: CandidatePolicy::default(),
            parallel: false,
        }
    }
}

impl ExplorationConfig {
    /// Check that the settings can drive an exploration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first unusable setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_branching == 0 {
            return Err(ConfigError::Invalid(
                "max_branching must be at least 1".to_string(),
            ));
        }
        if self.line_count == 0 {
            return Err(ConfigError::Invalid(
                "line_count must be at least 1".to_string(),
            ));
        }
        if self.search_depth == 0 {
            return Err(ConfigError::Invalid(
                "search_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

//! Core opening types.

use serde::{Deserialize, Serialize};

/// A named opening and the move sequence that defines its known line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Opening {
    /// The ECO code for this opening (e.g., "E04").
    #[serde(default)]
    pub eco: String,
    /// The name of the opening.
    pub name: String,
    /// The sequence of moves in SAN, starting from the initial position.
    pub moves: Vec<String>,
}

/// A single move from the move book with its usage weight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookMove {
    /// The move in SAN (e.g., "Nf3").
    pub san: String,
    /// How often this move was played (higher = more common).
    pub weight: u32,
}

impl Opening {
    /// Creates a new opening with the given ECO code, name, and SAN moves.
    #[must_use]
    pub fn new<S: Into<String>>(eco: impl Into<String>, name: impl Into<String>, moves: Vec<S>) -> Self {
        Self {
            eco: eco.into(),
            name: name.into(),
            moves: moves.into_iter().map(Into::into).collect(),
        }
    }

    /// The dictionary key for this opening: its name, trimmed and lowercased.
    #[must_use]
    pub fn key(&self) -> String {
        normalize_name(&self.name)
    }

    /// Number of plies in the known line.
    #[must_use]
    pub fn plies(&self) -> usize {
        self.moves.len()
    }
}

impl BookMove {
    /// Creates a new book move with the given SAN and weight.
    #[must_use]
    pub fn new(san: impl Into<String>, weight: u32) -> Self {
        Self {
            san: san.into(),
            weight,
        }
    }
}

/// Normalizes an opening name for case-insensitive lookup.
pub(crate) fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

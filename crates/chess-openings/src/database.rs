//! Opening dictionary storage and move book lookup.

use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;

use crate::opening::{normalize_name, BookMove, Opening};

/// Errors that can occur when loading opening data.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// The data was readable but semantically invalid.
    #[error("failed to parse opening database: {0}")]
    ParseError(String),

    /// Failed to read the opening database file.
    #[error("failed to read opening database: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Maps opening names (case-insensitive) to the move sequence of the known line.
///
/// Insertion order is preserved so listings come out in a stable order.
#[derive(Debug, Clone, Default)]
pub struct OpeningDictionary {
    openings: Vec<Opening>,
    index: HashMap<String, usize>,
}

impl OpeningDictionary {
    /// Creates a new empty dictionary.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a dictionary from the given openings.
    ///
    /// Later entries with the same name replace earlier ones.
    #[must_use]
    pub fn with_openings(openings: Vec<Opening>) -> Self {
        let mut dictionary = Self::new();
        for opening in openings {
            dictionary.add(opening);
        }
        dictionary
    }

    /// Parses a JSON array of openings.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::JsonError`] on malformed JSON and
    /// [`DatabaseError::ParseError`] when an opening has an empty name or line.
    pub fn from_json(json: &str) -> Result<Self, DatabaseError> {
        let openings: Vec<Opening> = serde_json::from_str(json)?;
        for opening in &openings {
            if opening.key().is_empty() {
                return Err(DatabaseError::ParseError(
                    "opening with an empty name".to_string(),
                ));
            }
            if opening.moves.is_empty() {
                return Err(DatabaseError::ParseError(format!(
                    "opening '{}' has no moves",
                    opening.name
                )));
            }
        }
        Ok(Self::with_openings(openings))
    }

    /// Loads a JSON opening file from disk.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::IoError`] if the file cannot be read, or any
    /// error from [`Self::from_json`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DatabaseError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Returns the number of openings in the dictionary.
    #[must_use]
    pub fn len(&self) -> usize {
        self.openings.len()
    }

    /// Returns true if the dictionary contains no openings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.openings.is_empty()
    }

    /// Adds an opening, replacing any opening with the same name.
    pub fn add(&mut self, opening: Opening) {
        let key = opening.key();
        match self.index.get(&key) {
            Some(&idx) => self.openings[idx] = opening,
            None => {
                self.index.insert(key, self.openings.len());
                self.openings.push(opening);
            }
        }
    }

    /// Adds every opening of `other`, replacing same-named entries.
    pub fn merge(&mut self, other: OpeningDictionary) {
        for opening in other.openings {
            self.add(opening);
        }
    }

    /// Looks up an opening by name, ignoring case and surrounding whitespace.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Opening> {
        self.index
            .get(&normalize_name(name))
            .map(|&idx| &self.openings[idx])
    }

    /// Returns all openings in insertion order.
    #[must_use]
    pub fn all(&self) -> &[Opening] {
        &self.openings
    }

    /// Returns the names of all openings in insertion order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.openings.iter().map(|o| o.name.as_str()).collect()
    }

    /// Finds all openings matching an ECO code prefix.
    ///
    /// For example, `by_eco("E0")` would match "E04", "E06", etc.
    #[must_use]
    pub fn by_eco(&self, eco_prefix: &str) -> Vec<&Opening> {
        self.openings
            .iter()
            .filter(|o| o.eco.starts_with(eco_prefix))
            .collect()
    }

    /// Searches for openings by name (case-insensitive substring match).
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<&Opening> {
        let query = normalize_name(query);
        self.openings
            .iter()
            .filter(|o| o.key().contains(&query))
            .collect()
    }
}

/// A move book that maps positions to weighted candidate moves.
///
/// Position keys are opaque strings chosen by the caller; the analysis crate
/// uses the FEN without move counters.
#[derive(Debug, Clone, Default)]
pub struct MoveBook {
    positions: HashMap<String, Vec<BookMove>>,
}

impl MoveBook {
    /// Creates a new empty move book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON object mapping position keys to lists of book moves.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::JsonError`] on malformed JSON.
    pub fn from_json(json: &str) -> Result<Self, DatabaseError> {
        let positions: HashMap<String, Vec<BookMove>> = serde_json::from_str(json)?;
        let mut book = Self::new();
        for (key, moves) in positions {
            book.add_position(key, moves);
        }
        Ok(book)
    }

    /// Loads a JSON move book from disk.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::IoError`] if the file cannot be read, or any
    /// error from [`Self::from_json`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DatabaseError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Returns true if the book is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Returns the number of positions in the book.
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Sets the candidate moves for a position, replacing any previous entry.
    pub fn add_position(&mut self, position_key: impl Into<String>, mut moves: Vec<BookMove>) {
        sort_by_weight(&mut moves);
        self.positions.insert(position_key.into(), moves);
    }

    /// Records one more occurrence of `san` in the given position.
    pub fn add_move(&mut self, position_key: impl Into<String>, san: &str, weight: u32) {
        let moves = self.positions.entry(position_key.into()).or_default();
        match moves.iter_mut().find(|m| m.san == san) {
            Some(existing) => existing.weight = existing.weight.saturating_add(weight),
            None => moves.push(BookMove::new(san, weight)),
        }
        sort_by_weight(moves);
    }

    /// Looks up candidate moves for a position, most frequent first.
    #[must_use]
    pub fn lookup(&self, position_key: &str) -> Option<&[BookMove]> {
        self.positions.get(position_key).map(|v| v.as_slice())
    }
}

// Stable sort keeps insertion order among equal weights.
fn sort_by_weight(moves: &mut [BookMove]) {
    moves.sort_by(|a, b| b.weight.cmp(&a.weight));
}

//! Candidate moves proposed by something other than the engine, typically an
//! opening database.

use serde::Serialize;
use thiserror::Error;

use crate::position::{ChessMove, Position};

/// Errors reported by candidate sources.
#[derive(Error, Debug)]
pub enum CandidateError {
    /// The source could not be reached.
    #[error("Candidate source unavailable: {0}")]
    Unavailable(String),
    /// The source answered with data that could not be used.
    #[error("Invalid candidate response: {0}")]
    InvalidResponse(String),
}

/// A move suggested for a position, with how often it was played when known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateMove {
    pub mv: ChessMove,
    pub frequency: Option<u64>,
}

impl CandidateMove {
    pub fn new(mv: ChessMove, frequency: Option<u64>) -> Self {
        Self { mv, frequency }
    }
}

/// Supplies candidate moves for a position.
pub trait CandidateSource: Send + Sync {
    /// Candidate moves legal in `position`, most relevant first.
    ///
    /// # Errors
    ///
    /// Returns a [`CandidateError`] when the source fails; callers treat this
    /// as "no candidates".
    fn candidates(&self, position: &Position) -> Result<Vec<CandidateMove>, CandidateError>;
}

impl<T: CandidateSource + ?Sized> CandidateSource for &T {
    fn candidates(&self, position: &Position) -> Result<Vec<CandidateMove>, CandidateError> {
        (**self).candidates(position)
    }
}

impl<T: CandidateSource + ?Sized> CandidateSource for Box<T> {
    fn candidates(&self, position: &Position) -> Result<Vec<CandidateMove>, CandidateError> {
        (**self).candidates(position)
    }
}

/// A source that never has anything to suggest.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCandidates;

impl CandidateSource for NoCandidates {
    fn candidates(&self, _position: &Position) -> Result<Vec<CandidateMove>, CandidateError> {
        Ok(Vec::new())
    }
}

/// Queries sources in order and merges their suggestions, keeping the first
/// occurrence of each move. A failing source is skipped unless all fail.
pub struct ChainedCandidates {
    sources: Vec<Box<dyn CandidateSource>>,
}

impl ChainedCandidates {
    pub fn new(sources: Vec<Box<dyn CandidateSource>>) -> Self {
        Self { sources }
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl CandidateSource for ChainedCandidates {
    fn candidates(&self, position: &Position) -> Result<Vec<CandidateMove>, CandidateError> {
        let mut merged: Vec<CandidateMove> = Vec::new();
        let mut last_error = None;
        let mut any_ok = self.sources.is_empty();

        for source in &self.sources {
            match source.candidates(position) {
                Ok(moves) => {
                    any_ok = true;
                    for candidate in moves {
                        if !merged.iter().any(|c| c.mv == candidate.mv) {
                            merged.push(candidate);
                        }
                    }
                }
                Err(e) => {
                    tracing::debug!(error = %e, "candidate source failed");
                    last_error = Some(e);
                }
            }
        }

        match (any_ok, last_error) {
            (false, Some(e)) => Err(e),
            _ => Ok(merged),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Vec<&'static str>);

    impl CandidateSource for Fixed {
        fn candidates(&self, position: &Position) -> Result<Vec<CandidateMove>, CandidateError> {
            Ok(self
                .0
                .iter()
                .map(|uci| CandidateMove::new(position.parse_uci(uci).unwrap(), Some(1)))
                .collect())
        }
    }

    struct Failing;

    impl CandidateSource for Failing {
        fn candidates(&self, _position: &Position) -> Result<Vec<CandidateMove>, CandidateError> {
            Err(CandidateError::Unavailable("offline".to_string()))
        }
    }

    #[test]
    fn test_no_candidates() {
        assert!(NoCandidates.candidates(&Position::startpos()).unwrap().is_empty());
    }

    #[test]
    fn test_chain_merges_without_duplicates() {
        let chain = ChainedCandidates::new(vec![
            Box::new(Fixed(vec!["e2e4", "d2d4"])),
            Box::new(Failing),
            Box::new(Fixed(vec!["d2d4", "c2c4"])),
        ]);
        let moves: Vec<String> = chain
            .candidates(&Position::startpos())
            .unwrap()
            .into_iter()
            .map(|c| c.mv.uci().to_string())
            .collect();
        assert_eq!(moves, vec!["e2e4", "d2d4", "c2c4"]);
    }

    #[test]
    fn test_chain_fails_when_every_source_fails() {
        let chain = ChainedCandidates::new(vec![Box::new(Failing)]);
        assert!(chain.candidates(&Position::startpos()).is_err());
    }
}

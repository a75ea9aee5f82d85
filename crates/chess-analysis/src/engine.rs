//! The engine evaluation seam.
//!
//! The variation builder only ever talks to an [`EngineEvaluator`]. The UCI
//! process adapter in [`crate::uci_engine`] is one implementation; tests use
//! scripted ones.

use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use crate::evaluation::Evaluation;
use crate::position::{ChessMove, Position};

/// Errors that can occur when working with chess engines.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Failed to spawn the engine process.
    #[error("Failed to spawn engine: {0}")]
    SpawnError(#[from] std::io::Error),
    /// Engine executable was not found at the specified path.
    #[error("Engine not found at path: {0}")]
    NotFound(String),
    /// Engine failed to initialize properly (UCI handshake failed).
    #[error("Engine initialization failed")]
    InitFailed,
    /// Engine returned an invalid or unexpected response.
    #[error("Invalid engine response: {0}")]
    InvalidResponse(String),
    /// Engine did not finish the query in time.
    #[error("Engine did not answer within {0:?}")]
    Timeout(Duration),
    /// Engine process closed its output.
    #[error("Engine closed the connection")]
    Closed,
}

/// One ranked line of engine output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineLine {
    /// First move of the line.
    pub mv: ChessMove,
    pub evaluation: Evaluation,
    /// Principal variation in UCI notation, starting with `mv`.
    pub pv: Vec<String>,
}

/// Anything that can score a position.
pub trait EngineEvaluator: Send + Sync {
    /// Return up to `lines` lines for `position`, best first, searched to
    /// `depth` plies.
    ///
    /// An empty result means the engine found no move, i.e. the position is
    /// terminal. Repeated calls on the same position should agree on the top
    /// move and score within engine noise.
    ///
    /// # Errors
    ///
    /// Returns an [`EngineError`] when the engine fails, times out or answers
    /// with output that cannot be understood.
    fn evaluate(
        &self,
        position: &Position,
        lines: usize,
        depth: u32,
    ) -> Result<Vec<EngineLine>, EngineError>;
}

impl<T: EngineEvaluator + ?Sized> EngineEvaluator for &T {
    fn evaluate(
        &self,
        position: &Position,
        lines: usize,
        depth: u32,
    ) -> Result<Vec<EngineLine>, EngineError> {
        (**self).evaluate(position, lines, depth)
    }
}

impl<T: EngineEvaluator + ?Sized> EngineEvaluator for Box<T> {
    fn evaluate(
        &self,
        position: &Position,
        lines: usize,
        depth: u32,
    ) -> Result<Vec<EngineLine>, EngineError> {
        (**self).evaluate(position, lines, depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_error_display() {
        let err = EngineError::NotFound("/path/to/engine".to_string());
        assert_eq!(err.to_string(), "Engine not found at path: /path/to/engine");

        let err = EngineError::InitFailed;
        assert_eq!(err.to_string(), "Engine initialization failed");

        let err = EngineError::InvalidResponse("bad data".to_string());
        assert_eq!(err.to_string(), "Invalid engine response: bad data");

        let err = EngineError::Timeout(Duration::from_millis(1500));
        assert_eq!(err.to_string(), "Engine did not answer within 1.5s");
    }
}

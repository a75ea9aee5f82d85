//! UCI (Universal Chess Interface) protocol types for driving analysis engines.
//!
//! This crate covers the GUI side of the protocol: formatting the commands an
//! analysis client sends and parsing what the engine answers.
//!
//! # Commands sent to the engine
//!
//! - `uci` - Initialize engine, get id and options
//! - `setoption name <id> value <x>` - Configure the engine (`MultiPV`, `Hash`, ...)
//! - `isready` / `readyok` - Synchronization
//! - `position fen <fen> [moves <move>...]` - Set position
//! - `go [depth <d>] [nodes <n>] [movetime <ms>]` - Start search
//! - `stop` - Stop search
//! - `quit` - Exit engine
//!
//! # Messages read from the engine
//!
//! - `id name <name>`, `uciok`, `readyok`
//! - `info ... multipv <k> score cp|mate <x> ... pv <moves>`
//! - `bestmove <move> [ponder <move>]`, where `(none)` means no legal move

mod command;
mod info;

pub use command::{GoOptions, GuiCommand};
pub use info::{Bound, EngineInfo, InfoBuilder, Score};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum UciError {
    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Messages sent from engine to GUI.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineMessage {
    /// Engine identification.
    Id { name: Option<String>, author: Option<String> },
    /// UCI initialization complete.
    UciOk,
    /// Engine is ready.
    ReadyOk,
    /// Search information.
    Info(EngineInfo),
    /// Best move found. `mv` is `None` when the engine reported `(none)`.
    BestMove { mv: Option<String>, ponder: Option<String> },
    /// Anything else (option declarations, copyright banners, ...).
    Other(String),
}

impl EngineMessage {
    /// Parse one line of engine output.
    ///
    /// # Errors
    ///
    /// Returns [`UciError::ParseError`] for a `bestmove` line without a move.
    pub fn parse(line: &str) -> Result<Self, UciError> {
        let line = line.trim();
        let mut parts = line.split_whitespace();

        match parts.next().unwrap_or("") {
            "uciok" => Ok(EngineMessage::UciOk),
            "readyok" => Ok(EngineMessage::ReadyOk),
            "id" => {
                let rest = |prefix: &str| {
                    line.strip_prefix(prefix)
                        .map(|s| s.trim().to_string())
                };
                Ok(EngineMessage::Id {
                    name: rest("id name "),
                    author: rest("id author "),
                })
            }
            "info" => Ok(EngineInfo::parse(line)
                .map(EngineMessage::Info)
                .unwrap_or_else(|| EngineMessage::Other(line.to_string()))),
            "bestmove" => {
                let mv = parts.next().ok_or_else(|| {
                    UciError::ParseError(format!("bestmove without a move: '{}'", line))
                })?;
                let ponder = match (parts.next(), parts.next()) {
                    (Some("ponder"), Some(p)) => Some(p.to_string()),
                    _ => None,
                };
                let mv = match mv {
                    "(none)" | "0000" => None,
                    other => Some(other.to_string()),
                };
                Ok(EngineMessage::BestMove { mv, ponder })
            }
            _ => Ok(EngineMessage::Other(line.to_string())),
        }
    }
}

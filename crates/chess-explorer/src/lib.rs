//! Candidate move sources for variation exploration.
//!
//! - [`MastersExplorer`] - moves from master games, via the Lichess opening explorer
//! - [`BookCandidates`] - moves from an offline [`chess_openings::MoveBook`]

mod book;
mod masters;

pub use book::{book_from_openings, BookCandidates};
pub use masters::{
    candidates_from_response, ExplorerConfig, ExplorerError, ExplorerMove, ExplorerResponse,
    MastersExplorer,
};

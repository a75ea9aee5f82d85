//! Opening dictionary and offline move book.
//!
//! This crate holds the static data an analysis session starts from: a
//! dictionary mapping opening names to the SAN move sequence defining the
//! known line, and a move book mapping positions to weighted candidate moves.
//! Neither type knows anything about chess rules; positions are identified by
//! opaque string keys supplied by the caller.

pub mod builtin;
pub mod database;
pub mod opening;

pub use builtin::builtin_dictionary;
pub use database::{DatabaseError, MoveBook, OpeningDictionary};
pub use opening::{BookMove, Opening};

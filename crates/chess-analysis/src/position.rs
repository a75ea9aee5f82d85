//! Board positions and moves.
//!
//! [`Position`] wraps a [`shakmaty::Chess`] board together with the number of
//! plies played since the root of an analysis. Moves are carried around as
//! [`ChessMove`], which keeps the legal move alongside its UCI and SAN text so
//! reports never have to replay a line to print it.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use shakmaty::fen::Fen;
use shakmaty::san::{San, SanPlus};
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, Color, EnPassantMode, Move, Position as _};
use std::fmt;
use std::hash::{Hash, Hasher};
use thiserror::Error;

use crate::evaluation::{Evaluation, Score};

/// Errors raised while building positions or applying moves.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PositionError {
    /// The FEN string could not be parsed or describes an impossible position.
    #[error("Invalid FEN '{fen}': {reason}")]
    InvalidFen { fen: String, reason: String },
    /// The text is neither valid UCI nor valid SAN.
    #[error("Invalid move notation: {0}")]
    InvalidNotation(String),
    /// The move is well formed but not legal in the position.
    #[error("Illegal move '{mv}' in position {fen}")]
    IllegalMove { mv: String, fen: String },
    /// A move of an opening line could not be played.
    #[error("Opening line breaks at ply {ply}: {source}")]
    IllegalLine {
        ply: usize,
        #[source]
        source: Box<PositionError>,
    },
}

/// Side of the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    White,
    Black,
}

impl Side {
    /// The other side.
    pub fn opposite(self) -> Self {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }
}

impl From<Color> for Side {
    fn from(color: Color) -> Self {
        match color {
            Color::White => Side::White,
            Color::Black => Side::Black,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::White => write!(f, "White"),
            Side::Black => write!(f, "Black"),
        }
    }
}

/// Why a position has no continuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terminal {
    /// The side to move is checkmated.
    Checkmate,
    /// The side to move has no legal move and is not in check.
    Stalemate,
    /// The engine reported no move although the rules allow one.
    NoLegalMoves,
}

impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Terminal::Checkmate => write!(f, "checkmate"),
            Terminal::Stalemate => write!(f, "stalemate"),
            Terminal::NoLegalMoves => write!(f, "no legal moves"),
        }
    }
}

/// A legal move together with its notations.
#[derive(Clone, Debug)]
pub struct ChessMove {
    inner: Move,
    uci: String,
    san: String,
}

impl ChessMove {
    fn new(position: &Chess, inner: Move) -> Self {
        let uci = inner.to_uci(CastlingMode::Standard).to_string();
        let san = San::from_move(position, inner).to_string();
        Self { inner, uci, san }
    }

    /// Long algebraic notation, e.g. `e2e4` or `e7e8q`.
    pub fn uci(&self) -> &str {
        &self.uci
    }

    /// Standard algebraic notation in the position the move was made from.
    pub fn san(&self) -> &str {
        &self.san
    }
}

impl PartialEq for ChessMove {
    fn eq(&self, other: &Self) -> bool {
        self.uci == other.uci
    }
}

impl Eq for ChessMove {}

impl Hash for ChessMove {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.uci.hash(state);
    }
}

impl fmt::Display for ChessMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.san)
    }
}

impl Serialize for ChessMove {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ChessMove", 2)?;
        state.serialize_field("uci", &self.uci)?;
        state.serialize_field("san", &self.san)?;
        state.end()
    }
}

/// A board position plus the number of plies played from the analysis root.
#[derive(Clone, Debug)]
pub struct Position {
    board: Chess,
    ply: u32,
}

impl Position {
    /// The standard starting position.
    pub fn startpos() -> Self {
        Self {
            board: Chess::default(),
            ply: 0,
        }
    }

    /// Parse a position from FEN.
    ///
    /// # Errors
    ///
    /// Returns [`PositionError::InvalidFen`] if the text is malformed or the
    /// setup is not a legal chess position.
    pub fn from_fen(fen: &str) -> Result<Self, PositionError> {
        let invalid = |reason: String| PositionError::InvalidFen {
            fen: fen.to_string(),
            reason,
        };
        let setup: Fen = fen.trim().parse().map_err(|e| invalid(format!("{e}")))?;
        let board: Chess = setup
            .into_position(CastlingMode::Standard)
            .map_err(|e| invalid(format!("{e}")))?;
        Ok(Self { board, ply: 0 })
    }

    /// Play a line of SAN moves from the starting position.
    ///
    /// Castling may be written with zeros (`0-0`). The returned position has
    /// its ply counter reset, so it can serve as an analysis root.
    ///
    /// # Errors
    ///
    /// Returns [`PositionError::IllegalLine`] naming the first move that
    /// cannot be played.
    pub fn from_san_line<S: AsRef<str>>(moves: &[S]) -> Result<Self, PositionError> {
        let mut position = Self::startpos();
        for (index, san) in moves.iter().enumerate() {
            let mv = position
                .parse_san(san.as_ref())
                .map_err(|e| PositionError::IllegalLine {
                    ply: index + 1,
                    source: Box::new(e),
                })?;
            position = position.play(&mv).map_err(|e| PositionError::IllegalLine {
                ply: index + 1,
                source: Box::new(e),
            })?;
        }
        position.ply = 0;
        Ok(position)
    }

    /// FEN of the position.
    pub fn fen(&self) -> String {
        Fen::from_position(&self.board, EnPassantMode::Legal).to_string()
    }

    /// Identity used for repetition detection and book lookups: the first
    /// four FEN fields, without the move counters.
    pub fn key(&self) -> String {
        self.fen()
            .split_whitespace()
            .take(4)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Plies played since the analysis root.
    pub fn ply(&self) -> u32 {
        self.ply
    }

    /// Full move number as written in game notation.
    pub fn fullmove_number(&self) -> u32 {
        self.board.fullmoves().get()
    }

    pub fn side_to_move(&self) -> Side {
        self.board.turn().into()
    }

    /// All legal moves, ordered by their UCI text.
    pub fn legal_moves(&self) -> Vec<ChessMove> {
        let mut moves: Vec<ChessMove> = self
            .board
            .legal_moves()
            .into_iter()
            .map(|m| ChessMove::new(&self.board, m))
            .collect();
        moves.sort_by(|a, b| a.uci.cmp(&b.uci));
        moves
    }

    /// Whether `mv` can be played here.
    pub fn is_legal(&self, mv: &ChessMove) -> bool {
        self.board.is_legal(mv.inner)
    }

    /// Apply a move, returning the successor position.
    ///
    /// # Errors
    ///
    /// Returns [`PositionError::IllegalMove`] if the move belongs to a
    /// different position.
    pub fn play(&self, mv: &ChessMove) -> Result<Self, PositionError> {
        if !self.is_legal(mv) {
            return Err(PositionError::IllegalMove {
                mv: mv.uci.clone(),
                fen: self.fen(),
            });
        }
        let mut board = self.board.clone();
        board.play_unchecked(mv.inner);
        Ok(Self {
            board,
            ply: self.ply + 1,
        })
    }

    /// Parse a move written in UCI notation.
    ///
    /// # Errors
    ///
    /// Returns [`PositionError::InvalidNotation`] for malformed text and
    /// [`PositionError::IllegalMove`] if the move cannot be played.
    pub fn parse_uci(&self, text: &str) -> Result<ChessMove, PositionError> {
        let uci: UciMove = text
            .trim()
            .parse()
            .map_err(|_| PositionError::InvalidNotation(text.to_string()))?;
        let inner = uci.to_move(&self.board).map_err(|_| PositionError::IllegalMove {
            mv: text.to_string(),
            fen: self.fen(),
        })?;
        Ok(ChessMove::new(&self.board, inner))
    }

    /// Parse a move written in SAN, accepting `0-0` style castling and
    /// trailing check marks.
    ///
    /// # Errors
    ///
    /// Returns [`PositionError::InvalidNotation`] for malformed text and
    /// [`PositionError::IllegalMove`] if the move cannot be played.
    pub fn parse_san(&self, text: &str) -> Result<ChessMove, PositionError> {
        let normalized = text.trim().replace('0', "O");
        let san: SanPlus = normalized
            .parse()
            .map_err(|_| PositionError::InvalidNotation(text.to_string()))?;
        let inner = san.san.to_move(&self.board).map_err(|_| PositionError::IllegalMove {
            mv: text.to_string(),
            fen: self.fen(),
        })?;
        Ok(ChessMove::new(&self.board, inner))
    }

    /// Parse a move in either UCI or SAN.
    ///
    /// # Errors
    ///
    /// Returns the SAN error when neither notation yields a legal move.
    pub fn parse_move(&self, text: &str) -> Result<ChessMove, PositionError> {
        self.parse_uci(text).or_else(|_| self.parse_san(text))
    }

    /// Whether the game is over by the rules in this position.
    pub fn terminal(&self) -> Option<Terminal> {
        if self.board.is_checkmate() {
            Some(Terminal::Checkmate)
        } else if self.board.is_stalemate() {
            Some(Terminal::Stalemate)
        } else {
            None
        }
    }

    /// The fixed evaluation of a finished position, from the side to move.
    ///
    /// A checkmated side scores as mated in zero; every other ending is a draw.
    pub fn terminal_evaluation(&self) -> Evaluation {
        let score = match self.terminal() {
            Some(Terminal::Checkmate) => Score::MatedIn(0),
            _ => Score::Centipawns(0),
        };
        Evaluation::new(score, self.side_to_move())
    }

    /// Piece placement as eight rank strings from rank 8 down to rank 1.
    pub(crate) fn placement(&self) -> String {
        self.fen()
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_string()
    }
}

impl PartialEq for Position {
    fn eq(&self, other: &Self) -> bool {
        self.ply == other.ply && self.fen() == other.fen()
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::startpos()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fen())
    }
}

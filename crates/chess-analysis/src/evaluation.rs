//! Chess position evaluation types.
//!
//! Every [`Evaluation`] states whose point of view its score is from. Scores
//! change perspective in exactly one place, [`Evaluation::relative_to`], and
//! mate scores flip between "mate in" and "mated in" instead of changing sign.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Neg;

use crate::position::{Position, Side};

/// Value of a mate on the move, used when mate scores must be compared with
/// ordinary scores. Mate in N is `MATE_SCORE - N`, which stays above every
/// `i32` centipawn score for every `u32` distance.
pub const MATE_SCORE: i64 = 1 << 40;

/// Score of a position from one side's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Score {
    /// Material and positional balance, 100 = one pawn.
    Centipawns(i32),
    /// This side mates in N moves.
    MateIn(u32),
    /// This side gets mated in N moves. `MatedIn(0)` is checkmate on the board.
    MatedIn(u32),
}

impl Score {
    /// Convert an engine score. UCI reports `mate 0` for a checkmated side to
    /// move, and negative mate counts when the side to move is losing.
    pub fn from_uci(score: uci::Score) -> Self {
        match score {
            uci::Score::Cp(cp) => Score::Centipawns(cp),
            uci::Score::Mate(n) if n > 0 => Score::MateIn(n.unsigned_abs()),
            uci::Score::Mate(n) => Score::MatedIn(n.unsigned_abs()),
        }
    }

    /// Single number for ordering and differences.
    ///
    /// Any mate outranks any centipawn score, and shorter mates outrank longer
    /// ones.
    pub fn to_centipawns(self) -> i64 {
        match self {
            Score::Centipawns(cp) => i64::from(cp),
            Score::MateIn(n) => MATE_SCORE - i64::from(n),
            Score::MatedIn(n) => -(MATE_SCORE - i64::from(n)),
        }
    }
}

impl Neg for Score {
    type Output = Score;

    fn neg(self) -> Score {
        match self {
            Score::Centipawns(cp) => Score::Centipawns(-cp),
            Score::MateIn(n) => Score::MatedIn(n),
            Score::MatedIn(n) => Score::MateIn(n),
        }
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Score::Centipawns(cp) => {
                let sign = if *cp < 0 { "-" } else { "+" };
                let abs = cp.unsigned_abs();
                write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
            }
            Score::MateIn(n) => write!(f, "#{}", n),
            Score::MatedIn(n) => write!(f, "#-{}", n),
        }
    }
}

/// A score together with the side whose point of view it expresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Evaluation {
    score: Score,
    perspective: Side,
}

impl Evaluation {
    pub fn new(score: Score, perspective: Side) -> Self {
        Self { score, perspective }
    }

    pub fn score(&self) -> Score {
        self.score
    }

    pub fn perspective(&self) -> Side {
        self.perspective
    }

    /// The same evaluation seen by `side`.
    pub fn relative_to(self, side: Side) -> Self {
        if side == self.perspective {
            self
        } else {
            Self {
                score: -self.score,
                perspective: side,
            }
        }
    }

    /// Shorthand for `relative_to(Side::White)`, the convention used in reports.
    pub fn white_view(self) -> Self {
        self.relative_to(Side::White)
    }

    pub fn to_centipawns(self) -> i64 {
        self.score.to_centipawns()
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.score)
    }
}

/// How an engine attributes its scores.
///
/// UCI engines report scores from the side to move. Some wrappers normalize to
/// White; declaring which one applies keeps a single conversion point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScorePerspective {
    #[default]
    SideToMove,
    White,
}

impl ScorePerspective {
    /// Attach the declared perspective to a raw score reported for `position`.
    pub fn attribute(self, score: Score, position: &Position) -> Evaluation {
        match self {
            ScorePerspective::SideToMove => Evaluation::new(score, position.side_to_move()),
            ScorePerspective::White => Evaluation::new(score, Side::White),
        }
    }
}

//! Move criticality classification.
//!
//! A move is critical when the best alternative to it loses more than the
//! configured threshold, or when choosing the alternative changes the mate
//! outlook (a mate is lost, a mate against appears, or a mate gets longer).

use serde::Serialize;
use std::fmt;

use crate::evaluation::{Evaluation, Score};
use crate::position::ChessMove;

/// Why a verdict came out the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictReason {
    /// The alternative stays within the threshold of the best move.
    WithinThreshold,
    /// The alternative loses more than the threshold.
    ExceedsThreshold,
    /// The alternative changes the mate outlook.
    MateSwing,
    /// There was nothing to compare with.
    NoAlternative,
}

impl fmt::Display for VerdictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerdictReason::WithinThreshold => write!(f, "within threshold"),
            VerdictReason::ExceedsThreshold => write!(f, "exceeds threshold"),
            VerdictReason::MateSwing => write!(f, "mate swing"),
            VerdictReason::NoAlternative => write!(f, "no alternative"),
        }
    }
}

/// Outcome of comparing a move against the best move in the same position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriticalityVerdict {
    pub critical: bool,
    /// Centipawns lost by the alternative, from the mover's point of view.
    /// Differences involving a mate are measured on the [`MATE_SCORE`] scale.
    ///
    /// [`MATE_SCORE`]: crate::evaluation::MATE_SCORE
    pub drop: i64,
    pub reason: VerdictReason,
    /// The move that would have been best, when known.
    pub best_move: Option<ChessMove>,
    pub best_evaluation: Evaluation,
}

impl CriticalityVerdict {
    /// Verdict for a move that had no alternative to compare against.
    pub fn forced(best: Evaluation) -> Self {
        Self {
            critical: false,
            drop: 0,
            reason: VerdictReason::NoAlternative,
            best_move: None,
            best_evaluation: best,
        }
    }

    pub fn with_best_move(mut self, mv: ChessMove) -> Self {
        self.best_move = Some(mv);
        self
    }
}

/// Classify `alternative` against `best`.
///
/// Both evaluations must share a perspective; comparing across perspectives is
/// a programming error and panics.
pub fn classify(best: Evaluation, alternative: Evaluation, threshold_cp: u32) -> CriticalityVerdict {
    assert_eq!(
        best.perspective(),
        alternative.perspective(),
        "cannot compare evaluations from different perspectives: best {:?}, alternative {:?}",
        best,
        alternative
    );

    let drop = best.to_centipawns() - alternative.to_centipawns();
    let reason = if drop <= 0 {
        VerdictReason::WithinThreshold
    } else if is_mate_swing(best.score(), alternative.score()) {
        VerdictReason::MateSwing
    } else if drop > i64::from(threshold_cp) {
        VerdictReason::ExceedsThreshold
    } else {
        VerdictReason::WithinThreshold
    };

    CriticalityVerdict {
        critical: matches!(reason, VerdictReason::ExceedsThreshold | VerdictReason::MateSwing),
        drop,
        reason,
        best_move: None,
        best_evaluation: best,
    }
}

fn is_mate_swing(best: Score, alternative: Score) -> bool {
    match (best, alternative) {
        (Score::MateIn(a), Score::MateIn(b)) => b > a,
        (Score::MateIn(_), _) => true,
        (Score::MatedIn(a), Score::MatedIn(b)) => b < a,
        (_, Score::MatedIn(_)) => true,
        _ => false,
    }
}

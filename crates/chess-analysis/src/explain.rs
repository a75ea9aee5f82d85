//! Short prose summaries of a position.

use crate::evaluation::Evaluation;
use crate::position::Position;

/// Turns a position and its evaluation into a sentence for the report.
pub trait ExplanationGenerator: Sync {
    fn explain(&self, position: &Position, evaluation: Option<Evaluation>) -> String;
}

/// Describes who is better by the size of the evaluation.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationPlans {
    /// Centipawn margin from which one side counts as better.
    pub margin_cp: i32,
}

impl Default for EvaluationPlans {
    fn default() -> Self {
        Self { margin_cp: 100 }
    }
}

impl ExplanationGenerator for EvaluationPlans {
    fn explain(&self, _position: &Position, evaluation: Option<Evaluation>) -> String {
        let Some(evaluation) = evaluation else {
            return "The position is unclear; no evaluation is available.".to_string();
        };
        let white = evaluation.white_view();
        let cp = white.to_centipawns();
        let margin = i64::from(self.margin_cp);
        if cp > margin {
            format!(
                "White has the better position ({}). White should look to press the advantage \
                 by improving piece activity and creating threats.",
                white
            )
        } else if cp < -margin {
            format!(
                "Black has the better position ({}). Black should look to exploit the weaknesses \
                 in White's camp.",
                white
            )
        } else {
            format!(
                "The position is balanced ({}). Both sides should focus on solid development \
                 and control of key squares.",
                white
            )
        }
    }
}

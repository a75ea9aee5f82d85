//! Turning a variation tree into a readable report.
//!
//! Every root-to-leaf path of the tree becomes one variation. Evaluations are
//! shown from White's point of view.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use tracing::warn;

use crate::config::ExplorationConfig;
use crate::criticality::VerdictReason;
use crate::diagram::DiagramRenderer;
use crate::evaluation::Evaluation;
use crate::explain::ExplanationGenerator;
use crate::position::{ChessMove, Position, Side};
use crate::variation::{LeafReason, VariationNode, VariationTree};

/// Identifier of the diagram of the root position.
pub const ROOT_DIAGRAM_ID: &str = "opening_line_position";

/// One move of a variation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoveEntry {
    /// Plies below the root.
    pub ply: u32,
    pub move_number: u32,
    pub side: Side,
    pub san: String,
    pub uci: String,
    /// White's point of view.
    pub evaluation: Option<Evaluation>,
    pub critical: bool,
    /// Centipawns lost against the best move, when classified.
    pub drop: Option<i64>,
    pub reason: Option<VerdictReason>,
    /// The best move in SAN, when this move was not it.
    pub best_move: Option<String>,
}

/// One root-to-leaf path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariationReport {
    /// 1-based, main line first.
    pub number: usize,
    pub moves: Vec<MoveEntry>,
    pub critical_count: usize,
    pub ending: LeafReason,
    pub final_fen: String,
    /// White's point of view.
    pub final_evaluation: Option<Evaluation>,
    pub diagram: Option<PathBuf>,
    pub explanation: String,
}

impl VariationReport {
    /// The moves in game notation, e.g. `10. Qxd5 exd5 11. Nc3`.
    pub fn notation(&self) -> String {
        let mut parts = Vec::with_capacity(self.moves.len());
        for (index, entry) in self.moves.iter().enumerate() {
            match entry.side {
                Side::White => parts.push(format!("{}. {}", entry.move_number, entry.san)),
                Side::Black if index == 0 => {
                    parts.push(format!("{}... {}", entry.move_number, entry.san))
                }
                Side::Black => parts.push(entry.san.clone()),
            }
        }
        parts.join(" ")
    }

    pub fn is_incomplete(&self) -> bool {
        matches!(self.ending, LeafReason::EvaluationUnavailable(_))
    }
}

/// A variation whose last position could not be evaluated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncompleteBranch {
    pub variation: usize,
    pub line: String,
    pub depth: u32,
    pub reason: String,
}

/// The full analysis of one opening position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub opening: Option<String>,
    pub root_fen: String,
    pub side_to_move: Side,
    /// White's point of view.
    pub root_evaluation: Option<Evaluation>,
    pub root_diagram: Option<PathBuf>,
    pub settings: ExplorationConfig,
    pub variations: Vec<VariationReport>,
    pub incomplete: Vec<IncompleteBranch>,
    pub node_count: usize,
    /// Distinct critical moves in the tree.
    pub critical_moves: usize,
}

/// Builds [`Report`]s, rendering diagrams and explanations along the way.
pub struct ReportAssembler<'a> {
    diagrams: &'a dyn DiagramRenderer,
    explanations: &'a dyn ExplanationGenerator,
}

impl<'a> ReportAssembler<'a> {
    pub fn new(
        diagrams: &'a dyn DiagramRenderer,
        explanations: &'a dyn ExplanationGenerator,
    ) -> Self {
        Self {
            diagrams,
            explanations,
        }
    }

    /// Assemble the report for `tree`. Diagram failures are logged and leave
    /// the diagram out; they never fail the report.
    pub fn assemble(&self, tree: &VariationTree, opening: Option<&str>) -> Report {
        let root = &tree.root;
        let root_diagram = self.diagram(&root.position, None, ROOT_DIAGRAM_ID);

        let mut variations = Vec::new();
        let mut incomplete = Vec::new();
        for (index, path) in root.paths().into_iter().enumerate() {
            let number = index + 1;
            let variation = self.variation(number, &path);
            if let LeafReason::EvaluationUnavailable(reason) = &variation.ending {
                incomplete.push(IncompleteBranch {
                    variation: number,
                    line: variation.notation(),
                    depth: path.last().map_or(0, |node| node.depth),
                    reason: reason.clone(),
                });
            }
            variations.push(variation);
        }

        Report {
            opening: opening.map(str::to_string),
            root_fen: root.position.fen(),
            side_to_move: root.position.side_to_move(),
            root_evaluation: root.evaluation.map(Evaluation::white_view),
            root_diagram,
            settings: tree.config.clone(),
            variations,
            incomplete,
            node_count: tree.node_count(),
            critical_moves: tree.critical_count(),
        }
    }

    fn variation(&self, number: usize, path: &[&VariationNode]) -> VariationReport {
        let moves: Vec<MoveEntry> = path
            .windows(2)
            .filter_map(|pair| move_entry(pair[0], pair[1]))
            .collect();
        let critical_count = moves.iter().filter(|m| m.critical).count();

        let last = path[path.len() - 1];
        let final_evaluation = last.evaluation.map(Evaluation::white_view);
        let diagram = self.diagram(
            &last.position,
            last.mv.as_ref(),
            &format!("variation_{}_final", number),
        );
        let explanation = self.explanations.explain(&last.position, final_evaluation);

        VariationReport {
            number,
            moves,
            critical_count,
            ending: last.leaf_reason().cloned().unwrap_or(LeafReason::DepthLimit),
            final_fen: last.position.fen(),
            final_evaluation,
            diagram,
            explanation,
        }
    }

    fn diagram(&self, position: &Position, last_move: Option<&ChessMove>, id: &str) -> Option<PathBuf> {
        match self.diagrams.render(position, last_move, id) {
            Ok(path) => path,
            Err(err) => {
                warn!(id, error = %err, "diagram could not be rendered");
                None
            }
        }
    }
}

fn move_entry(parent: &VariationNode, node: &VariationNode) -> Option<MoveEntry> {
    let mv = node.mv.as_ref()?;
    let best_move = node
        .verdict
        .as_ref()
        .and_then(|v| v.best_move.as_ref())
        .filter(|best| *best != mv)
        .map(|best| best.san().to_string());

    Some(MoveEntry {
        ply: node.depth,
        move_number: parent.position.fullmove_number(),
        side: parent.position.side_to_move(),
        san: mv.san().to_string(),
        uci: mv.uci().to_string(),
        evaluation: node.evaluation.map(Evaluation::white_view),
        critical: node.is_critical(),
        drop: node.verdict.as_ref().map(|v| v.drop),
        reason: node.verdict.as_ref().map(|v| v.reason),
        best_move,
    })
}

fn format_eval(evaluation: Option<Evaluation>) -> String {
    evaluation.map_or_else(|| "?".to_string(), |e| e.to_string())
}

/// Why a critical move is critical. The best move is critical because the
/// alternatives lose; any other move because it loses against the best one.
fn write_loss(f: &mut fmt::Formatter<'_>, entry: &MoveEntry) -> fmt::Result {
    let mate_swing = entry.reason == Some(VerdictReason::MateSwing);
    match (&entry.best_move, entry.drop) {
        (None, _) if mate_swing => write!(f, " (alternatives change the mate outlook)"),
        (None, Some(drop)) => write!(f, " (alternatives lose {} cp)", drop),
        (Some(best), _) if mate_swing => write!(f, " (changes the mate outlook against {})", best),
        (Some(best), Some(drop)) => write!(f, " (loses {} cp against {})", drop, best),
        (_, None) => Ok(()),
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(opening) = &self.opening {
            writeln!(f, "Opening: {}", opening)?;
        }
        writeln!(f, "Position: {}", self.root_fen)?;
        writeln!(
            f,
            "{} to move, evaluation {}",
            self.side_to_move,
            format_eval(self.root_evaluation)
        )?;
        if let Some(path) = &self.root_diagram {
            writeln!(f, "Diagram: {}", path.display())?;
        }

        for variation in &self.variations {
            writeln!(f)?;
            writeln!(f, "Variation {}: {}", variation.number, variation.notation())?;
            for entry in &variation.moves {
                let label = if entry.critical { "CRITICAL" } else { "Flexible" };
                let prefix = match entry.side {
                    Side::White => format!("{}.", entry.move_number),
                    Side::Black => format!("{}...", entry.move_number),
                };
                write!(
                    f,
                    "  {:<6} {:<8} {:>7}  {}",
                    prefix,
                    entry.san,
                    format_eval(entry.evaluation),
                    label
                )?;
                if entry.critical {
                    write_loss(f, entry)?;
                }
                if let Some(best) = &entry.best_move {
                    write!(f, " [best: {}]", best)?;
                }
                writeln!(f)?;
            }
            writeln!(f, "  Critical moves: {}", variation.critical_count)?;
            match &variation.ending {
                LeafReason::EvaluationUnavailable(reason) => {
                    writeln!(f, "  analysis incomplete at this node: {}", reason)?
                }
                ending => writeln!(f, "  Ends: {}", ending)?,
            }
            if let Some(path) = &variation.diagram {
                writeln!(f, "  Diagram: {}", path.display())?;
            }
            writeln!(f, "  {}", variation.explanation)?;
        }

        writeln!(f)?;
        writeln!(
            f,
            "Summary: {} variations, {} positions, {} critical moves",
            self.variations.len(),
            self.node_count,
            self.critical_moves
        )?;
        if !self.incomplete.is_empty() {
            writeln!(f, "Incomplete branches:")?;
            for branch in &self.incomplete {
                writeln!(
                    f,
                    "  variation {} at depth {} ({}): {}",
                    branch.variation, branch.depth, branch.line, branch.reason
                )?;
            }
        }
        Ok(())
    }
}

//! The variation tree produced by [`crate::builder::VariationBuilder`].

use serde::Serialize;
use std::fmt;

use crate::config::ExplorationConfig;
use crate::criticality::CriticalityVerdict;
use crate::evaluation::Evaluation;
use crate::position::{ChessMove, Position, Terminal};

/// Why a node was not expanded further.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum LeafReason {
    /// The node sits at the maximum depth.
    DepthLimit,
    /// The game is over in this position.
    Terminal(Terminal),
    /// The engine could not evaluate the position.
    EvaluationUnavailable(String),
    /// The position already occurred higher up on the same path.
    Repetition,
}

impl fmt::Display for LeafReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeafReason::DepthLimit => write!(f, "depth limit"),
            LeafReason::Terminal(terminal) => write!(f, "{}", terminal),
            LeafReason::EvaluationUnavailable(reason) => {
                write!(f, "evaluation unavailable ({})", reason)
            }
            LeafReason::Repetition => write!(f, "repetition"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "reason")]
pub enum NodeStatus {
    Expanded,
    Leaf(LeafReason),
}

/// A candidate that was classified at a node but not followed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedCandidate {
    pub mv: ChessMove,
    pub frequency: Option<u64>,
    /// From the mover's point of view; `None` when it could not be obtained.
    pub evaluation: Option<Evaluation>,
    pub verdict: Option<CriticalityVerdict>,
}

/// One position in the tree and the move that led to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariationNode {
    /// `None` only for the root.
    pub mv: Option<ChessMove>,
    #[serde(serialize_with = "serialize_fen")]
    pub position: Position,
    /// Plies below the root.
    pub depth: u32,
    /// Score of the move from the point of view of the side that played it.
    /// For the root, the engine's score for the side to move.
    pub evaluation: Option<Evaluation>,
    /// How the move compares with the best move of the parent position.
    pub verdict: Option<CriticalityVerdict>,
    pub status: NodeStatus,
    /// Candidates classified at this node that are not among the children.
    pub alternatives: Vec<ClassifiedCandidate>,
    /// Main line first, then critical alternatives.
    pub children: Vec<VariationNode>,
}

fn serialize_fen<S: serde::Serializer>(position: &Position, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&position.fen())
}

impl VariationNode {
    pub fn is_leaf(&self) -> bool {
        matches!(self.status, NodeStatus::Leaf(_))
    }

    pub fn leaf_reason(&self) -> Option<&LeafReason> {
        match &self.status {
            NodeStatus::Leaf(reason) => Some(reason),
            NodeStatus::Expanded => None,
        }
    }

    pub fn is_critical(&self) -> bool {
        self.verdict.as_ref().is_some_and(|v| v.critical)
    }

    /// This node and all its descendants, depth first.
    pub fn iter(&self) -> impl Iterator<Item = &VariationNode> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.children.iter().rev());
            Some(node)
        })
    }

    /// Every path from this node to a leaf, main lines first.
    pub fn paths(&self) -> Vec<Vec<&VariationNode>> {
        let mut paths = Vec::new();
        let mut current = Vec::new();
        collect_paths(self, &mut current, &mut paths);
        paths
    }
}

fn collect_paths<'a>(
    node: &'a VariationNode,
    current: &mut Vec<&'a VariationNode>,
    paths: &mut Vec<Vec<&'a VariationNode>>,
) {
    current.push(node);
    if node.children.is_empty() {
        paths.push(current.clone());
    } else {
        for child in &node.children {
            collect_paths(child, current, paths);
        }
    }
    current.pop();
}

/// The result of exploring one root position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariationTree {
    pub root: VariationNode,
    pub config: ExplorationConfig,
}

impl VariationTree {
    pub fn node_count(&self) -> usize {
        self.root.iter().count()
    }

    /// Depth of the deepest node.
    pub fn height(&self) -> u32 {
        self.root.iter().map(|n| n.depth).max().unwrap_or(0)
    }

    pub fn critical_count(&self) -> usize {
        self.root.iter().filter(|n| n.is_critical()).count()
    }

    /// Nodes whose evaluation failed.
    pub fn incomplete(&self) -> Vec<&VariationNode> {
        self.root
            .iter()
            .filter(|n| matches!(n.leaf_reason(), Some(LeafReason::EvaluationUnavailable(_))))
            .collect()
    }
}

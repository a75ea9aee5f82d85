//! Variation exploration and move criticality analysis.
//!
//! Starting from a position, usually the end of a known opening line, this
//! crate follows the engine's best move, classifies alternative moves against
//! it, and keeps exploring the alternatives that turn out to be critical.
//!
//! # Overview
//!
//! - [`Position`] / [`ChessMove`] - Board state and legal moves
//! - [`Evaluation`] - A score and the side it belongs to
//! - [`classify`] - Critical or not, given the best and an alternative evaluation
//! - [`EngineEvaluator`] - Where evaluations come from ([`EnginePool`] for UCI engines)
//! - [`CandidateSource`] - Where alternative moves come from
//! - [`VariationBuilder`] - Builds the [`VariationTree`]
//! - [`ReportAssembler`] - Turns the tree into a [`Report`]
//!
//! # Example
//!
//! ```ignore
//! use chess_analysis::{
//!     EnginePool, EvaluationPlans, ExplorationConfig, NoCandidates, NoDiagrams, Position,
//!     ReportAssembler, UciEngineConfig, VariationBuilder,
//! };
//!
//! let engine = EnginePool::start(UciEngineConfig::default())?;
//! let root = Position::from_san_line(&["d4", "Nf6", "c4", "e6", "g3"])?;
//! let builder = VariationBuilder::new(&engine, &NoCandidates, ExplorationConfig::default())?;
//! let tree = builder.build(root);
//! let report = ReportAssembler::new(&NoDiagrams, &EvaluationPlans::default()).assemble(&tree, None);
//! println!("{report}");
//! ```

pub mod builder;
pub mod candidate;
pub mod config;
pub mod criticality;
pub mod diagram;
pub mod engine;
pub mod evaluation;
pub mod explain;
pub mod position;
pub mod report;
pub mod uci_engine;
pub mod variation;

pub use builder::VariationBuilder;
pub use candidate::{CandidateError, CandidateMove, CandidateSource, ChainedCandidates, NoCandidates};
pub use config::{CandidatePolicy, ConfigError, ExplorationConfig};
pub use criticality::{classify, CriticalityVerdict, VerdictReason};
pub use diagram::{DiagramRenderer, NoDiagrams, RenderError, SvgDiagrams};
pub use engine::{EngineError, EngineEvaluator, EngineLine};
pub use evaluation::{Evaluation, Score, ScorePerspective, MATE_SCORE};
pub use explain::{EvaluationPlans, ExplanationGenerator};
pub use position::{ChessMove, Position, PositionError, Side, Terminal};
pub use report::{IncompleteBranch, MoveEntry, Report, ReportAssembler, VariationReport};
pub use uci_engine::{EngineCommand, EnginePool, UciEngineConfig, UciSession};
pub use variation::{ClassifiedCandidate, LeafReason, NodeStatus, VariationNode, VariationTree};

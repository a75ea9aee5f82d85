//! Depth-bounded exploration of continuations from a root position.
//!
//! At every node the engine supplies the best line and the runner-up lines.
//! The best move is always followed. Other candidate moves are classified
//! against it, and only the critical ones are explored as siblings, up to the
//! branching limit.

use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::candidate::{CandidateMove, CandidateSource};
use crate::config::{CandidatePolicy, ConfigError, ExplorationConfig};
use crate::criticality::{classify, CriticalityVerdict};
use crate::engine::{EngineEvaluator, EngineLine};
use crate::evaluation::Evaluation;
use crate::position::{ChessMove, Position, Side, Terminal};
use crate::variation::{
    ClassifiedCandidate, LeafReason, NodeStatus, VariationNode, VariationTree,
};

/// Builds [`VariationTree`]s from an engine and a candidate source.
pub struct VariationBuilder<'a> {
    engine: &'a dyn EngineEvaluator,
    candidates: &'a dyn CandidateSource,
    config: ExplorationConfig,
}

/// A child that has been chosen but not yet expanded.
struct NodeSeed {
    mv: Option<ChessMove>,
    position: Position,
    evaluation: Option<Evaluation>,
    verdict: Option<CriticalityVerdict>,
}

impl NodeSeed {
    fn into_leaf(self, depth: u32, reason: LeafReason) -> VariationNode {
        self.into_node(depth, NodeStatus::Leaf(reason), Vec::new(), Vec::new())
    }

    fn into_node(
        self,
        depth: u32,
        status: NodeStatus,
        alternatives: Vec<ClassifiedCandidate>,
        children: Vec<VariationNode>,
    ) -> VariationNode {
        VariationNode {
            mv: self.mv,
            position: self.position,
            depth,
            evaluation: self.evaluation,
            verdict: self.verdict,
            status,
            alternatives,
            children,
        }
    }
}

impl<'a> VariationBuilder<'a> {
    /// Create a builder.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the settings fail validation.
    pub fn new(
        engine: &'a dyn EngineEvaluator,
        candidates: &'a dyn CandidateSource,
        config: ExplorationConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            engine,
            candidates,
            config,
        })
    }

    pub fn config(&self) -> &ExplorationConfig {
        &self.config
    }

    /// Explore from `root`.
    ///
    /// Engine failures never abort the build: the affected node becomes a
    /// leaf marked as unavailable and the rest of the tree is still explored.
    pub fn build(&self, root: Position) -> VariationTree {
        info!(
            fen = %root.fen(),
            max_depth = self.config.max_depth,
            max_branching = self.config.max_branching,
            threshold_cp = self.config.threshold_cp,
            policy = %self.config.candidate_policy,
            "exploring variations"
        );

        let seed = NodeSeed {
            mv: None,
            position: root,
            evaluation: None,
            verdict: None,
        };
        let tree = VariationTree {
            root: self.expand(seed, 0, &[]),
            config: self.config.clone(),
        };

        info!(
            nodes = tree.node_count(),
            critical = tree.critical_count(),
            incomplete = tree.incomplete().len(),
            "exploration finished"
        );
        tree
    }

    fn expand(&self, seed: NodeSeed, depth: u32, path: &[String]) -> VariationNode {
        assert!(
            depth <= self.config.max_depth,
            "variation depth {} exceeds the maximum {} at {}",
            depth,
            self.config.max_depth,
            seed.position.fen()
        );

        if let Some(terminal) = seed.position.terminal() {
            return seed.into_leaf(depth, LeafReason::Terminal(terminal));
        }

        if depth == self.config.max_depth {
            return seed.into_leaf(depth, LeafReason::DepthLimit);
        }

        let key = seed.position.key();
        if path.contains(&key) {
            debug!(depth, fen = %seed.position.fen(), "position repeats on the current path");
            return seed.into_leaf(depth, LeafReason::Repetition);
        }

        let lines = match self.engine.evaluate(
            &seed.position,
            self.config.line_count,
            self.config.search_depth,
        ) {
            Ok(lines) => lines,
            Err(err) => {
                warn!(depth, fen = %seed.position.fen(), error = %err, "engine evaluation failed");
                return seed.into_leaf(depth, LeafReason::EvaluationUnavailable(err.to_string()));
            }
        };

        let Some(best) = lines.first() else {
            return seed.into_leaf(depth, LeafReason::Terminal(Terminal::NoLegalMoves));
        };

        let mover = seed.position.side_to_move();
        let best_eval = best.evaluation.relative_to(mover);
        debug!(depth, fen = %seed.position.fen(), best = %best.mv, eval = %best_eval, "evaluated");

        let main_position = match seed.position.play(&best.mv) {
            Ok(position) => position,
            Err(err) => {
                warn!(depth, error = %err, "engine suggested an illegal move");
                return seed.into_leaf(depth, LeafReason::EvaluationUnavailable(err.to_string()));
            }
        };
        let main_verdict = match lines.get(1) {
            Some(second) => self
                .compare(&seed.position, depth, best_eval, second.evaluation.relative_to(mover))
                .with_best_move(best.mv.clone()),
            None => CriticalityVerdict::forced(best_eval).with_best_move(best.mv.clone()),
        };

        let mut seeds = vec![NodeSeed {
            mv: Some(best.mv.clone()),
            position: main_position,
            evaluation: Some(best_eval),
            verdict: Some(main_verdict),
        }];

        let classified: Vec<ClassifiedCandidate> = self
            .candidate_moves(&seed.position, &lines)
            .into_iter()
            .map(|candidate| self.classify_candidate(&seed.position, depth, &lines, best_eval, candidate))
            .collect();
        let (followed, alternatives) = self.select_siblings(classified);

        for candidate in followed {
            match seed.position.play(&candidate.mv) {
                Ok(position) => seeds.push(NodeSeed {
                    mv: Some(candidate.mv),
                    position,
                    evaluation: candidate.evaluation,
                    verdict: candidate.verdict,
                }),
                Err(err) => warn!(depth, error = %err, "skipping unplayable candidate"),
            }
        }

        let mut child_path = path.to_vec();
        child_path.push(key);

        let children: Vec<VariationNode> = if self.config.parallel {
            seeds
                .into_par_iter()
                .map(|child| self.expand(child, depth + 1, &child_path))
                .collect()
        } else {
            seeds
                .into_iter()
                .map(|child| self.expand(child, depth + 1, &child_path))
                .collect()
        };

        let mut node = seed.into_node(depth, NodeStatus::Expanded, alternatives, children);
        if node.evaluation.is_none() {
            node.evaluation = Some(best_eval);
        }
        node
    }

    /// Candidate moves per the configured policy, best move excluded.
    fn candidate_moves(&self, position: &Position, lines: &[EngineLine]) -> Vec<CandidateMove> {
        let from_source = || match self.candidates.candidates(position) {
            Ok(moves) => moves,
            Err(err) => {
                warn!(fen = %position.fen(), error = %err, "candidate source failed");
                Vec::new()
            }
        };
        let from_engine = || {
            lines
                .iter()
                .skip(1)
                .map(|line| CandidateMove::new(line.mv.clone(), None))
                .collect::<Vec<_>>()
        };

        let mut moves = match self.config.candidate_policy {
            CandidatePolicy::Explorer => from_source(),
            CandidatePolicy::Engine => from_engine(),
            CandidatePolicy::Combined => {
                let mut moves = from_source();
                moves.extend(from_engine());
                moves
            }
        };

        let mut seen = HashSet::new();
        if let Some(best) = lines.first() {
            seen.insert(best.mv.uci().to_string());
        }
        moves.retain(|c| position.is_legal(&c.mv) && seen.insert(c.mv.uci().to_string()));
        moves
    }

    fn classify_candidate(
        &self,
        position: &Position,
        depth: u32,
        lines: &[EngineLine],
        best: Evaluation,
        candidate: CandidateMove,
    ) -> ClassifiedCandidate {
        let mover = position.side_to_move();
        let evaluation = match self.candidate_evaluation(position, lines, &candidate.mv, mover) {
            Ok(evaluation) => Some(evaluation),
            Err(reason) => {
                warn!(depth, mv = %candidate.mv, reason = %reason, "candidate evaluation unavailable");
                None
            }
        };
        let verdict = evaluation.map(|alternative| {
            let mut verdict = self.compare(position, depth, best, alternative);
            if let Some(line) = lines.first() {
                verdict = verdict.with_best_move(line.mv.clone());
            }
            verdict
        });

        ClassifiedCandidate {
            mv: candidate.mv,
            frequency: candidate.frequency,
            evaluation,
            verdict,
        }
    }

    /// Score of playing `mv`, from the mover's point of view.
    fn candidate_evaluation(
        &self,
        position: &Position,
        lines: &[EngineLine],
        mv: &ChessMove,
        mover: Side,
    ) -> Result<Evaluation, String> {
        if let Some(line) = lines.iter().find(|line| &line.mv == mv) {
            return Ok(line.evaluation.relative_to(mover));
        }

        let child = position.play(mv).map_err(|e| e.to_string())?;
        if child.terminal().is_some() {
            return Ok(child.terminal_evaluation().relative_to(mover));
        }

        let replies = self
            .engine
            .evaluate(&child, 1, self.config.search_depth)
            .map_err(|e| e.to_string())?;
        Ok(match replies.first() {
            Some(reply) => reply.evaluation.relative_to(mover),
            None => child.terminal_evaluation().relative_to(mover),
        })
    }

    /// Split classified candidates into followed siblings and the rest.
    ///
    /// Critical candidates are ranked by frequency (unknown last), then by
    /// evaluation; ties keep the source order.
    fn select_siblings(
        &self,
        classified: Vec<ClassifiedCandidate>,
    ) -> (Vec<ClassifiedCandidate>, Vec<ClassifiedCandidate>) {
        let slots = self.config.max_branching.saturating_sub(1);

        let mut ranked: Vec<usize> = classified
            .iter()
            .enumerate()
            .filter(|(_, c)| c.verdict.as_ref().is_some_and(|v| v.critical))
            .map(|(i, _)| i)
            .collect();
        ranked.sort_by(|&a, &b| rank(&classified[a], &classified[b]));
        ranked.truncate(slots);

        let mut followed: Vec<Option<ClassifiedCandidate>> = vec![None; ranked.len()];
        let mut alternatives = Vec::new();
        for (index, candidate) in classified.into_iter().enumerate() {
            match ranked.iter().position(|&i| i == index) {
                Some(slot) => followed[slot] = Some(candidate),
                None => alternatives.push(candidate),
            }
        }

        (followed.into_iter().flatten().collect(), alternatives)
    }

    fn compare(
        &self,
        position: &Position,
        depth: u32,
        best: Evaluation,
        alternative: Evaluation,
    ) -> CriticalityVerdict {
        assert_eq!(
            best.perspective(),
            alternative.perspective(),
            "evaluation perspectives differ at depth {} in {}: best {:?}, alternative {:?}",
            depth,
            position.fen(),
            best,
            alternative
        );
        classify(best, alternative, self.config.threshold_cp)
    }
}

fn rank(a: &ClassifiedCandidate, b: &ClassifiedCandidate) -> Ordering {
    let by_frequency = match (a.frequency, b.frequency) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_frequency.then_with(|| {
        let score = |c: &ClassifiedCandidate| c.evaluation.map(|e| e.to_centipawns());
        score(b).cmp(&score(a))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::{CandidateError, NoCandidates};
    use crate::engine::EngineError;
    use crate::evaluation::Score;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Scores every legal move by a fixed table, 0 cp otherwise.
    struct TableEngine {
        scores: HashMap<&'static str, i32>,
        calls: Mutex<usize>,
    }

    impl TableEngine {
        fn new(scores: &[(&'static str, i32)]) -> Self {
            Self {
                scores: scores.iter().copied().collect(),
                calls: Mutex::new(0),
            }
        }
    }

    impl EngineEvaluator for TableEngine {
        fn evaluate(
            &self,
            position: &Position,
            lines: usize,
            _depth: u32,
        ) -> Result<Vec<EngineLine>, EngineError> {
            *self.calls.lock().unwrap() += 1;
            let mut scored: Vec<(i32, ChessMove)> = position
                .legal_moves()
                .into_iter()
                .map(|mv| (self.scores.get(mv.uci()).copied().unwrap_or(0), mv))
                .collect();
            scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.uci().cmp(b.1.uci())));
            Ok(scored
                .into_iter()
                .take(lines)
                .map(|(cp, mv)| EngineLine {
                    pv: vec![mv.uci().to_string()],
                    mv,
                    evaluation: Evaluation::new(Score::Centipawns(cp), position.side_to_move()),
                })
                .collect())
        }
    }

    struct Listed(Vec<(&'static str, Option<u64>)>);

    impl CandidateSource for Listed {
        fn candidates(&self, position: &Position) -> Result<Vec<CandidateMove>, CandidateError> {
            Ok(self
                .0
                .iter()
                .filter_map(|(uci, freq)| position.parse_uci(uci).ok().map(|mv| CandidateMove::new(mv, *freq)))
                .collect())
        }
    }

    fn config(max_depth: u32, max_branching: usize) -> ExplorationConfig {
        ExplorationConfig {
            max_depth,
            max_branching,
            line_count: 20,
            ..ExplorationConfig::default()
        }
    }

    #[test]
    fn test_depth_zero_makes_no_engine_call() {
        let engine = TableEngine::new(&[]);
        let builder = VariationBuilder::new(&engine, &NoCandidates, config(0, 3)).unwrap();
        let tree = builder.build(Position::startpos());

        assert_eq!(tree.root.leaf_reason(), Some(&LeafReason::DepthLimit));
        assert_eq!(*engine.calls.lock().unwrap(), 0);
    }

    #[test]
    fn test_main_line_only_without_candidates() {
        let engine = TableEngine::new(&[("e2e4", 40), ("d2d4", 30)]);
        let builder = VariationBuilder::new(&engine, &NoCandidates, config(2, 3)).unwrap();
        let tree = builder.build(Position::startpos());

        assert_eq!(tree.root.children.len(), 1);
        let main = &tree.root.children[0];
        assert_eq!(main.mv.as_ref().unwrap().uci(), "e2e4");
        assert_eq!(main.evaluation.unwrap().score(), Score::Centipawns(40));
        assert!(!main.is_critical());
        assert_eq!(main.children.len(), 1);
        assert_eq!(main.children[0].leaf_reason(), Some(&LeafReason::DepthLimit));
    }

    #[test]
    fn test_critical_candidate_becomes_sibling() {
        let engine = TableEngine::new(&[("e2e4", 40), ("d2d4", 30), ("g2g4", -200)]);
        let candidates = Listed(vec![("g2g4", Some(10)), ("d2d4", Some(500))]);
        let builder = VariationBuilder::new(&engine, &candidates, config(1, 3)).unwrap();
        let tree = builder.build(Position::startpos());

        let moves: Vec<&str> = tree.root.children.iter().map(|c| c.mv.as_ref().unwrap().uci()).collect();
        assert_eq!(moves, vec!["e2e4", "g2g4"]);
        assert!(tree.root.children[1].is_critical());
        assert_eq!(tree.root.children[1].verdict.as_ref().unwrap().drop, 240);

        assert_eq!(tree.root.alternatives.len(), 1);
        assert_eq!(tree.root.alternatives[0].mv.uci(), "d2d4");
        assert!(!tree.root.alternatives[0].verdict.as_ref().unwrap().critical);
    }

    #[test]
    fn test_branching_limit_keeps_most_frequent() {
        let engine = TableEngine::new(&[("e2e4", 40), ("g2g4", -200), ("f2f3", -150)]);
        let candidates = Listed(vec![("g2g4", Some(10)), ("f2f3", Some(90))]);
        let builder = VariationBuilder::new(&engine, &candidates, config(1, 2)).unwrap();
        let tree = builder.build(Position::startpos());

        assert_eq!(tree.root.children.len(), 2);
        assert_eq!(tree.root.children[1].mv.as_ref().unwrap().uci(), "f2f3");
        assert_eq!(tree.root.alternatives[0].mv.uci(), "g2g4");
        assert!(tree.root.alternatives[0].verdict.as_ref().unwrap().critical);
    }

    #[test]
    fn test_rank_prefers_known_frequency_then_evaluation() {
        let start = Position::startpos();
        let make = |uci: &str, freq: Option<u64>, cp: i32| ClassifiedCandidate {
            mv: start.parse_uci(uci).unwrap(),
            frequency: freq,
            evaluation: Some(Evaluation::new(Score::Centipawns(cp), Side::White)),
            verdict: None,
        };
        let a = make("e2e4", Some(5), 0);
        let b = make("d2d4", None, 100);
        let c = make("c2c4", Some(5), 20);
        assert_eq!(rank(&a, &b), Ordering::Less);
        assert_eq!(rank(&a, &c), Ordering::Greater);
    }

    #[test]
    fn test_knight_shuffle_stops_at_repetition() {
        let engine = TableEngine::new(&[("g1f3", 100), ("g8f6", 100), ("f3g1", 100), ("f6g8", 100)]);
        let builder = VariationBuilder::new(&engine, &NoCandidates, config(6, 1)).unwrap();
        let tree = builder.build(Position::startpos());

        let leaves: Vec<(u32, &LeafReason)> = tree
            .root
            .iter()
            .filter_map(|node| node.leaf_reason().map(|reason| (node.depth, reason)))
            .collect();
        assert_eq!(leaves, vec![(4, &LeafReason::Repetition)]);
        assert_eq!(*engine.calls.lock().unwrap(), 4);
    }

    #[test]
    fn test_mate_at_depth_limit_is_terminal() {
        let root = Position::from_san_line(&["f3", "e5", "g4"]).unwrap();
        let engine = TableEngine::new(&[("d8h4", 1000)]);
        let builder = VariationBuilder::new(&engine, &NoCandidates, config(1, 1)).unwrap();
        let tree = builder.build(root);

        let mate = &tree.root.children[0];
        assert_eq!(mate.mv.as_ref().unwrap().uci(), "d8h4");
        assert_eq!(mate.depth, 1);
        assert_eq!(mate.leaf_reason(), Some(&LeafReason::Terminal(Terminal::Checkmate)));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let engine = TableEngine::new(&[]);
        assert!(VariationBuilder::new(&engine, &NoCandidates, config(3, 0)).is_err());
    }
}

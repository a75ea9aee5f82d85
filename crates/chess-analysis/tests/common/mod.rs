//! Shared helpers for the chess-analysis integration tests.

#![allow(dead_code)]

use chess_analysis::{
    CandidateError, CandidateMove, CandidateSource, EngineError, EngineEvaluator, EngineLine,
    Evaluation, Position, Score,
};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;
use std::time::Duration;

/// The Catalan line the analysis usually starts from.
pub const CATALAN: [&str; 18] = [
    "d4", "Nf6", "c4", "e6", "Nf3", "d5", "g3", "Be7", "Bg2", "O-O", "O-O", "dxc4", "Qc2", "a6",
    "a4", "Nc6", "Qxc4", "Qd5",
];

pub fn catalan() -> Position {
    Position::from_san_line(&CATALAN).expect("Catalan line is legal")
}

/// Play UCI moves from `position`.
pub fn play(position: &Position, moves: &[&str]) -> Position {
    moves.iter().fold(position.clone(), |pos, uci| {
        let mv = pos.parse_uci(uci).expect("legal move");
        pos.play(&mv).expect("playable move")
    })
}

enum Script {
    Lines(Vec<(String, Score)>),
    Fail,
}

/// An engine with scripted answers for chosen positions.
///
/// Unscripted positions get a deterministic answer: legal moves ranked by a
/// hash of the seed, the position and the move.
pub struct ScriptedEngine {
    seed: u64,
    scripts: HashMap<String, Script>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::with_seed(0)
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            scripts: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Answer `position` with these lines, scores from the side to move.
    pub fn script(mut self, position: &Position, lines: &[(&str, Score)]) -> Self {
        let lines = lines
            .iter()
            .map(|(uci, score)| (uci.to_string(), *score))
            .collect();
        self.scripts.insert(position.key(), Script::Lines(lines));
        self
    }

    /// Time out on `position`.
    pub fn fail_on(mut self, position: &Position) -> Self {
        self.scripts.insert(position.key(), Script::Fail);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn default_lines(&self, position: &Position) -> Vec<(String, Score)> {
        let mut scored: Vec<(String, Score)> = position
            .legal_moves()
            .into_iter()
            .map(|mv| {
                let mut hasher = DefaultHasher::new();
                (self.seed, position.key(), mv.uci()).hash(&mut hasher);
                let cp = (hasher.finish() % 301) as i32 - 150;
                (mv.uci().to_string(), Score::Centipawns(cp))
            })
            .collect();
        scored.sort_by(|a, b| b.1.to_centipawns().cmp(&a.1.to_centipawns()).then_with(|| a.0.cmp(&b.0)));
        scored
    }
}

impl EngineEvaluator for ScriptedEngine {
    fn evaluate(
        &self,
        position: &Position,
        lines: usize,
        _depth: u32,
    ) -> Result<Vec<EngineLine>, EngineError> {
        self.calls.lock().unwrap().push(position.key());

        let scripted = match self.scripts.get(&position.key()) {
            Some(Script::Fail) => return Err(EngineError::Timeout(Duration::from_secs(30))),
            Some(Script::Lines(lines)) => lines.clone(),
            None => self.default_lines(position),
        };

        Ok(scripted
            .into_iter()
            .take(lines)
            .map(|(uci, score)| EngineLine {
                mv: position.parse_uci(&uci).expect("scripted move is legal"),
                evaluation: Evaluation::new(score, position.side_to_move()),
                pv: vec![uci],
            })
            .collect())
    }
}

/// Candidate moves for chosen positions, nothing elsewhere.
#[derive(Default)]
pub struct ScriptedCandidates {
    moves: HashMap<String, Vec<(String, Option<u64>)>>,
}

impl ScriptedCandidates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, position: &Position, moves: &[(&str, Option<u64>)]) -> Self {
        self.moves.insert(
            position.key(),
            moves.iter().map(|(uci, f)| (uci.to_string(), *f)).collect(),
        );
        self
    }
}

impl CandidateSource for ScriptedCandidates {
    fn candidates(&self, position: &Position) -> Result<Vec<CandidateMove>, CandidateError> {
        Ok(self
            .moves
            .get(&position.key())
            .map(|moves| {
                moves
                    .iter()
                    .map(|(uci, f)| {
                        CandidateMove::new(position.parse_uci(uci).expect("legal candidate"), *f)
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Proposes every legal move, with a made-up frequency.
pub struct AllMoves;

impl CandidateSource for AllMoves {
    fn candidates(&self, position: &Position) -> Result<Vec<CandidateMove>, CandidateError> {
        Ok(position
            .legal_moves()
            .into_iter()
            .enumerate()
            .map(|(i, mv)| CandidateMove::new(mv, Some((i as u64 * 37) % 11)))
            .collect())
    }
}

//! UCI info command types.

use serde::{Deserialize, Serialize};

/// Score in centipawns or mate distance, from the side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Score {
    /// Centipawn score (100 = 1 pawn advantage).
    Cp(i32),
    /// Mate in N moves (positive = engine winning, negative = engine losing).
    Mate(i32),
}

/// Whether a reported score is exact or only a search bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Bound {
    #[default]
    Exact,
    Lower,
    Upper,
}

/// Search information from engine.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EngineInfo {
    /// Search depth in plies.
    pub depth: Option<u32>,
    /// Selective search depth.
    pub seldepth: Option<u32>,
    /// 1-based index of the line when the engine reports several lines.
    pub multipv: Option<u32>,
    /// Score evaluation.
    pub score: Option<Score>,
    /// Whether the score is exact or a bound.
    pub bound: Bound,
    /// Nodes searched.
    pub nodes: Option<u64>,
    /// Nodes per second.
    pub nps: Option<u64>,
    /// Time spent in milliseconds.
    pub time: Option<u64>,
    /// Principal variation (best line found).
    pub pv: Vec<String>,
    /// Arbitrary string info.
    pub string: Option<String>,
}

impl EngineInfo {
    /// Create a new empty info.
    pub fn new() -> Self {
        Self::default()
    }

    /// The line index this info belongs to, defaulting to the first line.
    pub fn line_index(&self) -> u32 {
        self.multipv.unwrap_or(1)
    }

    /// True if this info carries an exact score and a principal variation.
    pub fn is_complete_line(&self) -> bool {
        self.score.is_some() && self.bound == Bound::Exact && !self.pv.is_empty()
    }

    /// Parse UCI info line.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line != "info" && !line.starts_with("info ") {
            return None;
        }

        let mut info = EngineInfo::new();
        let parts: Vec<&str> = line.split_whitespace().collect();
        let mut i = 1; // Skip "info"

        while i < parts.len() {
            match parts[i] {
                "depth" => {
                    i += 1;
                    if i < parts.len() {
                        info.depth = parts[i].parse().ok();
                    }
                }
                "seldepth" => {
                    i += 1;
                    if i < parts.len() {
                        info.seldepth = parts[i].parse().ok();
                    }
                }
                "multipv" => {
                    i += 1;
                    if i < parts.len() {
                        info.multipv = parts[i].parse().ok();
                    }
                }
                "score" => {
                    i += 1;
                    if i + 1 < parts.len() {
                        let value = parts[i + 1];
                        match parts[i] {
                            "cp" => info.score = value.parse().ok().map(Score::Cp),
                            "mate" => info.score = value.parse().ok().map(Score::Mate),
                            _ => {}
                        }
                        i += 1;
                    }
                }
                "lowerbound" => info.bound = Bound::Lower,
                "upperbound" => info.bound = Bound::Upper,
                "nodes" => {
                    i += 1;
                    if i < parts.len() {
                        info.nodes = parts[i].parse().ok();
                    }
                }
                "nps" => {
                    i += 1;
                    if i < parts.len() {
                        info.nps = parts[i].parse().ok();
                    }
                }
                "time" => {
                    i += 1;
                    if i < parts.len() {
                        info.time = parts[i].parse().ok();
                    }
                }
                "pv" => {
                    i += 1;
                    // Collect all remaining moves until another keyword or end
                    while i < parts.len() && !is_info_keyword(parts[i]) {
                        info.pv.push(parts[i].to_string());
                        i += 1;
                    }
                    continue; // Don't increment i again
                }
                "string" => {
                    // String consumes rest of line
                    info.string = Some(parts[i + 1..].join(" "));
                    break;
                }
                _ => {}
            }
            i += 1;
        }

        Some(info)
    }
}

fn is_info_keyword(s: &str) -> bool {
    matches!(
        s,
        "depth"
            | "seldepth"
            | "multipv"
            | "score"
            | "lowerbound"
            | "upperbound"
            | "nodes"
            | "nps"
            | "time"
            | "pv"
            | "currmove"
            | "currmovenumber"
            | "hashfull"
            | "tbhits"
            | "string"
    )
}

/// Builds [`EngineInfo`] values, mostly for feeding parsers in tests.
#[derive(Default)]
pub struct InfoBuilder {
    info: EngineInfo,
}

impl InfoBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(mut self, d: u32) -> Self {
        self.info.depth = Some(d);
        self
    }

    pub fn multipv(mut self, index: u32) -> Self {
        self.info.multipv = Some(index);
        self
    }

    pub fn score_cp(mut self, cp: i32) -> Self {
        self.info.score = Some(Score::Cp(cp));
        self
    }

    pub fn score_mate(mut self, moves: i32) -> Self {
        self.info.score = Some(Score::Mate(moves));
        self
    }

    pub fn bound(mut self, bound: Bound) -> Self {
        self.info.bound = bound;
        self
    }

    pub fn pv<S: Into<String>>(mut self, moves: impl IntoIterator<Item = S>) -> Self {
        self.info.pv = moves.into_iter().map(Into::into).collect();
        self
    }

    pub fn build(self) -> EngineInfo {
        self.info
    }
}

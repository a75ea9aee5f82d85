//! One analysis session: opening lookup, candidate sources, tree building and
//! report assembly.

use chess_analysis::{
    CandidateSource, ChainedCandidates, DiagramRenderer, EngineEvaluator, EvaluationPlans,
    NoDiagrams, Position, PositionError, Report, ReportAssembler, SvgDiagrams, VariationBuilder,
    VariationTree,
};
use chess_explorer::{book_from_openings, BookCandidates, ExplorerError, MastersExplorer};
use chess_openings::{builtin_dictionary, DatabaseError, MoveBook, Opening, OpeningDictionary};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::config::SessionConfig;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Unknown opening '{name}'. Available openings: {}", available.join(", "))]
    UnknownOpening {
        name: String,
        available: Vec<String>,
    },
    #[error("Failed to load openings: {0}")]
    Openings(#[from] DatabaseError),
    #[error("Failed to load move book {}: {source}", path.display())]
    Book {
        path: PathBuf,
        source: DatabaseError,
    },
    #[error("Opening line is not playable: {0}")]
    Line(#[from] PositionError),
    #[error("Invalid analysis settings: {0}")]
    Settings(#[from] chess_analysis::ConfigError),
    #[error("Explorer setup failed: {0}")]
    Explorer(#[from] ExplorerError),
}

/// Everything needed to analyze openings, minus the engine.
pub struct Session {
    config: SessionConfig,
    openings: OpeningDictionary,
    progress: bool,
}

impl Session {
    /// Build the opening dictionary: the built-in openings, overridden by the
    /// configured openings file if there is one.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Openings`] if the openings file cannot be loaded.
    pub fn new(config: SessionConfig) -> Result<Self, SessionError> {
        let mut openings = builtin_dictionary();
        if let Some(path) = &config.openings_file {
            let extra = OpeningDictionary::load(path)?;
            info!(path = %path.display(), count = extra.len(), "loaded openings file");
            openings.merge(extra);
        }
        Ok(Self {
            config,
            openings,
            progress: false,
        })
    }

    /// Show a spinner on stderr while the tree is built.
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn openings(&self) -> &OpeningDictionary {
        &self.openings
    }

    /// Look up an opening by name, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::UnknownOpening`] listing every known name.
    pub fn opening(&self, name: &str) -> Result<&Opening, SessionError> {
        self.openings
            .get(name)
            .ok_or_else(|| SessionError::UnknownOpening {
                name: name.trim().to_string(),
                available: self.openings.names().into_iter().map(String::from).collect(),
            })
    }

    /// The explorer (when enabled), then the configured move book, then the
    /// offline book of all known opening lines.
    ///
    /// # Errors
    ///
    /// Fails if the move book cannot be loaded, an opening line is illegal or
    /// the HTTP client cannot be built.
    pub fn candidate_source(&self) -> Result<ChainedCandidates, SessionError> {
        let mut sources: Vec<Box<dyn CandidateSource>> = Vec::new();
        if self.config.explorer.enabled {
            sources.push(Box::new(MastersExplorer::new(self.config.explorer.clone())?));
        }
        if let Some(path) = &self.config.book_file {
            let book = MoveBook::load(path).map_err(|source| SessionError::Book {
                path: path.clone(),
                source,
            })?;
            info!(path = %path.display(), positions = book.len(), "loaded move book");
            sources.push(Box::new(BookCandidates::new(book)));
        }
        let book = book_from_openings(self.openings.all())?;
        sources.push(Box::new(BookCandidates::new(book)));
        Ok(ChainedCandidates::new(sources))
    }

    /// Explore the position at the end of `opening`.
    ///
    /// # Errors
    ///
    /// Fails on an illegal opening line, invalid settings or candidate
    /// source setup. Engine failures during the build end up in the report.
    pub fn explore(
        &self,
        opening: &Opening,
        engine: &dyn EngineEvaluator,
    ) -> Result<VariationTree, SessionError> {
        let root = Position::from_san_line(&opening.moves)?;
        let candidates = self.candidate_source()?;
        let builder = VariationBuilder::new(engine, &candidates, self.config.analysis.clone())?;

        info!(opening = %opening.name, fen = %root.fen(), "analyzing opening");
        let spinner = self.spinner(&opening.name);
        let tree = builder.build(root);
        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }
        Ok(tree)
    }

    /// Explore `opening` and assemble its report, writing diagrams if enabled.
    ///
    /// # Errors
    ///
    /// See [`Session::explore`].
    pub fn analyze(
        &self,
        opening: &Opening,
        engine: &dyn EngineEvaluator,
    ) -> Result<Report, SessionError> {
        let tree = self.explore(opening, engine)?;

        let output = &self.config.output;
        let renderer: Box<dyn DiagramRenderer> = if output.diagrams {
            Box::new(SvgDiagrams::new(&output.diagram_dir, output.board_size))
        } else {
            Box::new(NoDiagrams)
        };
        let explanations = EvaluationPlans::default();

        Ok(ReportAssembler::new(renderer.as_ref(), &explanations)
            .assemble(&tree, Some(&opening.name)))
    }

    fn spinner(&self, name: &str) -> Option<ProgressBar> {
        if !self.progress {
            return None;
        }
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner} {msg} [{elapsed}]") {
            spinner.set_style(style);
        }
        spinner.set_message(format!("Exploring variations after the {name}"));
        spinner.enable_steady_tick(Duration::from_millis(120));
        Some(spinner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_analysis::{EngineError, EngineLine, Evaluation, LeafReason, Score, Side};

    /// Every legal move scores 0; lines come in UCI order.
    struct FlatEngine;

    impl EngineEvaluator for FlatEngine {
        fn evaluate(
            &self,
            position: &Position,
            lines: usize,
            _depth: u32,
        ) -> Result<Vec<EngineLine>, EngineError> {
            let side: Side = position.side_to_move();
            Ok(position
                .legal_moves()
                .into_iter()
                .take(lines)
                .map(|mv| EngineLine {
                    pv: vec![mv.uci().to_string()],
                    mv,
                    evaluation: Evaluation::new(Score::Centipawns(0), side),
                })
                .collect())
        }
    }

    fn offline_config() -> SessionConfig {
        let mut config = SessionConfig::default();
        config.explorer.enabled = false;
        config.output.diagrams = false;
        config.analysis.max_depth = 2;
        config.analysis.max_branching = 2;
        config
    }

    #[test]
    fn test_opening_lookup_ignores_case() {
        let session = Session::new(offline_config()).unwrap();
        let opening = session.opening("  CATALAN ").unwrap();
        assert_eq!(opening.name, "Catalan");
    }

    #[test]
    fn test_unknown_opening_lists_available_names() {
        let session = Session::new(offline_config()).unwrap();
        let err = session.opening("Bongcloud").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Unknown opening 'Bongcloud'"));
        assert!(message.contains("Ruy Lopez"));
    }

    #[test]
    fn test_openings_file_is_merged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("openings.json");
        std::fs::write(
            &path,
            r#"[{"eco": "A00", "name": "Grob Attack", "moves": ["g4", "d5"]}]"#,
        )
        .unwrap();

        let mut config = offline_config();
        config.openings_file = Some(path);
        let session = Session::new(config).unwrap();

        assert!(session.opening("grob attack").is_ok());
        assert!(session.opening("Catalan").is_ok());
    }

    #[test]
    fn test_missing_openings_file_is_an_error() {
        let mut config = offline_config();
        config.openings_file = Some(PathBuf::from("/nonexistent/openings.json"));
        assert!(matches!(Session::new(config), Err(SessionError::Openings(_))));
    }

    #[test]
    fn test_move_book_file_adds_candidates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.json");
        let start = Position::startpos();
        std::fs::write(
            &path,
            format!(r#"{{"{}": [{{"san": "b3", "weight": 12}}]}}"#, start.key()),
        )
        .unwrap();

        let mut config = offline_config();
        config.book_file = Some(path);
        let session = Session::new(config).unwrap();

        let candidates = session.candidate_source().unwrap().candidates(&start).unwrap();
        assert_eq!(candidates[0].mv.san(), "b3");
        assert!(candidates.iter().any(|c| c.mv.san() == "d4"));
    }

    #[test]
    fn test_missing_move_book_is_an_error() {
        let mut config = offline_config();
        config.book_file = Some(PathBuf::from("/nonexistent/book.json"));
        let session = Session::new(config).unwrap();
        let err = session.candidate_source().err().unwrap();
        assert!(matches!(err, SessionError::Book { .. }));
        assert!(err.to_string().contains("/nonexistent/book.json"));
    }

    #[test]
    fn test_illegal_opening_line_is_rejected() {
        let session = Session::new(offline_config()).unwrap();
        let broken = Opening::new("A00", "Broken", vec!["e4", "e4"]);
        let err = session.explore(&broken, &FlatEngine).unwrap_err();
        assert!(matches!(err, SessionError::Line(_)));
    }

    #[test]
    fn test_invalid_settings_are_rejected() {
        let mut config = offline_config();
        config.analysis.max_branching = 0;
        let session = Session::new(config).unwrap();
        let opening = session.opening("Catalan").unwrap().clone();
        assert!(matches!(
            session.explore(&opening, &FlatEngine),
            Err(SessionError::Settings(_))
        ));
    }

    #[test]
    fn test_analyze_catalan_offline() {
        let session = Session::new(offline_config()).unwrap();
        let opening = session.opening("Catalan").unwrap().clone();

        let report = session.analyze(&opening, &FlatEngine).unwrap();

        assert_eq!(report.opening.as_deref(), Some("Catalan"));
        assert_eq!(report.side_to_move, Side::White);
        assert!(!report.variations.is_empty());
        assert!(report.incomplete.is_empty());
        assert!(report.root_diagram.is_none());
        for variation in &report.variations {
            assert!(variation.moves.len() <= 2);
            assert!(!matches!(variation.ending, LeafReason::EvaluationUnavailable(_)));
        }
        assert!(report.variations[0].notation().starts_with("10. "));
    }

    #[test]
    fn test_analyze_writes_diagrams() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = offline_config();
        config.output.diagrams = true;
        config.output.diagram_dir = dir.path().join("boards");
        config.analysis.max_depth = 1;
        let session = Session::new(config).unwrap();
        let opening = session.opening("Catalan").unwrap().clone();

        let report = session.analyze(&opening, &FlatEngine).unwrap();

        let root = report.root_diagram.clone().unwrap();
        assert_eq!(root, dir.path().join("boards").join("opening_line_position.svg"));
        assert!(root.exists());
        let first = report.variations[0].diagram.clone().unwrap();
        assert!(first.ends_with("variation_1_final.svg"));
        assert!(first.exists());
    }
}

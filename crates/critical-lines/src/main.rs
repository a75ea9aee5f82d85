//! critical-lines - finds the moves that matter after a known opening line.
//!
//! Plays out the line of a named opening, then lets a UCI engine and the
//! opening explorer decide which continuations are critical.

mod config;
mod session;

use anyhow::{bail, Context};
use chess_analysis::{CandidatePolicy, EnginePool};
use chess_openings::{Opening, OpeningDictionary};
use clap::{Args, Parser, Subcommand, ValueEnum};
use config::{OutputFormat, SessionConfig};
use session::Session;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "critical-lines")]
#[command(about = "Explore the critical variations after a chess opening", version)]
struct Cli {
    /// Configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze the position at the end of an opening line
    Analyze(AnalyzeArgs),
    /// List known openings, optionally filtered by name or ECO code
    Openings {
        /// Part of the opening name
        query: Option<String>,

        /// ECO code prefix, e.g. `C6` or `E04`
        #[arg(long)]
        eco: Option<String>,
    },
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// Opening name; asked for on stdin when omitted
    opening: Option<String>,

    /// Centipawn loss above which a move is critical
    #[arg(long)]
    threshold: Option<u32>,

    /// Plies to explore after the opening line
    #[arg(long)]
    depth: Option<u32>,

    /// Branches per position, main line included
    #[arg(long)]
    branching: Option<usize>,

    /// Engine lines per position
    #[arg(long)]
    lines: Option<usize>,

    /// Engine search depth
    #[arg(long)]
    search_depth: Option<u32>,

    /// Where alternative moves come from
    #[arg(long, value_enum)]
    policy: Option<PolicyArg>,

    /// Explore sibling branches in parallel
    #[arg(long)]
    parallel: bool,

    /// Engine executable
    #[arg(long)]
    engine: Option<String>,

    /// Number of engine processes
    #[arg(long)]
    engines: Option<usize>,

    /// Skip the opening explorer and use the offline book only
    #[arg(long)]
    offline: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Do not write SVG diagrams
    #[arg(long)]
    no_diagrams: bool,

    /// Directory for SVG diagrams
    #[arg(long)]
    diagram_dir: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum PolicyArg {
    Explorer,
    Engine,
    Combined,
}

impl From<PolicyArg> for CandidatePolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Explorer => CandidatePolicy::Explorer,
            PolicyArg::Engine => CandidatePolicy::Engine,
            PolicyArg::Combined => CandidatePolicy::Combined,
        }
    }
}

impl AnalyzeArgs {
    /// Command line flags win over the configuration file.
    fn apply(&self, config: &mut SessionConfig) {
        let analysis = &mut config.analysis;
        if let Some(threshold) = self.threshold {
            analysis.threshold_cp = threshold;
        }
        if let Some(depth) = self.depth {
            analysis.max_depth = depth;
        }
        if let Some(branching) = self.branching {
            analysis.max_branching = branching;
        }
        if let Some(lines) = self.lines {
            analysis.line_count = lines;
        }
        if let Some(search_depth) = self.search_depth {
            analysis.search_depth = search_depth;
        }
        if let Some(policy) = self.policy {
            analysis.candidate_policy = policy.into();
        }
        if self.parallel {
            analysis.parallel = true;
        }

        if let Some(engine) = &self.engine {
            config.engine.path = engine.clone();
        }
        if let Some(engines) = self.engines {
            config.engine.pool_size = engines;
        }
        if self.offline {
            config.explorer.enabled = false;
        }

        if self.json {
            config.output.format = OutputFormat::Json;
        }
        if self.no_diagrams {
            config.output.diagrams = false;
        }
        if let Some(dir) = &self.diagram_dir {
            config.output.diagram_dir = dir.clone();
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config_path = cli.config.unwrap_or_else(SessionConfig::config_path);
    let mut config = SessionConfig::load(&config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;

    match cli.command {
        Commands::Openings { query, eco } => {
            let session = Session::new(config)?;
            let openings = select_openings(session.openings(), query.as_deref(), eco.as_deref());
            list_openings(&openings);
        }
        Commands::Analyze(args) => {
            args.apply(&mut config);
            let session = Session::new(config)?.with_progress(true);
            let name = match &args.opening {
                Some(name) => name.clone(),
                None => prompt_opening(&session)?,
            };
            analyze(&session, &name)?;
        }
    }

    Ok(())
}

fn analyze(session: &Session, name: &str) -> anyhow::Result<()> {
    let opening = session.opening(name)?;
    let config = session.config();

    let engine = EnginePool::start(config.engine.clone())
        .with_context(|| format!("failed to start engine '{}'", config.engine.path))?;
    if let Some(engine_name) = engine.engine_name() {
        tracing::info!(engine = %engine_name, "engine ready");
    }

    let report = session.analyze(opening, &engine)?;

    match config.output.format {
        OutputFormat::Text => println!("{report}"),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}

fn select_openings<'a>(
    dictionary: &'a OpeningDictionary,
    query: Option<&str>,
    eco: Option<&str>,
) -> Vec<&'a Opening> {
    let mut openings = match query {
        Some(query) => dictionary.search(query),
        None => dictionary.all().iter().collect(),
    };
    if let Some(prefix) = eco {
        let prefix = prefix.trim().to_ascii_uppercase();
        let matching = dictionary.by_eco(&prefix);
        openings.retain(|opening| matching.iter().any(|m| std::ptr::eq(*m, *opening)));
    }
    openings
}

fn list_openings(openings: &[&Opening]) {
    if openings.is_empty() {
        println!("No openings match.");
        return;
    }
    for opening in openings {
        println!(
            "{:<4} {:<28} {} plies",
            opening.eco,
            opening.name,
            opening.plies()
        );
    }
}

fn prompt_opening(session: &Session) -> anyhow::Result<String> {
    println!("Available openings: {}", session.openings().names().join(", "));
    print!("Enter the name of the opening: ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let name = line.trim();
    if name.is_empty() {
        bail!("no opening given");
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze_args(argv: &[&str]) -> AnalyzeArgs {
        let cli = Cli::try_parse_from(argv.iter().copied()).unwrap();
        match cli.command {
            Commands::Analyze(args) => args,
            Commands::Openings { .. } => panic!("expected analyze"),
        }
    }

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags_override_config() {
        let args = analyze_args(&[
            "critical-lines",
            "analyze",
            "Catalan",
            "--threshold",
            "80",
            "--depth",
            "3",
            "--branching",
            "2",
            "--policy",
            "combined",
            "--parallel",
            "--engine",
            "/opt/sf",
            "--offline",
            "--json",
            "--no-diagrams",
        ]);
        assert_eq!(args.opening.as_deref(), Some("Catalan"));

        let mut config = SessionConfig::default();
        args.apply(&mut config);

        assert_eq!(config.analysis.threshold_cp, 80);
        assert_eq!(config.analysis.max_depth, 3);
        assert_eq!(config.analysis.max_branching, 2);
        assert_eq!(config.analysis.candidate_policy, CandidatePolicy::Combined);
        assert!(config.analysis.parallel);
        assert_eq!(config.engine.path, "/opt/sf");
        assert!(!config.explorer.enabled);
        assert_eq!(config.output.format, OutputFormat::Json);
        assert!(!config.output.diagrams);
    }

    #[test]
    fn test_no_flags_keep_config() {
        let args = analyze_args(&["critical-lines", "analyze"]);
        assert!(args.opening.is_none());

        let mut config: SessionConfig =
            toml::from_str("[analysis]\nthreshold_cp = 25\nparallel = true\n").unwrap();
        let before = config.clone();
        args.apply(&mut config);

        assert_eq!(config, before);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "critical-lines",
            "openings",
            "indian",
            "--verbose",
            "--config",
            "other.toml",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("other.toml")));
        assert!(matches!(cli.command, Commands::Openings { query: Some(ref q), .. } if q == "indian"));
    }

    #[test]
    fn test_openings_filtered_by_eco() {
        let cli = Cli::try_parse_from(["critical-lines", "openings", "--eco", "c8"]).unwrap();
        let Commands::Openings { query, eco } = cli.command else {
            panic!("expected openings");
        };
        assert!(query.is_none());

        let dictionary = chess_openings::builtin_dictionary();
        let openings = select_openings(&dictionary, query.as_deref(), eco.as_deref());
        assert!(!openings.is_empty());
        assert!(openings.iter().all(|o| o.eco.starts_with("C8")));
        assert!(openings.iter().any(|o| o.name == "Ruy Lopez"));
    }

    #[test]
    fn test_openings_name_and_eco_filters_combine() {
        let dictionary = chess_openings::builtin_dictionary();
        let openings = select_openings(&dictionary, Some("ruy"), Some("E"));
        assert!(openings.is_empty());
        assert_eq!(select_openings(&dictionary, None, None).len(), dictionary.len());
    }

    #[test]
    fn test_unknown_policy_is_rejected() {
        assert!(Cli::try_parse_from(["critical-lines", "analyze", "--policy", "random"]).is_err());
    }
}

//! UCI engine processes as an [`EngineEvaluator`].
//!
//! A [`UciSession`] owns one engine process. Its stdout is drained by a
//! reader thread so every read can carry a deadline. [`EnginePool`] hands
//! sessions out one query at a time and replaces sessions that failed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};
use uci::{EngineInfo, EngineMessage, GoOptions, GuiCommand};

use crate::engine::{EngineError, EngineEvaluator, EngineLine};
use crate::evaluation::{Score, ScorePerspective};
use crate::position::Position;

/// Maximum number of lines to read before giving up on a UCI response.
pub const MAX_UCI_LINES: usize = 100_000;

/// How the engine process is started and configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UciEngineConfig {
    /// Engine executable, either a path or a bare name looked up in `PATH`.
    pub path: String,
    /// Extra command line arguments for the engine.
    pub args: Vec<String>,
    /// Value for the `Threads` option.
    pub threads: u32,
    /// Value for the `Hash` option, in megabytes.
    pub hash_mb: u32,
    /// Maximum number of engine processes.
    pub pool_size: usize,
    /// Per-query time limit. `None` waits forever.
    pub timeout_ms: Option<u64>,
    /// How the engine reports scores.
    pub score_perspective: ScorePerspective,
    /// Send `ucinewgame` before every query so results do not depend on
    /// earlier searches.
    pub fresh_search: bool,
}

impl Default for UciEngineConfig {
    fn default() -> Self {
        Self {
            path: "stockfish".to_string(),
            args: Vec::new(),
            threads: 1,
            hash_mb: 64,
            pool_size: 1,
            timeout_ms: Some(60_000),
            score_perspective: ScorePerspective::SideToMove,
            fresh_search: true,
        }
    }
}

impl UciEngineConfig {
    pub fn command(&self) -> EngineCommand {
        EngineCommand {
            program: self.path.clone(),
            args: self.args.clone(),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

/// An engine executable and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl EngineCommand {
    /// Locate the executable.
    ///
    /// Programs containing a path separator must exist as given; bare names
    /// are searched in `PATH`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] if no executable can be found.
    pub fn resolve(&self) -> Result<PathBuf, EngineError> {
        let program = Path::new(&self.program);
        if program.components().count() > 1 {
            return if program.exists() {
                Ok(program.to_path_buf())
            } else {
                Err(EngineError::NotFound(self.program.clone()))
            };
        }

        std::env::var_os("PATH")
            .into_iter()
            .flat_map(|paths| std::env::split_paths(&paths).collect::<Vec<_>>())
            .map(|dir| dir.join(&self.program))
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| EngineError::NotFound(self.program.clone()))
    }
}

/// A running UCI engine.
pub struct UciSession {
    /// The engine process handle.
    process: Child,
    /// Writer for sending commands to the engine.
    stdin: ChildStdin,
    /// Lines read from the engine's stdout by the reader thread.
    lines: Receiver<String>,
    /// The engine's name (reported via UCI id).
    name: String,
    /// Currently configured `MultiPV` value.
    multipv: usize,
    timeout: Option<Duration>,
    perspective: ScorePerspective,
    fresh_search: bool,
}

impl UciSession {
    /// Start an engine and complete the UCI handshake.
    ///
    /// # Errors
    ///
    /// - `EngineError::NotFound` if the engine executable cannot be located
    /// - `EngineError::SpawnError` if the engine process fails to start
    /// - `EngineError::InitFailed` if UCI initialization fails
    /// - `EngineError::Timeout` if the engine does not answer the handshake
    pub fn spawn(config: &UciEngineConfig) -> Result<Self, EngineError> {
        let command = config.command();
        let program = command.resolve()?;
        debug!(program = %program.display(), args = ?command.args, "spawning engine");

        let mut process = Command::new(&program)
            .args(&command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        let stdin = process.stdin.take().ok_or(EngineError::InitFailed)?;
        let stdout = process.stdout.take().ok_or(EngineError::InitFailed)?;
        let lines = spawn_reader(stdout)?;

        let mut session = Self {
            process,
            stdin,
            lines,
            name: String::new(),
            multipv: 1,
            timeout: config.timeout(),
            perspective: config.score_perspective,
            fresh_search: config.fresh_search,
        };

        session.init_uci(config).map_err(|e| match e {
            EngineError::Closed => EngineError::InitFailed,
            other => other,
        })?;

        Ok(session)
    }

    /// Initialize the UCI protocol with the engine.
    fn init_uci(&mut self, config: &UciEngineConfig) -> Result<(), EngineError> {
        self.send(&GuiCommand::Uci)?;

        let deadline = self.deadline();
        let mut name = None;
        let mut lines_read = 0;
        loop {
            if lines_read > MAX_UCI_LINES {
                return Err(EngineError::InitFailed);
            }
            lines_read += 1;
            match EngineMessage::parse(&self.read_line(deadline)?) {
                Ok(EngineMessage::Id { name: Some(n), .. }) => name = Some(n),
                Ok(EngineMessage::UciOk) => break,
                _ => {}
            }
        }
        self.name = name.unwrap_or_else(|| "Unknown Engine".to_string());

        if config.threads > 0 {
            self.send(&GuiCommand::set_option("Threads", config.threads))?;
        }
        if config.hash_mb > 0 {
            self.send(&GuiCommand::set_option("Hash", config.hash_mb))?;
        }
        self.send(&GuiCommand::set_option("MultiPV", self.multipv))?;
        self.sync()?;

        info!(engine = %self.name, "engine ready");
        Ok(())
    }

    /// Returns the engine's name as reported via UCI protocol.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tell the engine a new game starts and wait until it is ready.
    pub fn new_game(&mut self) -> Result<(), EngineError> {
        self.send(&GuiCommand::UciNewGame)?;
        self.sync()
    }

    /// Search `position` to `depth` and return up to `lines` lines, best first.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Timeout` if no `bestmove` arrives in time and
    /// `EngineError::InvalidResponse` for output that does not describe
    /// legal moves of `position`.
    pub fn analyze(
        &mut self,
        position: &Position,
        lines: usize,
        depth: u32,
    ) -> Result<Vec<EngineLine>, EngineError> {
        let lines = lines.max(1);
        if self.fresh_search {
            self.new_game()?;
        }
        if lines != self.multipv {
            self.send(&GuiCommand::set_option("MultiPV", lines))?;
            self.multipv = lines;
        }
        self.send(&GuiCommand::position_fen(position.fen()))?;
        self.send(&GuiCommand::Go(GoOptions::depth(depth)))?;

        let deadline = self.deadline();
        let mut collector = LineCollector::new(lines);
        for _ in 0..MAX_UCI_LINES {
            let line = self.read_line(deadline)?;
            match EngineMessage::parse(&line) {
                Ok(EngineMessage::Info(info)) => collector.push(info),
                Ok(EngineMessage::BestMove { mv, .. }) => {
                    return collector.finish(position, mv.as_deref(), self.perspective);
                }
                Ok(_) => {}
                Err(e) => return Err(EngineError::InvalidResponse(e.to_string())),
            }
        }

        Err(EngineError::InvalidResponse(format!(
            "no bestmove after {} lines",
            MAX_UCI_LINES
        )))
    }

    /// Send `isready` and wait for `readyok`.
    fn sync(&mut self) -> Result<(), EngineError> {
        self.send(&GuiCommand::IsReady)?;
        let deadline = self.deadline();
        for _ in 0..MAX_UCI_LINES {
            if EngineMessage::parse(&self.read_line(deadline)?).ok() == Some(EngineMessage::ReadyOk) {
                return Ok(());
            }
        }
        Err(EngineError::InvalidResponse("no readyok".to_string()))
    }

    /// Send a command to the engine.
    fn send(&mut self, command: &GuiCommand) -> Result<(), EngineError> {
        let line = command.to_uci();
        debug!(cmd = %line, "engine <");
        writeln!(self.stdin, "{}", line)?;
        self.stdin.flush()?;
        Ok(())
    }

    /// Read one line, waiting no longer than `deadline`.
    fn read_line(&mut self, deadline: Option<Instant>) -> Result<String, EngineError> {
        let line = match deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                self.lines.recv_timeout(remaining).map_err(|e| match e {
                    RecvTimeoutError::Timeout => {
                        EngineError::Timeout(self.timeout.unwrap_or_default())
                    }
                    RecvTimeoutError::Disconnected => EngineError::Closed,
                })?
            }
            None => self.lines.recv().map_err(|_| EngineError::Closed)?,
        };
        trace!(line = %line, "engine >");
        Ok(line)
    }

    fn deadline(&self) -> Option<Instant> {
        self.timeout.map(|timeout| Instant::now() + timeout)
    }
}

impl Drop for UciSession {
    fn drop(&mut self) {
        let _ = self.send(&GuiCommand::Quit);
        for _ in 0..20 {
            match self.process.try_wait() {
                Ok(Some(_)) => return,
                Ok(None) => thread::sleep(Duration::from_millis(10)),
                Err(_) => break,
            }
        }
        let _ = self.process.kill();
        let _ = self.process.wait();
    }
}

fn spawn_reader(stdout: ChildStdout) -> Result<Receiver<String>, EngineError> {
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("uci-reader".to_string())
        .spawn(move || {
            let mut reader = BufReader::new(stdout);
            let mut buffer = String::new();
            loop {
                buffer.clear();
                match reader.read_line(&mut buffer) {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {
                        if tx.send(buffer.trim().to_string()).is_err() {
                            break;
                        }
                    }
                }
            }
        })?;
    Ok(rx)
}

/// Keeps the latest exact line per `multipv` index until `bestmove` arrives.
pub(crate) struct LineCollector {
    wanted: usize,
    lines: BTreeMap<u32, EngineInfo>,
}

impl LineCollector {
    pub(crate) fn new(wanted: usize) -> Self {
        Self {
            wanted,
            lines: BTreeMap::new(),
        }
    }

    pub(crate) fn push(&mut self, info: EngineInfo) {
        if !info.is_complete_line() {
            return;
        }
        let index = info.line_index();
        if index == 0 || index as usize > self.wanted {
            return;
        }
        self.lines.insert(index, info);
    }

    pub(crate) fn finish(
        self,
        position: &Position,
        bestmove: Option<&str>,
        perspective: ScorePerspective,
    ) -> Result<Vec<EngineLine>, EngineError> {
        let Some(bestmove) = bestmove else {
            return Ok(Vec::new());
        };
        if self.lines.is_empty() {
            return Err(EngineError::InvalidResponse(format!(
                "bestmove {} without a scored line",
                bestmove
            )));
        }

        let mut result = Vec::with_capacity(self.lines.len());
        for info in self.lines.into_values() {
            let (Some(score), Some(first)) = (info.score, info.pv.first()) else {
                continue;
            };
            let mv = position
                .parse_uci(first)
                .map_err(|e| EngineError::InvalidResponse(e.to_string()))?;
            result.push(EngineLine {
                mv,
                evaluation: perspective.attribute(Score::from_uci(score), position),
                pv: info.pv,
            });
        }

        if result.first().map(|line| line.mv.uci()) != Some(bestmove) {
            debug!(bestmove, fen = %position.fen(), "bestmove differs from the first reported line");
        }
        Ok(result)
    }
}

struct PoolState {
    idle: Vec<UciSession>,
    live: usize,
}

/// A bounded set of engine sessions shared between threads.
///
/// Each query has exclusive use of one session, so commands of concurrent
/// queries never interleave on one process.
pub struct EnginePool {
    config: UciEngineConfig,
    size: usize,
    state: Mutex<PoolState>,
    available: Condvar,
}

impl EnginePool {
    /// Create a pool that spawns sessions on first use.
    pub fn new(config: UciEngineConfig) -> Self {
        let size = config.pool_size.max(1);
        Self {
            config,
            size,
            state: Mutex::new(PoolState {
                idle: Vec::new(),
                live: 0,
            }),
            available: Condvar::new(),
        }
    }

    /// Create a pool and start one session right away, so a missing or broken
    /// engine is reported before any analysis begins.
    ///
    /// # Errors
    ///
    /// Returns the error of the first session start.
    pub fn start(config: UciEngineConfig) -> Result<Self, EngineError> {
        let pool = Self::new(config);
        let session = UciSession::spawn(&pool.config)?;
        info!(engine = %session.name(), size = pool.size, "engine pool started");
        {
            let mut state = pool.lock();
            state.idle.push(session);
            state.live = 1;
        }
        Ok(pool)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Name of an idle engine, if one is running.
    pub fn engine_name(&self) -> Option<String> {
        self.lock().idle.first().map(|s| s.name().to_string())
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn checkout(&self) -> Result<SessionGuard<'_>, EngineError> {
        let mut state = self.lock();
        loop {
            if let Some(session) = state.idle.pop() {
                return Ok(SessionGuard::new(self, session));
            }
            if state.live < self.size {
                state.live += 1;
                drop(state);
                return match UciSession::spawn(&self.config) {
                    Ok(session) => Ok(SessionGuard::new(self, session)),
                    Err(e) => {
                        self.lock().live -= 1;
                        self.available.notify_one();
                        Err(e)
                    }
                };
            }
            state = self
                .available
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

impl EngineEvaluator for EnginePool {
    fn evaluate(
        &self,
        position: &Position,
        lines: usize,
        depth: u32,
    ) -> Result<Vec<EngineLine>, EngineError> {
        let mut guard = self.checkout()?;
        let result = guard.session()?.analyze(position, lines, depth);
        if let Err(err) = &result {
            warn!(%err, fen = %position.fen(), "discarding engine session");
            guard.discard();
        }
        result
    }
}

/// Exclusive use of one pooled session; returns it on drop.
struct SessionGuard<'a> {
    pool: &'a EnginePool,
    session: Option<UciSession>,
    healthy: bool,
}

impl<'a> SessionGuard<'a> {
    fn new(pool: &'a EnginePool, session: UciSession) -> Self {
        Self {
            pool,
            session: Some(session),
            healthy: true,
        }
    }

    fn session(&mut self) -> Result<&mut UciSession, EngineError> {
        self.session.as_mut().ok_or(EngineError::Closed)
    }

    fn discard(&mut self) {
        self.healthy = false;
    }
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        if self.healthy {
            self.pool.lock().idle.push(session);
        } else {
            self.pool.lock().live -= 1;
            drop(session);
        }
        self.pool.available.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::Score;
    use crate::position::Side;
    use uci::{Bound, InfoBuilder};

    #[test]
    fn test_collector_keeps_latest_line_per_index() {
        let start = Position::startpos();
        let mut collector = LineCollector::new(2);
        collector.push(InfoBuilder::new().depth(1).multipv(1).score_cp(10).pv(["d2d4"]).build());
        collector.push(InfoBuilder::new().depth(1).multipv(2).score_cp(5).pv(["g1f3"]).build());
        collector.push(InfoBuilder::new().depth(2).multipv(1).score_cp(30).pv(["e2e4", "e7e5"]).build());
        collector.push(InfoBuilder::new().depth(2).multipv(2).score_cp(20).pv(["d2d4"]).build());

        let lines = collector
            .finish(&start, Some("e2e4"), ScorePerspective::SideToMove)
            .unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].mv.uci(), "e2e4");
        assert_eq!(lines[0].evaluation.score(), Score::Centipawns(30));
        assert_eq!(lines[0].pv, vec!["e2e4", "e7e5"]);
        assert_eq!(lines[1].mv.uci(), "d2d4");
    }

    #[test]
    fn test_collector_ignores_bounds_and_extra_lines() {
        let start = Position::startpos();
        let mut collector = LineCollector::new(1);
        collector.push(InfoBuilder::new().multipv(1).score_cp(40).pv(["e2e4"]).build());
        collector.push(
            InfoBuilder::new()
                .multipv(1)
                .score_cp(90)
                .bound(Bound::Lower)
                .pv(["g1f3"])
                .build(),
        );
        collector.push(InfoBuilder::new().multipv(2).score_cp(10).pv(["d2d4"]).build());

        let lines = collector
            .finish(&start, Some("e2e4"), ScorePerspective::SideToMove)
            .unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].evaluation.score(), Score::Centipawns(40));
    }

    #[test]
    fn test_collector_bestmove_none_is_terminal() {
        let start = Position::startpos();
        let collector = LineCollector::new(3);
        let lines = collector
            .finish(&start, None, ScorePerspective::SideToMove)
            .unwrap();
        assert!(lines.is_empty());
    }

    #[test]
    fn test_collector_rejects_illegal_pv() {
        let start = Position::startpos();
        let mut collector = LineCollector::new(1);
        collector.push(InfoBuilder::new().multipv(1).score_cp(0).pv(["e2e5"]).build());
        let err = collector
            .finish(&start, Some("e2e5"), ScorePerspective::SideToMove)
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidResponse(_)));
    }

    #[test]
    fn test_collector_applies_perspective() {
        let start = Position::startpos();
        let black = start.play(&start.parse_uci("e2e4").unwrap()).unwrap();
        let mut collector = LineCollector::new(1);
        collector.push(InfoBuilder::new().multipv(1).score_mate(-2).pv(["e7e5"]).build());

        let lines = collector
            .finish(&black, Some("e7e5"), ScorePerspective::SideToMove)
            .unwrap();
        assert_eq!(lines[0].evaluation.perspective(), Side::Black);
        assert_eq!(lines[0].evaluation.score(), Score::MatedIn(2));
    }

    #[test]
    fn test_collector_bestmove_without_lines() {
        let start = Position::startpos();
        let err = LineCollector::new(1)
            .finish(&start, Some("e2e4"), ScorePerspective::SideToMove)
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidResponse(_)));
    }

    #[test]
    fn test_engine_not_found() {
        let config = UciEngineConfig {
            path: "/nonexistent/path/to/engine".to_string(),
            ..UciEngineConfig::default()
        };
        let result = UciSession::spawn(&config);
        assert!(matches!(result, Err(EngineError::NotFound(_))));

        let command = EngineCommand {
            program: "definitely-not-an-installed-engine".to_string(),
            args: Vec::new(),
        };
        assert!(matches!(command.resolve(), Err(EngineError::NotFound(_))));
    }

    #[test]
    fn test_config_defaults() {
        let config = UciEngineConfig::default();
        assert_eq!(config.path, "stockfish");
        assert_eq!(config.threads, 1);
        assert_eq!(config.pool_size, 1);
        assert_eq!(config.timeout(), Some(Duration::from_secs(60)));
        assert!(config.fresh_search);
    }

    #[cfg(unix)]
    mod process {
        use super::*;
        use std::fs;
        use tempfile::TempDir;

        const FAKE_ENGINE: &str = r#"
while read -r line; do
  case "$line" in
    uci) echo "id name FakeFish 1.0"; echo "option name Hash type spin default 16"; echo "uciok" ;;
    isready) echo "readyok" ;;
    go*)
      echo "info depth 1 multipv 1 score cp 20 pv e2e4 e7e5"
      echo "info depth 1 multipv 2 score cp 10 pv d2d4"
      echo "bestmove e2e4 ponder e7e5" ;;
    quit) exit 0 ;;
  esac
done
"#;

        const SILENT_SEARCH: &str = r#"
while read -r line; do
  case "$line" in
    uci) echo "id name Sleepy"; echo "uciok" ;;
    isready) echo "readyok" ;;
    quit) exit 0 ;;
  esac
done
"#;

        fn script_config(dir: &TempDir, body: &str, timeout_ms: u64) -> UciEngineConfig {
            let script = dir.path().join("engine.sh");
            fs::write(&script, body).unwrap();
            UciEngineConfig {
                path: "sh".to_string(),
                args: vec![script.display().to_string()],
                timeout_ms: Some(timeout_ms),
                ..UciEngineConfig::default()
            }
        }

        #[test]
        fn test_session_handshake_and_analysis() {
            let dir = TempDir::new().unwrap();
            let config = script_config(&dir, FAKE_ENGINE, 5_000);
            let mut session = UciSession::spawn(&config).unwrap();
            assert_eq!(session.name(), "FakeFish 1.0");

            let lines = session.analyze(&Position::startpos(), 2, 10).unwrap();
            assert_eq!(lines.len(), 2);
            assert_eq!(lines[0].mv.san(), "e4");
            assert_eq!(lines[0].evaluation.score(), Score::Centipawns(20));
            assert_eq!(lines[1].mv.san(), "d4");
        }

        #[test]
        fn test_pool_reuses_sessions() {
            let dir = TempDir::new().unwrap();
            let pool = EnginePool::start(script_config(&dir, FAKE_ENGINE, 5_000)).unwrap();
            assert_eq!(pool.engine_name().as_deref(), Some("FakeFish 1.0"));

            for _ in 0..3 {
                let lines = pool.evaluate(&Position::startpos(), 1, 8).unwrap();
                assert_eq!(lines[0].mv.uci(), "e2e4");
            }
            assert_eq!(pool.lock().live, 1);
        }

        #[test]
        fn test_search_timeout() {
            let dir = TempDir::new().unwrap();
            let pool = EnginePool::new(script_config(&dir, SILENT_SEARCH, 300));

            let err = pool.evaluate(&Position::startpos(), 1, 8).unwrap_err();
            assert!(matches!(err, EngineError::Timeout(_)));
            assert_eq!(pool.lock().live, 0);
            assert!(pool.lock().idle.is_empty());
        }
    }
}

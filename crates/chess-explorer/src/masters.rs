//! Lichess masters opening explorer client.

use chess_analysis::{CandidateError, CandidateMove, CandidateSource, Position};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors from the explorer service.
#[derive(Error, Debug)]
pub enum ExplorerError {
    /// The request could not be sent or the body could not be read.
    #[error("Explorer request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The service answered with a non-success status.
    #[error("Explorer returned HTTP {0}")]
    Status(u16),
    /// The body was not the expected JSON.
    #[error("Invalid explorer response: {0}")]
    Json(#[from] serde_json::Error),
}

fn default_enabled() -> bool {
    true
}

fn default_url() -> String {
    "https://explorer.lichess.ovh/masters".to_string()
}

fn default_top_moves() -> usize {
    3
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_user_agent() -> String {
    concat!("critical-lines/", env!("CARGO_PKG_VERSION")).to_string()
}

/// Explorer connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplorerConfig {
    /// Query the explorer at all. When off, only the offline book is used.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_url")]
    pub url: String,
    /// Personal API token, sent as a bearer token.
    #[serde(default)]
    pub token: Option<String>,
    /// Number of most played moves to propose.
    #[serde(default = "default_top_moves")]
    pub top_moves: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            url: default_url(),
            token: None,
            top_moves: default_top_moves(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

/// Body of an explorer answer. Only the fields used here are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ExplorerResponse {
    #[serde(default)]
    pub moves: Vec<ExplorerMove>,
}

/// One move row of an explorer answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ExplorerMove {
    #[serde(default)]
    pub uci: Option<String>,
    #[serde(default)]
    pub san: Option<String>,
    #[serde(default)]
    pub white: u64,
    #[serde(default)]
    pub draws: u64,
    #[serde(default)]
    pub black: u64,
}

impl ExplorerMove {
    /// Games in which the move was played.
    pub fn games(&self) -> u64 {
        self.white + self.draws + self.black
    }
}

/// The `top_moves` most played moves of `response` that are legal in
/// `position`, most played first.
pub fn candidates_from_response(
    position: &Position,
    response: &ExplorerResponse,
    top_moves: usize,
) -> Vec<CandidateMove> {
    let mut rows: Vec<&ExplorerMove> = response.moves.iter().collect();
    rows.sort_by(|a, b| b.games().cmp(&a.games()));

    rows.into_iter()
        .filter_map(|row| {
            let parsed = match (&row.uci, &row.san) {
                (Some(uci), _) => position.parse_uci(uci),
                (None, Some(san)) => position.parse_san(san),
                (None, None) => return None,
            };
            match parsed {
                Ok(mv) => Some(CandidateMove::new(mv, Some(row.games()))),
                Err(err) => {
                    debug!(error = %err, "skipping explorer move");
                    None
                }
            }
        })
        .take(top_moves)
        .collect()
}

/// Candidate source backed by the masters database.
pub struct MastersExplorer {
    client: reqwest::blocking::Client,
    config: ExplorerConfig,
    cache: Mutex<HashMap<String, Vec<CandidateMove>>>,
}

impl MastersExplorer {
    /// Build the HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`ExplorerError::Http`] if the client cannot be created.
    pub fn new(config: ExplorerConfig) -> Result<Self, ExplorerError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            config,
            cache: Mutex::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &ExplorerConfig {
        &self.config
    }

    /// Query the explorer for a FEN.
    ///
    /// # Errors
    ///
    /// Returns an [`ExplorerError`] for transport failures, non-success
    /// statuses and malformed bodies.
    pub fn fetch(&self, fen: &str) -> Result<ExplorerResponse, ExplorerError> {
        debug!(fen, url = %self.config.url, "querying explorer");
        let mut request = self.client.get(&self.config.url).query(&[("fen", fen)]);
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }

        let response = request.send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(ExplorerError::Status(status.as_u16()));
        }

        let body = response.text()?;
        Ok(serde_json::from_str(&body)?)
    }
}

impl CandidateSource for MastersExplorer {
    fn candidates(&self, position: &Position) -> Result<Vec<CandidateMove>, CandidateError> {
        let key = position.key();
        if let Some(cached) = self
            .cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&key)
        {
            return Ok(cached.clone());
        }

        let response = self.fetch(&position.fen()).map_err(|err| {
            warn!(error = %err, "explorer unavailable");
            match err {
                ExplorerError::Json(e) => CandidateError::InvalidResponse(e.to_string()),
                other => CandidateError::Unavailable(other.to_string()),
            }
        })?;

        let moves = candidates_from_response(position, &response, self.config.top_moves);
        self.cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, moves.clone());
        Ok(moves)
    }
}

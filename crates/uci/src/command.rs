//! Commands sent from the GUI to an engine.

/// Commands sent from GUI to engine.
#[derive(Debug, Clone, PartialEq)]
pub enum GuiCommand {
    /// Initialize UCI mode.
    Uci,
    /// Check if engine is ready.
    IsReady,
    /// Set an engine option.
    SetOption { name: String, value: String },
    /// Tell the engine the next search belongs to a different game.
    UciNewGame,
    /// Set up position.
    Position {
        fen: Option<String>,
        moves: Vec<String>,
    },
    /// Start calculating.
    Go(GoOptions),
    /// Stop calculating.
    Stop,
    /// Quit the engine.
    Quit,
}

/// Options for the `go` command.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GoOptions {
    /// Search for exactly this time in milliseconds.
    pub movetime: Option<u64>,
    /// Search to this depth.
    pub depth: Option<u32>,
    /// Search exactly this many nodes.
    pub nodes: Option<u64>,
    /// Search indefinitely until `stop`.
    pub infinite: bool,
}

impl GoOptions {
    /// Search to a fixed depth.
    pub fn depth(depth: u32) -> Self {
        Self {
            depth: Some(depth),
            ..Self::default()
        }
    }
}

impl GuiCommand {
    /// Shorthand for a `setoption` command.
    pub fn set_option(name: impl Into<String>, value: impl ToString) -> Self {
        GuiCommand::SetOption {
            name: name.into(),
            value: value.to_string(),
        }
    }

    /// Shorthand for `position fen <fen>` without moves.
    pub fn position_fen(fen: impl Into<String>) -> Self {
        GuiCommand::Position {
            fen: Some(fen.into()),
            moves: Vec::new(),
        }
    }

    /// Format as a UCI command line (without trailing newline).
    pub fn to_uci(&self) -> String {
        match self {
            GuiCommand::Uci => "uci".to_string(),
            GuiCommand::IsReady => "isready".to_string(),
            GuiCommand::SetOption { name, value } => {
                format!("setoption name {} value {}", name, value)
            }
            GuiCommand::UciNewGame => "ucinewgame".to_string(),
            GuiCommand::Position { fen, moves } => {
                let mut cmd = match fen {
                    Some(fen) => format!("position fen {}", fen),
                    None => "position startpos".to_string(),
                };
                if !moves.is_empty() {
                    cmd.push_str(" moves ");
                    cmd.push_str(&moves.join(" "));
                }
                cmd
            }
            GuiCommand::Go(opts) => {
                let mut parts = vec!["go".to_string()];
                if let Some(d) = opts.depth {
                    parts.push(format!("depth {}", d));
                }
                if let Some(n) = opts.nodes {
                    parts.push(format!("nodes {}", n));
                }
                if let Some(t) = opts.movetime {
                    parts.push(format!("movetime {}", t));
                }
                if opts.infinite {
                    parts.push("infinite".to_string());
                }
                parts.join(" ")
            }
            GuiCommand::Stop => "stop".to_string(),
            GuiCommand::Quit => "quit".to_string(),
        }
    }
}

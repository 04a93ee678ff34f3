//! CLI command implementations for Bombot.

pub(crate) mod play;
pub(crate) mod replay;
pub(crate) mod run;
pub(crate) mod seeds;

use std::error::Error;
use std::fmt;

use clap::ValueEnum;

use bombot::game::{Game, Tile};

/// Output format for the `run` and `seeds` commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// CLI error type.
#[derive(Debug)]
pub(crate) struct CliError {
    message: String,
}

impl CliError {
    /// Create a new CLI error.
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for CliError {}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        Self::new(e.to_string())
    }
}

impl From<bombot::error::ConfigError> for CliError {
    fn from(e: bombot::error::ConfigError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<bombot::error::EngineError> for CliError {
    fn from(e: bombot::error::EngineError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<bombot::error::LlmError> for CliError {
    fn from(e: bombot::error::LlmError) -> Self {
        Self::new(e.to_string())
    }
}

/// Render the board as ASCII for terminal output.
///
/// `#` hard block, `%` soft block, `*` bomb, `+` loot, `x` explosion,
/// digits for living players.
pub(crate) fn render_board(game: &Game) -> String {
    let mut out = String::new();
    for y in 0..game.grid.height() {
        for x in 0..game.grid.width() {
            let coord = bombot::game::Coord::new(x, y);
            let ch = if let Some(player) = game.living_players().find(|p| p.pos() == coord) {
                char::from(b'0' + player.id)
            } else if game
                .explosions
                .iter()
                .any(|e| e.cells.contains(&coord))
            {
                'x'
            } else if game.bomb_at(coord).is_some() {
                '*'
            } else if game.loot_at(coord).is_some() {
                '+'
            } else {
                match game.grid.get(coord) {
                    Some(Tile::Hard) => '#',
                    Some(Tile::Soft) => '%',
                    _ => '.',
                }
            };
            out.push(ch);
            out.push(' ');
        }
        out.push('\n');
    }
    out
}

/// One-line score summary.
pub(crate) fn score_line(game: &Game) -> String {
    let parts: Vec<String> = game
        .players
        .iter()
        .map(|p| {
            format!(
                "P{}: {}{}",
                p.id,
                p.score,
                if p.alive { "" } else { " (dead)" }
            )
        })
        .collect();
    parts.join("  ")
}

/// Build the single-threaded async runtime used by game commands.
pub(crate) fn build_runtime() -> Result<tokio::runtime::Runtime, CliError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::new(format!("failed to build runtime: {e}")))
}

//! Error taxonomy for the engine.
//!
//! Recoverable failures are absorbed at their component boundary: blocked or
//! invalid moves surface as boolean returns from the simulation, and LLM
//! failures degrade to random-safe fallback moves. Only [`EngineError`]
//! escapes to the embedding UI.

use std::fmt;

/// Errors raised during world generation or configuration validation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigError {
    /// Grid dimensions are unusable.
    InvalidDimensions {
        /// Requested width.
        width: u16,
        /// Requested height.
        height: u16,
    },
    /// Soft block density outside `[0, 1]`.
    InvalidDensity(f64),
    /// Unsupported player count.
    InvalidPlayerCount(usize),
    /// No path exists between at least two spawn corners.
    UnreachableSpawns {
        /// Seed of the rejected world.
        seed: u64,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDimensions { width, height } => {
                write!(f, "invalid grid dimensions {width}x{height}")
            }
            Self::InvalidDensity(d) => write!(f, "soft block density {d} outside [0, 1]"),
            Self::InvalidPlayerCount(n) => write!(f, "unsupported player count {n}"),
            Self::UnreachableSpawns { seed } => {
                write!(f, "seed {seed} produced no path between spawn corners")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Errors from the chat-completion adapter.
///
/// Every variant is recoverable: the engine substitutes a random-safe move
/// and the round still completes.
#[derive(Debug, Clone)]
pub enum LlmError {
    /// No API key was configured for a live game.
    MissingKey,
    /// Transport-level failure (DNS, connect, TLS, body read).
    Http(String),
    /// Non-2xx response from the provider.
    Status(u16),
    /// Request exceeded the configured timeout.
    Timeout,
    /// Response content was not valid JSON.
    Parse(String),
    /// Response JSON did not match the move or memory schema.
    Schema(String),
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingKey => write!(f, "no API key configured"),
            Self::Http(e) => write!(f, "http error: {e}"),
            Self::Status(code) => write!(f, "provider returned status {code}"),
            Self::Timeout => write!(f, "request timed out"),
            Self::Parse(e) => write!(f, "response was not valid JSON: {e}"),
            Self::Schema(e) => write!(f, "response violated schema: {e}"),
        }
    }
}

impl std::error::Error for LlmError {}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if let Some(status) = e.status() {
            Self::Status(status.as_u16())
        } else {
            Self::Http(e.to_string())
        }
    }
}

/// Fatal engine error: a programmer-visible invariant was violated.
///
/// The only error that propagates to the embedding UI; everything else is
/// absorbed where it occurs.
#[derive(Debug, Clone)]
pub struct EngineError {
    /// Description of the violated invariant.
    pub message: String,
}

impl EngineError {
    /// Create a new fatal engine error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fatal engine error: {}", self.message)
    }
}

impl std::error::Error for EngineError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::UnreachableSpawns { seed: 77 };
        assert!(format!("{err}").contains("77"));

        let err = ConfigError::InvalidDimensions {
            width: 0,
            height: 11,
        };
        assert!(format!("{err}").contains("0x11"));
    }

    #[test]
    fn test_llm_error_display() {
        let err = LlmError::Status(429);
        assert!(format!("{err}").contains("429"));

        let err = LlmError::Timeout;
        assert!(format!("{err}").contains("timed out"));
    }

    #[test]
    fn test_engine_error_display() {
        let err = EngineError::new("history cursor out of range");
        assert!(format!("{err}").contains("history cursor"));
    }
}

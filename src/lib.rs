// Allow unwrap and exact float comparison in tests (test code is not production)
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::float_cmp))]
//! Bombot: a deterministic, seedable, turn-based bomb-placement game engine
//! with LLM-driven agents.
//!
//! The engine is headless: rendering is an external collaborator consuming
//! state snapshots and engine events. Given a seed and a move script, the
//! state trajectory is byte-identical across runs.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │       Scheduler / Engine            │
//! ├──────────────┬──────────────────────┤
//! │  Prompter    │   LLM adapter        │
//! ├──────────────┴──────────────────────┤
//! │      Simulation (grid, bombs)       │
//! ├─────────────────────────────────────┤
//! │   History / Replay / Seed finder    │
//! └─────────────────────────────────────┘
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod game;
pub mod history;
pub mod llm;
pub mod prompt;
pub mod rng;
pub mod seedfind;

pub use config::GameConfig;
pub use engine::{Engine, EngineEvent, MoveProvider, RandomProvider, ScriptedProvider};
pub use error::{ConfigError, EngineError, LlmError};

// Re-export key game types at crate root for convenience
pub use game::{Coord, Direction, Game, Grid, Move, Player, PlayerId, Tile};
pub use history::{History, ReplayPlayer};
pub use rng::SeededRng;

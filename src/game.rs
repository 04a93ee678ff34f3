//! Game state, board terrain, and the turn-based simulation.

pub mod entities;
pub mod grid;
pub mod invariants;
pub mod sim;
pub mod worldgen;

pub use entities::{Bomb, BombId, Explosion, Loot, LootKind, Move, Player, PlayerId};
pub use grid::{Coord, Direction, Grid, Tile};
pub use invariants::{InvariantViolation, assert_invariants, check_invariants};
pub use sim::{Game, MoveAnalysis};
pub use worldgen::{any_corners_connected, corners_reachable, generate_grid};

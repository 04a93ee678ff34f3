//! Game configuration and frozen board constants.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::game::{Coord, LootKind};

/// Board width in cells.
pub const GRID_WIDTH: u16 = 13;

/// Board height in cells.
pub const GRID_HEIGHT: u16 = 11;

/// Score awarded per destroyed soft block.
pub const SCORE_SOFT_BLOCK: u32 = 10;

/// Score awarded for killing another player.
pub const SCORE_KILL: u32 = 100;

/// Default colors assigned to players in spawn order.
pub const PLAYER_COLORS: [&str; 4] = ["#ff4444", "#4488ff", "#44cc44", "#ffcc00"];

/// The four spawn corners in player-id order.
#[must_use]
pub const fn spawn_corners() -> [Coord; 4] {
    [
        Coord::new(0, 0),
        Coord::new(GRID_WIDTH - 1, 0),
        Coord::new(0, GRID_HEIGHT - 1),
        Coord::new(GRID_WIDTH - 1, GRID_HEIGHT - 1),
    ]
}

/// The 3-cell L-shaped safe zones kept free of soft blocks at generation.
#[must_use]
pub fn safe_zone_cells() -> Vec<Coord> {
    let mut cells = Vec::with_capacity(12);
    for corner in spawn_corners() {
        let dx: i32 = if corner.x == 0 { 1 } else { -1 };
        let dy: i32 = if corner.y == 0 { 1 } else { -1 };
        cells.push(corner);
        cells.push(Coord::new(offset(corner.x, dx), corner.y));
        cells.push(Coord::new(corner.x, offset(corner.y, dy)));
    }
    cells
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
const fn offset(v: u16, d: i32) -> u16 {
    (v as i32 + d) as u16
}

/// One row of the weighted loot table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LootWeight {
    /// Loot kind produced when this row is selected.
    pub kind: LootKind,
    /// Relative selection weight; rows with non-positive weight never fire.
    pub weight: f64,
}

/// A bomb injected at game start (testing mode only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureBomb {
    /// Owning player.
    pub owner: u8,
    /// Cell x.
    pub x: u16,
    /// Cell y.
    pub y: u16,
    /// Rounds until detonation.
    pub rounds_until_explode: u32,
    /// Explosion range.
    pub range: u32,
}

/// A loot item injected at game start (testing mode only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureLoot {
    /// Loot kind.
    pub kind: LootKind,
    /// Cell x.
    pub x: u16,
    /// Cell y.
    pub y: u16,
}

/// Complete game configuration.
///
/// Serializable so saved sessions carry the exact settings they were
/// produced with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Seed for world generation and all RNG-driven events.
    pub seed: u64,
    /// Number of players (2-4, one per spawn corner).
    pub num_players: usize,
    /// Probability of a soft block per eligible cell.
    pub soft_block_density: f64,
    /// Default bomb fuse in rounds.
    pub bomb_rounds_until_explode: u32,
    /// Default explosion range in cells per direction.
    pub initial_bomb_range: u32,
    /// Default simultaneous bomb capacity.
    pub initial_max_bombs: u32,
    /// Probability of a loot drop per destroyed soft block.
    pub loot_drop_chance: f64,
    /// Weighted table of loot kinds.
    pub loot_table: Vec<LootWeight>,
    /// Rounds an explosion record stays visible.
    pub explosion_duration_rounds: u32,
    /// Minimum wall-clock gap between rounds, in milliseconds.
    pub turn_delay_ms: u64,
    /// Per-LLM-request timeout in milliseconds.
    pub request_timeout_ms: u64,
    /// Cap on history snapshot buffer.
    pub max_history_entries: usize,
    /// Shortens delays and enables fixture injection.
    pub testing_mode: bool,
    /// Bombs placed at game start when `testing_mode` is set.
    pub initial_bombs: Vec<FixtureBomb>,
    /// Loot placed at game start when `testing_mode` is set.
    pub initial_loot: Vec<FixtureLoot>,
    /// Reject worlds where no two spawn corners connect.
    pub require_reachable: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            seed: 1,
            num_players: 4,
            soft_block_density: 0.4,
            bomb_rounds_until_explode: 4,
            initial_bomb_range: 1,
            initial_max_bombs: 1,
            loot_drop_chance: 0.3,
            loot_table: vec![
                LootWeight {
                    kind: LootKind::FlashRadius,
                    weight: 0.5,
                },
                LootWeight {
                    kind: LootKind::ExtraBomb,
                    weight: 0.35,
                },
                LootWeight {
                    kind: LootKind::BombPickup,
                    weight: 0.15,
                },
            ],
            explosion_duration_rounds: 1,
            turn_delay_ms: 1500,
            request_timeout_ms: 10_000,
            max_history_entries: 500,
            testing_mode: false,
            initial_bombs: Vec::new(),
            initial_loot: Vec::new(),
            require_reachable: false,
        }
    }
}

impl GameConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for densities outside `[0, 1]` or player
    /// counts not in `2..=4`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.soft_block_density) {
            return Err(ConfigError::InvalidDensity(self.soft_block_density));
        }
        if !(0.0..=1.0).contains(&self.loot_drop_chance) {
            return Err(ConfigError::InvalidDensity(self.loot_drop_chance));
        }
        if !(2..=4).contains(&self.num_players) {
            return Err(ConfigError::InvalidPlayerCount(self.num_players));
        }
        Ok(())
    }

    /// Effective inter-round delay, shortened under testing mode.
    #[must_use]
    pub const fn effective_turn_delay_ms(&self) -> u64 {
        if self.testing_mode { 0 } else { self.turn_delay_ms }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(GameConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_density_rejected() {
        let config = GameConfig {
            soft_block_density: 1.5,
            ..GameConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDensity(_))
        ));
    }

    #[test]
    fn test_invalid_player_count_rejected() {
        let config = GameConfig {
            num_players: 1,
            ..GameConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidPlayerCount(1))
        ));
    }

    #[test]
    fn test_safe_zones_are_corner_l_shapes() {
        let cells = safe_zone_cells();
        assert_eq!(cells.len(), 12);
        assert!(cells.contains(&Coord::new(0, 0)));
        assert!(cells.contains(&Coord::new(1, 0)));
        assert!(cells.contains(&Coord::new(0, 1)));
        assert!(cells.contains(&Coord::new(GRID_WIDTH - 2, GRID_HEIGHT - 1)));
        assert!(cells.contains(&Coord::new(GRID_WIDTH - 1, GRID_HEIGHT - 2)));
    }

    #[test]
    fn test_testing_mode_shortens_delay() {
        let mut config = GameConfig::default();
        assert_eq!(config.effective_turn_delay_ms(), 1500);
        config.testing_mode = true;
        assert_eq!(config.effective_turn_delay_ms(), 0);
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let config = GameConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let restored: GameConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, restored);
    }
}

//! Pure data shapes: players, bombs, loot, explosions.

use serde::{Deserialize, Serialize};

use crate::game::{Coord, Direction};

/// Unique identifier for a player.
pub type PlayerId = u8;

/// Unique identifier for a bomb, allocated monotonically per game.
pub type BombId = u32;

/// State for a single player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    /// Unique identifier.
    pub id: PlayerId,
    /// Current x cell.
    pub x: u16,
    /// Current y cell.
    pub y: u16,
    /// Display color (hex string, consumed by renderers).
    pub color: String,
    /// Whether the player is still alive.
    pub alive: bool,
    /// Accumulated score.
    pub score: u32,
    /// Bombs currently placed or carried by this player.
    pub bombs_active: u32,
    /// Simultaneous bomb capacity.
    pub max_bombs: u32,
    /// Explosion range of newly placed bombs.
    pub bomb_range: u32,
    /// Bomb currently carried, if any.
    pub carried_bomb: Option<BombId>,
    /// Whether the bomb-pickup power-up has been collected.
    pub can_pickup_bombs: bool,
}

impl Player {
    /// Create a player at a spawn cell with default capacities.
    #[must_use]
    pub fn new(id: PlayerId, pos: Coord, color: &str, max_bombs: u32, bomb_range: u32) -> Self {
        Self {
            id,
            x: pos.x,
            y: pos.y,
            color: color.to_string(),
            alive: true,
            score: 0,
            bombs_active: 0,
            max_bombs,
            bomb_range,
            carried_bomb: None,
            can_pickup_bombs: false,
        }
    }

    /// Current position as a coordinate.
    #[must_use]
    pub const fn pos(&self) -> Coord {
        Coord::new(self.x, self.y)
    }
}

/// A placed (or carried) bomb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bomb {
    /// Unique identifier.
    pub id: BombId,
    /// Player who placed the bomb.
    pub owner: PlayerId,
    /// Current x cell (tracks the carrier while carried).
    pub x: u16,
    /// Current y cell (tracks the carrier while carried).
    pub y: u16,
    /// Round the bomb was placed on.
    pub placed_on_round: u32,
    /// Fuse length in rounds.
    pub rounds_until_explode: u32,
    /// Explosion range in cells per cardinal direction.
    pub range: u32,
    /// Whether a player is currently carrying this bomb.
    pub being_carried: bool,
    /// The carrying player, when `being_carried` is set.
    pub carrier: Option<PlayerId>,
}

impl Bomb {
    /// Current position as a coordinate.
    #[must_use]
    pub const fn pos(&self) -> Coord {
        Coord::new(self.x, self.y)
    }

    /// Rounds remaining before this bomb detonates at `round_count`.
    ///
    /// Saturates at zero; the tick that observes zero detonates the bomb.
    #[must_use]
    pub const fn rounds_remaining(&self, round_count: u32) -> u32 {
        let elapsed = round_count.saturating_sub(self.placed_on_round);
        self.rounds_until_explode.saturating_sub(elapsed)
    }
}

/// Kinds of loot dropped by destroyed soft blocks or fallen players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LootKind {
    /// Increases bomb range by one.
    FlashRadius,
    /// Increases simultaneous bomb capacity by one.
    ExtraBomb,
    /// Grants the bomb pickup-and-throw ability.
    BombPickup,
}

impl LootKind {
    /// Wire/display name, matching the save format.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            LootKind::FlashRadius => "flash_radius",
            LootKind::ExtraBomb => "extra_bomb",
            LootKind::BombPickup => "bomb_pickup",
        }
    }
}

/// A loot item resting on a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loot {
    /// What the item grants.
    pub kind: LootKind,
    /// Cell x.
    pub x: u16,
    /// Cell y.
    pub y: u16,
    /// Round the item appeared on.
    pub spawned_round: u32,
}

impl Loot {
    /// Current position as a coordinate.
    #[must_use]
    pub const fn pos(&self) -> Coord {
        Coord::new(self.x, self.y)
    }
}

/// An explosion event: the full affected cell set of one detonation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Explosion {
    /// Every cell touched, chains included.
    pub cells: Vec<Coord>,
    /// Round the explosion happened on.
    pub created_round: u32,
    /// Rounds the record stays before expiry.
    pub duration_rounds: u32,
}

/// One player's move for a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    /// Direction to step.
    pub direction: Direction,
    /// Whether to place a bomb before stepping.
    #[serde(rename = "dropBomb")]
    pub drop_bomb: bool,
    /// Tactical justification (display only, never affects simulation).
    #[serde(default)]
    pub thought: String,
}

impl Move {
    /// A stationary move with no bomb.
    #[must_use]
    pub fn stay() -> Self {
        Self {
            direction: Direction::Stay,
            drop_bomb: false,
            thought: String::new(),
        }
    }

    /// A directional move with no bomb.
    #[must_use]
    pub fn step(direction: Direction) -> Self {
        Self {
            direction,
            drop_bomb: false,
            thought: String::new(),
        }
    }

    /// A move that drops a bomb, then steps.
    #[must_use]
    pub fn drop_and_step(direction: Direction) -> Self {
        Self {
            direction,
            drop_bomb: true,
            thought: String::new(),
        }
    }
}

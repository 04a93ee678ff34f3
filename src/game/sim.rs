//! The game state machine: moves, bombs, chain reactions, loot, scoring.
//!
//! All mutation goes through the operations here. Blocked or invalid moves
//! are reported as `false` returns and never fail the round. Every random
//! decision draws from the game's own [`SeededRng`], so a seed plus a move
//! script replays to a byte-identical state.

use serde::{Deserialize, Serialize};

use crate::config::{GameConfig, PLAYER_COLORS, SCORE_KILL, SCORE_SOFT_BLOCK, spawn_corners};
use crate::error::ConfigError;
use crate::game::worldgen::generate_grid;
use crate::game::{
    Bomb, BombId, Coord, Direction, Explosion, Grid, Loot, LootKind, Move, Player, PlayerId, Tile,
};
use crate::rng::SeededRng;

/// Probability that a fallback move also drops a bomb.
const FALLBACK_DROP_CHANCE: f64 = 0.1;

/// Result of the per-player danger analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveAnalysis {
    /// Passable directions whose destination survives the next bomb tick.
    pub safe: Vec<Direction>,
    /// Passable directions whose destination is lethal within one round.
    pub dangerous: Vec<Direction>,
    /// Whether the player's current cell is outside all imminent blasts.
    pub currently_safe: bool,
}

/// Complete game state and simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    /// Configuration this game was created with.
    pub config: GameConfig,
    /// Board terrain.
    pub grid: Grid,
    /// All players, in id order.
    pub players: Vec<Player>,
    /// Live bombs, in placement order. Placement order decides which
    /// primary detonates first at a round boundary.
    pub bombs: Vec<Bomb>,
    /// Unexpired explosion records.
    pub explosions: Vec<Explosion>,
    /// Loot resting on the board.
    pub loot: Vec<Loot>,
    /// Total turns taken.
    pub turn_count: u32,
    /// Completed full rounds.
    pub round_count: u32,
    /// Index into `players` of the player whose turn it is.
    pub current_player_index: usize,
    rng: SeededRng,
    next_bomb_id: BombId,
}

impl Game {
    /// Create a new game: generate the world, spawn players at the corners,
    /// and inject testing fixtures when configured.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for invalid configuration or, when
    /// `require_reachable` is set, a sealed world.
    pub fn new(config: GameConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut rng = SeededRng::new(config.seed);
        let grid = generate_grid(&config, &mut rng)?;

        let corners = spawn_corners();
        let mut players = Vec::with_capacity(config.num_players);
        for i in 0..config.num_players {
            #[allow(clippy::cast_possible_truncation)]
            let id = (i + 1) as PlayerId;
            players.push(Player::new(
                id,
                corners[i],
                PLAYER_COLORS[i % PLAYER_COLORS.len()],
                config.initial_max_bombs,
                config.initial_bomb_range,
            ));
        }

        let mut game = Self {
            grid,
            players,
            bombs: Vec::new(),
            explosions: Vec::new(),
            loot: Vec::new(),
            turn_count: 0,
            round_count: 0,
            current_player_index: 0,
            rng,
            next_bomb_id: 1,
            config,
        };

        if game.config.testing_mode {
            game.inject_fixtures();
        }

        Ok(game)
    }

    fn inject_fixtures(&mut self) {
        let bombs = self.config.initial_bombs.clone();
        for fixture in bombs {
            let id = self.alloc_bomb_id();
            self.bombs.push(Bomb {
                id,
                owner: fixture.owner,
                x: fixture.x,
                y: fixture.y,
                placed_on_round: self.round_count,
                rounds_until_explode: fixture.rounds_until_explode,
                range: fixture.range,
                being_carried: false,
                carrier: None,
            });
            if let Some(player) = self.player_mut(fixture.owner) {
                player.bombs_active += 1;
            }
        }
        let round = self.round_count;
        for fixture in &self.config.initial_loot {
            self.loot.push(Loot {
                kind: fixture.kind,
                x: fixture.x,
                y: fixture.y,
                spawned_round: round,
            });
        }
    }

    fn alloc_bomb_id(&mut self) -> BombId {
        let id = self.next_bomb_id;
        self.next_bomb_id += 1;
        id
    }

    /// The seed this game was created with.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.rng.seed()
    }

    /// Look up a player by id.
    #[must_use]
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    /// Iterate over living players in id order.
    pub fn living_players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.alive)
    }

    /// The resting (not carried) bomb on a cell, if any.
    #[must_use]
    pub fn bomb_at(&self, coord: Coord) -> Option<&Bomb> {
        self.bombs
            .iter()
            .find(|b| !b.being_carried && b.pos() == coord)
    }

    /// The loot item on a cell, if any.
    #[must_use]
    pub fn loot_at(&self, coord: Coord) -> Option<&Loot> {
        self.loot.iter().find(|l| l.pos() == coord)
    }

    /// Whether a cell can be entered by a player.
    ///
    /// Soft and hard blocks are impassable; bombs and other players are not.
    #[must_use]
    pub fn is_passable(&self, coord: Coord) -> bool {
        self.grid.get(coord).is_some_and(Tile::is_passable)
    }

    // ---- player operations ------------------------------------------------

    /// Move a player one cell.
    ///
    /// Returns `false` (and changes nothing) when the player is missing or
    /// dead, or the destination is out of bounds or impassable. A successful
    /// move triggers loot pickup on the destination cell.
    pub fn move_player(&mut self, id: PlayerId, direction: Direction) -> bool {
        let Some(player) = self.player(id) else {
            return false;
        };
        if !player.alive {
            return false;
        }
        let Some(dest) = self.grid.step(player.pos(), direction) else {
            return false;
        };
        if !self.is_passable(dest) {
            return false;
        }

        let carried = player.carried_bomb;
        if let Some(player) = self.player_mut(id) {
            player.x = dest.x;
            player.y = dest.y;
        }
        // A carried bomb rides along with its carrier
        if let Some(bomb_id) = carried
            && let Some(bomb) = self.bombs.iter_mut().find(|b| b.id == bomb_id)
        {
            bomb.x = dest.x;
            bomb.y = dest.y;
        }
        self.check_loot_pickup(id);
        true
    }

    /// Place a bomb on the player's current cell.
    ///
    /// Returns `false` when the player is missing or dead, at bomb capacity,
    /// or already standing on a bomb.
    pub fn place_bomb(&mut self, id: PlayerId) -> bool {
        let Some(player) = self.player(id) else {
            return false;
        };
        if !player.alive || player.bombs_active >= player.max_bombs {
            return false;
        }
        let pos = player.pos();
        if self.bomb_at(pos).is_some() {
            return false;
        }

        let bomb_id = self.alloc_bomb_id();
        let (round, fuse, range) = (
            self.round_count,
            self.config.bomb_rounds_until_explode,
            self.player(id).map_or(1, |p| p.bomb_range),
        );
        self.bombs.push(Bomb {
            id: bomb_id,
            owner: id,
            x: pos.x,
            y: pos.y,
            placed_on_round: round,
            rounds_until_explode: fuse,
            range,
            being_carried: false,
            carrier: None,
        });
        if let Some(player) = self.player_mut(id) {
            player.bombs_active += 1;
        }
        true
    }

    /// Pick up the bomb on the player's cell.
    ///
    /// Gated by the `bomb_pickup` power-up; fails when already carrying or
    /// no bomb rests on the cell.
    pub fn pickup_bomb(&mut self, id: PlayerId) -> bool {
        let Some(player) = self.player(id) else {
            return false;
        };
        if !player.alive || !player.can_pickup_bombs || player.carried_bomb.is_some() {
            return false;
        }
        let pos = player.pos();
        let Some(bomb_id) = self.bomb_at(pos).map(|b| b.id) else {
            return false;
        };

        if let Some(bomb) = self.bombs.iter_mut().find(|b| b.id == bomb_id) {
            bomb.being_carried = true;
            bomb.carrier = Some(id);
        }
        if let Some(player) = self.player_mut(id) {
            player.carried_bomb = Some(bomb_id);
        }
        true
    }

    /// Throw the carried bomb in a cardinal direction.
    ///
    /// The bomb projects in a straight line with toroidal wrap-around and
    /// lands one cell before the first soft block, hard block, or resting
    /// bomb. Travel is capped at `width + height` cells so obstacle-free
    /// boards terminate. A throw with no room to travel would land on the
    /// thrower's own cell; it is rejected when that cell already holds a
    /// resting bomb, and the bomb stays carried.
    pub fn throw_bomb(&mut self, id: PlayerId, direction: Direction) -> bool {
        if direction == Direction::Stay {
            return false;
        }
        let Some(player) = self.player(id) else {
            return false;
        };
        if !player.alive {
            return false;
        }
        let Some(bomb_id) = player.carried_bomb else {
            return false;
        };

        let mut pos = player.pos();
        let max_travel = usize::from(self.grid.width()) + usize::from(self.grid.height());
        for _ in 0..max_travel {
            let next = self.grid.step_wrapping(pos, direction);
            let blocked = !self.is_passable(next) || self.bomb_at(next).is_some();
            if blocked {
                break;
            }
            pos = next;
        }
        // One resting bomb per cell; carried bombs are not resting
        if self.bomb_at(pos).is_some() {
            return false;
        }

        if let Some(bomb) = self.bombs.iter_mut().find(|b| b.id == bomb_id) {
            bomb.x = pos.x;
            bomb.y = pos.y;
            bomb.being_carried = false;
            bomb.carrier = None;
        }
        if let Some(player) = self.player_mut(id) {
            player.carried_bomb = None;
        }
        true
    }

    /// Pick up and apply loot on the player's cell, if present.
    pub fn check_loot_pickup(&mut self, id: PlayerId) {
        let Some(player) = self.player(id) else {
            return;
        };
        if !player.alive {
            return;
        }
        let pos = player.pos();
        let Some(idx) = self.loot.iter().position(|l| l.pos() == pos) else {
            return;
        };
        let kind = self.loot.remove(idx).kind;
        if let Some(player) = self.player_mut(id) {
            match kind {
                LootKind::FlashRadius => player.bomb_range += 1,
                LootKind::ExtraBomb => player.max_bombs += 1,
                LootKind::BombPickup => player.can_pickup_bombs = true,
            }
        }
    }

    // ---- bombs and explosions ---------------------------------------------

    /// Detonate every bomb whose fuse has elapsed.
    ///
    /// Invoked exactly once per round boundary. Primaries resolve in
    /// placement order; chains triggered by a primary resolve within that
    /// primary's pass.
    pub fn tick_bombs(&mut self) {
        let due: Vec<BombId> = self
            .bombs
            .iter()
            .filter(|b| b.rounds_remaining(self.round_count) == 0)
            .map(|b| b.id)
            .collect();

        for id in due {
            // A chain from an earlier primary may have consumed this bomb
            let Some(idx) = self.bombs.iter().position(|b| b.id == id) else {
                continue;
            };
            let mut bomb = self.bombs.remove(idx);
            self.release_bomb(&mut bomb);
            self.resolve_detonation(bomb);
        }
    }

    /// Snap a carried bomb to its carrier and release the carrier.
    fn release_bomb(&mut self, bomb: &mut Bomb) {
        if let Some(player) = self.player_mut(bomb.owner) {
            player.bombs_active = player.bombs_active.saturating_sub(1);
        }
        if !bomb.being_carried {
            return;
        }
        if let Some(carrier_id) = bomb.carrier
            && let Some(carrier) = self.player_mut(carrier_id)
        {
            bomb.x = carrier.x;
            bomb.y = carrier.y;
            carrier.carried_bomb = None;
        }
        bomb.being_carried = false;
        bomb.carrier = None;
    }

    /// Resolve one primary detonation and all bombs it chains into.
    fn resolve_detonation(&mut self, primary: Bomb) {
        let mut affected: Vec<Coord> = Vec::new();
        let mut destroyed_soft: Vec<Coord> = Vec::new();
        let mut kills: Vec<(PlayerId, PlayerId, u32)> = Vec::new();
        let mut worklist = vec![primary];

        while let Some(bomb) = worklist.pop() {
            let center = bomb.pos();
            if !affected.contains(&center) {
                affected.push(center);
            }
            self.kill_players_at(center, bomb.owner, &mut kills);

            for direction in Direction::CARDINAL {
                let mut pos = center;
                for _ in 0..bomb.range {
                    let Some(next) = self.grid.step(pos, direction) else {
                        break;
                    };
                    pos = next;
                    match self.grid.get(pos) {
                        Some(Tile::Hard) | None => break,
                        Some(Tile::Soft) => {
                            if !affected.contains(&pos) {
                                affected.push(pos);
                            }
                            self.destroy_soft_block(pos, bomb.owner);
                            destroyed_soft.push(pos);
                            break;
                        }
                        Some(Tile::Empty) => {
                            if !affected.contains(&pos) {
                                affected.push(pos);
                            }
                            self.kill_players_at(pos, bomb.owner, &mut kills);
                            // A resting bomb stops the ray and chains.
                            // Removing it before recursion prevents cycles.
                            if let Some(idx) = self
                                .bombs
                                .iter()
                                .position(|b| !b.being_carried && b.pos() == pos)
                            {
                                let chained = self.bombs.remove(idx);
                                if let Some(owner) = self.player_mut(chained.owner) {
                                    owner.bombs_active = owner.bombs_active.saturating_sub(1);
                                }
                                worklist.push(chained);
                                break;
                            }
                        }
                    }
                }
            }
        }

        // Exposed loot is consumed; loot on a cell whose soft block was
        // destroyed this pass was shielded by the block and survives.
        self.loot
            .retain(|l| !affected.contains(&l.pos()) || destroyed_soft.contains(&l.pos()));

        for (killer, victim, victim_range) in kills {
            if killer != victim && self.player(killer).is_some_and(|p| p.alive) {
                if let Some(player) = self.player_mut(killer) {
                    player.score += SCORE_KILL;
                }
                self.spread_loot(victim_range);
            }
        }

        self.explosions.push(Explosion {
            cells: affected,
            created_round: self.round_count,
            duration_rounds: self.config.explosion_duration_rounds,
        });
    }

    fn kill_players_at(
        &mut self,
        cell: Coord,
        killer: PlayerId,
        kills: &mut Vec<(PlayerId, PlayerId, u32)>,
    ) {
        for player in &mut self.players {
            if player.alive && player.pos() == cell {
                player.alive = false;
                kills.push((killer, player.id, player.bomb_range));
            }
        }
    }

    /// Convert a soft block to empty, award points, maybe drop loot.
    fn destroy_soft_block(&mut self, pos: Coord, owner: PlayerId) {
        self.grid.set(pos, Tile::Empty);
        if let Some(player) = self.player_mut(owner)
            && player.alive
        {
            player.score += SCORE_SOFT_BLOCK;
        }
        if self.loot_at(pos).is_none() && self.rng.random() < self.config.loot_drop_chance {
            if let Some(kind) = self.pick_loot_kind() {
                let round = self.round_count;
                self.loot.push(Loot {
                    kind,
                    x: pos.x,
                    y: pos.y,
                    spawned_round: round,
                });
            }
        }
    }

    fn pick_loot_kind(&mut self) -> Option<LootKind> {
        let weights: Vec<f64> = self.config.loot_table.iter().map(|w| w.weight).collect();
        let idx = self.rng.weighted_index(&weights)?;
        Some(self.config.loot_table[idx].kind)
    }

    /// Scatter up to `count` loot items on random free cells.
    ///
    /// Runs when a player is killed by another player; the victim's bomb
    /// range decides how much loot falls.
    fn spread_loot(&mut self, count: u32) {
        let mut candidates: Vec<Coord> = self
            .grid
            .iter()
            .filter(|(coord, tile)| {
                *tile == Tile::Empty
                    && self.loot_at(*coord).is_none()
                    && !self.players.iter().any(|p| p.alive && p.pos() == *coord)
            })
            .map(|(coord, _)| coord)
            .collect();

        for _ in 0..count {
            if candidates.is_empty() {
                break;
            }
            #[allow(clippy::cast_possible_truncation)]
            let idx = self.rng.next_u32(candidates.len() as u32) as usize;
            let pos = candidates.swap_remove(idx);
            if let Some(kind) = self.pick_loot_kind() {
                let round = self.round_count;
                self.loot.push(Loot {
                    kind,
                    x: pos.x,
                    y: pos.y,
                    spawned_round: round,
                });
            }
        }
    }

    fn expire_explosions(&mut self) {
        let round = self.round_count;
        self.explosions
            .retain(|e| round.saturating_sub(e.created_round) <= e.duration_rounds);
    }

    // ---- danger analysis ----------------------------------------------------

    /// Cells a bomb would hit if it detonated on the current terrain.
    ///
    /// Read-only blast geometry: soft blocks stop rays inclusively, hard
    /// blocks exclusively, resting bombs stop rays inclusively.
    #[must_use]
    pub fn blast_cells(&self, bomb: &Bomb) -> Vec<Coord> {
        let mut cells = vec![bomb.pos()];
        for direction in Direction::CARDINAL {
            let mut pos = bomb.pos();
            for _ in 0..bomb.range {
                let Some(next) = self.grid.step(pos, direction) else {
                    break;
                };
                pos = next;
                match self.grid.get(pos) {
                    Some(Tile::Hard) | None => break,
                    Some(Tile::Soft) => {
                        cells.push(pos);
                        break;
                    }
                    Some(Tile::Empty) => {
                        cells.push(pos);
                        if self.bomb_at(pos).is_some_and(|b| b.id != bomb.id) {
                            break;
                        }
                    }
                }
            }
        }
        cells
    }

    /// Cells lethal within one round: the union of blasts of every bomb
    /// with at most one round left on its fuse.
    #[must_use]
    pub fn danger_cells(&self) -> Vec<Coord> {
        let mut cells = Vec::new();
        for bomb in &self.bombs {
            if bomb.rounds_remaining(self.round_count) <= 1 {
                for cell in self.blast_cells(bomb) {
                    if !cells.contains(&cell) {
                        cells.push(cell);
                    }
                }
            }
        }
        cells
    }

    /// Classify a player's five moves into safe and dangerous sets.
    ///
    /// Lethality is judged solely against bombs present right now; bombs
    /// other players may place this round are unknowable and ignored.
    #[must_use]
    pub fn analyze_moves(&self, id: PlayerId) -> MoveAnalysis {
        let Some(player) = self.player(id) else {
            return MoveAnalysis {
                safe: Vec::new(),
                dangerous: Vec::new(),
                currently_safe: true,
            };
        };
        let danger = self.danger_cells();
        let mut safe = Vec::new();
        let mut dangerous = Vec::new();

        for direction in Direction::ALL {
            let Some(dest) = self.grid.step(player.pos(), direction) else {
                continue;
            };
            if !self.is_passable(dest) {
                continue;
            }
            if danger.contains(&dest) {
                dangerous.push(direction);
            } else {
                safe.push(direction);
            }
        }

        MoveAnalysis {
            safe,
            dangerous,
            currently_safe: !danger.contains(&player.pos()),
        }
    }

    /// Directions a player can actually move in, with destinations.
    #[must_use]
    pub fn valid_moves(&self, id: PlayerId) -> Vec<(Direction, Coord)> {
        let Some(player) = self.player(id) else {
            return Vec::new();
        };
        Direction::ALL
            .into_iter()
            .filter_map(|d| {
                let dest = self.grid.step(player.pos(), d)?;
                self.is_passable(dest).then_some((d, dest))
            })
            .collect()
    }

    /// Directions a player cannot move in, with the blocking destination
    /// (or `None` when the step leaves the board).
    #[must_use]
    pub fn blocked_moves(&self, id: PlayerId) -> Vec<(Direction, Option<Coord>)> {
        let Some(player) = self.player(id) else {
            return Vec::new();
        };
        Direction::ALL
            .into_iter()
            .filter_map(|d| match self.grid.step(player.pos(), d) {
                Some(dest) if self.is_passable(dest) => None,
                Some(dest) => Some((d, Some(dest))),
                None => Some((d, None)),
            })
            .collect()
    }

    /// Validate an agent move: the player must exist and be alive.
    ///
    /// Direction validity is enforced by the type system at parse time, and
    /// blocked destinations are legal to request (they no-op).
    #[must_use]
    pub fn validate_move(&self, id: PlayerId, _mv: &Move) -> bool {
        self.player(id).is_some_and(|p| p.alive)
    }

    /// Random-safe fallback move, used when the LLM fails.
    ///
    /// Preference order: passable and non-lethal, then any passable
    /// destination, then `stay`. A bomb is dropped with small probability
    /// and only under capacity.
    pub fn random_move(&mut self, id: PlayerId) -> Move {
        let analysis = self.analyze_moves(id);
        let passable: Vec<Direction> = self.valid_moves(id).iter().map(|(d, _)| *d).collect();

        let direction = if let Some(d) = self.rng.choice(&analysis.safe) {
            *d
        } else if let Some(d) = self.rng.choice(&passable) {
            *d
        } else {
            Direction::Stay
        };

        let has_capacity = self
            .player(id)
            .is_some_and(|p| p.alive && p.bombs_active < p.max_bombs);
        let drop_bomb = has_capacity && self.rng.random() < FALLBACK_DROP_CHANCE;

        Move {
            direction,
            drop_bomb,
            thought: "fallback".to_string(),
        }
    }

    // ---- turns and termination ----------------------------------------------

    /// Advance one turn: bump the turn counter and pass the baton to the
    /// next living player. Wrapping to (or below) the previous index closes
    /// the round, expires old explosions, and ticks bombs exactly once.
    pub fn next_turn(&mut self) {
        self.turn_count += 1;
        let n = self.players.len();
        let prev = self.current_player_index;

        let mut idx = (prev + 1) % n;
        for _ in 0..n {
            if self.players[idx].alive {
                break;
            }
            idx = (idx + 1) % n;
        }
        self.current_player_index = idx;

        if idx <= prev {
            self.round_count += 1;
            self.expire_explosions();
            self.tick_bombs();
        }
    }

    /// Advance turns until the round counter increments, ticking bombs once.
    pub fn advance_round(&mut self) {
        let start = self.round_count;
        // Bounded: the index wraps within one sweep of the roster
        for _ in 0..=self.players.len() {
            if self.round_count > start {
                break;
            }
            self.next_turn();
        }
    }

    /// The game is over when at most one player remains alive.
    #[must_use]
    pub fn is_game_over(&self) -> bool {
        self.living_players().count() <= 1
    }

    /// The winning player: the sole survivor, or the highest score when
    /// nobody survives (ties broken by lowest id).
    #[must_use]
    pub fn winner(&self) -> Option<PlayerId> {
        if !self.is_game_over() {
            return None;
        }
        if let Some(survivor) = self.living_players().next() {
            return Some(survivor.id);
        }
        self.players
            .iter()
            .max_by(|a, b| a.score.cmp(&b.score).then(b.id.cmp(&a.id)))
            .map(|p| p.id)
    }
}

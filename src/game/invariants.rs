//! Structural consistency checks for game state.
//!
//! These catch simulation bugs early in tests and debug builds; release
//! builds never pay for them unless asked.

use std::collections::HashMap;

use crate::game::{Coord, Game, Tile};

/// A single violated consistency rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantViolation {
    /// Human-readable description of what went wrong.
    pub message: String,
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// Check every structural invariant and collect the violations.
#[must_use]
pub fn check_invariants(game: &Game) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();

    // Hard lattice is immutable: hard exactly on odd,odd cells
    for (coord, tile) in game.grid.iter() {
        let lattice = coord.x % 2 == 1 && coord.y % 2 == 1;
        if lattice && tile != Tile::Hard {
            violations.push(violation(format!(
                "lattice cell ({}, {}) is {tile:?}, expected hard",
                coord.x, coord.y
            )));
        }
        if !lattice && tile == Tile::Hard {
            violations.push(violation(format!(
                "hard block off the lattice at ({}, {})",
                coord.x, coord.y
            )));
        }
    }

    // At most one resting bomb per cell
    let mut bomb_cells: HashMap<Coord, u32> = HashMap::new();
    for bomb in &game.bombs {
        if !bomb.being_carried {
            *bomb_cells.entry(bomb.pos()).or_insert(0) += 1;
        }
    }
    for (coord, count) in bomb_cells {
        if count > 1 {
            violations.push(violation(format!(
                "{count} bombs resting on cell ({}, {})",
                coord.x, coord.y
            )));
        }
    }

    // Entities stay on the board, and bombs never sit inside blocks
    for bomb in &game.bombs {
        if !game.grid.in_bounds(bomb.pos()) {
            violations.push(violation(format!("bomb {} out of bounds", bomb.id)));
        } else if !bomb.being_carried && game.grid.get(bomb.pos()) != Some(Tile::Empty) {
            violations.push(violation(format!("bomb {} inside a block", bomb.id)));
        }
    }
    for player in &game.players {
        if !game.grid.in_bounds(player.pos()) {
            violations.push(violation(format!("player {} out of bounds", player.id)));
        }
    }
    for item in &game.loot {
        if !game.grid.in_bounds(item.pos()) {
            violations.push(violation(format!(
                "loot out of bounds at ({}, {})",
                item.x, item.y
            )));
        }
    }

    // Per-player bomb accounting matches the bomb list
    for player in &game.players {
        let owned = game.bombs.iter().filter(|b| b.owner == player.id).count();
        if usize::try_from(player.bombs_active).ok() != Some(owned) {
            violations.push(violation(format!(
                "player {} claims {} active bombs but owns {owned}",
                player.id, player.bombs_active
            )));
        }
        if player.bombs_active > player.max_bombs {
            violations.push(violation(format!(
                "player {} exceeds bomb capacity ({} > {})",
                player.id, player.bombs_active, player.max_bombs
            )));
        }
    }

    // Carried bombs and carriers agree both ways
    for bomb in &game.bombs {
        if bomb.being_carried {
            let consistent = bomb
                .carrier
                .and_then(|id| game.player(id))
                .is_some_and(|p| p.carried_bomb == Some(bomb.id));
            if !consistent {
                violations.push(violation(format!(
                    "carried bomb {} has no agreeing carrier",
                    bomb.id
                )));
            }
        }
    }
    for player in &game.players {
        if let Some(bomb_id) = player.carried_bomb {
            let consistent = game
                .bombs
                .iter()
                .any(|b| b.id == bomb_id && b.being_carried && b.carrier == Some(player.id));
            if !consistent {
                violations.push(violation(format!(
                    "player {} claims bomb {bomb_id} which is not carried by them",
                    player.id
                )));
            }
        }
    }

    // Current player index stays in range
    if game.current_player_index >= game.players.len() {
        violations.push(violation(format!(
            "current player index {} out of range",
            game.current_player_index
        )));
    }

    violations
}

fn violation(message: String) -> InvariantViolation {
    InvariantViolation { message }
}

/// Panic on any violated invariant. Compiled out of release builds.
pub fn assert_invariants(game: &Game) {
    if cfg!(debug_assertions) {
        let violations = check_invariants(game);
        assert!(
            violations.is_empty(),
            "invariant violations: {violations:?}"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::game::Direction;

    fn game(seed: u64) -> Game {
        Game::new(GameConfig {
            seed,
            ..GameConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_fresh_game_is_consistent() {
        for seed in [1, 42, 1234] {
            assert!(check_invariants(&game(seed)).is_empty(), "seed {seed}");
        }
    }

    #[test]
    fn test_consistency_survives_simulation() {
        let mut game = game(99);
        for round in 0..30u32 {
            for id in 1..=4u8 {
                if round % 2 == 0 {
                    game.place_bomb(id);
                }
                let mv = game.random_move(id);
                game.move_player(id, mv.direction);
            }
            game.advance_round();
            assert_invariants(&game);
            if game.is_game_over() {
                break;
            }
        }
    }

    #[test]
    fn test_detects_off_lattice_hard_block() {
        let mut game = game(1);
        game.grid.set(crate::game::Coord::new(2, 2), Tile::Hard);
        assert!(!check_invariants(&game).is_empty());
    }

    #[test]
    fn test_detects_bomb_miscount() {
        let mut game = game(1);
        assert!(game.place_bomb(1));
        game.players[0].bombs_active = 5;
        let violations = check_invariants(&game);
        assert!(violations.iter().any(|v| v.message.contains("player 1")));
    }

    #[test]
    fn test_detects_double_booked_cell() {
        let mut game = game(1);
        assert!(game.place_bomb(1));
        assert!(game.move_player(1, Direction::Right));
        // Force a second bomb onto the same cell, bypassing placement rules
        game.players[0].max_bombs = 2;
        assert!(game.place_bomb(1));
        let idx = game.bombs.len() - 1;
        game.bombs[idx].x = 0;
        game.bombs[idx].y = 0;
        let violations = check_invariants(&game);
        assert!(violations.iter().any(|v| v.message.contains("bombs resting")));
    }
}

//! Deterministic world generation.
//!
//! Layout rules: hard blocks on the fixed odd×odd lattice, soft blocks on
//! remaining cells with configured probability, and four L-shaped corner
//! safe zones kept clear so spawns are never walled in.

use crate::config::{GameConfig, GRID_HEIGHT, GRID_WIDTH, safe_zone_cells, spawn_corners};
use crate::error::ConfigError;
use crate::game::{Coord, Grid, Tile};
use crate::rng::SeededRng;

/// Generate the board terrain for a seedable world.
///
/// # Errors
///
/// Returns [`ConfigError::UnreachableSpawns`] when `require_reachable` is set
/// and no two spawn corners connect through empty and soft cells.
pub fn generate_grid(config: &GameConfig, rng: &mut SeededRng) -> Result<Grid, ConfigError> {
    let mut grid = Grid::new(GRID_WIDTH, GRID_HEIGHT).ok_or(ConfigError::InvalidDimensions {
        width: GRID_WIDTH,
        height: GRID_HEIGHT,
    })?;

    let safe: Vec<Coord> = safe_zone_cells();

    for y in 0..GRID_HEIGHT {
        for x in 0..GRID_WIDTH {
            let coord = Coord::new(x, y);
            if x % 2 == 1 && y % 2 == 1 {
                grid.set(coord, Tile::Hard);
                continue;
            }
            if safe.contains(&coord) {
                continue;
            }
            // One RNG draw per eligible cell, in row-major order
            if rng.random() < config.soft_block_density {
                grid.set(coord, Tile::Soft);
            }
        }
    }

    if config.require_reachable && !any_corners_connected(&grid) {
        return Err(ConfigError::UnreachableSpawns { seed: rng.seed() });
    }

    Ok(grid)
}

/// Check whether two spawn corners connect through empty and soft cells.
///
/// Soft blocks count as traversable because they can be bombed open.
#[must_use]
pub fn corners_reachable(grid: &Grid, from: Coord, to: Coord) -> bool {
    if from == to {
        return true;
    }
    let width = usize::from(grid.width());
    let height = usize::from(grid.height());
    let mut visited = vec![false; width * height];
    let mut queue = std::collections::VecDeque::new();

    let idx = |c: Coord| usize::from(c.y) * width + usize::from(c.x);
    visited[idx(from)] = true;
    queue.push_back(from);

    while let Some(coord) = queue.pop_front() {
        if coord == to {
            return true;
        }
        for dir in crate::game::Direction::CARDINAL {
            let Some(next) = grid.step(coord, dir) else {
                continue;
            };
            if visited[idx(next)] {
                continue;
            }
            let traversable = matches!(grid.get(next), Some(Tile::Empty | Tile::Soft));
            if traversable {
                visited[idx(next)] = true;
                queue.push_back(next);
            }
        }
    }
    false
}

/// Whether at least one pair of spawn corners connects.
#[must_use]
pub fn any_corners_connected(grid: &Grid) -> bool {
    let corners = spawn_corners();
    for i in 0..corners.len() {
        for j in (i + 1)..corners.len() {
            if corners_reachable(grid, corners[i], corners[j]) {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generate(seed: u64, density: f64) -> Grid {
        let config = GameConfig {
            seed,
            soft_block_density: density,
            ..GameConfig::default()
        };
        let mut rng = SeededRng::new(seed);
        generate_grid(&config, &mut rng).unwrap()
    }

    #[test]
    fn test_hard_lattice_at_odd_odd() {
        let grid = generate(42, 0.4);
        for (coord, tile) in grid.iter() {
            if coord.x % 2 == 1 && coord.y % 2 == 1 {
                assert_eq!(tile, Tile::Hard, "expected hard block at {coord:?}");
            } else {
                assert_ne!(tile, Tile::Hard, "unexpected hard block at {coord:?}");
            }
        }
    }

    #[test]
    fn test_safe_zones_clear() {
        // Even at full density the corner L-shapes stay clear
        let grid = generate(7, 1.0);
        for coord in safe_zone_cells() {
            assert_eq!(grid.get(coord), Some(Tile::Empty), "safe zone at {coord:?}");
        }
    }

    #[test]
    fn test_full_density_fills_everything_else() {
        let grid = generate(7, 1.0);
        for (coord, tile) in grid.iter() {
            if safe_zone_cells().contains(&coord) || (coord.x % 2 == 1 && coord.y % 2 == 1) {
                continue;
            }
            assert_eq!(tile, Tile::Soft, "expected soft block at {coord:?}");
        }
    }

    #[test]
    fn test_zero_density_is_open() {
        let grid = generate(7, 0.0);
        assert_eq!(grid.count(Tile::Soft), 0);
    }

    #[test]
    fn test_generation_determinism() {
        let a = generate(1234, 0.4);
        let b = generate(1234, 0.4);
        assert_eq!(a, b);

        let c = generate(1235, 0.4);
        assert_ne!(a, c);
    }

    #[test]
    fn test_open_board_corners_reachable() {
        let grid = generate(1, 0.0);
        let corners = spawn_corners();
        for i in 0..corners.len() {
            for j in (i + 1)..corners.len() {
                assert!(corners_reachable(&grid, corners[i], corners[j]));
            }
        }
    }

    #[test]
    fn test_reachability_blocked_by_hard_wall() {
        let mut grid = Grid::new(5, 5).unwrap();
        for y in 0..5 {
            grid.set(Coord::new(2, y), Tile::Hard);
        }
        assert!(!corners_reachable(&grid, Coord::new(0, 0), Coord::new(4, 0)));
        assert!(corners_reachable(&grid, Coord::new(0, 0), Coord::new(0, 4)));
    }

    #[test]
    fn test_soft_blocks_count_as_traversable() {
        let mut grid = Grid::new(5, 1).unwrap();
        grid.set(Coord::new(2, 0), Tile::Soft);
        assert!(corners_reachable(&grid, Coord::new(0, 0), Coord::new(4, 0)));
    }

    #[test]
    fn test_require_reachable_rejects_sealed_world() {
        // Density 1.0 still leaves safe zones open, and soft blocks are
        // traversable, so a sealed world needs a handcrafted check instead:
        // verify the flag is honored by the happy path at least.
        let config = GameConfig {
            seed: 3,
            require_reachable: true,
            soft_block_density: 0.4,
            ..GameConfig::default()
        };
        let mut rng = SeededRng::new(3);
        assert!(generate_grid(&config, &mut rng).is_ok());
    }
}

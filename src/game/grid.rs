//! Board terrain: coordinates, directions, tiles, grid.
//!
//! Terrain is a pure enum. Bombs never live inside the grid; "cell contains
//! a bomb" is answered by the simulation's entity index.

use serde::{Deserialize, Serialize};

/// A cell coordinate on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coord {
    /// X coordinate (column).
    pub x: u16,
    /// Y coordinate (row).
    pub y: u16,
}

impl Coord {
    /// Create a new coordinate.
    #[must_use]
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }

    /// Chess-notation label: file `'A' + x`, rank `height - y`.
    #[must_use]
    pub fn notation(&self, height: u16) -> String {
        #[allow(clippy::cast_possible_truncation)]
        let file = (b'A' + self.x as u8) as char;
        format!("{file}{}", height - self.y)
    }
}

/// One of the five move directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Decrease y.
    Up,
    /// Increase y.
    Down,
    /// Decrease x.
    Left,
    /// Increase x.
    Right,
    /// Remain on the current cell.
    Stay,
}

impl Direction {
    /// All five directions, in prompt order.
    pub const ALL: [Direction; 5] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
        Direction::Stay,
    ];

    /// The four cardinal directions (no `Stay`).
    pub const CARDINAL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// The `(dx, dy)` cell delta for this direction.
    #[must_use]
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
            Direction::Stay => (0, 0),
        }
    }

    /// Lowercase wire name, as used in the move schema.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::Stay => "stay",
        }
    }

    /// Parse a wire name back into a direction.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "up" => Some(Direction::Up),
            "down" => Some(Direction::Down),
            "left" => Some(Direction::Left),
            "right" => Some(Direction::Right),
            "stay" => Some(Direction::Stay),
            _ => None,
        }
    }
}

/// Terrain of a single cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Tile {
    /// Open floor.
    Empty = 0,
    /// Breakable block; worth points when destroyed, stops explosions.
    Soft = 1,
    /// Indestructible block; never mutated, stops explosions.
    Hard = 2,
}

impl Tile {
    /// Whether a player can stand on this terrain.
    #[must_use]
    pub const fn is_passable(self) -> bool {
        matches!(self, Tile::Empty)
    }
}

/// The board terrain, indexed `[y][x]`, row-major.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    width: u16,
    height: u16,
    tiles: Vec<Tile>,
}

impl Grid {
    /// Create a grid filled with empty tiles.
    ///
    /// Returns `None` when either dimension is zero.
    #[must_use]
    pub fn new(width: u16, height: u16) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        let size = usize::from(width) * usize::from(height);
        Some(Self {
            width,
            height,
            tiles: vec![Tile::Empty; size],
        })
    }

    /// Board width in cells.
    #[must_use]
    pub const fn width(&self) -> u16 {
        self.width
    }

    /// Board height in cells.
    #[must_use]
    pub const fn height(&self) -> u16 {
        self.height
    }

    /// Check whether a coordinate is on the board.
    #[must_use]
    pub const fn in_bounds(&self, coord: Coord) -> bool {
        coord.x < self.width && coord.y < self.height
    }

    fn index(&self, coord: Coord) -> Option<usize> {
        if self.in_bounds(coord) {
            Some(usize::from(coord.y) * usize::from(self.width) + usize::from(coord.x))
        } else {
            None
        }
    }

    /// Terrain at a coordinate, or `None` out of bounds.
    #[must_use]
    pub fn get(&self, coord: Coord) -> Option<Tile> {
        self.index(coord).map(|i| self.tiles[i])
    }

    /// Set the terrain at a coordinate.
    ///
    /// Returns `false` when the coordinate is out of bounds.
    pub fn set(&mut self, coord: Coord, tile: Tile) -> bool {
        if let Some(i) = self.index(coord) {
            self.tiles[i] = tile;
            true
        } else {
            false
        }
    }

    /// Apply a direction to a coordinate, staying in bounds.
    ///
    /// Returns `None` when the step would leave the board.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn step(&self, from: Coord, direction: Direction) -> Option<Coord> {
        let (dx, dy) = direction.delta();
        let x = i32::from(from.x) + dx;
        let y = i32::from(from.y) + dy;
        if x < 0 || y < 0 || x >= i32::from(self.width) || y >= i32::from(self.height) {
            return None;
        }
        Some(Coord::new(x as u16, y as u16))
    }

    /// Apply a direction with toroidal wrap-around (used by bomb throws).
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn step_wrapping(&self, from: Coord, direction: Direction) -> Coord {
        let (dx, dy) = direction.delta();
        let x = (i32::from(from.x) + dx).rem_euclid(i32::from(self.width));
        let y = (i32::from(from.y) + dy).rem_euclid(i32::from(self.height));
        Coord::new(x as u16, y as u16)
    }

    /// Iterate over all coordinates and tiles.
    pub fn iter(&self) -> impl Iterator<Item = (Coord, Tile)> + '_ {
        self.tiles.iter().enumerate().map(|(idx, tile)| {
            #[allow(clippy::cast_possible_truncation)]
            let x = (idx % usize::from(self.width)) as u16;
            #[allow(clippy::cast_possible_truncation)]
            let y = (idx / usize::from(self.width)) as u16;
            (Coord::new(x, y), *tile)
        })
    }

    /// Count cells holding a given terrain.
    #[must_use]
    pub fn count(&self, tile: Tile) -> usize {
        self.tiles.iter().filter(|t| **t == tile).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_creation() {
        let grid = Grid::new(13, 11).unwrap();
        assert_eq!(grid.width(), 13);
        assert_eq!(grid.height(), 11);
        assert_eq!(grid.count(Tile::Empty), 13 * 11);
        assert!(Grid::new(0, 5).is_none());
    }

    #[test]
    fn test_get_set() {
        let mut grid = Grid::new(13, 11).unwrap();
        let coord = Coord::new(3, 4);
        assert_eq!(grid.get(coord), Some(Tile::Empty));
        assert!(grid.set(coord, Tile::Soft));
        assert_eq!(grid.get(coord), Some(Tile::Soft));
        assert!(!grid.set(Coord::new(13, 0), Tile::Hard));
        assert_eq!(grid.get(Coord::new(0, 11)), None);
    }

    #[test]
    fn test_step_bounds() {
        let grid = Grid::new(13, 11).unwrap();
        assert_eq!(grid.step(Coord::new(0, 0), Direction::Up), None);
        assert_eq!(grid.step(Coord::new(0, 0), Direction::Left), None);
        assert_eq!(
            grid.step(Coord::new(0, 0), Direction::Down),
            Some(Coord::new(0, 1))
        );
        assert_eq!(
            grid.step(Coord::new(12, 10), Direction::Right),
            None
        );
        assert_eq!(
            grid.step(Coord::new(5, 5), Direction::Stay),
            Some(Coord::new(5, 5))
        );
    }

    #[test]
    fn test_step_wrapping() {
        let grid = Grid::new(13, 11).unwrap();
        assert_eq!(
            grid.step_wrapping(Coord::new(0, 0), Direction::Left),
            Coord::new(12, 0)
        );
        assert_eq!(
            grid.step_wrapping(Coord::new(12, 10), Direction::Down),
            Coord::new(12, 0)
        );
    }

    #[test]
    fn test_direction_roundtrip() {
        for dir in Direction::ALL {
            assert_eq!(Direction::parse(dir.as_str()), Some(dir));
        }
        assert_eq!(Direction::parse("diagonal"), None);
    }

    #[test]
    fn test_chess_notation() {
        // On a height-11 board: (0,0) is A11, (12,10) is M1
        assert_eq!(Coord::new(0, 0).notation(11), "A11");
        assert_eq!(Coord::new(12, 10).notation(11), "M1");
        assert_eq!(Coord::new(1, 10).notation(11), "B1");
    }
}

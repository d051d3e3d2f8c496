//! # Game Module
//!
//! Core crawl state, the tile grid, doors, entities and enemy AI.
//!
//! This module contains the fundamental building blocks of a crawl:
//! - Tile and grid representation
//! - Door classification and room transitions
//! - Player and enemy entities with their movement classes
//! - The enemy AI engine and the turn controller

pub mod ai;
pub mod doors;
pub mod entities;
pub mod state;
pub mod world;

pub use ai::*;
pub use doors::*;
pub use entities::*;
pub use state::*;
pub use world::*;

use serde::{Deserialize, Serialize};

/// A cell address on a room grid, row first.
///
/// # Examples
///
/// ```
/// use delver::Position;
///
/// let pos = Position::new(5, 10);
/// assert_eq!(pos.row, 5);
/// assert_eq!(pos.col, 10);
///
/// let adjacent = pos.cardinal_adjacent_positions();
/// assert_eq!(adjacent.len(), 4);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub row: i32,
    pub col: i32,
}

impl Position {
    /// Creates a new position with the given coordinates.
    pub fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// Returns the origin position (0, 0).
    pub fn origin() -> Self {
        Self::new(0, 0)
    }

    /// Calculates the Manhattan distance to another position.
    ///
    /// # Examples
    ///
    /// ```
    /// use delver::Position;
    ///
    /// let pos1 = Position::new(0, 0);
    /// let pos2 = Position::new(3, 4);
    /// assert_eq!(pos1.manhattan_distance(pos2), 7);
    /// ```
    pub fn manhattan_distance(self, other: Position) -> u32 {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col)
    }

    /// Calculates the Chebyshev (king-move) distance to another position.
    pub fn chebyshev_distance(self, other: Position) -> u32 {
        self.row.abs_diff(other.row).max(self.col.abs_diff(other.col))
    }

    /// Returns the 4 cardinal neighbours in north, south, west, east order.
    ///
    /// Breadth-first searches expand neighbours in this order, so it also
    /// fixes how ties between equally short paths are broken.
    pub fn cardinal_adjacent_positions(self) -> [Position; 4] {
        Direction::all().map(|direction| self + direction.to_delta())
    }

    /// Moves one cell in the given direction.
    pub fn step(self, direction: Direction) -> Position {
        self + direction.to_delta()
    }
}

impl std::ops::Add for Position {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self::new(self.row + other.row, self.col + other.col)
    }
}

impl std::ops::Sub for Position {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self::new(self.row - other.row, self.col - other.col)
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Cardinal directions for movement, room-graph growth and wall sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    West,
    East,
}

impl Direction {
    /// Converts a direction to a position delta.
    ///
    /// # Examples
    ///
    /// ```
    /// use delver::{Direction, Position};
    ///
    /// assert_eq!(Direction::North.to_delta(), Position::new(-1, 0));
    /// assert_eq!(Direction::East.to_delta(), Position::new(0, 1));
    /// ```
    pub fn to_delta(self) -> Position {
        match self {
            Direction::North => Position::new(-1, 0),
            Direction::South => Position::new(1, 0),
            Direction::West => Position::new(0, -1),
            Direction::East => Position::new(0, 1),
        }
    }

    /// Converts a position delta to a direction.
    ///
    /// Returns None if the delta is not a single cardinal step.
    pub fn from_delta(delta: Position) -> Option<Direction> {
        match (delta.row, delta.col) {
            (-1, 0) => Some(Direction::North),
            (1, 0) => Some(Direction::South),
            (0, -1) => Some(Direction::West),
            (0, 1) => Some(Direction::East),
            _ => None,
        }
    }

    /// Returns the reverse direction.
    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
            Direction::East => Direction::West,
        }
    }

    /// The wall a room must open to reach its neighbour in this direction.
    pub fn wall_side(self) -> WallSide {
        match self {
            Direction::North => WallSide::Top,
            Direction::South => WallSide::Bottom,
            Direction::West => WallSide::Left,
            Direction::East => WallSide::Right,
        }
    }

    /// Returns all 4 directions in search order.
    pub fn all() -> [Direction; 4] {
        [
            Direction::North,
            Direction::South,
            Direction::West,
            Direction::East,
        ]
    }
}

/// Why a player move was turned into a no-op.
///
/// None of these are faults. The player stays where they were and the turn
/// ends without an enemy pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveRefusal {
    /// The target cell lies outside the grid
    OutOfBounds,
    /// The target cell is a wall or water
    Blocked,
    /// A two-way door with no recorded connection
    DeadEndDoor,
    /// The connected room has no door to arrive through
    UnreachableDestinationDoor,
}

impl MoveRefusal {
    /// Narrative line shown to the player, if the refusal deserves one.
    pub fn narrative(self) -> Option<&'static str> {
        match self {
            MoveRefusal::OutOfBounds | MoveRefusal::Blocked => None,
            MoveRefusal::DeadEndDoor => Some("This door doesn't seem to lead anywhere..."),
            MoveRefusal::UnreachableDestinationDoor => Some("The way forward is sealed."),
        }
    }
}

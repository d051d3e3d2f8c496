//! # Doors and Transitions
//!
//! Wall-side classification of grid cells, door lookup, spawn cells, and the
//! resolution of a two-way door into the room on the other side.

use crate::game::{Dungeon, Grid, MoveRefusal, Position, Tile};
use crate::generation::DoorPlacement;
use serde::{Deserialize, Serialize};

/// Which wall of a room a cell sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WallSide {
    Top,
    Bottom,
    Left,
    Right,
    Unknown,
}

impl WallSide {
    /// The four real walls, in the order breadth-first searches expand them.
    pub const CARDINAL: [WallSide; 4] = [
        WallSide::Top,
        WallSide::Bottom,
        WallSide::Left,
        WallSide::Right,
    ];

    /// Classifies a cell by the wall it lies on.
    ///
    /// Column checks run before row checks, so corners belong to the left or
    /// right wall.
    ///
    /// # Examples
    ///
    /// ```
    /// use delver::{Grid, Position, Tile, WallSide};
    ///
    /// let grid = Grid::new(5, 4, Tile::Floor);
    /// assert_eq!(WallSide::of(Position::new(0, 0), &grid), WallSide::Left);
    /// assert_eq!(WallSide::of(Position::new(0, 2), &grid), WallSide::Top);
    /// assert_eq!(WallSide::of(Position::new(2, 2), &grid), WallSide::Unknown);
    /// ```
    pub fn of(pos: Position, grid: &Grid) -> WallSide {
        if pos.col == 0 {
            WallSide::Left
        } else if pos.col == grid.max_col() {
            WallSide::Right
        } else if pos.row == 0 {
            WallSide::Top
        } else if pos.row == grid.max_row() {
            WallSide::Bottom
        } else {
            WallSide::Unknown
        }
    }

    pub fn opposite(self) -> WallSide {
        match self {
            WallSide::Left => WallSide::Right,
            WallSide::Right => WallSide::Left,
            WallSide::Top => WallSide::Bottom,
            WallSide::Bottom => WallSide::Top,
            WallSide::Unknown => WallSide::Unknown,
        }
    }

    /// Whether the cell lies on this wall.
    pub fn contains(self, pos: Position, grid: &Grid) -> bool {
        match self {
            WallSide::Left => pos.col == 0,
            WallSide::Right => pos.col == grid.max_col(),
            WallSide::Top => pos.row == 0,
            WallSide::Bottom => pos.row == grid.max_row(),
            WallSide::Unknown => false,
        }
    }

    /// Step that leads from this wall into the room.
    pub fn inward(self) -> Position {
        match self {
            WallSide::Left => Position::new(0, 1),
            WallSide::Right => Position::new(0, -1),
            WallSide::Top => Position::new(1, 0),
            WallSide::Bottom => Position::new(-1, 0),
            WallSide::Unknown => Position::origin(),
        }
    }

    /// Every cell of this wall, ordered along the wall.
    pub fn cells(self, grid: &Grid) -> Vec<Position> {
        match self {
            WallSide::Left => (0..=grid.max_row()).map(|row| Position::new(row, 0)).collect(),
            WallSide::Right => (0..=grid.max_row())
                .map(|row| Position::new(row, grid.max_col()))
                .collect(),
            WallSide::Top => (0..=grid.max_col()).map(|col| Position::new(0, col)).collect(),
            WallSide::Bottom => (0..=grid.max_col())
                .map(|col| Position::new(grid.max_row(), col))
                .collect(),
            WallSide::Unknown => Vec::new(),
        }
    }

    /// The middle cell of this wall.
    pub fn midpoint(self, grid: &Grid) -> Position {
        let mid_row = grid.height() as i32 / 2;
        let mid_col = grid.width() as i32 / 2;
        match self {
            WallSide::Left => Position::new(mid_row, 0),
            WallSide::Right => Position::new(mid_row, grid.max_col()),
            WallSide::Top => Position::new(0, mid_col),
            WallSide::Bottom => Position::new(grid.max_row(), mid_col),
            WallSide::Unknown => Position::new(mid_row, mid_col),
        }
    }
}

/// Doors of `kind` on `side`, sorted by row for left/right walls and by
/// column for top/bottom walls.
pub fn door_positions_on_side(grid: &Grid, side: WallSide, kind: Tile) -> Vec<Position> {
    let mut doors: Vec<Position> = grid
        .find(kind)
        .into_iter()
        .filter(|&pos| side.contains(pos, grid))
        .collect();

    match side {
        WallSide::Left | WallSide::Right => doors.sort_by_key(|pos| (pos.row, pos.col)),
        _ => doors.sort_by_key(|pos| (pos.col, pos.row)),
    }
    doors
}

/// The cell one step inward from a door.
///
/// Falls back to the door itself when the inward cell blocks or lies outside
/// the grid.
pub fn spawn_in_front_of(grid: &Grid, door: Position, side: WallSide) -> Position {
    let inward = door + side.inward();
    match grid.get(inward) {
        Some(tile) if !tile.is_blocking() => inward,
        _ => door,
    }
}

/// Carves a floor cell beside `spawn` when all four neighbours block.
///
/// Returns the carved cell, if any.
pub fn ensure_spawn_space(grid: &mut Grid, spawn: Position) -> Option<Position> {
    let boxed_in = spawn
        .cardinal_adjacent_positions()
        .into_iter()
        .filter_map(|pos| grid.get(pos))
        .all(Tile::is_blocking);
    if !boxed_in {
        return None;
    }

    let carve = if spawn.col < grid.max_col() {
        Position::new(spawn.row, spawn.col + 1)
    } else {
        Position::new(spawn.row, spawn.col - 1)
    };
    grid.set(carve, Tile::Floor).ok().map(|_| carve)
}

/// Where the player lands after walking through a two-way door.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arrival {
    pub room: String,
    pub entry_side: WallSide,
    pub door: Position,
    pub spawn: Position,
}

/// Resolves a step onto a two-way door at `door` of `room`.
///
/// The destination door is the first two-way door on the wall facing back
/// toward `room`. With midpoint doors a missing entry-side door falls back to
/// the first two-way door anywhere in the destination, row-major.
pub fn resolve_transition(
    dungeon: &Dungeon,
    room: &str,
    grid: &Grid,
    door: Position,
) -> Result<Arrival, MoveRefusal> {
    let exit_side = WallSide::of(door, grid);
    let destination = dungeon
        .connected_room(room, exit_side)
        .ok_or(MoveRefusal::DeadEndDoor)?;
    let next = dungeon
        .room(destination)
        .map_err(|_| MoveRefusal::DeadEndDoor)?;

    let entry_side = exit_side.opposite();
    let mut doors = door_positions_on_side(&next.grid, entry_side, Tile::DoorTwoWay);
    if doors.is_empty() && dungeon.door_placement == DoorPlacement::Midpoint {
        doors = next.grid.find(Tile::DoorTwoWay);
    }
    let anchor = doors
        .first()
        .copied()
        .ok_or(MoveRefusal::UnreachableDestinationDoor)?;

    Ok(Arrival {
        room: destination.to_string(),
        entry_side,
        door: anchor,
        spawn: spawn_in_front_of(&next.grid, anchor, entry_side),
    })
}

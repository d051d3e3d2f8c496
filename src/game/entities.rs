//! # Entities
//!
//! The player and the enemies that share a room grid with them.

use crate::game::{Grid, Position, Tile};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// How an enemy is allowed to move.
///
/// Each class carries its own step permission; the AI engine asks the class
/// rather than branching on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementClass {
    /// Walks plain walkable tiles, wanders when it cannot reach the player
    Regular,
    /// Walks a fixed route until it sees the player
    Patrol,
    /// Charges across traps and water, and dies on them
    Reckless,
    /// Flies over everything except walls
    Flying,
}

impl MovementClass {
    pub const ALL: [MovementClass; 4] = [
        MovementClass::Regular,
        MovementClass::Patrol,
        MovementClass::Reckless,
        MovementClass::Flying,
    ];

    /// The class an enemy tile stands for.
    pub fn from_tile(tile: Tile) -> Option<Self> {
        match tile {
            Tile::EnemyRegular => Some(MovementClass::Regular),
            Tile::EnemyPatrol => Some(MovementClass::Patrol),
            Tile::EnemyReckless => Some(MovementClass::Reckless),
            Tile::EnemyFlying => Some(MovementClass::Flying),
            _ => None,
        }
    }

    /// The tile drawn for an enemy of this class.
    pub fn tile(self) -> Tile {
        match self {
            MovementClass::Regular => Tile::EnemyRegular,
            MovementClass::Patrol => Tile::EnemyPatrol,
            MovementClass::Reckless => Tile::EnemyReckless,
            MovementClass::Flying => Tile::EnemyFlying,
        }
    }

    /// Whether an enemy of this class may step onto `tile`.
    ///
    /// # Examples
    ///
    /// ```
    /// use delver::{MovementClass, Tile};
    ///
    /// assert!(!MovementClass::Regular.permits(Tile::Trap));
    /// assert!(MovementClass::Reckless.permits(Tile::Water));
    /// assert!(MovementClass::Flying.permits(Tile::Water));
    /// assert!(!MovementClass::Flying.permits(Tile::WallVertical));
    /// ```
    pub fn permits(self, tile: Tile) -> bool {
        match self {
            MovementClass::Regular | MovementClass::Patrol => {
                tile.is_walkable() && !tile.is_hazard()
            }
            MovementClass::Reckless => tile.is_walkable() || tile.is_hazard(),
            MovementClass::Flying => !tile.is_wall() && !tile.is_entity(),
        }
    }

    /// Whether stepping onto `tile` kills an enemy of this class.
    pub fn is_fatal(self, tile: Tile) -> bool {
        self == MovementClass::Reckless && tile.is_hazard()
    }
}

/// The player's presence on the live grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub position: Position,
    /// Tile restored when the player steps away
    pub under: Tile,
}

impl Player {
    pub fn new(position: Position, under: Tile) -> Self {
        Self { position, under }
    }
}

/// An enemy in the active room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enemy {
    pub position: Position,
    pub class: MovementClass,
    /// Remaining patrol route, consumed front to back and recycled
    pub patrol: VecDeque<Position>,
    /// Tile restored when the enemy steps away
    pub under: Tile,
    /// Set after a chase; the route is rebuilt from wherever the enemy ends up
    pub off_route: bool,
}

impl Enemy {
    pub fn new(position: Position, class: MovementClass) -> Self {
        Self {
            position,
            class,
            patrol: VecDeque::new(),
            under: Tile::Floor,
            off_route: false,
        }
    }

    /// Scans a grid for enemy tiles in row-major order.
    ///
    /// Patrol enemies get their route synthesized from where they stand.
    pub fn scan(grid: &Grid) -> Vec<Enemy> {
        grid.positions()
            .filter_map(|pos| {
                let class = grid.get(pos).and_then(MovementClass::from_tile)?;
                let mut enemy = Enemy::new(pos, class);
                if class == MovementClass::Patrol {
                    enemy.patrol = crate::game::ai::synthesize_patrol(grid, class, pos);
                }
                Some(enemy)
            })
            .collect()
    }
}

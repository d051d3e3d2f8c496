//! # Generation Module
//!
//! Procedural generation of rooms and the dungeons they make up.
//!
//! Rooms are generated from a level's numeric parameters and then grown into
//! a connected dungeon by a randomized frontier expansion over an abstract
//! room-graph coordinate space. Everything is driven by a seeded [`StdRng`],
//! so a seed and a level record reproduce the same dungeon.

pub mod dungeon;
pub mod levels;
pub mod rooms;

pub use dungeon::*;
pub use levels::*;
pub use rooms::*;

use crate::game::{door_positions_on_side, Direction, Grid, Position, Tile, WallSide};
use crate::{config, DelverError, DelverResult};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What kind of location a level record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LevelKind {
    /// A procedurally generated dungeon crawl
    #[default]
    #[serde(rename = "dung")]
    Dungeon,
    #[serde(rename = "buff")]
    Buff,
    #[serde(rename = "shop")]
    Shop,
    #[serde(rename = "boss")]
    Boss,
}

impl LevelKind {
    /// Only dungeons are crawled; other kinds are handled elsewhere.
    pub fn is_crawl(self) -> bool {
        self == LevelKind::Dungeon
    }
}

impl std::fmt::Display for LevelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LevelKind::Dungeon => "dungeon",
            LevelKind::Buff => "buff",
            LevelKind::Shop => "shop",
            LevelKind::Boss => "boss",
        };
        write!(f, "{}", name)
    }
}

/// Relative weights of the four enemy movement classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyMix {
    pub regular: u32,
    pub patrol: u32,
    pub reckless: u32,
    pub flying: u32,
}

impl EnemyMix {
    /// Weights in [`crate::MovementClass::ALL`] order.
    pub fn weights(&self) -> [u32; 4] {
        [self.regular, self.patrol, self.reckless, self.flying]
    }

    /// A mix that only ever produces regular enemies.
    pub fn regular_only() -> Self {
        Self {
            regular: 1,
            patrol: 0,
            reckless: 0,
            flying: 0,
        }
    }
}

impl Default for EnemyMix {
    fn default() -> Self {
        Self {
            regular: 4,
            patrol: 2,
            reckless: 1,
            flying: 1,
        }
    }
}

fn default_enemy_range() -> (u32, u32) {
    (1, 2)
}

fn default_trap_chance() -> f64 {
    0.05
}

fn default_pond_chance() -> f64 {
    0.2
}

fn default_num_rooms() -> usize {
    6
}

fn default_deadend_chance() -> f64 {
    0.3
}

fn default_weight() -> f64 {
    1.0
}

/// Per-level generation record, as stored in the level table.
///
/// Missing fields fall back to their defaults.
///
/// # Examples
///
/// ```
/// use delver::{LevelKind, LevelParams};
///
/// let params: LevelParams = serde_json::from_str(r#"{"num_rooms": 3, "type": "dung"}"#).unwrap();
/// assert_eq!(params.num_rooms, 3);
/// assert_eq!(params.enemy_range, (1, 2));
/// assert_eq!(params.kind, LevelKind::Dungeon);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelParams {
    /// Inclusive bounds on enemies per room
    #[serde(default = "default_enemy_range")]
    pub enemy_range: (u32, u32),
    /// Per-cell trap probability
    #[serde(default = "default_trap_chance")]
    pub trap_chance: f64,
    /// Per-attempt pond probability
    #[serde(default = "default_pond_chance")]
    pub pond_chance: f64,
    /// Target room count
    #[serde(default = "default_num_rooms")]
    pub num_rooms: usize,
    /// Chance that a new room is not expanded further
    #[serde(default = "default_deadend_chance")]
    pub deadend_chance: f64,
    /// Weight when offering this level as a path
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default)]
    pub kind: LevelKind,
    #[serde(default)]
    pub enemy_mix: EnemyMix,
}

impl Default for LevelParams {
    fn default() -> Self {
        Self {
            enemy_range: default_enemy_range(),
            trap_chance: default_trap_chance(),
            pond_chance: default_pond_chance(),
            num_rooms: default_num_rooms(),
            deadend_chance: default_deadend_chance(),
            weight: default_weight(),
            description: String::new(),
            kind: LevelKind::default(),
            enemy_mix: EnemyMix::default(),
        }
    }
}

impl LevelParams {
    /// Rejects records that generation cannot honour.
    pub fn validate(&self) -> DelverResult<()> {
        let probabilities = [
            ("trap_chance", self.trap_chance),
            ("pond_chance", self.pond_chance),
            ("deadend_chance", self.deadend_chance),
        ];
        for (name, value) in probabilities {
            if !(0.0..=1.0).contains(&value) {
                return Err(DelverError::GenerationFailed(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }

        let (min, max) = self.enemy_range;
        if min > max {
            return Err(DelverError::GenerationFailed(format!(
                "enemy_range is inverted: ({}, {})",
                min, max
            )));
        }
        if self.num_rooms == 0 {
            return Err(DelverError::GenerationFailed(
                "num_rooms must be at least 1".to_string(),
            ));
        }
        if !(self.weight >= 0.0 && self.weight.is_finite()) {
            return Err(DelverError::GenerationFailed(format!(
                "weight must be a non-negative number, got {}",
                self.weight
            )));
        }
        Ok(())
    }
}

/// How the door pair between two neighbouring rooms is carved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DoorPlacement {
    /// Middle of each facing wall
    #[default]
    Midpoint,
    /// A random usable cell on each facing wall; a wall may end up without one
    Randomized,
}

/// Configuration for procedural generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Random seed for reproducible generation
    pub seed: u64,
    /// Identity of the level being generated
    pub level_key: String,
    /// Numeric parameters of that level
    pub level: LevelParams,
    pub door_placement: DoorPlacement,
    /// Attempts made to find a free floor cell before giving up
    pub max_placement_attempts: u32,
}

impl GenerationConfig {
    /// Creates a configuration with default level parameters.
    ///
    /// # Examples
    ///
    /// ```
    /// use delver::{DoorPlacement, GenerationConfig};
    ///
    /// let config = GenerationConfig::new(42);
    /// assert_eq!(config.level.num_rooms, 6);
    /// assert_eq!(config.door_placement, DoorPlacement::Midpoint);
    /// ```
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            level_key: "dungeon".to_string(),
            level: LevelParams::default(),
            door_placement: DoorPlacement::Midpoint,
            max_placement_attempts: config::MAX_PLACEMENT_ATTEMPTS,
        }
    }

    /// Creates a configuration for testing with small, quiet dungeons.
    pub fn for_testing(seed: u64) -> Self {
        Self {
            level: LevelParams {
                enemy_range: (0, 1),
                trap_chance: 0.02,
                pond_chance: 0.1,
                num_rooms: 4,
                deadend_chance: 0.2,
                ..LevelParams::default()
            },
            level_key: "test".to_string(),
            ..Self::new(seed)
        }
    }

    /// Creates a configuration for a named level record.
    pub fn for_level(seed: u64, level_key: impl Into<String>, level: LevelParams) -> Self {
        Self {
            level_key: level_key.into(),
            level,
            ..Self::new(seed)
        }
    }

    pub fn with_door_placement(mut self, door_placement: DoorPlacement) -> Self {
        self.door_placement = door_placement;
        self
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self::new(42)
    }
}

/// Abstract room-graph coordinate, not a tile position.
///
/// North decreases `y`, west decreases `x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RoomCoord {
    pub x: i32,
    pub y: i32,
}

impl RoomCoord {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn origin() -> Self {
        Self::new(0, 0)
    }

    /// The neighbouring coordinate in `direction`.
    pub fn step(self, direction: Direction) -> RoomCoord {
        let delta = direction.to_delta();
        RoomCoord::new(self.x + delta.col, self.y + delta.row)
    }
}

/// A named room grid placed at a room-graph coordinate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub name: String,
    pub grid: Grid,
    pub coord: RoomCoord,
}

impl Room {
    pub fn new(name: impl Into<String>, grid: Grid, coord: RoomCoord) -> Self {
        Self {
            name: name.into(),
            grid,
            coord,
        }
    }

    /// Doors of either kind on each wall, sorted along the wall.
    pub fn doors(&self) -> BTreeMap<WallSide, Vec<Position>> {
        WallSide::CARDINAL
            .into_iter()
            .map(|side| {
                let mut doors = door_positions_on_side(&self.grid, side, Tile::DoorTwoWay);
                doors.extend(door_positions_on_side(&self.grid, side, Tile::DoorOneWay));
                doors.sort_by_key(|pos| match side {
                    WallSide::Left | WallSide::Right => (pos.row, pos.col),
                    _ => (pos.col, pos.row),
                });
                (side, doors)
            })
            .filter(|(_, doors)| !doors.is_empty())
            .collect()
    }
}

/// Trait for procedural generators.
///
/// All generation systems implement this trait so they share a seeded,
/// reproducible interface.
pub trait Generator<T> {
    /// Generates content using the provided configuration and random number generator.
    fn generate(&self, config: &GenerationConfig, rng: &mut StdRng) -> DelverResult<T>;

    /// Validates that the generated content meets requirements.
    fn validate(&self, content: &T, config: &GenerationConfig) -> DelverResult<()>;

    /// Gets the generator type name for logging and debugging.
    fn generator_type(&self) -> &'static str;
}

/// Utility functions for generation algorithms.
pub mod utils {
    use super::*;
    use rand::{Rng, SeedableRng};

    /// Creates a seeded random number generator.
    pub fn create_rng(seed: u64) -> StdRng {
        StdRng::seed_from_u64(seed)
    }

    /// Draws random interior cells until one holds floor.
    ///
    /// Returns `None` after `attempts` misses.
    pub fn random_interior_floor(
        grid: &Grid,
        rng: &mut StdRng,
        attempts: u32,
    ) -> Option<Position> {
        if grid.height() < 3 || grid.width() < 3 {
            return None;
        }
        (0..attempts).find_map(|_| {
            let pos = Position::new(
                rng.gen_range(1..grid.max_row()),
                rng.gen_range(1..grid.max_col()),
            );
            (grid.get(pos) == Some(Tile::Floor)).then_some(pos)
        })
    }
}

//! # Delver
//!
//! A turn-based, grid-oriented dungeon crawl engine.
//!
//! ## Architecture Overview
//!
//! Delver grows a dungeon out of procedurally generated rooms and then runs a
//! strictly turn-based crawl through it. The core pieces are:
//!
//! - **World**: tiles, their categories, and the row-major room grid
//! - **Generation**: room shapes and hazards, grown into a connected room graph
//! - **Doors**: wall-side classification and room-to-room transitions
//! - **AI**: breadth-first chasing, patrol routes and line-of-sight gating
//! - **Crawl Session**: the single owner of the live grid, player and enemies
//!
//! Combat, inventory and character stats are not part of this crate. A crawl
//! ends with either [`CrawlState::Exited`] or [`CrawlState::Encounter`], the
//! latter carrying an [`EncounterHandoff`] for whatever system resolves fights.

pub mod game;
pub mod generation;
pub mod input;
pub mod rendering;

// Core module re-exports
pub use game::*;
pub use generation::*;
pub use input::*;
pub use rendering::*;

/// Core error type for the Delver engine.
///
/// Refused moves are not errors; they are reported as
/// [`CrawlEvent::MoveRefused`] inside a [`TurnReport`].
#[derive(thiserror::Error, Debug)]
pub enum DelverError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Session state is invalid
    #[error("Invalid game state: {0}")]
    InvalidState(String),

    /// Room map data could not be parsed
    #[error("Invalid room data: {0}")]
    InvalidRoomData(String),

    /// A grid write fell outside the grid
    #[error("Position ({row}, {col}) is outside the grid")]
    OutOfBounds { row: i32, col: i32 },

    /// A room name has no entry in the dungeon
    #[error("Unknown room: {0}")]
    UnknownRoom(String),

    /// A level name has no entry in the level table
    #[error("Unknown level: {0}")]
    UnknownLevel(String),

    /// Generation failed
    #[error("Generation failed: {0}")]
    GenerationFailed(String),
}

/// Result type used throughout the Delver codebase.
pub type DelverResult<T> = Result<T, DelverError>;

/// Version information for the engine.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Generation constants.
pub mod config {
    /// Side length bounds for square rooms
    pub const SQUARE_MIN_SIDE: usize = 15;
    pub const SQUARE_MAX_SIDE: usize = 20;

    /// Width and height bounds for rectangular rooms
    pub const RECT_MIN_WIDTH: usize = 18;
    pub const RECT_MAX_WIDTH: usize = 24;
    pub const RECT_MIN_HEIGHT: usize = 12;
    pub const RECT_MAX_HEIGHT: usize = 16;

    /// Radius bounds for disc rooms
    pub const DISC_MIN_RADIUS: usize = 8;
    pub const DISC_MAX_RADIUS: usize = 10;

    /// Slack added to the disc radius when rasterizing
    pub const DISC_RADIUS_SLACK: f64 = 0.3;

    /// Maximum number of ponds in a single room
    pub const MAX_PONDS: usize = 2;

    /// Attempts made to find a free floor cell before giving up
    pub const MAX_PLACEMENT_ATTEMPTS: u32 = 1000;

    /// Name of the entrance room in every generated dungeon
    pub const ENTRANCE_ROOM: &str = "enter";
}

//! # Room Generation
//!
//! Builds a single room grid: a square, rectangular or disc-shaped floor
//! plan, optionally an entrance door, then ponds, enemies and traps.

use crate::config;
use crate::game::{Grid, MovementClass, Position, Tile, WallSide};
use crate::generation::utils::random_interior_floor;
use crate::generation::{GenerationConfig, Generator};
use crate::{DelverError, DelverResult};
use log::{debug, warn};
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::Rng;

/// Floor plan of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomShape {
    Square { side: usize },
    Rectangle { width: usize, height: usize },
    /// Rasterized circle, `2 * radius + 1` cells across
    Disc { radius: usize },
}

impl RoomShape {
    /// Picks one of the three shapes uniformly, with dimensions inside the
    /// configured bounds.
    pub fn random(rng: &mut StdRng) -> Self {
        match rng.gen_range(0..3) {
            0 => RoomShape::Square {
                side: rng.gen_range(config::SQUARE_MIN_SIDE..=config::SQUARE_MAX_SIDE),
            },
            1 => RoomShape::Rectangle {
                width: rng.gen_range(config::RECT_MIN_WIDTH..=config::RECT_MAX_WIDTH),
                height: rng.gen_range(config::RECT_MIN_HEIGHT..=config::RECT_MAX_HEIGHT),
            },
            _ => RoomShape::Disc {
                radius: rng.gen_range(config::DISC_MIN_RADIUS..=config::DISC_MAX_RADIUS),
            },
        }
    }

    /// Rasterizes the bare floor plan with its wall ring.
    pub fn build(self) -> DelverResult<Grid> {
        match self {
            RoomShape::Square { side } => walled_rectangle(side, side),
            RoomShape::Rectangle { width, height } => walled_rectangle(width, height),
            RoomShape::Disc { radius } => disc(radius),
        }
    }
}

/// Floor with `=` along the top and bottom rows and `|` down the sides.
fn walled_rectangle(width: usize, height: usize) -> DelverResult<Grid> {
    let mut grid = Grid::new(width, height, Tile::Floor);
    let (max_row, max_col) = (grid.max_row(), grid.max_col());
    let border: Vec<Position> = grid
        .positions()
        .filter(|pos| pos.row == 0 || pos.row == max_row || pos.col == 0 || pos.col == max_col)
        .collect();

    for pos in border {
        let wall = if pos.row == 0 || pos.row == max_row {
            Tile::WallHorizontal
        } else {
            Tile::WallVertical
        };
        grid.set(pos, wall)?;
    }
    Ok(grid)
}

/// A disc of floor cells within `radius + slack` of the centre.
///
/// Void cells touching the floor across an edge become walls: above or below
/// the floor they are horizontal, beside it vertical. Void with no floor
/// neighbour is filled with horizontal wall.
fn disc(radius: usize) -> DelverResult<Grid> {
    let size = radius * 2 + 1;
    let centre = radius as f64;
    let reach = radius as f64 + config::DISC_RADIUS_SLACK;

    let mut floor = vec![false; size * size];
    for row in 0..size {
        for col in 0..size {
            let distance = ((row as f64 - centre).powi(2) + (col as f64 - centre).powi(2)).sqrt();
            floor[row * size + col] = distance <= reach;
        }
    }

    let mut grid = Grid::new(size, size, Tile::WallHorizontal);
    for pos in grid.positions().collect::<Vec<_>>() {
        let index = pos.row as usize * size + pos.col as usize;
        let is_floor = |p: Position| {
            p.row >= 0
                && p.col >= 0
                && (p.row as usize) < size
                && (p.col as usize) < size
                && floor[p.row as usize * size + p.col as usize]
        };

        let tile = if floor[index] {
            Tile::Floor
        } else if is_floor(pos + Position::new(0, -1)) || is_floor(pos + Position::new(0, 1)) {
            Tile::WallVertical
        } else {
            Tile::WallHorizontal
        };
        grid.set(pos, tile)?;
    }
    Ok(grid)
}

/// Generates one room grid from the level parameters in a
/// [`GenerationConfig`].
#[derive(Debug, Clone, Default)]
pub struct RoomGenerator {
    /// Entrance rooms get a one-way door at the middle of their left wall
    pub is_entrance: bool,
    /// Fixed floor plan; random when `None`
    pub shape: Option<RoomShape>,
}

impl RoomGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entrance() -> Self {
        Self {
            is_entrance: true,
            shape: None,
        }
    }

    pub fn with_shape(mut self, shape: RoomShape) -> Self {
        self.shape = Some(shape);
        self
    }

    fn add_ponds(
        &self,
        grid: &mut Grid,
        config: &GenerationConfig,
        rng: &mut StdRng,
    ) -> DelverResult<()> {
        let mut ponds = 0;
        let mut attempts = 0;
        while ponds < config::MAX_PONDS
            && attempts < config.max_placement_attempts
            && rng.gen_bool(config.level.pond_chance)
        {
            attempts += 1;
            if let Some(pos) = random_interior_floor(grid, rng, 1) {
                grid.set(pos, Tile::Water)?;
                ponds += 1;
            }
        }
        Ok(())
    }

    fn add_enemies(
        &self,
        grid: &mut Grid,
        config: &GenerationConfig,
        rng: &mut StdRng,
    ) -> DelverResult<()> {
        let (min, max) = config.level.enemy_range;
        let count = rng.gen_range(min..=max);
        let mix = WeightedIndex::new(config.level.enemy_mix.weights()).ok();

        let mut placed = 0;
        for _ in 0..count {
            let Some(pos) = random_interior_floor(grid, rng, config.max_placement_attempts) else {
                break;
            };
            let class = match &mix {
                Some(mix) => MovementClass::ALL[mix.sample(rng)],
                None => MovementClass::Regular,
            };
            grid.set(pos, class.tile())?;
            placed += 1;
        }

        if placed < count {
            warn!("Placed {} of {} enemies: no free floor left", placed, count);
        }
        Ok(())
    }

    /// Scatters traps over interior floor, keeping clear of existing doors.
    fn add_traps(
        &self,
        grid: &mut Grid,
        config: &GenerationConfig,
        rng: &mut StdRng,
    ) -> DelverResult<()> {
        let doors: Vec<Position> = grid
            .positions()
            .filter(|&pos| grid.get(pos).map_or(false, Tile::is_door))
            .collect();
        let interior: Vec<Position> = grid
            .positions()
            .filter(|pos| {
                pos.row > 0 && pos.col > 0 && pos.row < grid.max_row() && pos.col < grid.max_col()
            })
            .collect();

        for pos in interior {
            if grid.get(pos) != Some(Tile::Floor) || !rng.gen_bool(config.level.trap_chance) {
                continue;
            }
            if doors.iter().any(|&door| door.chebyshev_distance(pos) <= 1) {
                continue;
            }
            grid.set(pos, Tile::Trap)?;
        }
        Ok(())
    }
}

impl Generator<Grid> for RoomGenerator {
    fn generate(&self, config: &GenerationConfig, rng: &mut StdRng) -> DelverResult<Grid> {
        let shape = self.shape.unwrap_or_else(|| RoomShape::random(rng));
        let mut grid = shape.build()?;
        debug!("Generating {:?} room (entrance: {})", shape, self.is_entrance);

        if self.is_entrance {
            grid.set(WallSide::Left.midpoint(&grid), Tile::DoorOneWay)?;
        }

        self.add_ponds(&mut grid, config, rng)?;
        self.add_enemies(&mut grid, config, rng)?;
        self.add_traps(&mut grid, config, rng)?;

        self.validate(&grid, config)?;
        Ok(grid)
    }

    fn validate(&self, grid: &Grid, _config: &GenerationConfig) -> DelverResult<()> {
        if grid.count(Tile::Floor) + grid.count(Tile::Trap) == 0 {
            return Err(DelverError::GenerationFailed(
                "Room has no floor tiles".to_string(),
            ));
        }
        if self.is_entrance && grid.get(WallSide::Left.midpoint(grid)) != Some(Tile::DoorOneWay) {
            return Err(DelverError::GenerationFailed(
                "Entrance room lost its door".to_string(),
            ));
        }
        Ok(())
    }

    fn generator_type(&self) -> &'static str {
        "RoomGenerator"
    }
}

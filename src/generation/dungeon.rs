//! # Dungeon Generation
//!
//! Grows a set of rooms into a connected dungeon by randomized frontier
//! expansion over room-graph coordinates.
//!
//! The builder:
//! 1. Places the entrance at the origin and seeds the frontier with it
//! 2. Repeatedly expands a random frontier coordinate into its first free
//!    neighbour (directions shuffled), carving a door pair on the shared wall
//! 3. Re-admits new rooms to the frontier unless they roll a dead end
//! 4. Puts a one-way exit on the right wall of the room farthest from the
//!    entrance

use crate::config;
use crate::game::{
    door_positions_on_side, Direction, Dungeon, ExitTile, Grid, Position, Tile, WallSide,
};
use crate::generation::{
    utils, DoorPlacement, GenerationConfig, Generator, Room, RoomCoord, RoomGenerator,
};
use crate::{DelverError, DelverResult};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashMap;

/// Cells of `side` that can take a new door, nearest the wall's midpoint
/// first.
///
/// Corners, existing doors and cells whose inward neighbour is a wall are
/// skipped.
pub fn door_candidates(grid: &Grid, side: WallSide) -> Vec<Position> {
    let midpoint = side.midpoint(grid);
    let mut cells: Vec<Position> = side
        .cells(grid)
        .into_iter()
        .filter(|&pos| {
            let corner = match side {
                WallSide::Left | WallSide::Right => pos.row == 0 || pos.row == grid.max_row(),
                _ => pos.col == 0 || pos.col == grid.max_col(),
            };
            let free = grid.get(pos).map_or(false, |tile| !tile.is_door());
            let open_inward = grid
                .get(pos + side.inward())
                .map_or(false, |tile| !tile.is_wall());
            !corner && free && open_inward
        })
        .collect();

    cells.sort_by_key(|pos| pos.manhattan_distance(midpoint));
    cells
}

/// Carves a door of `kind` into `side` of `grid`.
///
/// Midpoint placement uses the middle of the wall unless a door already sits
/// there, then the nearest candidate. Randomized placement picks any
/// candidate, and carves nothing when there is none. A pond directly inside
/// the new door is drained.
pub fn carve_door(
    grid: &mut Grid,
    side: WallSide,
    kind: Tile,
    placement: DoorPlacement,
    rng: &mut StdRng,
) -> DelverResult<Option<Position>> {
    let target = match placement {
        DoorPlacement::Midpoint => {
            let midpoint = side.midpoint(grid);
            if grid.get(midpoint).map_or(false, Tile::is_door) {
                let nearest = door_candidates(grid, side).first().copied();
                Some(nearest.ok_or_else(|| {
                    DelverError::GenerationFailed(format!("no room for a door on the {:?} wall", side))
                })?)
            } else {
                Some(midpoint)
            }
        }
        DoorPlacement::Randomized => door_candidates(grid, side).choose(rng).copied(),
    };

    let Some(door) = target else {
        warn!("No usable cell for a door on the {:?} wall", side);
        return Ok(None);
    };

    grid.set(door, kind)?;
    let inward = door + side.inward();
    if grid.get(inward) == Some(Tile::Water) {
        grid.set(inward, Tile::Floor)?;
    }
    Ok(Some(door))
}

/// Frontier-expansion dungeon builder.
#[derive(Debug, Clone, Default)]
pub struct DungeonBuilder {
    /// Generator used for every non-entrance room
    pub room_generator: RoomGenerator,
}

impl DungeonBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generates and validates a dungeon from the config's own seed.
    ///
    /// # Examples
    ///
    /// ```
    /// use delver::{DungeonBuilder, GenerationConfig};
    ///
    /// let dungeon = DungeonBuilder::build(&GenerationConfig::for_testing(7)).unwrap();
    /// assert!(dungeon.is_connected());
    /// assert_eq!(dungeon.exit_tiles().len(), 1);
    /// ```
    pub fn build(config: &GenerationConfig) -> DelverResult<Dungeon> {
        let mut rng = utils::create_rng(config.seed);
        Self::new().generate(config, &mut rng)
    }

    /// Carves the one-way exit into the right wall of the room farthest from
    /// the entrance, as close to the wall's middle as possible.
    ///
    /// Distance is counted over room placement, not doors. Every existing
    /// two-way door leads somewhere, so the exit is always a new door.
    fn place_exit(&self, dungeon: &mut Dungeon) -> DelverResult<ExitTile> {
        let (room_name, distance) = dungeon.farthest_room().ok_or_else(|| {
            DelverError::GenerationFailed("dungeon has no entrance room".to_string())
        })?;

        let room = dungeon.room_mut(&room_name)?;
        let position = door_candidates(&room.grid, WallSide::Right)
            .first()
            .copied()
            .ok_or_else(|| {
                DelverError::GenerationFailed(format!(
                    "room '{}' has no space for an exit",
                    room_name
                ))
            })?;

        room.grid.set(position, Tile::DoorOneWay)?;
        let inward = position + WallSide::Right.inward();
        if room.grid.get(inward) == Some(Tile::Water) {
            room.grid.set(inward, Tile::Floor)?;
        }

        debug!(
            "Exit placed in '{}' at {} ({} hops from the entrance)",
            room_name, position, distance
        );
        let exit = ExitTile {
            room: room_name,
            position,
        };
        dungeon.exit = Some(exit.clone());
        Ok(exit)
    }
}

impl Generator<Dungeon> for DungeonBuilder {
    fn generate(&self, config: &GenerationConfig, rng: &mut StdRng) -> DelverResult<Dungeon> {
        config.level.validate()?;
        let params = &config.level;

        let entrance_grid = RoomGenerator::entrance().generate(config, rng)?;
        let entrance_door = door_positions_on_side(&entrance_grid, WallSide::Left, Tile::DoorOneWay)
            .first()
            .copied();
        let mut dungeon = Dungeon::new(
            config.level_key.clone(),
            Room::new(config::ENTRANCE_ROOM, entrance_grid, RoomCoord::origin()),
            config.door_placement,
        );
        dungeon.entrance_door = entrance_door;

        let mut placed: HashMap<RoomCoord, String> = HashMap::new();
        placed.insert(RoomCoord::origin(), config::ENTRANCE_ROOM.to_string());
        let mut frontier = vec![RoomCoord::origin()];

        while placed.len() < params.num_rooms && !frontier.is_empty() {
            let index = rng.gen_range(0..frontier.len());
            let coord = frontier[index];
            let mut directions = Direction::all();
            directions.shuffle(rng);

            let Some(direction) = directions
                .into_iter()
                .find(|&direction| !placed.contains_key(&coord.step(direction)))
            else {
                frontier.remove(index);
                continue;
            };

            let from = placed.get(&coord).cloned().ok_or_else(|| {
                DelverError::GenerationFailed(format!("frontier holds unplaced {:?}", coord))
            })?;
            let next = coord.step(direction);
            let name = format!("room{}", placed.len());
            let side = direction.wall_side();

            let mut room = Room::new(name.clone(), self.room_generator.generate(config, rng)?, next);
            carve_door(
                &mut dungeon.room_mut(&from)?.grid,
                side,
                Tile::DoorTwoWay,
                config.door_placement,
                rng,
            )?;
            carve_door(
                &mut room.grid,
                side.opposite(),
                Tile::DoorTwoWay,
                config.door_placement,
                rng,
            )?;

            debug!("Placed '{}' at {:?}, {:?} of '{}'", name, next, direction, from);
            dungeon.add_room(room);
            dungeon.connect(&from, side, &name);
            placed.insert(next, name);

            if placed.len() < params.num_rooms && rng.gen_bool(1.0 - params.deadend_chance) {
                frontier.push(next);
            }
        }

        if placed.len() < params.num_rooms {
            info!(
                "Frontier exhausted with {} of {} rooms placed",
                placed.len(),
                params.num_rooms
            );
        }

        let exit = self.place_exit(&mut dungeon)?;
        self.validate(&dungeon, config)?;

        info!(
            "Generated dungeon '{}' with {} rooms; exit in '{}' at {}",
            dungeon.key,
            dungeon.room_count(),
            exit.room,
            exit.position
        );
        Ok(dungeon)
    }

    fn validate(&self, dungeon: &Dungeon, config: &GenerationConfig) -> DelverResult<()> {
        if !dungeon.is_connected() {
            return Err(DelverError::GenerationFailed(
                "Some rooms are unreachable from the entrance".to_string(),
            ));
        }
        if dungeon.room_count() > config.level.num_rooms {
            return Err(DelverError::GenerationFailed(format!(
                "Placed {} rooms, more than the {} requested",
                dungeon.room_count(),
                config.level.num_rooms
            )));
        }

        let exits = dungeon.exit_tiles();
        let [exit] = exits.as_slice() else {
            return Err(DelverError::GenerationFailed(format!(
                "Expected exactly one exit, found {}",
                exits.len()
            )));
        };

        let distances: HashMap<String, usize> = dungeon.bfs_over_placement().into_iter().collect();
        let deepest = distances.values().copied().max().unwrap_or(0);
        if distances.get(&exit.room) != Some(&deepest) {
            return Err(DelverError::GenerationFailed(format!(
                "Exit room '{}' is not the farthest from the entrance",
                exit.room
            )));
        }

        if config.door_placement == DoorPlacement::Midpoint {
            for (room, sides) in &dungeon.connections {
                let grid = &dungeon.room(room)?.grid;
                for (&side, neighbour) in sides {
                    if door_positions_on_side(grid, side, Tile::DoorTwoWay).is_empty() {
                        return Err(DelverError::GenerationFailed(format!(
                            "'{}' has no door toward '{}'",
                            room, neighbour
                        )));
                    }
                }
            }
        }

        Ok(())
    }

    fn generator_type(&self) -> &'static str {
        "DungeonBuilder"
    }
}

//! # World Representation
//!
//! Tiles, the room grid, and the dungeon that ties rooms together.
//!
//! A [`Grid`] is a fixed-size, row-major buffer of [`Tile`]s. It is mutated in
//! place as the player and enemies move and is never resized. A [`Dungeon`]
//! owns every generated room plus the record of which wall of which room
//! leads where.

use crate::game::{Direction, Position, WallSide};
use crate::generation::{DoorPlacement, Room, RoomCoord};
use crate::{DelverError, DelverResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

/// Persistence format of a single room: stringified row index to row string.
pub type RoomMap = BTreeMap<String, String>;

/// Broad movement category of a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileCategory {
    /// Something can stand here
    Walkable,
    /// Nothing walks through this
    Blocking,
    /// Occupied by the player or an enemy
    Entity,
}

/// Cosmetic hint handed to the renderer alongside each tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StyleHint {
    Player,
    Enemy,
    Trap,
    Water,
    Plain,
}

/// The content of one grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tile {
    Floor,
    Water,
    Trap,
    DoorTwoWay,
    DoorOneWay,
    WallVertical,
    WallHorizontal,
    Player,
    EnemyRegular,
    EnemyPatrol,
    EnemyReckless,
    EnemyFlying,
    /// Reserved for loot; movement treats it like floor
    Loot,
}

impl Tile {
    /// Every tile, in legend order.
    pub const ALL: [Tile; 13] = [
        Tile::Player,
        Tile::EnemyRegular,
        Tile::EnemyPatrol,
        Tile::EnemyReckless,
        Tile::EnemyFlying,
        Tile::DoorTwoWay,
        Tile::DoorOneWay,
        Tile::WallVertical,
        Tile::WallHorizontal,
        Tile::Floor,
        Tile::Water,
        Tile::Trap,
        Tile::Loot,
    ];

    /// The single character used for this tile on screen and on disk.
    ///
    /// # Examples
    ///
    /// ```
    /// use delver::Tile;
    ///
    /// assert_eq!(Tile::Player.symbol(), '@');
    /// assert_eq!(Tile::from_symbol('&'), Some(Tile::DoorTwoWay));
    /// ```
    pub const fn symbol(self) -> char {
        match self {
            Tile::Player => '@',
            Tile::EnemyRegular => 'E',
            Tile::EnemyPatrol => 'P',
            Tile::EnemyReckless => 'R',
            Tile::EnemyFlying => 'F',
            Tile::DoorTwoWay => '&',
            Tile::DoorOneWay => '>',
            Tile::WallVertical => '|',
            Tile::WallHorizontal => '=',
            Tile::Floor => ' ',
            Tile::Water => '≈',
            Tile::Trap => '^',
            Tile::Loot => '$',
        }
    }

    /// Parses a legend character.
    pub fn from_symbol(symbol: char) -> Option<Tile> {
        Tile::ALL.into_iter().find(|tile| tile.symbol() == symbol)
    }

    /// The movement category, or None for display-only tags.
    ///
    /// Traps count as walkable: the player can step on one and suffers for
    /// it. Water blocks the player and line-of-sight.
    pub const fn category(self) -> Option<TileCategory> {
        match self {
            Tile::Floor | Tile::Trap | Tile::DoorTwoWay | Tile::DoorOneWay => {
                Some(TileCategory::Walkable)
            }
            Tile::WallVertical | Tile::WallHorizontal | Tile::Water => Some(TileCategory::Blocking),
            Tile::Player
            | Tile::EnemyRegular
            | Tile::EnemyPatrol
            | Tile::EnemyReckless
            | Tile::EnemyFlying => Some(TileCategory::Entity),
            Tile::Loot => None,
        }
    }

    pub fn is_walkable(self) -> bool {
        self.category() == Some(TileCategory::Walkable)
    }

    pub fn is_blocking(self) -> bool {
        self.category() == Some(TileCategory::Blocking)
    }

    pub fn is_entity(self) -> bool {
        self.category() == Some(TileCategory::Entity)
    }

    pub fn is_wall(self) -> bool {
        matches!(self, Tile::WallVertical | Tile::WallHorizontal)
    }

    pub fn is_door(self) -> bool {
        matches!(self, Tile::DoorTwoWay | Tile::DoorOneWay)
    }

    /// Tiles that hurt whoever steps on them.
    pub fn is_hazard(self) -> bool {
        matches!(self, Tile::Water | Tile::Trap)
    }

    pub fn is_enemy(self) -> bool {
        self.is_entity() && self != Tile::Player
    }

    pub fn style_hint(self) -> StyleHint {
        match self {
            Tile::Player => StyleHint::Player,
            Tile::EnemyRegular | Tile::EnemyPatrol | Tile::EnemyReckless | Tile::EnemyFlying => {
                StyleHint::Enemy
            }
            Tile::Trap => StyleHint::Trap,
            Tile::Water => StyleHint::Water,
            _ => StyleHint::Plain,
        }
    }
}

/// A rectangular room grid stored row-major.
///
/// All rows have the same length and the grid keeps its dimensions for its
/// whole life. Reads outside the grid return `None`; writes outside it fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RoomMap", into = "RoomMap")]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<Tile>,
}

impl Grid {
    /// Creates a grid filled with a single tile.
    pub fn new(width: usize, height: usize, fill: Tile) -> Self {
        Self {
            width,
            height,
            cells: vec![fill; width * height],
        }
    }

    /// Parses rows of legend characters.
    ///
    /// # Examples
    ///
    /// ```
    /// use delver::{Grid, Position, Tile};
    ///
    /// let grid = Grid::from_rows(&["=====", "|@ E|", "====="]).unwrap();
    /// assert_eq!(grid.width(), 5);
    /// assert_eq!(grid.get(Position::new(1, 1)), Some(Tile::Player));
    /// ```
    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> DelverResult<Self> {
        let Some(first) = rows.first() else {
            return Err(DelverError::InvalidRoomData("room has no rows".to_string()));
        };
        let width = first.as_ref().chars().count();
        if width == 0 {
            return Err(DelverError::InvalidRoomData("room rows are empty".to_string()));
        }
        let mut cells = Vec::with_capacity(width * rows.len());

        for (row_index, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.chars().count() != width {
                return Err(DelverError::InvalidRoomData(format!(
                    "row {} has {} cells, expected {}",
                    row_index,
                    row.chars().count(),
                    width
                )));
            }
            for symbol in row.chars() {
                let tile = Tile::from_symbol(symbol).ok_or_else(|| {
                    DelverError::InvalidRoomData(format!(
                        "unknown tile '{}' in row {}",
                        symbol, row_index
                    ))
                })?;
                cells.push(tile);
            }
        }

        Ok(Self {
            width,
            height: rows.len(),
            cells,
        })
    }

    /// Parses the persisted room format. Keys are row indices and must
    /// cover `0..n` exactly; rows are ordered numerically, not by string.
    pub fn from_room_map(map: &RoomMap) -> DelverResult<Self> {
        let mut rows: Vec<(usize, &str)> = map
            .iter()
            .map(|(key, row)| {
                key.parse::<usize>()
                    .map(|index| (index, row.as_str()))
                    .map_err(|_| DelverError::InvalidRoomData(format!("bad row key '{}'", key)))
            })
            .collect::<DelverResult<_>>()?;
        rows.sort_by_key(|(index, _)| *index);

        for (expected, (index, _)) in rows.iter().enumerate() {
            if *index != expected {
                return Err(DelverError::InvalidRoomData(format!(
                    "missing row {}",
                    expected
                )));
            }
        }

        let rows: Vec<&str> = rows.into_iter().map(|(_, row)| row).collect();
        Self::from_rows(&rows)
    }

    /// Converts the grid into the persisted room format.
    pub fn to_room_map(&self) -> RoomMap {
        self.to_rows()
            .into_iter()
            .enumerate()
            .map(|(index, row)| (index.to_string(), row))
            .collect()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Last valid row index.
    pub fn max_row(&self) -> i32 {
        self.height as i32 - 1
    }

    /// Last valid column index.
    pub fn max_col(&self) -> i32 {
        self.width as i32 - 1
    }

    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.row >= 0 && pos.col >= 0 && pos.row <= self.max_row() && pos.col <= self.max_col()
    }

    fn index(&self, pos: Position) -> Option<usize> {
        self.in_bounds(pos)
            .then(|| pos.row as usize * self.width + pos.col as usize)
    }

    pub fn get(&self, pos: Position) -> Option<Tile> {
        self.index(pos).map(|index| self.cells[index])
    }

    pub fn set(&mut self, pos: Position, tile: Tile) -> DelverResult<()> {
        let index = self.index(pos).ok_or(DelverError::OutOfBounds {
            row: pos.row,
            col: pos.col,
        })?;
        self.cells[index] = tile;
        Ok(())
    }

    /// Every position in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.height).flat_map(move |row| {
            (0..self.width).map(move |col| Position::new(row as i32, col as i32))
        })
    }

    /// Positions holding `tile`, in row-major order.
    pub fn find(&self, tile: Tile) -> Vec<Position> {
        self.positions()
            .filter(|&pos| self.get(pos) == Some(tile))
            .collect()
    }

    pub fn count(&self, tile: Tile) -> usize {
        self.cells.iter().filter(|&&cell| cell == tile).count()
    }

    pub fn to_rows(&self) -> Vec<String> {
        self.cells
            .chunks(self.width.max(1))
            .take(self.height)
            .map(|row| row.iter().map(|tile| tile.symbol()).collect())
            .collect()
    }
}

impl TryFrom<RoomMap> for Grid {
    type Error = DelverError;

    fn try_from(map: RoomMap) -> Result<Self, Self::Error> {
        Grid::from_room_map(&map)
    }
}

impl From<Grid> for RoomMap {
    fn from(grid: Grid) -> Self {
        grid.to_room_map()
    }
}

impl std::fmt::Display for Grid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in self.to_rows() {
            writeln!(f, "{}", row)?;
        }
        Ok(())
    }
}

/// The one-way door that completes the dungeon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitTile {
    pub room: String,
    pub position: Position,
}

/// A connected set of rooms for one level.
///
/// Rooms are keyed by name. `connections` maps a room and one of its walls
/// to the room on the other side of that wall.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dungeon {
    /// Level identity key, handed to the encounter system
    pub key: String,
    /// All rooms, indexed by name
    pub rooms: BTreeMap<String, Room>,
    /// Wall-side connectivity record
    pub connections: BTreeMap<String, BTreeMap<WallSide, String>>,
    /// Name of the entrance room
    pub entrance: String,
    /// The entrance's one-way door
    pub entrance_door: Option<Position>,
    /// The one-way exit door
    pub exit: Option<ExitTile>,
    /// How door pairs were carved
    pub door_placement: DoorPlacement,
}

impl Dungeon {
    /// Creates a dungeon holding only its entrance room.
    pub fn new(key: impl Into<String>, entrance: Room, door_placement: DoorPlacement) -> Self {
        let entrance_name = entrance.name.clone();
        let mut rooms = BTreeMap::new();
        rooms.insert(entrance_name.clone(), entrance);

        Self {
            key: key.into(),
            rooms,
            connections: BTreeMap::new(),
            entrance: entrance_name,
            entrance_door: None,
            exit: None,
            door_placement,
        }
    }

    pub fn add_room(&mut self, room: Room) {
        self.rooms.insert(room.name.clone(), room);
    }

    pub fn room(&self, name: &str) -> DelverResult<&Room> {
        self.rooms
            .get(name)
            .ok_or_else(|| DelverError::UnknownRoom(name.to_string()))
    }

    pub fn room_mut(&mut self, name: &str) -> DelverResult<&mut Room> {
        self.rooms
            .get_mut(name)
            .ok_or_else(|| DelverError::UnknownRoom(name.to_string()))
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Records a bidirectional edge: `from`'s `side` wall leads to `to`, and
    /// `to`'s opposite wall leads back.
    pub fn connect(&mut self, from: &str, side: WallSide, to: &str) {
        self.connections
            .entry(from.to_string())
            .or_default()
            .insert(side, to.to_string());
        self.connections
            .entry(to.to_string())
            .or_default()
            .insert(side.opposite(), from.to_string());
    }

    /// The room behind `side` of `room`, if any.
    pub fn connected_room(&self, room: &str, side: WallSide) -> Option<&str> {
        self.connections
            .get(room)
            .and_then(|sides| sides.get(&side))
            .map(String::as_str)
    }

    /// Breadth-first walk of the connectivity record from the entrance.
    ///
    /// Returns `(room, hop distance)` in visit order. Neighbours are expanded
    /// top, bottom, left, right.
    pub fn bfs_from_entrance(&self) -> Vec<(String, usize)> {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        let mut order = Vec::new();

        visited.insert(self.entrance.clone());
        queue.push_back((self.entrance.clone(), 0));

        while let Some((room, distance)) = queue.pop_front() {
            for side in WallSide::CARDINAL {
                if let Some(neighbour) = self.connected_room(&room, side) {
                    if visited.insert(neighbour.to_string()) {
                        queue.push_back((neighbour.to_string(), distance + 1));
                    }
                }
            }
            order.push((room, distance));
        }

        order
    }

    /// Breadth-first walk of the room placement from the entrance.
    ///
    /// Rooms on neighbouring coordinates count as adjacent whether or not a
    /// door joins them. Neighbours are expanded north, south, west, east.
    pub fn bfs_over_placement(&self) -> Vec<(String, usize)> {
        let by_coord: HashMap<RoomCoord, &str> = self
            .rooms
            .values()
            .map(|room| (room.coord, room.name.as_str()))
            .collect();
        let Ok(entrance) = self.room(&self.entrance) else {
            return Vec::new();
        };

        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        let mut order = Vec::new();

        visited.insert(entrance.coord);
        queue.push_back((entrance.coord, 0));

        while let Some((coord, distance)) = queue.pop_front() {
            for direction in Direction::all() {
                let next = coord.step(direction);
                if by_coord.contains_key(&next) && visited.insert(next) {
                    queue.push_back((next, distance + 1));
                }
            }
            if let Some(&name) = by_coord.get(&coord) {
                order.push((name.to_string(), distance));
            }
        }

        order
    }

    /// Room with the greatest placement distance from the entrance. Ties go
    /// to the room visited first.
    pub fn farthest_room(&self) -> Option<(String, usize)> {
        self.bfs_over_placement()
            .into_iter()
            .fold(None, |best, (room, distance)| match best {
                Some((_, best_distance)) if best_distance >= distance => best,
                _ => Some((room, distance)),
            })
    }

    /// True when every room can be reached from the entrance.
    pub fn is_connected(&self) -> bool {
        self.bfs_from_entrance().len() == self.rooms.len()
    }

    /// All one-way door tiles other than the entrance door.
    pub fn exit_tiles(&self) -> Vec<ExitTile> {
        self.rooms
            .values()
            .flat_map(|room| {
                room.grid
                    .find(Tile::DoorOneWay)
                    .into_iter()
                    .filter(move |&pos| {
                        !(room.name == self.entrance && Some(pos) == self.entrance_door)
                    })
                    .map(move |position| ExitTile {
                        room: room.name.clone(),
                        position,
                    })
            })
            .collect()
    }

    /// Saves the dungeon to JSON.
    pub fn save_to_json(&self) -> DelverResult<String> {
        serde_json::to_string_pretty(self).map_err(DelverError::from)
    }

    /// Loads a dungeon from JSON.
    pub fn load_from_json(json: &str) -> DelverResult<Self> {
        serde_json::from_str(json).map_err(DelverError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::RoomCoord;

    #[test]
    fn test_tile_categories_are_total() {
        for tile in Tile::ALL {
            let flags = [tile.is_walkable(), tile.is_blocking(), tile.is_entity()];
            let set = flags.iter().filter(|&&flag| flag).count();
            if tile == Tile::Loot {
                assert_eq!(set, 0);
            } else {
                assert_eq!(set, 1, "{:?} should have exactly one category", tile);
            }
        }
    }

    #[test]
    fn test_tile_symbols_are_unique() {
        for tile in Tile::ALL {
            assert_eq!(Tile::from_symbol(tile.symbol()), Some(tile));
        }
        assert_eq!(Tile::from_symbol('x'), None);
    }

    #[test]
    fn test_hazards() {
        assert!(Tile::Water.is_hazard());
        assert!(Tile::Trap.is_hazard());
        assert!(Tile::Trap.is_walkable());
        assert!(Tile::Water.is_blocking());
        assert!(!Tile::Floor.is_hazard());
    }

    #[test]
    fn test_grid_accessors() {
        let mut grid = Grid::new(4, 3, Tile::Floor);
        assert_eq!(grid.width(), 4);
        assert_eq!(grid.height(), 3);
        assert_eq!(grid.get(Position::new(2, 3)), Some(Tile::Floor));
        assert_eq!(grid.get(Position::new(3, 0)), None);
        assert_eq!(grid.get(Position::new(0, -1)), None);

        grid.set(Position::new(1, 2), Tile::Trap).unwrap();
        assert_eq!(grid.get(Position::new(1, 2)), Some(Tile::Trap));
        assert!(grid.set(Position::new(5, 5), Tile::Trap).is_err());
        assert_eq!(grid.find(Tile::Trap), vec![Position::new(1, 2)]);
    }

    #[test]
    fn test_grid_rejects_ragged_rows() {
        assert!(Grid::from_rows(&["===", "| |", "=="]).is_err());
        assert!(Grid::from_rows(&["=x="]).is_err());
        assert!(Grid::from_rows::<&str>(&[]).is_err());
    }

    #[test]
    fn test_grid_rejects_zero_width_rows() {
        assert!(matches!(
            Grid::from_rows(&["", ""]),
            Err(DelverError::InvalidRoomData(_))
        ));

        let dungeon = Dungeon::new(
            "crypt",
            Room::new("enter", Grid::from_rows(&["="]).unwrap(), RoomCoord::origin()),
            DoorPlacement::Midpoint,
        );
        let json = dungeon.save_to_json().unwrap().replace(r#""0": "=""#, r#""0": """#);
        assert!(json.contains(r#""0": """#));
        assert!(Dungeon::load_from_json(&json).is_err());
    }

    #[test]
    fn test_room_map_orders_rows_numerically() {
        let mut grid = Grid::new(3, 12, Tile::Floor);
        for row in 0..12 {
            grid.set(Position::new(row, row % 3), Tile::Trap).unwrap();
        }
        let map = grid.to_room_map();
        assert_eq!(map.len(), 12);
        assert_eq!(map.get("10").unwrap(), &grid.to_rows()[10]);

        let restored = Grid::from_room_map(&map).unwrap();
        assert_eq!(restored, grid);
    }

    #[test]
    fn test_room_map_rejects_gaps() {
        let mut map = RoomMap::new();
        map.insert("0".to_string(), "===".to_string());
        map.insert("2".to_string(), "===".to_string());
        assert!(Grid::from_room_map(&map).is_err());
    }

    #[test]
    fn test_dungeon_connections_are_bidirectional() {
        let grid = Grid::new(5, 5, Tile::Floor);
        let mut dungeon = Dungeon::new(
            "crypt",
            Room::new("enter", grid.clone(), RoomCoord::origin()),
            DoorPlacement::Midpoint,
        );
        dungeon.add_room(Room::new("room1", grid.clone(), RoomCoord::new(1, 0)));
        dungeon.add_room(Room::new("room2", grid, RoomCoord::new(2, 0)));
        dungeon.connect("enter", WallSide::Right, "room1");
        dungeon.connect("room1", WallSide::Right, "room2");

        assert_eq!(dungeon.connected_room("room1", WallSide::Left), Some("enter"));
        assert_eq!(dungeon.connected_room("enter", WallSide::Top), None);
        assert!(dungeon.is_connected());
        assert_eq!(dungeon.farthest_room(), Some(("room2".to_string(), 2)));
    }

    #[test]
    fn test_farthest_room_follows_placement_not_doors() {
        // enter (0,0) - room1 (1,0) - room2 (1,1) - room3 (0,1), doors form a
        // chain but room3 sits directly below the entrance
        let grid = Grid::new(5, 5, Tile::Floor);
        let mut dungeon = Dungeon::new(
            "crypt",
            Room::new("enter", grid.clone(), RoomCoord::origin()),
            DoorPlacement::Midpoint,
        );
        dungeon.add_room(Room::new("room1", grid.clone(), RoomCoord::new(1, 0)));
        dungeon.add_room(Room::new("room2", grid.clone(), RoomCoord::new(1, 1)));
        dungeon.add_room(Room::new("room3", grid, RoomCoord::new(0, 1)));
        dungeon.connect("enter", WallSide::Right, "room1");
        dungeon.connect("room1", WallSide::Bottom, "room2");
        dungeon.connect("room2", WallSide::Left, "room3");

        let through_doors: HashMap<String, usize> = dungeon.bfs_from_entrance().into_iter().collect();
        assert_eq!(through_doors["room3"], 3);

        let placed: HashMap<String, usize> = dungeon.bfs_over_placement().into_iter().collect();
        assert_eq!(placed["room3"], 1);
        assert_eq!(placed["room2"], 2);
        assert_eq!(dungeon.farthest_room(), Some(("room2".to_string(), 2)));
    }

    #[test]
    fn test_dungeon_json_round_trip() {
        let grid = Grid::from_rows(&["=====", "|  >|", "====="]).unwrap();
        let dungeon = Dungeon::new(
            "crypt",
            Room::new("enter", grid, RoomCoord::origin()),
            DoorPlacement::Midpoint,
        );
        let json = dungeon.save_to_json().unwrap();
        let loaded = Dungeon::load_from_json(&json).unwrap();
        assert_eq!(loaded.key, "crypt");
        assert_eq!(loaded.room("enter").unwrap().grid, dungeon.room("enter").unwrap().grid);
        assert_eq!(loaded.exit_tiles().len(), 1);
    }
}

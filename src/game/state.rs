//! # Crawl State Module
//!
//! The movement/turn controller for a single dungeon visit.
//!
//! A [`CrawlSession`] is the sole owner of the live room grid, the player and
//! the enemy roster. Every accepted player move is processed to completion,
//! including the enemy pass, before the next move is taken.

use crate::game::{
    door_positions_on_side, ensure_spawn_space, resolve_transition, run_enemy_pass,
    spawn_in_front_of, Direction, Dungeon, Enemy, Grid, MoveRefusal, MovementClass, Player,
    Position, Tile, WallSide,
};
use crate::generation::utils::create_rng;
use crate::{DelverError, DelverResult};
use log::{debug, info};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

/// Where a crawl stands after a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrawlState {
    /// Waiting for a move, or the move was a no-op
    Idle,
    /// The player moved within the room
    Moving,
    /// The player walked through a two-way door
    Transitioning,
    /// An enemy and the player collided; control passes to the encounter system
    Encounter,
    /// The player left through a one-way door
    Exited,
}

impl CrawlState {
    /// Whether the crawl loop keeps accepting moves.
    pub fn is_terminal(self) -> bool {
        matches!(self, CrawlState::Encounter | CrawlState::Exited)
    }
}

/// What the encounter system needs to take over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterHandoff {
    /// Level identity key, used to look up threat tables
    pub level_key: String,
    pub room: String,
    pub enemy_at: Position,
    pub enemy_class: MovementClass,
    /// True when the player walked into the enemy
    pub initiated_by_player: bool,
}

/// Things that happened during a turn, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum CrawlEvent {
    PlayerMoved { from: Position, to: Position },
    MoveRefused(MoveRefusal),
    /// Damage is resolved by whoever consumes the event
    TrapSprung { at: Position },
    RoomEntered { room: String, spawn: Position },
    EnemyMoved { class: MovementClass, from: Position, to: Position },
    EnemyPerished { class: MovementClass, at: Position },
    EncounterStarted(EncounterHandoff),
    DungeonExited { room: String, door: Position },
    Message(String),
}

/// Result of one player move.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnReport {
    pub state: CrawlState,
    pub events: Vec<CrawlEvent>,
}

impl TurnReport {
    fn new(state: CrawlState, events: Vec<CrawlEvent>) -> Self {
        Self { state, events }
    }

    pub fn refusal(&self) -> Option<MoveRefusal> {
        self.events.iter().find_map(|event| match event {
            CrawlEvent::MoveRefused(refusal) => Some(*refusal),
            _ => None,
        })
    }

    pub fn handoff(&self) -> Option<&EncounterHandoff> {
        self.events.iter().find_map(|event| match event {
            CrawlEvent::EncounterStarted(handoff) => Some(handoff),
            _ => None,
        })
    }
}

/// Running totals for a crawl.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlStatistics {
    pub steps_taken: u64,
    pub enemy_passes: u64,
    pub traps_sprung: u32,
    pub rooms_entered: u32,
    pub enemies_perished: u32,
    pub moves_refused: u32,
}

impl CrawlStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates statistics based on a crawl event.
    pub fn update_from_event(&mut self, event: &CrawlEvent) {
        match event {
            CrawlEvent::PlayerMoved { .. } => self.steps_taken += 1,
            CrawlEvent::MoveRefused(_) => self.moves_refused += 1,
            CrawlEvent::TrapSprung { .. } => self.traps_sprung += 1,
            CrawlEvent::RoomEntered { .. } => self.rooms_entered += 1,
            CrawlEvent::EnemyPerished { .. } => self.enemies_perished += 1,
            _ => {}
        }
    }
}

/// A single visit to a dungeon, from entry to exit or encounter.
#[derive(Debug, Clone)]
pub struct CrawlSession {
    dungeon: Dungeon,
    current_room: String,
    grid: Grid,
    player: Player,
    enemies: Vec<Enemy>,
    state: CrawlState,
    turn_number: u64,
    statistics: CrawlStatistics,
    rng: StdRng,
}

impl CrawlSession {
    /// Enters a dungeon through its entrance door.
    ///
    /// The player appears one step inward of the entrance's left-wall one-way
    /// door, or near the left edge of the room if it has none.
    pub fn enter(dungeon: Dungeon, seed: u64) -> DelverResult<Self> {
        let entrance = dungeon.room(&dungeon.entrance)?;
        let grid = &entrance.grid;

        let door = dungeon.entrance_door.or_else(|| {
            door_positions_on_side(grid, WallSide::Left, Tile::DoorOneWay)
                .first()
                .copied()
        });
        let spawn = match door {
            Some(door) => match spawn_in_front_of(grid, door, WallSide::Left) {
                inward if grid.get(inward).map_or(false, Tile::is_entity) => door,
                inward => inward,
            },
            None => Position::new(grid.height() as i32 / 2, 2.min(grid.max_col())),
        };

        let room = dungeon.entrance.clone();
        let mut session = Self::start_at(dungeon, &room, spawn, seed)?;
        if let Some(carved) = ensure_spawn_space(&mut session.grid, session.player.position) {
            debug!("Carved spawn space at {}", carved);
        }
        Ok(session)
    }

    /// Starts a crawl with the player at `spawn` in `room`.
    ///
    /// Stale player tiles in the stored grid are cleared first. A spawn cell
    /// holding an enemy or blocking tile is rejected.
    pub fn start_at(dungeon: Dungeon, room: &str, spawn: Position, seed: u64) -> DelverResult<Self> {
        let mut grid = dungeon.room(room)?.grid.clone();
        for stale in grid.find(Tile::Player) {
            grid.set(stale, Tile::Floor)?;
        }

        let under = grid
            .get(spawn)
            .ok_or(DelverError::OutOfBounds {
                row: spawn.row,
                col: spawn.col,
            })?;
        if under.is_blocking() || under.is_entity() {
            return Err(DelverError::InvalidState(format!(
                "cannot spawn on {:?} at {}",
                under, spawn
            )));
        }

        let player = Player::new(spawn, settle(under));
        grid.set(spawn, Tile::Player)?;
        let enemies = Enemy::scan(&grid);

        info!(
            "Entered dungeon '{}' in room '{}' at {} with {} enemies",
            dungeon.key,
            room,
            spawn,
            enemies.len()
        );

        let mut statistics = CrawlStatistics::new();
        statistics.rooms_entered = 1;

        Ok(Self {
            dungeon,
            current_room: room.to_string(),
            grid,
            player,
            enemies,
            state: CrawlState::Idle,
            turn_number: 0,
            statistics,
            rng: create_rng(seed),
        })
    }

    pub fn dungeon(&self) -> &Dungeon {
        &self.dungeon
    }

    pub fn current_room(&self) -> &str {
        &self.current_room
    }

    /// The live grid of the current room.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn enemies(&self) -> &[Enemy] {
        &self.enemies
    }

    pub fn state(&self) -> CrawlState {
        self.state
    }

    pub fn turn_number(&self) -> u64 {
        self.turn_number
    }

    pub fn statistics(&self) -> &CrawlStatistics {
        &self.statistics
    }

    /// Whether the crawl loop should keep accepting moves.
    pub fn is_active(&self) -> bool {
        !self.state.is_terminal()
    }

    /// Moves the player one step in `direction`.
    pub fn step(&mut self, direction: Direction) -> DelverResult<TurnReport> {
        self.move_player(direction.to_delta())
    }

    /// Applies one player move and, if it was plain movement, one enemy pass.
    pub fn move_player(&mut self, delta: Position) -> DelverResult<TurnReport> {
        if !self.is_active() {
            return Err(DelverError::InvalidState(format!(
                "crawl already ended in {:?}",
                self.state
            )));
        }
        self.state = CrawlState::Idle;

        let from = self.player.position;
        let target = from + delta;
        let Some(tile) = self.grid.get(target) else {
            return Ok(self.refuse(MoveRefusal::OutOfBounds));
        };

        let report = match tile {
            _ if tile.is_blocking() => self.refuse(MoveRefusal::Blocked),
            Tile::Player => self.refuse(MoveRefusal::Blocked),
            _ if tile.is_enemy() => self.engage(target, tile, true)?,
            Tile::DoorTwoWay => self.transition(target)?,
            Tile::DoorOneWay => {
                self.state = CrawlState::Exited;
                self.turn_number += 1;
                info!("Left dungeon '{}' from room '{}'", self.dungeon.key, self.current_room);
                self.record(vec![CrawlEvent::DungeonExited {
                    room: self.current_room.clone(),
                    door: target,
                }])
            }
            _ => self.walk(from, target, tile)?,
        };

        Ok(report)
    }

    /// Stores the live grid back into the dungeon and hands the dungeon back.
    pub fn finish(mut self) -> DelverResult<Dungeon> {
        self.store_current_room()?;
        Ok(self.dungeon)
    }

    fn walk(&mut self, from: Position, target: Position, tile: Tile) -> DelverResult<TurnReport> {
        let mut events = Vec::new();
        if tile == Tile::Trap {
            debug!("Trap sprung at {}", target);
            events.push(CrawlEvent::TrapSprung { at: target });
        }

        self.grid.set(from, self.player.under)?;
        self.grid.set(target, Tile::Player)?;
        self.player = Player::new(target, settle(tile));
        self.turn_number += 1;
        events.push(CrawlEvent::PlayerMoved { from, to: target });

        let pass = run_enemy_pass(&mut self.grid, &mut self.enemies, target, &mut self.rng)?;
        self.statistics.enemy_passes += 1;
        events.extend(pass.events);

        if let Some(enemy_at) = pass.engaged_by {
            let tile = self.grid.get(enemy_at).ok_or(DelverError::OutOfBounds {
                row: enemy_at.row,
                col: enemy_at.col,
            })?;
            let mut report = self.engage(enemy_at, tile, false)?;
            events.append(&mut report.events);
            return Ok(self.record_as(CrawlState::Encounter, events));
        }

        self.state = CrawlState::Moving;
        Ok(self.record(events))
    }

    fn engage(
        &mut self,
        enemy_at: Position,
        tile: Tile,
        initiated_by_player: bool,
    ) -> DelverResult<TurnReport> {
        let enemy_class = MovementClass::from_tile(tile).ok_or_else(|| {
            DelverError::InvalidState(format!("no enemy at {}, found {:?}", enemy_at, tile))
        })?;
        info!(
            "Encounter with {:?} enemy at {} in room '{}'",
            enemy_class, enemy_at, self.current_room
        );
        let handoff = EncounterHandoff {
            level_key: self.dungeon.key.clone(),
            room: self.current_room.clone(),
            enemy_at,
            enemy_class,
            initiated_by_player,
        };

        self.state = CrawlState::Encounter;
        if initiated_by_player {
            self.turn_number += 1;
            Ok(self.record(vec![CrawlEvent::EncounterStarted(handoff)]))
        } else {
            // Counted by the caller, which owns the rest of the turn's events
            Ok(TurnReport::new(self.state, vec![CrawlEvent::EncounterStarted(handoff)]))
        }
    }

    fn transition(&mut self, door: Position) -> DelverResult<TurnReport> {
        let arrival = match resolve_transition(&self.dungeon, &self.current_room, &self.grid, door) {
            Ok(arrival) => arrival,
            Err(refusal) => return Ok(self.refuse(refusal)),
        };

        self.store_current_room()?;

        let mut grid = self.dungeon.room(&arrival.room)?.grid.clone();
        let spawn = match grid.get(arrival.spawn) {
            Some(tile) if !tile.is_entity() => arrival.spawn,
            _ => arrival.door,
        };
        let under = grid.get(spawn).map(settle).unwrap_or(Tile::Floor);
        grid.set(spawn, Tile::Player)?;

        info!(
            "Moved from room '{}' to '{}' through the {:?} wall",
            self.current_room, arrival.room, arrival.entry_side
        );

        self.enemies = Enemy::scan(&grid);
        self.grid = grid;
        self.player = Player::new(spawn, under);
        self.current_room = arrival.room.clone();
        self.state = CrawlState::Transitioning;
        self.turn_number += 1;

        Ok(self.record(vec![CrawlEvent::RoomEntered {
            room: arrival.room,
            spawn,
        }]))
    }

    fn refuse(&mut self, refusal: MoveRefusal) -> TurnReport {
        debug!("Move refused: {:?}", refusal);
        let mut events = vec![CrawlEvent::MoveRefused(refusal)];
        if let Some(line) = refusal.narrative() {
            events.push(CrawlEvent::Message(line.to_string()));
        }
        self.state = CrawlState::Idle;
        self.record(events)
    }

    fn record(&mut self, events: Vec<CrawlEvent>) -> TurnReport {
        self.record_as(self.state, events)
    }

    fn record_as(&mut self, state: CrawlState, events: Vec<CrawlEvent>) -> TurnReport {
        self.state = state;
        for event in &events {
            self.statistics.update_from_event(event);
        }
        TurnReport::new(state, events)
    }

    /// Writes the live grid, minus the player, back into the dungeon.
    fn store_current_room(&mut self) -> DelverResult<()> {
        let mut grid = self.grid.clone();
        grid.set(self.player.position, self.player.under)?;
        self.dungeon.room_mut(&self.current_room)?.grid = grid;
        Ok(())
    }
}

/// The tile the player leaves behind: traps are spent once stepped on.
fn settle(tile: Tile) -> Tile {
    match tile {
        Tile::Trap => Tile::Floor,
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::{DoorPlacement, Room, RoomCoord};

    fn single_room(rows: &[&str]) -> Dungeon {
        let grid = Grid::from_rows(rows).unwrap();
        Dungeon::new(
            "test",
            Room::new("enter", grid, RoomCoord::origin()),
            DoorPlacement::Midpoint,
        )
    }

    const OPEN_ROOM: [&str; 9] = [
        "==========",
        "|        |",
        "|        |",
        "|        |",
        "|        |",
        "|        |",
        "|        |",
        "|       E|",
        "==========",
    ];

    #[test]
    fn test_plain_move_runs_one_enemy_pass() {
        let mut session =
            CrawlSession::start_at(single_room(&OPEN_ROOM), "enter", Position::new(5, 5), 1)
                .unwrap();
        let report = session.move_player(Position::new(0, 1)).unwrap();

        assert_eq!(report.state, CrawlState::Moving);
        assert_eq!(session.grid().get(Position::new(5, 5)), Some(Tile::Floor));
        assert_eq!(session.grid().get(Position::new(5, 6)), Some(Tile::Player));
        assert_eq!(session.grid().count(Tile::Player), 1);
        assert_eq!(session.statistics().enemy_passes, 1);
        assert_eq!(session.turn_number(), 1);
        assert!(report
            .events
            .iter()
            .any(|event| matches!(event, CrawlEvent::EnemyMoved { .. })));
    }

    #[test]
    fn test_blocked_and_out_of_bounds_moves_are_no_ops() {
        let mut session =
            CrawlSession::start_at(single_room(&OPEN_ROOM), "enter", Position::new(1, 1), 1)
                .unwrap();
        let before = session.grid().clone();

        let report = session.step(Direction::West).unwrap();
        assert_eq!(report.state, CrawlState::Idle);
        assert_eq!(report.refusal(), Some(MoveRefusal::Blocked));

        let report = session.move_player(Position::new(-5, 0)).unwrap();
        assert_eq!(report.refusal(), Some(MoveRefusal::OutOfBounds));

        assert_eq!(session.grid(), &before);
        assert_eq!(session.player().position, Position::new(1, 1));
        assert_eq!(session.statistics().enemy_passes, 0);
        assert_eq!(session.statistics().moves_refused, 2);
        assert_eq!(session.turn_number(), 0);
    }

    #[test]
    fn test_trap_is_spent_after_stepping_off() {
        let mut session = CrawlSession::start_at(
            single_room(&["======", "| ^  |", "======"]),
            "enter",
            Position::new(1, 1),
            1,
        )
        .unwrap();

        let report = session.step(Direction::East).unwrap();
        assert!(report.events.contains(&CrawlEvent::TrapSprung {
            at: Position::new(1, 2)
        }));
        session.step(Direction::East).unwrap();
        assert_eq!(session.grid().get(Position::new(1, 2)), Some(Tile::Floor));
        assert_eq!(session.statistics().traps_sprung, 1);
    }

    #[test]
    fn test_walking_into_enemy_hands_off() {
        let mut session = CrawlSession::start_at(
            single_room(&["======", "| P  |", "======"]),
            "enter",
            Position::new(1, 1),
            1,
        )
        .unwrap();

        let report = session.step(Direction::East).unwrap();
        assert_eq!(report.state, CrawlState::Encounter);
        let handoff = report.handoff().unwrap();
        assert_eq!(handoff.level_key, "test");
        assert_eq!(handoff.enemy_class, MovementClass::Patrol);
        assert!(handoff.initiated_by_player);
        assert!(!session.is_active());
        assert!(session.step(Direction::East).is_err());
    }

    #[test]
    fn test_enemy_stepping_into_player_hands_off() {
        let mut session = CrawlSession::start_at(
            single_room(&["=======", "|    E|", "======="]),
            "enter",
            Position::new(1, 3),
            1,
        )
        .unwrap();

        let report = session.step(Direction::East).unwrap();
        assert_eq!(report.state, CrawlState::Encounter);
        let handoff = report.handoff().unwrap();
        assert_eq!(handoff.enemy_at, Position::new(1, 5));
        assert!(!handoff.initiated_by_player);
        assert_eq!(session.statistics().enemy_passes, 1);
    }

    #[test]
    fn test_engaging_a_non_enemy_tile_is_an_error() {
        let mut session = CrawlSession::start_at(
            single_room(&["======", "|    |", "======"]),
            "enter",
            Position::new(1, 1),
            1,
        )
        .unwrap();

        let result = session.engage(Position::new(1, 2), Tile::Floor, false);
        assert!(matches!(result, Err(DelverError::InvalidState(_))));
        assert_eq!(session.state(), CrawlState::Idle);
        assert!(session.is_active());
    }

    #[test]
    fn test_one_way_door_exits() {
        let mut session = CrawlSession::start_at(
            single_room(&["=====", "|   >", "====="]),
            "enter",
            Position::new(1, 3),
            1,
        )
        .unwrap();

        let report = session.step(Direction::East).unwrap();
        assert_eq!(report.state, CrawlState::Exited);
        assert!(!session.is_active());
        assert_eq!(session.statistics().enemy_passes, 0);
    }

    #[test]
    fn test_dead_end_door_is_refused_with_narrative() {
        let mut session = CrawlSession::start_at(
            single_room(&["=====", "|   &", "====="]),
            "enter",
            Position::new(1, 3),
            1,
        )
        .unwrap();

        let report = session.step(Direction::East).unwrap();
        assert_eq!(report.state, CrawlState::Idle);
        assert_eq!(report.refusal(), Some(MoveRefusal::DeadEndDoor));
        assert!(report.events.iter().any(|event| matches!(
            event,
            CrawlEvent::Message(line) if line == "This door doesn't seem to lead anywhere..."
        )));
        assert_eq!(session.player().position, Position::new(1, 3));
    }

    #[test]
    fn test_transition_relocates_and_stores_room() {
        let west = Grid::from_rows(&["=====", "|   &", "|E  |", "====="]).unwrap();
        let east = Grid::from_rows(&["=====", "&   |", "|  F|", "====="]).unwrap();
        let mut dungeon = Dungeon::new(
            "two",
            Room::new("enter", west, RoomCoord::origin()),
            DoorPlacement::Midpoint,
        );
        dungeon.add_room(Room::new("east", east, RoomCoord::new(1, 0)));
        dungeon.connect("enter", WallSide::Right, "east");

        let mut session =
            CrawlSession::start_at(dungeon, "enter", Position::new(1, 3), 5).unwrap();
        let report = session.step(Direction::East).unwrap();

        assert_eq!(report.state, CrawlState::Transitioning);
        assert_eq!(session.current_room(), "east");
        assert_eq!(session.player().position, Position::new(1, 1));
        assert_eq!(session.enemies().len(), 1);
        assert_eq!(session.enemies()[0].class, MovementClass::Flying);
        assert_eq!(session.statistics().enemy_passes, 0);
        assert_eq!(session.statistics().rooms_entered, 2);

        let stored = &session.dungeon().room("enter").unwrap().grid;
        assert_eq!(stored.count(Tile::Player), 0);
        assert_eq!(stored.get(Position::new(1, 3)), Some(Tile::Floor));

        // Back through the left door lands beside the door we came in by
        let report = session.step(Direction::West).unwrap();
        assert_eq!(report.state, CrawlState::Transitioning);
        assert_eq!(session.current_room(), "enter");
        assert_eq!(session.player().position, Position::new(1, 3));
    }

    #[test]
    fn test_enter_spawns_inside_entrance_door() {
        let mut dungeon = single_room(&["======", "|    |", ">    |", "|    |", "======"]);
        dungeon.entrance_door = Some(Position::new(2, 0));
        let session = CrawlSession::enter(dungeon, 1).unwrap();
        assert_eq!(session.player().position, Position::new(2, 1));
        assert_eq!(session.player().under, Tile::Floor);
        assert_eq!(session.state(), CrawlState::Idle);
    }
}

//! # Enemy AI
//!
//! Per-turn enemy movement: breadth-first chasing, patrol routes gated by
//! line-of-sight, and random wandering for regular enemies that cannot reach
//! the player.

use crate::game::{CrawlEvent, Direction, Enemy, Grid, MovementClass, Position};
use crate::DelverResult;
use log::debug;
use pathfinding::prelude::bfs;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::VecDeque;

/// Why an enemy picked the step it is about to take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Next cell of a patrol route
    Route,
    /// First cell of a shortest path to the player
    Chase,
    /// A random permitted neighbour
    Wander,
}

/// Outcome of one enemy pass over the active room.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnemyPass {
    pub events: Vec<CrawlEvent>,
    /// Position of the enemy that stepped into the player, if any
    pub engaged_by: Option<Position>,
}

/// Shortest path from `start` to `goal`, excluding `start`.
///
/// Cells are expanded north, south, west, east and only entered when the
/// class permits their tile. The goal cell is always enterable, since it
/// normally holds the player.
///
/// # Examples
///
/// ```
/// use delver::{find_path, Grid, MovementClass, Position};
///
/// let grid = Grid::from_rows(&["=====", "|E @|", "====="]).unwrap();
/// let path = find_path(&grid, MovementClass::Regular, Position::new(1, 1), Position::new(1, 3));
/// assert_eq!(path, Some(vec![Position::new(1, 2), Position::new(1, 3)]));
/// ```
pub fn find_path(
    grid: &Grid,
    class: MovementClass,
    start: Position,
    goal: Position,
) -> Option<Vec<Position>> {
    let path = bfs(
        &start,
        |&pos| {
            pos.cardinal_adjacent_positions()
                .into_iter()
                .filter(|&next| {
                    next == goal || grid.get(next).map_or(false, |tile| class.permits(tile))
                })
                .collect::<Vec<_>>()
        },
        |&pos| pos == goal,
    )?;

    Some(path.into_iter().skip(1).collect())
}

/// True when both cells share a row or column and nothing between them
/// blocks.
pub fn has_line_of_sight(grid: &Grid, from: Position, to: Position) -> bool {
    let between: Vec<Position> = if from.row == to.row {
        let (low, high) = (from.col.min(to.col), from.col.max(to.col));
        ((low + 1)..high).map(|col| Position::new(from.row, col)).collect()
    } else if from.col == to.col {
        let (low, high) = (from.row.min(to.row), from.row.max(to.row));
        ((low + 1)..high).map(|row| Position::new(row, from.col)).collect()
    } else {
        return false;
    };

    between
        .into_iter()
        .all(|pos| grid.get(pos).map_or(false, |tile| !tile.is_blocking()))
}

/// Builds a closed patrol walk from `origin`.
///
/// Casts a ray in each cardinal direction while the next cell is permitted
/// and unoccupied, keeps the longest (earliest wins ties), and walks it out
/// and back. A ray of `n` cells yields a route of `2n` steps ending on
/// `origin`.
pub fn synthesize_patrol(grid: &Grid, class: MovementClass, origin: Position) -> VecDeque<Position> {
    let mut longest: Vec<Position> = Vec::new();

    for direction in Direction::all() {
        let mut ray = Vec::new();
        let mut cursor = origin;
        loop {
            cursor = cursor.step(direction);
            match grid.get(cursor) {
                Some(tile) if class.permits(tile) && !tile.is_entity() => ray.push(cursor),
                _ => break,
            }
        }
        if ray.len() > longest.len() {
            longest = ray;
        }
    }

    if longest.is_empty() {
        return VecDeque::new();
    }

    let mut route: VecDeque<Position> = longest.iter().copied().collect();
    route.extend(longest.iter().rev().skip(1).copied());
    route.push_back(origin);
    route
}

/// Picks the next cell for an enemy, or `None` to hold still.
///
/// Patrol enemies chase only with line-of-sight; afterwards their route is
/// rebuilt from wherever they stopped.
pub fn plan_step(
    grid: &Grid,
    enemy: &mut Enemy,
    player: Position,
    rng: &mut StdRng,
) -> Option<(Intent, Position)> {
    match enemy.class {
        MovementClass::Patrol => {
            if has_line_of_sight(grid, enemy.position, player) {
                enemy.off_route = true;
                return chase_step(grid, enemy, player);
            }
            if enemy.off_route || enemy.patrol.is_empty() {
                enemy.patrol = synthesize_patrol(grid, enemy.class, enemy.position);
                enemy.off_route = false;
            }
            enemy.patrol.front().map(|&next| (Intent::Route, next))
        }
        MovementClass::Regular => {
            chase_step(grid, enemy, player).or_else(|| wander_step(grid, enemy, rng))
        }
        MovementClass::Reckless | MovementClass::Flying => chase_step(grid, enemy, player),
    }
}

fn chase_step(grid: &Grid, enemy: &Enemy, player: Position) -> Option<(Intent, Position)> {
    find_path(grid, enemy.class, enemy.position, player)?
        .first()
        .map(|&next| (Intent::Chase, next))
}

fn wander_step(grid: &Grid, enemy: &Enemy, rng: &mut StdRng) -> Option<(Intent, Position)> {
    let options: Vec<Position> = enemy
        .position
        .cardinal_adjacent_positions()
        .into_iter()
        .filter(|&pos| grid.get(pos).map_or(false, |tile| enemy.class.permits(tile)))
        .collect();
    options.choose(rng).map(|&next| (Intent::Wander, next))
}

/// Moves every enemy once, in roster order.
///
/// The pass stops at the first enemy whose step lands on the player. Reckless
/// enemies that step onto a hazard are removed from the roster and leave the
/// hazard in place.
pub fn run_enemy_pass(
    grid: &mut Grid,
    enemies: &mut Vec<Enemy>,
    player: Position,
    rng: &mut StdRng,
) -> DelverResult<EnemyPass> {
    let mut pass = EnemyPass::default();
    let mut index = 0;

    while index < enemies.len() {
        let enemy = &mut enemies[index];
        let Some((intent, next)) = plan_step(grid, enemy, player, rng) else {
            index += 1;
            continue;
        };

        if next == player {
            debug!("{:?} enemy at {} engages the player", enemy.class, enemy.position);
            pass.engaged_by = Some(enemy.position);
            break;
        }

        let tile = match grid.get(next) {
            Some(tile) if enemy.class.permits(tile) => tile,
            // A stale route cell; wait for it to clear
            _ => {
                index += 1;
                continue;
            }
        };

        if intent == Intent::Route {
            enemy.patrol.rotate_left(1);
        }

        let from = enemy.position;
        grid.set(from, enemy.under)?;

        if enemy.class.is_fatal(tile) {
            debug!("{:?} enemy perished on {:?} at {}", enemy.class, tile, next);
            pass.events.push(CrawlEvent::EnemyPerished {
                class: enemy.class,
                at: next,
            });
            enemies.remove(index);
            continue;
        }

        enemy.under = tile;
        enemy.position = next;
        grid.set(next, enemy.class.tile())?;
        pass.events.push(CrawlEvent::EnemyMoved {
            class: enemy.class,
            from,
            to: next,
        });
        index += 1;
    }

    Ok(pass)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Tile;
    use crate::generation::utils::create_rng;
    use std::collections::HashMap;

    fn grid(rows: &[&str]) -> Grid {
        Grid::from_rows(rows).unwrap()
    }

    /// Plain Dijkstra with unit weights, used to cross-check the BFS.
    fn reference_distance(
        grid: &Grid,
        class: MovementClass,
        start: Position,
        goal: Position,
    ) -> Option<usize> {
        let mut dist: HashMap<Position, usize> = HashMap::new();
        dist.insert(start, 0);
        let mut unsettled: Vec<Position> = vec![start];
        let mut settled = Vec::new();

        while !unsettled.is_empty() {
            unsettled.sort_by_key(|pos| std::cmp::Reverse(dist[pos]));
            let current = unsettled.pop().unwrap();
            if current == goal {
                return Some(dist[&current]);
            }
            settled.push(current);
            for (dr, dc) in [(-1, 0), (1, 0), (0, -1), (0, 1)] {
                let next = Position::new(current.row + dr, current.col + dc);
                let enterable =
                    next == goal || grid.get(next).map_or(false, |tile| class.permits(tile));
                if !enterable || settled.contains(&next) {
                    continue;
                }
                let candidate = dist[&current] + 1;
                if dist.get(&next).map_or(true, |&known| candidate < known) {
                    dist.insert(next, candidate);
                    if !unsettled.contains(&next) {
                        unsettled.push(next);
                    }
                }
            }
        }
        None
    }

    const MAZE: [&str; 7] = [
        "=========",
        "|E  |  @|",
        "| | | | |",
        "| |   | |",
        "| ^^^^| |",
        "|     ^ |",
        "=========",
    ];

    #[test]
    fn test_bfs_matches_reference_shortest_path() {
        let maze = grid(&MAZE);
        let start = Position::new(1, 1);
        let goal = Position::new(1, 7);

        for class in MovementClass::ALL {
            let path = find_path(&maze, class, start, goal);
            let expected = reference_distance(&maze, class, start, goal);
            assert_eq!(path.as_ref().map(Vec::len), expected, "{:?}", class);

            if let Some(path) = path {
                assert_eq!(path.last(), Some(&goal));
                let mut previous = start;
                for &pos in &path {
                    assert_eq!(previous.manhattan_distance(pos), 1);
                    previous = pos;
                }
            }
        }
    }

    #[test]
    fn test_regular_path_avoids_traps() {
        let maze = grid(&MAZE);
        let start = Position::new(1, 1);
        let goal = Position::new(1, 7);
        let careful = find_path(&maze, MovementClass::Regular, start, goal).unwrap();
        let reckless = find_path(&maze, MovementClass::Reckless, start, goal).unwrap();
        assert!(reckless.len() <= careful.len());
        assert!(careful
            .iter()
            .all(|&pos| maze.get(pos) != Some(Tile::Trap)));
    }

    #[test]
    fn test_no_path_when_sealed() {
        let sealed = grid(&["=======", "|E | @|", "======="]);
        assert_eq!(
            find_path(&sealed, MovementClass::Flying, Position::new(1, 1), Position::new(1, 5)),
            None
        );
    }

    #[test]
    fn test_line_of_sight() {
        let room = grid(&["=======", "|P ≈ @|", "|     |", "======="]);
        let patrol = Position::new(1, 1);
        assert!(!has_line_of_sight(&room, patrol, Position::new(1, 5)));
        assert!(has_line_of_sight(&room, patrol, Position::new(2, 1)));
        assert!(has_line_of_sight(&room, Position::new(2, 1), Position::new(2, 5)));
        assert!(!has_line_of_sight(&room, patrol, Position::new(2, 5)));
    }

    #[test]
    fn test_patrol_route_closes_after_2n_steps() {
        let room = grid(&["=========", "|P      |", "|       |", "========="]);
        let origin = Position::new(1, 1);
        let route = synthesize_patrol(&room, MovementClass::Patrol, origin);
        // The eastward ray is longest: six cells
        assert_eq!(route.len(), 12);
        assert_eq!(route.front(), Some(&Position::new(1, 2)));
        assert_eq!(route.back(), Some(&origin));

        let mut room = room;
        let mut enemies = Enemy::scan(&room);
        let mut rng = create_rng(7);
        // Player out of sight behind the wall row
        let player = Position::new(3, 8);

        for _ in 0..12 {
            let pass = run_enemy_pass(&mut room, &mut enemies, player, &mut rng).unwrap();
            assert!(pass.engaged_by.is_none());
        }
        assert_eq!(enemies[0].position, origin);
        assert_eq!(room.get(origin), Some(Tile::EnemyPatrol));
        assert_eq!(room.count(Tile::EnemyPatrol), 1);
    }

    #[test]
    fn test_patrol_chases_with_line_of_sight_and_reroutes() {
        let mut room = grid(&["=======", "|P    |", "|     |", "|    @|", "======="]);
        let mut enemies = Enemy::scan(&room);
        let mut rng = create_rng(1);
        let player = Position::new(3, 5);

        // Straight down the column toward the player's row
        let pass = run_enemy_pass(&mut room, &mut enemies, Position::new(3, 1), &mut rng).unwrap();
        assert!(pass.engaged_by.is_none());
        assert_eq!(enemies[0].position, Position::new(2, 1));
        assert!(enemies[0].off_route);

        // Out of sight again: a fresh route from the new cell
        let pass = run_enemy_pass(&mut room, &mut enemies, player, &mut rng).unwrap();
        assert!(pass.engaged_by.is_none());
        assert!(!enemies[0].off_route);
        // Eastward ray of four cells from (2, 1)
        assert_eq!(enemies[0].patrol.len(), 8);
        assert_eq!(enemies[0].position, Position::new(2, 2));
    }

    #[test]
    fn test_reckless_enemy_dies_on_trap() {
        let mut room = grid(&["=======", "|     |", "|     |", "|  R^@|", "======="]);
        let mut enemies = Enemy::scan(&room);
        let mut rng = create_rng(3);

        let pass = run_enemy_pass(&mut room, &mut enemies, Position::new(3, 5), &mut rng).unwrap();

        assert!(enemies.is_empty());
        assert_eq!(room.get(Position::new(3, 3)), Some(Tile::Floor));
        assert_eq!(room.get(Position::new(3, 4)), Some(Tile::Trap));
        assert_eq!(
            pass.events,
            vec![CrawlEvent::EnemyPerished {
                class: MovementClass::Reckless,
                at: Position::new(3, 4),
            }]
        );
    }

    #[test]
    fn test_flying_enemy_restores_water_it_crossed() {
        let mut room = grid(&["=======", "|F≈  @|", "======="]);
        let mut enemies = Enemy::scan(&room);
        let mut rng = create_rng(3);
        let player = Position::new(1, 5);

        run_enemy_pass(&mut room, &mut enemies, player, &mut rng).unwrap();
        assert_eq!(enemies[0].under, Tile::Water);
        run_enemy_pass(&mut room, &mut enemies, player, &mut rng).unwrap();
        assert_eq!(room.get(Position::new(1, 2)), Some(Tile::Water));
        assert_eq!(enemies[0].position, Position::new(1, 3));
    }

    #[test]
    fn test_engagement_stops_the_pass() {
        let mut room = grid(&["=======", "|E@  E|", "======="]);
        let mut enemies = Enemy::scan(&room);
        let mut rng = create_rng(9);

        let pass = run_enemy_pass(&mut room, &mut enemies, Position::new(1, 2), &mut rng).unwrap();
        assert_eq!(pass.engaged_by, Some(Position::new(1, 1)));
        assert!(pass.events.is_empty());
        // The second enemy never moved
        assert_eq!(enemies[1].position, Position::new(1, 5));
    }

    #[test]
    fn test_regular_enemy_wanders_without_a_path() {
        let mut room = grid(&["==========", "|  E  | @|", "=========="]);
        let mut enemies = Enemy::scan(&room);
        let mut rng = create_rng(11);

        let pass = run_enemy_pass(&mut room, &mut enemies, Position::new(1, 8), &mut rng).unwrap();
        assert_eq!(pass.events.len(), 1);
        assert_eq!(enemies[0].position.row, 1);
        assert_eq!(enemies[0].position.manhattan_distance(Position::new(1, 3)), 1);
        assert_eq!(room.count(Tile::EnemyRegular), 1);
    }
}

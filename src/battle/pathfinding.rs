//! Breadth-first movement search for battle maps
//!
//! Every step costs one move. Cells held by a living enemy of the moving side
//! block both passage and arrival; cells held by allies may be passed through
//! but never ended on.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use crate::battle::grid::GridCoord;
use crate::battle::units::{Battlefield, Side};

/// Can a unit of `side` step onto this cell on its way somewhere?
fn is_traversable(field: &Battlefield, cell: GridCoord, side: Side) -> bool {
    match field.unit_at(cell) {
        Some(occupant) => occupant.side == side,
        None => true,
    }
}

/// All cells a unit of `side` at `origin` can end a move on, with their step count
///
/// Bounded BFS to depth `mobility`. The origin and every occupied cell are
/// excluded from the result.
pub fn reachable_cells(
    field: &Battlefield,
    origin: GridCoord,
    mobility: u32,
    side: Side,
) -> BTreeMap<GridCoord, u32> {
    let mut reachable = BTreeMap::new();
    let mut visited: HashMap<GridCoord, u32> = HashMap::new();
    let mut queue = VecDeque::new();

    visited.insert(origin, 0);
    queue.push_back((origin, 0u32));

    while let Some((cell, dist)) = queue.pop_front() {
        if dist > 0 && !field.is_occupied(cell) {
            reachable.insert(cell, dist);
        }
        if dist >= mobility {
            continue;
        }

        for next in field.grid.neighbors(cell) {
            if matches!(visited.get(&next), Some(&prev) if prev <= dist + 1) {
                continue;
            }
            if !is_traversable(field, next, side) {
                continue;
            }
            visited.insert(next, dist + 1);
            queue.push_back((next, dist + 1));
        }
    }

    reachable
}

/// Find the shortest route from `start` to `goal` for a unit of `side`
///
/// The returned cells run from the first step through `goal` inclusive.
/// Returns an empty route when `start == goal` and None if no route exists.
pub fn find_path(
    field: &Battlefield,
    start: GridCoord,
    goal: GridCoord,
    side: Side,
) -> Option<Vec<GridCoord>> {
    if start == goal {
        return Some(Vec::new());
    }
    if !field.grid.is_valid_cell(goal) || !is_traversable(field, goal, side) {
        return None;
    }

    let mut came_from: HashMap<GridCoord, GridCoord> = HashMap::new();
    let mut visited = HashSet::new();
    let mut queue = VecDeque::new();

    visited.insert(start);
    queue.push_back(start);

    while let Some(current) = queue.pop_front() {
        for next in field.grid.neighbors(current) {
            if visited.contains(&next) || !is_traversable(field, next, side) {
                continue;
            }
            came_from.insert(next, current);
            if next == goal {
                return Some(reconstruct_path(&came_from, start, goal));
            }
            visited.insert(next);
            queue.push_back(next);
        }
    }

    None
}

/// Reconstruct path from came_from map, excluding the start cell
fn reconstruct_path(
    came_from: &HashMap<GridCoord, GridCoord>,
    start: GridCoord,
    mut current: GridCoord,
) -> Vec<GridCoord> {
    let mut path = vec![current];
    while let Some(&prev) = came_from.get(&current) {
        if prev == start {
            break;
        }
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}

/// Shortest route, or a direct single step to `goal` when none exists
///
/// Callers validate destinations against `reachable_cells` first, so the
/// fallback only fires on a caller bug.
pub fn shortest_path(
    field: &Battlefield,
    start: GridCoord,
    goal: GridCoord,
    side: Side,
) -> Vec<GridCoord> {
    match find_path(field, start, goal, side) {
        Some(path) => path,
        None => {
            tracing::warn!(
                "No path from ({}, {}) to ({}, {}) for {} side, stepping directly",
                start.q,
                start.r,
                goal.q,
                goal.r,
                side
            );
            vec![goal]
        }
    }
}

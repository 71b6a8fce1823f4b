//! Square grid coordinate system for battle maps
//!
//! Cells are addressed by (q, r) with 4-connected adjacency and Manhattan distance.

use serde::{Deserialize, Serialize};

/// Grid cell coordinate
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct GridCoord {
    pub q: i32,
    pub r: i32,
}

impl GridCoord {
    pub fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// Manhattan distance
    pub fn distance(&self, other: &Self) -> u32 {
        self.q.abs_diff(other.q) + self.r.abs_diff(other.r)
    }

    /// The 4 orthogonal neighbors (no diagonals). May lie outside the grid.
    pub fn neighbors(&self) -> [GridCoord; 4] {
        Direction::all().map(|dir| *self + dir.offset())
    }
}

impl std::ops::Add for GridCoord {
    type Output = GridCoord;

    fn add(self, rhs: GridCoord) -> GridCoord {
        GridCoord::new(self.q + rhs.q, self.r + rhs.r)
    }
}

/// Orthogonal step direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    East,
    West,
    South,
    North,
}

impl Direction {
    pub fn offset(&self) -> GridCoord {
        match self {
            Direction::East => GridCoord::new(1, 0),
            Direction::West => GridCoord::new(-1, 0),
            Direction::South => GridCoord::new(0, 1),
            Direction::North => GridCoord::new(0, -1),
        }
    }

    pub fn all() -> [Direction; 4] {
        [
            Direction::East,
            Direction::West,
            Direction::South,
            Direction::North,
        ]
    }
}

/// Fixed board dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleGrid {
    pub cols: i32,
    pub rows: i32,
}

impl BattleGrid {
    pub fn new(cols: i32, rows: i32) -> Self {
        Self { cols, rows }
    }

    pub fn is_valid_cell(&self, cell: GridCoord) -> bool {
        (0..self.cols).contains(&cell.q) && (0..self.rows).contains(&cell.r)
    }

    /// In-grid neighbors of a cell
    pub fn neighbors(&self, cell: GridCoord) -> impl Iterator<Item = GridCoord> + '_ {
        cell.neighbors()
            .into_iter()
            .filter(move |n| self.is_valid_cell(*n))
    }

    /// Every cell, row by row
    pub fn cells(&self) -> impl Iterator<Item = GridCoord> + '_ {
        (0..self.rows).flat_map(move |r| (0..self.cols).map(move |q| GridCoord::new(q, r)))
    }

    pub fn cell_count(&self) -> usize {
        (self.cols.max(0) * self.rows.max(0)) as usize
    }
}

//! Food Placement
//!
//! Rejection sampling over a region of the grid with a bounded number of
//! attempts. Exhaustion is reported, never fatal: the caller leaves the food
//! unplaced and tries again next tick.

use std::fmt;
use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::core::rng::DeterministicRng;
use crate::game::grid::{Cell, Grid, Half};
use crate::game::occupancy::OccupancyGrid;

/// What was being placed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlacementKind {
    /// A food item
    Food,
    /// An obstacle spawn
    Obstacle,
}

impl fmt::Display for PlacementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlacementKind::Food => f.write_str("food"),
            PlacementKind::Obstacle => f.write_str("obstacle"),
        }
    }
}

/// Placement failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlacementError {
    /// Every attempt hit an occupied cell.
    #[error("no free cell for {kind} after {attempts} attempts")]
    Exhausted {
        /// What was being placed
        kind: PlacementKind,
        /// Attempts made
        attempts: u32,
    },

    /// The region holds no cells at all.
    #[error("placement region is empty")]
    EmptyRegion,
}

/// Where a food may go.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Region {
    /// Whole playable grid
    Playable,
    /// Columns `[start, end)` of the playable rows
    Columns {
        /// First column
        start: i32,
        /// One past the last column
        end: i32,
    },
}

impl Region {
    /// One battle half.
    pub fn half(grid: &Grid, half: Half) -> Self {
        let (start, end) = grid.boundary().half_columns(half, grid.width_cells);
        Region::Columns { start, end }
    }

    /// Column range `[start, end)` on `grid`.
    pub fn columns(&self, grid: &Grid) -> (i32, i32) {
        match *self {
            Region::Playable => (0, grid.width_cells),
            Region::Columns { start, end } => (start.max(0), end.min(grid.width_cells)),
        }
    }

    /// True if `cell` lies in the region.
    pub fn contains(&self, grid: &Grid, cell: Cell) -> bool {
        let (start, end) = self.columns(grid);
        grid.contains(cell) && cell.col >= start && cell.col < end
    }
}

/// Draw a free cell in `region`, different from `previous`.
pub fn place_food(
    rng: &mut DeterministicRng,
    grid: &Grid,
    occupancy: &OccupancyGrid,
    region: Region,
    previous: Option<Cell>,
    max_attempts: u32,
) -> Result<Cell, PlacementError> {
    let (start, end) = region.columns(grid);
    let rows = grid.playable_rows();
    if start >= end || rows <= 0 {
        return Err(PlacementError::EmptyRegion);
    }

    for _ in 0..max_attempts {
        let candidate = Cell::new(rng.next_index(start, end), rng.next_index(0, rows));
        if Some(candidate) == previous {
            continue;
        }
        if occupancy.is_free(candidate) {
            return Ok(candidate);
        }
    }

    Err(PlacementError::Exhausted {
        kind: PlacementKind::Food,
        attempts: max_attempts,
    })
}

// =============================================================================
// TESTS
// =============================================================================

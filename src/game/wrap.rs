//! Wrap / Boundary Resolver
//!
//! With teleport enabled a head that leaves its span lands on the aligned
//! cell at the opposite edge. Without teleport positions are left alone and
//! the occupancy probe reports the edge.

use serde::{Serialize, Deserialize};

use crate::core::fixed::{Fixed, from_int};
use crate::core::vec2::FixedVec2;
use crate::game::grid::{Grid, Half};
use crate::game::input::{Axis, Direction};

/// How an actor wraps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WrapRule {
    /// Toroidal over the whole playable grid.
    Plain,
    /// Horizontal wrap only inside the actor's own half of a split grid.
    Split(Half),
}

/// Result of resolving a position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Wrapped {
    /// Position after wrapping
    pub position: FixedVec2,
    /// True if the position jumped to the opposite edge
    pub wrapped: bool,
}

impl WrapRule {
    /// Aligned columns `[first, last]` the actor may occupy.
    pub fn column_span(&self, grid: &Grid) -> (i32, i32) {
        match self {
            WrapRule::Plain => (0, grid.width_cells - 1),
            WrapRule::Split(half) => {
                let (start, end) = grid.boundary().half_columns(*half, grid.width_cells);
                (start, end - 1)
            }
        }
    }
}

/// Resolve a freshly advanced head position.
pub fn resolve(
    pos: FixedVec2,
    direction: Direction,
    teleport: bool,
    rule: WrapRule,
    grid: &Grid,
) -> Wrapped {
    let unchanged = Wrapped { position: pos, wrapped: false };
    if !teleport {
        return unchanged;
    }

    match direction.axis() {
        Axis::Horizontal => {
            let (first, last) = rule.column_span(grid);
            match wrap_axis(pos.x, direction, first, last) {
                Some(x) => Wrapped { position: FixedVec2::new(x, pos.y).snapped(), wrapped: true },
                None => unchanged,
            }
        }
        Axis::Vertical => {
            match wrap_axis(pos.y, direction, 0, grid.playable_rows() - 1) {
                Some(y) => Wrapped { position: FixedVec2::new(pos.x, y).snapped(), wrapped: true },
                None => unchanged,
            }
        }
    }
}

/// New coordinate if `value` has left `[first, last]` in the moving direction.
#[inline]
fn wrap_axis(value: Fixed, direction: Direction, first: i32, last: i32) -> Option<Fixed> {
    if direction.is_positive() && value > from_int(last) {
        Some(from_int(first))
    } else if !direction.is_positive() && value < from_int(first) {
        Some(from_int(last))
    } else {
        None
    }
}

// =============================================================================
// TESTS
// =============================================================================

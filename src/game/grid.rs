//! Grid Model
//!
//! Converts a pixel play area into discrete cells. Each cell is drawn
//! `cell_size` pixels wide with a one pixel gutter, so the stride between
//! cell origins is `cell_size + 1`. The bottom rows are reserved for the
//! status bar and never hold gameplay.
//!
//! ```text
//!   col 0   col 1   col 2
//!  ┌─────┐ ┌─────┐ ┌─────┐   ← stride = cell_size + 1
//!  │     │ │     │ │     │
//!  └─────┘ └─────┘ └─────┘
//!  ... playable rows ...
//!  ═══════════════════════   ← status bar (reserved rows)
//! ```

use std::fmt;
use serde::{Serialize, Deserialize};

use crate::core::fixed::{Fixed, from_int, fixed_ratio};
use crate::core::vec2::FixedVec2;
use crate::game::config::{ConfigError, MIN_CELL_SIZE};

/// Largest grid dimension, per axis.
///
/// Keeps squared obstacle distances inside Q16.16 range.
pub const MAX_GRID_CELLS: i32 = 100;

// =============================================================================
// CELL
// =============================================================================

/// A discrete grid cell. Row 0 is the top row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cell {
    /// Column index
    pub col: i32,
    /// Row index
    pub row: i32,
}

impl Cell {
    /// Create a cell.
    #[inline]
    pub const fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }

    /// Continuous position of this cell's origin.
    #[inline]
    pub fn position(self) -> FixedVec2 {
        FixedVec2::from_ints(self.col, self.row)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.col, self.row)
    }
}

// =============================================================================
// BATTLE BOUNDARY
// =============================================================================

/// Which side of the battle boundary an actor owns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Half {
    /// Columns left of the boundary (player 0)
    Left,
    /// Columns right of the boundary (player 1)
    Right,
}

impl Half {
    /// Half owned by an actor slot.
    pub fn for_actor(index: usize) -> Self {
        if index == 0 { Half::Left } else { Half::Right }
    }
}

/// Column band splitting the grid in battle modes: columns `[left, right)`.
///
/// Even widths use the two centre columns, odd widths the single centre
/// column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundaryLine {
    /// First boundary column
    pub left: i32,
    /// One past the last boundary column
    pub right: i32,
}

impl BoundaryLine {
    /// Boundary for a grid `width` cells wide.
    pub fn for_width(width: i32) -> Self {
        if width % 2 == 0 {
            Self { left: width / 2 - 1, right: width / 2 + 1 }
        } else {
            Self { left: width / 2, right: width / 2 + 1 }
        }
    }

    /// True if `col` is part of the boundary.
    #[inline]
    pub fn contains_col(&self, col: i32) -> bool {
        col >= self.left && col < self.right
    }

    /// Columns `[start, end)` owned by `half` on a grid `width` wide.
    pub fn half_columns(&self, half: Half, width: i32) -> (i32, i32) {
        match half {
            Half::Left => (0, self.left),
            Half::Right => (self.right, width),
        }
    }
}

// =============================================================================
// GRID
// =============================================================================

/// Discrete play field. Immutable for the lifetime of a round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    /// Cell size in pixels
    pub cell_size: u32,
    /// Columns
    pub width_cells: i32,
    /// Rows, status bar included
    pub height_cells: i32,
    /// Bottom rows reserved for the status bar
    pub reserved_rows: i32,
}

impl Grid {
    /// Derive the grid for a play area.
    pub fn from_play_area(
        width_px: u32,
        height_px: u32,
        cell_size: u32,
        status_bar_percent: u32,
    ) -> Result<Self, ConfigError> {
        if cell_size < MIN_CELL_SIZE {
            return Err(ConfigError::CellTooSmall { got: cell_size, min: MIN_CELL_SIZE });
        }
        if status_bar_percent >= 100 {
            return Err(ConfigError::InvalidStatusBar(status_bar_percent));
        }

        let stride = cell_size + 1;
        let width_cells = (width_px / stride) as i32;
        let height_cells = (height_px / stride) as i32;
        let playable = height_cells * (100 - status_bar_percent as i32) / 100;

        if width_cells == 0 || playable == 0 {
            return Err(ConfigError::EmptyPlayArea {
                width: width_px,
                height: height_px,
                cell_size,
            });
        }
        if width_cells > MAX_GRID_CELLS || height_cells > MAX_GRID_CELLS {
            return Err(ConfigError::GridTooLarge {
                width: width_cells,
                height: height_cells,
                max: MAX_GRID_CELLS,
            });
        }

        Ok(Self {
            cell_size,
            width_cells,
            height_cells,
            reserved_rows: height_cells - playable,
        })
    }

    /// Build a grid directly from cell counts.
    pub fn new(width_cells: i32, playable_rows: i32, reserved_rows: i32, cell_size: u32) -> Self {
        Self {
            cell_size,
            width_cells,
            height_cells: playable_rows + reserved_rows,
            reserved_rows,
        }
    }

    /// Pixel distance between neighbouring cell origins.
    #[inline]
    pub fn stride(&self) -> u32 {
        self.cell_size + 1
    }

    /// Rows available to gameplay.
    #[inline]
    pub fn playable_rows(&self) -> i32 {
        self.height_cells - self.reserved_rows
    }

    /// Playable cell count.
    #[inline]
    pub fn cell_count(&self) -> i32 {
        self.width_cells * self.playable_rows()
    }

    /// Last aligned column, in cells.
    #[inline]
    pub fn max_x(&self) -> Fixed {
        from_int(self.width_cells - 1)
    }

    /// Last aligned playable row, in cells.
    #[inline]
    pub fn max_y(&self) -> Fixed {
        from_int(self.playable_rows() - 1)
    }

    /// True if `cell` is inside the playable area.
    #[inline]
    pub fn contains(&self, cell: Cell) -> bool {
        cell.col >= 0
            && cell.col < self.width_cells
            && cell.row >= 0
            && cell.row < self.playable_rows()
    }

    /// Side of a drawn cell in cell units (`cell_size / stride`).
    #[inline]
    pub fn footprint(&self) -> Fixed {
        fixed_ratio(self.cell_size as i64, self.stride() as i64)
    }

    /// Battle boundary for this grid.
    pub fn boundary(&self) -> BoundaryLine {
        BoundaryLine::for_width(self.width_cells)
    }

    /// Pixel origin of a cell.
    pub fn cell_to_pixels(&self, cell: Cell) -> (i32, i32) {
        let stride = self.stride() as i32;
        (cell.col * stride, cell.row * stride)
    }

    /// Pixel position of a continuous point (render only).
    pub fn to_pixels(&self, pos: FixedVec2) -> (f32, f32) {
        let (x, y) = pos.to_floats();
        let stride = self.stride() as f32;
        (x * stride, y * stride)
    }
}

// =============================================================================
// TESTS
// =============================================================================

//! Occupancy Oracle
//!
//! Explicit per-cell occupancy map, rebuilt from actor state before every
//! query. Collision and placement both read from it.
//!
//! A continuous position between two cells touches a *rear* cell (the one it
//! is leaving) and a *front* cell (the one it is entering). Aligned positions
//! have rear == front.

use serde::{Serialize, Deserialize};

use crate::core::fixed::{Fixed, fixed_ceil, fixed_floor};
use crate::core::vec2::FixedVec2;
use crate::game::grid::{BoundaryLine, Cell, Grid};
use crate::game::input::Direction;
use crate::game::obstacle::ObstacleState;
use crate::game::state::{ActorId, FoodState, SnakeActor};

/// What a cell holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Occupant {
    /// Empty playable cell
    Background,
    /// Food with the given id
    Food(u32),
    /// Head or body of a snake
    Body(ActorId),
    /// Obstacle footprint
    Obstacle(u32),
    /// Battle boundary band
    Boundary,
    /// Off-grid or status bar
    OutOfBounds,
}

impl Occupant {
    /// True if entering this cell disqualifies a snake.
    #[inline]
    pub fn is_collision(&self) -> bool {
        !matches!(self, Occupant::Background | Occupant::Food(_))
    }
}

/// Entity left out of a rebuild, so it does not collide with itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Exclusion {
    /// Nothing excluded
    None,
    /// The head cells of one snake (its body stays)
    HeadOf(ActorId),
    /// One obstacle's footprint
    Obstacle(u32),
}

/// Cell a continuous coordinate is leaving.
#[inline]
fn rear_axis(value: Fixed, positive: bool) -> i32 {
    if positive { fixed_floor(value) } else { fixed_ceil(value) }
}

/// Cell a continuous coordinate is entering.
#[inline]
fn front_axis(value: Fixed, positive: bool) -> i32 {
    if positive { fixed_ceil(value) } else { fixed_floor(value) }
}

/// Rear cell of a position moving in `direction`.
pub fn rear_cell(pos: FixedVec2, direction: Direction) -> Cell {
    let positive = direction.is_positive();
    match direction {
        Direction::Left | Direction::Right => {
            Cell::new(rear_axis(pos.x, positive), fixed_floor(pos.y))
        }
        Direction::Up | Direction::Down => {
            Cell::new(fixed_floor(pos.x), rear_axis(pos.y, positive))
        }
    }
}

/// Front cell of a position moving in `direction`.
pub fn front_cell(pos: FixedVec2, direction: Direction) -> Cell {
    let positive = direction.is_positive();
    match direction {
        Direction::Left | Direction::Right => {
            Cell::new(front_axis(pos.x, positive), fixed_floor(pos.y))
        }
        Direction::Up | Direction::Down => {
            Cell::new(fixed_floor(pos.x), front_axis(pos.y, positive))
        }
    }
}

/// Cells under the four corners of a square footprint at top-left `pos`.
pub fn footprint_cells(pos: FixedVec2, side: Fixed) -> [Cell; 4] {
    let left = fixed_floor(pos.x);
    let top = fixed_floor(pos.y);
    let right = fixed_floor(pos.x.wrapping_add(side));
    let bottom = fixed_floor(pos.y.wrapping_add(side));
    [
        Cell::new(left, top),
        Cell::new(right, top),
        Cell::new(left, bottom),
        Cell::new(right, bottom),
    ]
}

/// Occupancy of every playable cell.
#[derive(Clone, Debug)]
pub struct OccupancyGrid {
    width: i32,
    rows: i32,
    cells: Vec<Occupant>,
}

impl OccupancyGrid {
    /// Empty map for a grid.
    pub fn new(grid: &Grid) -> Self {
        let width = grid.width_cells;
        let rows = grid.playable_rows();
        Self {
            width,
            rows,
            cells: vec![Occupant::Background; (width * rows).max(0) as usize],
        }
    }

    #[inline]
    fn index(&self, cell: Cell) -> Option<usize> {
        if cell.col < 0 || cell.col >= self.width || cell.row < 0 || cell.row >= self.rows {
            return None;
        }
        Some((cell.row * self.width + cell.col) as usize)
    }

    /// Occupant of `cell`. Anything off the playable area is `OutOfBounds`.
    #[inline]
    pub fn test(&self, cell: Cell) -> Occupant {
        match self.index(cell) {
            Some(idx) => self.cells[idx],
            None => Occupant::OutOfBounds,
        }
    }

    /// True if `cell` is empty and playable.
    #[inline]
    pub fn is_free(&self, cell: Cell) -> bool {
        self.test(cell) == Occupant::Background
    }

    /// Mark a cell. Off-grid cells are ignored.
    #[inline]
    pub fn mark(&mut self, cell: Cell, occupant: Occupant) {
        if let Some(idx) = self.index(cell) {
            self.cells[idx] = occupant;
        }
    }

    /// Clear every cell to background.
    pub fn clear(&mut self) {
        self.cells.fill(Occupant::Background);
    }

    /// Rebuild from current actor state.
    ///
    /// Later marks win: boundary, food, obstacles, trails, then heads.
    pub fn rebuild(
        &mut self,
        grid: &Grid,
        actors: &[SnakeActor],
        foods: &[FoodState],
        obstacles: &[ObstacleState],
        boundary: Option<BoundaryLine>,
        exclude: Exclusion,
    ) {
        self.clear();

        if let Some(line) = boundary {
            for col in line.left..line.right {
                for row in 0..self.rows {
                    self.mark(Cell::new(col, row), Occupant::Boundary);
                }
            }
        }

        for food in foods {
            if let Some(cell) = food.position {
                self.mark(cell, Occupant::Food(food.id));
            }
        }

        let side = grid.footprint();
        for obstacle in obstacles {
            if exclude == Exclusion::Obstacle(obstacle.id) {
                continue;
            }
            for cell in footprint_cells(obstacle.position, side) {
                self.mark(cell, Occupant::Obstacle(obstacle.id));
            }
        }

        for actor in actors {
            for entry in actor.trail.entries() {
                self.mark(rear_cell(entry.position, entry.direction), Occupant::Body(actor.id));
            }
        }

        for actor in actors {
            if exclude == Exclusion::HeadOf(actor.id) {
                continue;
            }
            let body = Occupant::Body(actor.id);
            self.mark(rear_cell(actor.position, actor.direction), body);
            self.mark(front_cell(actor.position, actor.direction), body);
        }
    }

    /// Count of background cells.
    pub fn free_count(&self) -> usize {
        self.cells.iter().filter(|c| **c == Occupant::Background).count()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::{FIXED_ONE, from_int};
    use crate::game::trail::TrailEntry;

    const QUARTER: Fixed = FIXED_ONE / 4;

    #[test]
    fn test_rear_and_front_cells() {
        let pos = FixedVec2::new(from_int(5) + QUARTER, from_int(3));
        assert_eq!(rear_cell(pos, Direction::Right), Cell::new(5, 3));
        assert_eq!(front_cell(pos, Direction::Right), Cell::new(6, 3));

        let pos = FixedVec2::new(from_int(5) - QUARTER, from_int(3));
        assert_eq!(rear_cell(pos, Direction::Left), Cell::new(5, 3));
        assert_eq!(front_cell(pos, Direction::Left), Cell::new(4, 3));

        let pos = FixedVec2::new(from_int(2), from_int(7) - QUARTER);
        assert_eq!(rear_cell(pos, Direction::Up), Cell::new(2, 7));
        assert_eq!(front_cell(pos, Direction::Up), Cell::new(2, 6));

        // Aligned: rear == front
        let pos = Cell::new(4, 4).position();
        for direction in Direction::ALL {
            assert_eq!(rear_cell(pos, direction), front_cell(pos, direction));
        }
    }

    #[test]
    fn test_front_cell_off_grid() {
        let pos = FixedVec2::new(-QUARTER, from_int(3));
        assert_eq!(front_cell(pos, Direction::Left), Cell::new(-1, 3));
    }

    #[test]
    fn test_footprint_cells() {
        let side = FIXED_ONE * 20 / 21;
        let cells = footprint_cells(FixedVec2::new(from_int(3) + QUARTER, from_int(2)), side);
        assert_eq!(cells[0], Cell::new(3, 2));
        assert_eq!(cells[1], Cell::new(4, 2));
        assert_eq!(cells[2], Cell::new(3, 2));
        assert_eq!(cells[3], Cell::new(4, 2));
    }

    #[test]
    fn test_out_of_bounds_and_status_bar() {
        let grid = Grid::new(10, 8, 2, 20);
        let occ = OccupancyGrid::new(&grid);
        assert_eq!(occ.test(Cell::new(-1, 0)), Occupant::OutOfBounds);
        assert_eq!(occ.test(Cell::new(10, 0)), Occupant::OutOfBounds);
        // First status bar row
        assert_eq!(occ.test(Cell::new(0, 8)), Occupant::OutOfBounds);
        assert_eq!(occ.test(Cell::new(0, 7)), Occupant::Background);
        assert_eq!(occ.free_count(), 80);
    }

    #[test]
    fn test_collision_classes() {
        assert!(!Occupant::Background.is_collision());
        assert!(!Occupant::Food(0).is_collision());
        assert!(Occupant::Body(ActorId(0)).is_collision());
        assert!(Occupant::Obstacle(1).is_collision());
        assert!(Occupant::Boundary.is_collision());
        assert!(Occupant::OutOfBounds.is_collision());
    }

    #[test]
    fn test_rebuild_marks_and_excludes_own_head() {
        let grid = Grid::new(20, 16, 4, 20);
        let config = crate::game::config::SimConfig::default();
        let rules = crate::game::mode::GameMode::Classic.actor_rules(0, &config, &grid);
        let mut actor = SnakeActor::new(ActorId(0), Cell::new(5, 5), Direction::Right, 4, 4, rules);
        actor.trail.repos(TrailEntry { position: Cell::new(4, 5).position(), direction: Direction::Right });
        actor.position = FixedVec2::new(from_int(5) + QUARTER, from_int(5));

        let food = FoodState::new(7, None, crate::game::placement::Region::Playable);
        let food = FoodState { position: Some(Cell::new(9, 9)), ..food };

        let mut occ = OccupancyGrid::new(&grid);
        occ.rebuild(&grid, std::slice::from_ref(&actor), std::slice::from_ref(&food), &[], Some(grid.boundary()), Exclusion::None);

        assert_eq!(occ.test(Cell::new(4, 5)), Occupant::Body(ActorId(0)));
        assert_eq!(occ.test(Cell::new(5, 5)), Occupant::Body(ActorId(0)));
        assert_eq!(occ.test(Cell::new(6, 5)), Occupant::Body(ActorId(0)));
        assert_eq!(occ.test(Cell::new(9, 9)), Occupant::Food(7));
        assert_eq!(occ.test(Cell::new(9, 0)), Occupant::Boundary);
        assert_eq!(occ.test(Cell::new(10, 0)), Occupant::Boundary);

        occ.rebuild(&grid, std::slice::from_ref(&actor), &[], &[], None, Exclusion::HeadOf(ActorId(0)));
        assert_eq!(occ.test(Cell::new(4, 5)), Occupant::Body(ActorId(0)));
        assert_eq!(occ.test(Cell::new(6, 5)), Occupant::Background);
    }
}

//! Obstacle Controller
//!
//! Obstacles are free-moving squares the size of a drawn cell. They spawn on
//! a play-area edge, fly straight at the snake's head, and are destroyed the
//! moment any corner touches something other than empty space or food. An
//! obstacle that eats food becomes empowered and re-aims every tick.

use serde::{Serialize, Deserialize};

use crate::core::fixed::{Fixed, FIXED_HALF, fixed_atan2, fixed_mul, fixed_ratio};
use crate::core::rng::DeterministicRng;
use crate::core::vec2::FixedVec2;
use crate::game::config::SimConfig;
use crate::game::grid::Grid;
use crate::game::occupancy::{OccupancyGrid, Occupant, footprint_cells};
use crate::game::placement::{PlacementError, PlacementKind};
use crate::game::state::ActorId;

/// Spawn edge of the play area.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Edge {
    /// Row 0
    Top,
    /// Last column
    Right,
    /// Last playable row
    Bottom,
    /// Column 0
    Left,
}

impl Edge {
    const ALL: [Edge; 4] = [Edge::Top, Edge::Right, Edge::Bottom, Edge::Left];
}

/// A moving obstacle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObstacleState {
    /// Stable id within the round
    pub id: u32,
    /// Top-left corner, in cells
    pub position: FixedVec2,
    /// Unit heading
    pub heading: FixedVec2,
    /// Distance per tick, in cells
    pub speed: Fixed,
    /// Re-aims every tick once set
    pub empowered: bool,
    /// Times destroyed and respawned
    pub respawns: u32,
    /// Snake being chased
    pub target: ActorId,
}

impl ObstacleState {
    /// Create an obstacle at `position`, not yet aimed.
    pub fn new(id: u32, position: FixedVec2, speed: Fixed, target: ActorId) -> Self {
        Self {
            id,
            position,
            heading: FixedVec2::ZERO,
            speed,
            empowered: false,
            respawns: 0,
            target,
        }
    }

    /// Point the heading from this obstacle's centre at the centre of a
    /// snake head at `head`. A zero-length aim keeps the old heading.
    pub fn aim_at(&mut self, head: FixedVec2, footprint: Fixed) {
        let half = fixed_mul(footprint, FIXED_HALF);
        let from = self.position.offset(half);
        let to = head.offset(half);
        let heading = (to - from).normalize();
        if heading != FixedVec2::ZERO {
            self.heading = heading;
        }
    }

    /// Move one tick along the heading.
    #[inline]
    pub fn advance(&mut self) {
        self.position = self.position + self.heading.scale(self.speed);
    }

    /// Heading angle in fixed-point radians, for rendering.
    pub fn heading_angle(&self) -> Fixed {
        fixed_atan2(self.heading.y, self.heading.x)
    }

    /// Put the obstacle back at a fresh spawn point.
    pub fn respawn(&mut self, position: FixedVec2) {
        self.position = position;
        self.empowered = false;
        self.respawns += 1;
    }
}

/// Per-tick obstacle speed in cells.
pub fn obstacle_speed(config: &SimConfig, grid: &Grid) -> Fixed {
    fixed_ratio(
        config.obstacle_base_speed as i64,
        config.substeps_per_cell as i64 * grid.stride() as i64,
    )
}

/// True if any footprint corner touches something other than empty space
/// or food. The obstacle itself must be excluded from `occupancy`.
pub fn footprint_blocked(position: FixedVec2, footprint: Fixed, occupancy: &OccupancyGrid) -> bool {
    footprint_cells(position, footprint)
        .iter()
        .any(|cell| occupancy.test(*cell).is_collision())
}

/// Food id under any footprint corner.
pub fn food_under(position: FixedVec2, footprint: Fixed, occupancy: &OccupancyGrid) -> Option<u32> {
    footprint_cells(position, footprint)
        .iter()
        .find_map(|cell| match occupancy.test(*cell) {
            Occupant::Food(id) => Some(id),
            _ => None,
        })
}

/// Draw a spawn point on a random edge whose footprint is clear.
pub fn spawn_position(
    rng: &mut DeterministicRng,
    grid: &Grid,
    occupancy: &OccupancyGrid,
    max_attempts: u32,
) -> Result<FixedVec2, PlacementError> {
    let max_x = grid.max_x();
    let max_y = grid.max_y();
    let footprint = grid.footprint();

    for _ in 0..max_attempts {
        let edge = rng.choose(&Edge::ALL).copied().unwrap_or(Edge::Top);
        let candidate = match edge {
            Edge::Top => FixedVec2::new(rng.next_fixed_range(0, max_x + 1), 0),
            Edge::Right => FixedVec2::new(max_x, rng.next_fixed_range(0, max_y + 1)),
            Edge::Bottom => FixedVec2::new(rng.next_fixed_range(0, max_x + 1), max_y),
            Edge::Left => FixedVec2::new(0, rng.next_fixed_range(0, max_y + 1)),
        };
        if !footprint_blocked(candidate, footprint, occupancy) {
            return Ok(candidate);
        }
    }

    Err(PlacementError::Exhausted {
        kind: PlacementKind::Obstacle,
        attempts: max_attempts,
    })
}

/// Ticks between periodic spawns.
#[inline]
pub fn spawn_period(config: &SimConfig) -> u32 {
    config.obstacle_spawn_interval_cells.saturating_mul(config.substeps_per_cell).max(1)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::{FIXED_ONE, FIXED_PI, from_int, to_fixed};
    use crate::game::grid::Cell;

    fn grid() -> Grid {
        Grid::new(20, 16, 4, 20)
    }

    #[test]
    fn test_speed() {
        let config = SimConfig { substeps_per_cell: 4, obstacle_base_speed: 21, ..SimConfig::default() };
        // 21 px / (4 * 21 px)
        assert_eq!(obstacle_speed(&config, &grid()), FIXED_ONE / 4);
    }

    #[test]
    fn test_aim_and_advance() {
        let mut obstacle = ObstacleState::new(0, Cell::new(0, 5).position(), FIXED_ONE / 2, ActorId(0));
        obstacle.aim_at(Cell::new(10, 5).position(), grid().footprint());
        assert_eq!(obstacle.heading, FixedVec2::new(FIXED_ONE, 0));
        assert_eq!(obstacle.heading_angle(), 0);

        obstacle.advance();
        assert_eq!(obstacle.position, FixedVec2::new(FIXED_ONE / 2, from_int(5)));
    }

    #[test]
    fn test_aim_at_self_keeps_heading() {
        let mut obstacle = ObstacleState::new(0, Cell::new(3, 3).position(), FIXED_ONE, ActorId(0));
        obstacle.heading = FixedVec2::new(0, FIXED_ONE);
        obstacle.aim_at(Cell::new(3, 3).position(), grid().footprint());
        assert_eq!(obstacle.heading, FixedVec2::new(0, FIXED_ONE));
    }

    #[test]
    fn test_heading_angle_left() {
        let mut obstacle = ObstacleState::new(0, Cell::new(10, 3).position(), FIXED_ONE, ActorId(0));
        obstacle.aim_at(Cell::new(2, 3).position(), grid().footprint());
        assert!((obstacle.heading_angle() - FIXED_PI).abs() < to_fixed(0.01));
    }

    #[test]
    fn test_blocked_by_body_not_food() {
        let grid = grid();
        let mut occ = OccupancyGrid::new(&grid);
        let fp = grid.footprint();
        let pos = FixedVec2::new(from_int(4) + FIXED_ONE / 2, from_int(4));

        occ.mark(Cell::new(5, 4), Occupant::Food(2));
        assert!(!footprint_blocked(pos, fp, &occ));
        assert_eq!(food_under(pos, fp, &occ), Some(2));

        occ.mark(Cell::new(5, 4), Occupant::Body(ActorId(0)));
        assert!(footprint_blocked(pos, fp, &occ));

        // Leaving the grid kills
        let off = FixedVec2::new(-FIXED_ONE / 8, from_int(4));
        assert!(footprint_blocked(off, fp, &OccupancyGrid::new(&grid)));
    }

    #[test]
    fn test_spawn_on_edge() {
        let grid = grid();
        let occ = OccupancyGrid::new(&grid);
        let mut rng = DeterministicRng::new(99);
        for _ in 0..50 {
            let pos = spawn_position(&mut rng, &grid, &occ, 16).unwrap();
            let on_edge = pos.x == 0 || pos.y == 0 || pos.x == grid.max_x() || pos.y == grid.max_y();
            assert!(on_edge, "{} not on an edge", pos);
            assert!(!footprint_blocked(pos, grid.footprint(), &occ));
        }
    }

    #[test]
    fn test_spawn_exhaustion() {
        let grid = Grid::new(3, 3, 0, 20);
        let mut occ = OccupancyGrid::new(&grid);
        for col in 0..3 {
            for row in 0..3 {
                occ.mark(Cell::new(col, row), Occupant::Body(ActorId(0)));
            }
        }
        let mut rng = DeterministicRng::new(5);
        assert_eq!(
            spawn_position(&mut rng, &grid, &occ, 8),
            Err(PlacementError::Exhausted { kind: PlacementKind::Obstacle, attempts: 8 })
        );
    }

    #[test]
    fn test_respawn_clears_empowered() {
        let mut obstacle = ObstacleState::new(1, FixedVec2::ZERO, FIXED_ONE, ActorId(0));
        obstacle.empowered = true;
        obstacle.respawn(Cell::new(0, 4).position());
        assert!(!obstacle.empowered);
        assert_eq!(obstacle.respawns, 1);
    }

    #[test]
    fn test_spawn_period() {
        let config = SimConfig::default();
        assert_eq!(spawn_period(&config), 240);
    }
}

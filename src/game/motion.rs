//! Motion Controller
//!
//! Snakes move a fixed fraction of a cell per tick. Turns are buffered and
//! only committed at a cell boundary, so a snake is always on a grid line
//! along its off-axis.

use crate::core::fixed::FIXED_ONE;
use crate::core::vec2::FixedVec2;
use crate::game::grid::Grid;
use crate::game::input::Direction;
use crate::game::state::SnakeActor;
use crate::game::trail::TrailEntry;
use crate::game::wrap;

/// What happened during one advance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MotionStep {
    /// Turn committed before moving
    pub redirected: Option<Direction>,
    /// Snake ended the tick on a cell boundary
    pub aligned: bool,
    /// Snake jumped to the opposite edge
    pub wrapped: bool,
}

/// Buffer a turn.
///
/// Only quarter turns are accepted, and only while no other turn is
/// pending. Returns true if the turn was buffered.
pub fn request_direction(actor: &mut SnakeActor, requested: Direction) -> bool {
    if actor.disqualified || actor.pending_direction.is_some() {
        return false;
    }
    if !actor.direction.is_perpendicular(requested) {
        return false;
    }
    actor.pending_direction = Some(requested);
    true
}

/// Advance a snake by one sub-step.
pub fn advance(actor: &mut SnakeActor, grid: &Grid, substeps: u32, teleport: bool) -> MotionStep {
    let substeps = substeps.max(1);
    let mut step = MotionStep::default();

    if actor.is_aligned() {
        if let Some(next) = actor.pending_direction.take() {
            if actor.direction.is_perpendicular(next) {
                actor.direction = next;
                step.redirected = Some(next);
            }
        }
    }

    let previous = TrailEntry {
        position: actor.position,
        direction: actor.direction,
    };

    let stride = FIXED_ONE / substeps as i32;
    let (dx, dy) = actor.direction.delta();
    actor.position = actor.position + FixedVec2::new(dx * stride, dy * stride);
    actor.sub_step_counter = (actor.sub_step_counter + 1) % substeps;

    if actor.sub_step_counter == 0 {
        // Non power-of-two sub-steps leave a remainder; drop it.
        actor.position = actor.position.snapped();
        step.aligned = true;
    }

    let resolved = wrap::resolve(actor.position, actor.direction, teleport, actor.rules.wrap, grid);
    if resolved.wrapped {
        actor.position = resolved.position;
        actor.sub_step_counter = 0;
        step.aligned = true;
        step.wrapped = true;
    }

    actor.trail.repos(previous);

    #[cfg(feature = "debug-tracing")]
    tracing::trace!(
        "{} at {} dir {:?} counter {}",
        actor.id,
        actor.position,
        actor.direction,
        actor.sub_step_counter
    );

    step
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::{from_int, is_whole};
    use crate::game::config::SimConfig;
    use crate::game::grid::Cell;
    use crate::game::mode::GameMode;
    use crate::game::state::ActorId;
    use proptest::prelude::*;

    fn grid() -> Grid {
        Grid::new(20, 20, 0, 20)
    }

    fn snake(mode: GameMode, start: Cell, direction: Direction) -> SnakeActor {
        let grid = grid();
        let rules = mode.actor_rules(0, &SimConfig::default(), &grid);
        SnakeActor::new(ActorId(0), start, direction, 4, 4, rules)
    }

    #[test]
    fn test_advance_quarter_cell() {
        let grid = grid();
        let mut actor = snake(GameMode::Classic, Cell::new(5, 5), Direction::Right);

        let step = advance(&mut actor, &grid, 4, true);
        assert_eq!(actor.position, FixedVec2::new(from_int(5) + FIXED_ONE / 4, from_int(5)));
        assert_eq!(actor.sub_step_counter, 1);
        assert!(!step.aligned);

        for _ in 0..3 {
            advance(&mut actor, &grid, 4, true);
        }
        assert_eq!(actor.position, Cell::new(6, 5).position());
        assert!(actor.is_aligned());
    }

    #[test]
    fn test_turn_waits_for_alignment() {
        let grid = grid();
        let mut actor = snake(GameMode::Classic, Cell::new(5, 5), Direction::Right);
        advance(&mut actor, &grid, 4, true);

        assert!(request_direction(&mut actor, Direction::Up));
        // Second request is dropped while one is pending
        assert!(!request_direction(&mut actor, Direction::Down));

        for _ in 0..3 {
            let step = advance(&mut actor, &grid, 4, true);
            assert_eq!(step.redirected, None);
            assert_eq!(actor.direction, Direction::Right);
        }

        let step = advance(&mut actor, &grid, 4, true);
        assert_eq!(step.redirected, Some(Direction::Up));
        assert_eq!(actor.direction, Direction::Up);
        assert_eq!(actor.pending_direction, None);
        assert_eq!(actor.position, FixedVec2::new(from_int(6), from_int(5) - FIXED_ONE / 4));
    }

    #[test]
    fn test_reverse_and_same_direction_rejected() {
        let mut actor = snake(GameMode::Classic, Cell::new(5, 5), Direction::Up);
        assert!(!request_direction(&mut actor, Direction::Down));
        assert!(!request_direction(&mut actor, Direction::Up));
        assert!(request_direction(&mut actor, Direction::Left));
    }

    #[test]
    fn test_disqualified_ignores_input() {
        let mut actor = snake(GameMode::Classic, Cell::new(5, 5), Direction::Up);
        actor.disqualified = true;
        assert!(!request_direction(&mut actor, Direction::Left));
    }

    #[test]
    fn test_three_substeps_snap() {
        let grid = grid();
        let mut actor = snake(GameMode::Classic, Cell::new(5, 5), Direction::Right);
        for _ in 0..3 {
            advance(&mut actor, &grid, 3, true);
        }
        assert_eq!(actor.position, Cell::new(6, 5).position());
    }

    #[test]
    fn test_wrap_resets_counter() {
        let grid = grid();
        let mut actor = snake(GameMode::Classic, Cell::new(0, 4), Direction::Left);
        let step = advance(&mut actor, &grid, 4, true);
        assert!(step.wrapped);
        assert_eq!(actor.position, Cell::new(19, 4).position());
        assert_eq!(actor.sub_step_counter, 0);
    }

    #[test]
    fn test_trail_records_previous_head() {
        let grid = grid();
        let mut actor = snake(GameMode::Classic, Cell::new(5, 5), Direction::Right);
        advance(&mut actor, &grid, 4, true);
        let newest = actor.trail.entries().next().unwrap();
        assert_eq!(newest.position, Cell::new(5, 5).position());
    }

    proptest! {
        #[test]
        fn prop_never_reverses_and_stays_in_bounds(
            start_col in 0i32..20,
            start_row in 0i32..20,
            codes in proptest::collection::vec(0u8..5, 1..200),
        ) {
            let grid = grid();
            let mut actor = snake(GameMode::Classic, Cell::new(start_col, start_row), Direction::Up);

            for code in codes {
                if let Some(direction) = Direction::from_code(code) {
                    request_direction(&mut actor, direction);
                }
                let before = actor.direction;
                advance(&mut actor, &grid, 4, true);
                prop_assert!(!before.is_opposite(actor.direction));

                prop_assert!(actor.position.x >= 0 && actor.position.x <= grid.max_x());
                prop_assert!(actor.position.y >= 0 && actor.position.y <= grid.max_y());
                if actor.is_aligned() {
                    prop_assert!(is_whole(actor.position.x) && is_whole(actor.position.y));
                }
            }
        }
    }
}

//! Trail / Body Manager
//!
//! The body is the history of past head positions, one entry per tick.
//! Growth is modelled as placeholder entries: while placeholders remain the
//! tail is not popped, so the body extends by one sub-step per tick.
//!
//! ```text
//!   head ─► [newest entry] [..] [..] [oldest entry] (+ placeholders)
//! ```

use std::collections::VecDeque;
use serde::{Serialize, Deserialize};

use crate::core::vec2::FixedVec2;
use crate::game::input::Direction;

/// One recorded head position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrailEntry {
    /// Head position at the time, in cells
    pub position: FixedVec2,
    /// Direction the head was moving from that position
    pub direction: Direction,
}

/// Ordered body history of one snake.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trail {
    /// Newest entry first
    entries: VecDeque<TrailEntry>,
    /// Placeholder sub-steps still to be filled
    growth_pending: u32,
    /// Sub-steps per cell
    substeps: u32,
}

impl Trail {
    /// New trail for a snake of `starting_length` cells. Everything except
    /// the head starts as placeholders, so the body grows out of the start
    /// cell.
    pub fn new(starting_length: u32, substeps: u32) -> Self {
        let substeps = substeps.max(1);
        let capacity = (starting_length.max(1) * substeps) as usize;
        Self {
            entries: VecDeque::with_capacity(capacity),
            growth_pending: starting_length.saturating_sub(1) * substeps,
            substeps,
        }
    }

    /// Record the previous head position.
    ///
    /// Pops the tail unless a placeholder absorbs the step.
    pub fn repos(&mut self, previous_head: TrailEntry) {
        self.entries.push_front(previous_head);
        if self.growth_pending > 0 {
            self.growth_pending -= 1;
        } else {
            self.entries.pop_back();
        }
    }

    /// Lengthen the snake by `cells`.
    pub fn grow(&mut self, cells: u32) {
        self.growth_pending = self.growth_pending.saturating_add(cells.saturating_mul(self.substeps));
    }

    /// Visible length in cells, head included.
    pub fn len(&self) -> u32 {
        self.sub_steps() / self.substeps + 1
    }

    /// Never empty: the head always counts.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Body length in sub-steps, placeholders included.
    #[inline]
    pub fn sub_steps(&self) -> u32 {
        self.entries.len() as u32 + self.growth_pending
    }

    /// Placeholders not yet filled.
    #[inline]
    pub fn growth_pending(&self) -> u32 {
        self.growth_pending
    }

    /// Recorded entries, newest first.
    pub fn entries(&self) -> impl Iterator<Item = &TrailEntry> + '_ {
        self.entries.iter()
    }

    /// Number of recorded entries.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Drop the body and start over at `starting_length`.
    pub fn reset(&mut self, starting_length: u32) {
        self.entries.clear();
        self.growth_pending = starting_length.saturating_sub(1) * self.substeps;
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::FIXED_ONE;

    fn entry(x: i32) -> TrailEntry {
        TrailEntry {
            position: FixedVec2::new(x * FIXED_ONE / 4, 0),
            direction: Direction::Right,
        }
    }

    #[test]
    fn test_new_trail_is_placeholders() {
        let trail = Trail::new(4, 4);
        assert_eq!(trail.len(), 4);
        assert_eq!(trail.entry_count(), 0);
        assert_eq!(trail.growth_pending(), 12);
    }

    #[test]
    fn test_repos_fills_placeholders_then_pops() {
        let mut trail = Trail::new(2, 4);
        for i in 0..4 {
            trail.repos(entry(i));
        }
        assert_eq!(trail.entry_count(), 4);
        assert_eq!(trail.growth_pending(), 0);
        assert_eq!(trail.len(), 2);

        trail.repos(entry(4));
        assert_eq!(trail.entry_count(), 4);
        assert_eq!(trail.entries().next(), Some(&entry(4)));
        assert_eq!(trail.entries().last(), Some(&entry(1)));
    }

    #[test]
    fn test_length_invariant_in_sub_steps() {
        let mut trail = Trail::new(4, 4);
        for i in 0..50 {
            trail.repos(entry(i));
            assert_eq!(trail.sub_steps(), (trail.len() - 1) * 4);
        }
    }

    #[test]
    fn test_grow_one_cell_after_substeps_ticks() {
        let mut trail = Trail::new(3, 4);
        for i in 0..20 {
            trail.repos(entry(i));
        }
        let before = trail.len();

        trail.grow(1);
        for i in 20..24 {
            trail.repos(entry(i));
        }

        assert_eq!(trail.len(), before + 1);
        assert_eq!(trail.entry_count() as u32, before * 4);
        assert_eq!(trail.growth_pending(), 0);
    }

    #[test]
    fn test_reset() {
        let mut trail = Trail::new(4, 4);
        for i in 0..30 {
            trail.repos(entry(i));
        }
        trail.grow(3);
        trail.reset(4);

        assert_eq!(trail.len(), 4);
        assert_eq!(trail.entry_count(), 0);
    }

    #[test]
    fn test_starting_length_one() {
        let mut trail = Trail::new(1, 4);
        assert_eq!(trail.len(), 1);
        trail.repos(entry(0));
        assert_eq!(trail.entry_count(), 0);
    }
}

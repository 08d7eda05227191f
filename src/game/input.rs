//! Input Capture and Buffering
//!
//! Steering is discrete: an input frame either names a direction or is idle.
//! Frames are what the simulation consumes and what replays record.

use std::collections::VecDeque;
use serde::{Serialize, Deserialize};

use crate::game::state::ActorId;

// =============================================================================
// DIRECTION
// =============================================================================

/// Axis of a direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    /// Left / Right
    Horizontal,
    /// Up / Down
    Vertical,
}

/// Heading of a snake. Up decreases the row index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Direction {
    /// Toward row 0
    Up = 0,
    /// Toward the status bar
    Down = 1,
    /// Toward column 0
    Left = 2,
    /// Toward the last column
    Right = 3,
}

impl Direction {
    /// All four directions.
    pub const ALL: [Direction; 4] = [Direction::Up, Direction::Down, Direction::Left, Direction::Right];

    /// Decode from the wire code.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Direction::Up),
            1 => Some(Direction::Down),
            2 => Some(Direction::Left),
            3 => Some(Direction::Right),
            _ => None,
        }
    }

    /// Axis this direction moves along.
    #[inline]
    pub fn axis(self) -> Axis {
        match self {
            Direction::Up | Direction::Down => Axis::Vertical,
            Direction::Left | Direction::Right => Axis::Horizontal,
        }
    }

    /// The reverse direction.
    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// True if `other` reverses this direction.
    #[inline]
    pub fn is_opposite(self, other: Direction) -> bool {
        self.opposite() == other
    }

    /// True if `other` is a quarter turn away.
    #[inline]
    pub fn is_perpendicular(self, other: Direction) -> bool {
        self.axis() != other.axis()
    }

    /// True if moving increases the coordinate on this axis.
    #[inline]
    pub fn is_positive(self) -> bool {
        matches!(self, Direction::Down | Direction::Right)
    }

    /// Unit step `(dx, dy)`.
    #[inline]
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    /// Head sprite rotation in degrees (counter-clockwise from Up).
    pub fn sprite_rotation(self) -> u16 {
        match self {
            Direction::Up => 0,
            Direction::Left => 90,
            Direction::Down => 180,
            Direction::Right => 270,
        }
    }
}

// =============================================================================
// INPUT FRAME
// =============================================================================

/// Input for a single actor on a single tick.
///
/// NO tick field - tick is stored separately for compression.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[repr(C)]
pub struct InputFrame {
    /// 0 = idle, otherwise direction code + 1
    pub steer: u8,
}

impl InputFrame {
    /// Size in bytes
    pub const SIZE: usize = 1;

    /// Idle frame.
    pub const fn new() -> Self {
        Self { steer: 0 }
    }

    /// Frame requesting a turn.
    pub const fn steer(direction: Direction) -> Self {
        Self { steer: direction as u8 + 1 }
    }

    /// Requested direction, if any.
    #[inline]
    pub fn direction(&self) -> Option<Direction> {
        self.steer.checked_sub(1).and_then(Direction::from_code)
    }

    /// Check if this is an idle frame (no input).
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.direction().is_none()
    }
}

// =============================================================================
// INTENT QUEUE
// =============================================================================

/// Per-actor holding area for steering intents that arrive faster than
/// the snake can turn.
///
/// The snake itself only holds one pending turn. While that slot is busy,
/// up to `CAPACITY` further intents wait here; anything beyond is dropped.
#[derive(Clone, Debug, Default)]
pub struct IntentQueue {
    slots: VecDeque<Direction>,
}

impl IntentQueue {
    /// Intents held at most.
    pub const CAPACITY: usize = 2;

    /// Create an empty queue.
    pub fn new() -> Self {
        Self { slots: VecDeque::with_capacity(Self::CAPACITY) }
    }

    /// Queue an intent. Returns false if it was dropped.
    pub fn push(&mut self, direction: Direction) -> bool {
        if self.slots.len() >= Self::CAPACITY {
            return false;
        }
        // Repeating the newest intent adds nothing.
        if self.slots.back() == Some(&direction) {
            return false;
        }
        self.slots.push_back(direction);
        true
    }

    /// Frame to feed this tick: the oldest intent once the snake's
    /// pending slot is free, otherwise idle.
    pub fn next_frame(&mut self, pending_busy: bool) -> InputFrame {
        if pending_busy {
            return InputFrame::new();
        }
        match self.slots.pop_front() {
            Some(direction) => InputFrame::steer(direction),
            None => InputFrame::new(),
        }
    }

    /// Number of queued intents.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Drop everything (round reset, pause).
    pub fn clear(&mut self) {
        self.slots.clear();
    }
}

// =============================================================================
// INPUT RECORDING
// =============================================================================

/// A non-idle frame and the tick it was fed on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputDelta {
    /// Round tick the frame was fed on
    pub tick: u32,
    /// The frame
    pub frame: InputFrame,
}

impl InputDelta {
    /// Create new delta entry.
    pub fn new(tick: u32, frame: InputFrame) -> Self {
        Self { tick, frame }
    }
}

/// Complete input recording for one actor in one round.
///
/// Steering is an impulse, so only non-idle frames are stored; every
/// other tick replays as idle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorInputBuffer {
    /// Actor the frames belong to
    pub actor_id: ActorId,
    /// Last tick recorded (idle or not)
    pub end_tick: u32,
    /// Non-idle frames in tick order
    deltas: Vec<InputDelta>,
}

impl ActorInputBuffer {
    /// Create a new input buffer for an actor.
    pub fn new(actor_id: ActorId) -> Self {
        Self {
            actor_id,
            end_tick: 0,
            deltas: Vec::with_capacity(64),
        }
    }

    /// Record the frame fed on `tick`.
    pub fn record(&mut self, tick: u32, frame: InputFrame) {
        self.end_tick = self.end_tick.max(tick);
        if !frame.is_idle() {
            self.deltas.push(InputDelta::new(tick, frame));
        }
    }

    /// Frame fed on `tick`.
    ///
    /// Uses binary search for efficiency.
    pub fn get_input_at(&self, tick: u32) -> InputFrame {
        match self.deltas.binary_search_by_key(&tick, |d| d.tick) {
            Ok(idx) => self.deltas[idx].frame,
            Err(_) => InputFrame::new(),
        }
    }

    /// All non-idle entries.
    pub fn deltas(&self) -> &[InputDelta] {
        &self.deltas
    }

    /// Number of non-idle entries.
    pub fn delta_count(&self) -> usize {
        self.deltas.len()
    }

    /// Iterate `(tick, frame)` for every tick from 0 to `end_tick`.
    pub fn replay_iter(&self) -> ReplayIterator<'_> {
        ReplayIterator {
            buffer: self,
            current_tick: 0,
            delta_idx: 0,
            finished: false,
        }
    }
}

/// Iterator for replaying inputs tick-by-tick.
pub struct ReplayIterator<'a> {
    buffer: &'a ActorInputBuffer,
    current_tick: u32,
    delta_idx: usize,
    finished: bool,
}

impl<'a> Iterator for ReplayIterator<'a> {
    type Item = (u32, InputFrame);

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished || self.current_tick > self.buffer.end_tick {
            return None;
        }

        let mut frame = InputFrame::new();
        if let Some(delta) = self.buffer.deltas.get(self.delta_idx) {
            if delta.tick == self.current_tick {
                frame = delta.frame;
                self.delta_idx += 1;
            }
        }

        let result = (self.current_tick, frame);
        match self.current_tick.checked_add(1) {
            Some(next) => self.current_tick = next,
            None => self.finished = true,
        }
        Some(result)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_direction_relations() {
        assert!(Direction::Up.is_opposite(Direction::Down));
        assert!(Direction::Left.is_opposite(Direction::Right));
        assert!(!Direction::Up.is_opposite(Direction::Left));

        assert!(Direction::Up.is_perpendicular(Direction::Left));
        assert!(!Direction::Up.is_perpendicular(Direction::Up));
        assert!(!Direction::Up.is_perpendicular(Direction::Down));

        assert_eq!(Direction::Up.delta(), (0, -1));
        assert!(Direction::Right.is_positive());
        assert!(!Direction::Left.is_positive());
    }

    #[test]
    fn test_direction_codes() {
        for direction in Direction::ALL {
            assert_eq!(Direction::from_code(direction as u8), Some(direction));
        }
        assert_eq!(Direction::from_code(4), None);
    }

    #[test]
    fn test_input_frame() {
        assert!(InputFrame::new().is_idle());
        assert_eq!(InputFrame::default(), InputFrame::new());

        let frame = InputFrame::steer(Direction::Left);
        assert_eq!(frame.direction(), Some(Direction::Left));
        assert!(!frame.is_idle());

        // Garbage codes decode as idle
        assert!(InputFrame { steer: 200 }.is_idle());
    }

    #[test]
    fn test_intent_queue_capacity() {
        let mut queue = IntentQueue::new();
        assert!(queue.push(Direction::Left));
        assert!(queue.push(Direction::Up));
        assert!(!queue.push(Direction::Right), "third intent is dropped");
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_intent_queue_waits_for_pending_slot() {
        let mut queue = IntentQueue::new();
        queue.push(Direction::Left);
        queue.push(Direction::Up);

        // Snake still holds a pending turn: nothing is offered
        assert!(queue.next_frame(true).is_idle());
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.next_frame(false).direction(), Some(Direction::Left));
        assert_eq!(queue.next_frame(false).direction(), Some(Direction::Up));
        assert!(queue.next_frame(false).is_idle());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_intent_queue_ignores_repeats() {
        let mut queue = IntentQueue::new();
        assert!(queue.push(Direction::Left));
        assert!(!queue.push(Direction::Left));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_input_buffer_stores_only_steering() {
        let mut buffer = ActorInputBuffer::new(ActorId(0));
        buffer.record(0, InputFrame::new());
        buffer.record(1, InputFrame::steer(Direction::Left));
        buffer.record(2, InputFrame::new());
        buffer.record(3, InputFrame::steer(Direction::Up));
        buffer.record(9, InputFrame::new());

        assert_eq!(buffer.delta_count(), 2);
        assert_eq!(buffer.end_tick, 9);
    }

    #[test]
    fn test_input_buffer_get_at() {
        let mut buffer = ActorInputBuffer::new(ActorId(1));
        buffer.record(10, InputFrame::steer(Direction::Left));
        buffer.record(20, InputFrame::steer(Direction::Down));

        assert!(buffer.get_input_at(5).is_idle());
        assert_eq!(buffer.get_input_at(10).direction(), Some(Direction::Left));
        // Impulses do not persist
        assert!(buffer.get_input_at(15).is_idle());
        assert_eq!(buffer.get_input_at(20).direction(), Some(Direction::Down));
        assert!(buffer.get_input_at(21).is_idle());
    }

    #[test]
    fn test_replay_iterator() {
        let mut buffer = ActorInputBuffer::new(ActorId(0));
        buffer.record(1, InputFrame::steer(Direction::Right));
        buffer.record(3, InputFrame::steer(Direction::Down));
        buffer.record(5, InputFrame::new());

        let frames: Vec<_> = buffer.replay_iter().collect();

        assert_eq!(frames.len(), 6); // Ticks 0-5
        assert!(frames[0].1.is_idle());
        assert_eq!(frames[1].1.direction(), Some(Direction::Right));
        assert!(frames[2].1.is_idle());
        assert_eq!(frames[3].1.direction(), Some(Direction::Down));
        assert!(frames[5].1.is_idle());
    }

    proptest! {
        #[test]
        fn prop_replay_iter_matches_get_input_at(
            ticks in proptest::collection::btree_set(0u32..200, 0..40),
            codes in proptest::collection::vec(0u8..4, 40),
        ) {
            let mut buffer = ActorInputBuffer::new(ActorId(0));
            for (tick, code) in ticks.iter().zip(codes.iter()) {
                let direction = Direction::from_code(*code).unwrap();
                buffer.record(*tick, InputFrame::steer(direction));
            }
            buffer.record(200, InputFrame::new());

            for (tick, frame) in buffer.replay_iter() {
                prop_assert_eq!(frame, buffer.get_input_at(tick));
            }
        }
    }
}

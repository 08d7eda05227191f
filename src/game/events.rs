//! Game Events
//!
//! Events generated during simulation for the render/audio shell, logs and
//! replay checks.

use serde::{Serialize, Deserialize};

use crate::core::vec2::FixedVec2;
use crate::game::grid::Cell;
use crate::game::input::Direction;
use crate::game::occupancy::Occupant;
use crate::game::placement::PlacementKind;
use crate::game::state::{ActorId, EndReason, RoundPhase};

/// Priority for event processing order.
///
/// Lower value = processed first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum EventPriority {
    /// Disqualifications first
    Disqualification = 0,
    /// Then eating
    Eat = 1,
    /// Then growth
    Growth = 2,
    /// Then food and obstacle placement
    Placement = 3,
    /// Then steering
    Movement = 4,
    /// Lowest priority
    Other = 255,
}

/// Discrete audio cue for the sound collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoundCue {
    /// A snake turned
    Redirect,
    /// A snake ate
    Eat,
}

/// Game event data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEventData {
    /// Buffered turn committed
    Redirected {
        actor_id: ActorId,
        direction: Direction,
    },

    /// Snake ate a food
    FoodEaten {
        actor_id: ActorId,
        food_id: u32,
        cell: Cell,
        new_length: u32,
    },

    /// Survival clock forced a growth
    ForcedGrowth {
        actor_id: ActorId,
        new_length: u32,
    },

    /// Food placed on a cell
    FoodPlaced {
        food_id: u32,
        cell: Cell,
    },

    /// Snake entered a blocking cell
    ActorDisqualified {
        actor_id: ActorId,
        cause: Occupant,
        cell: Cell,
    },

    /// New obstacle
    ObstacleSpawned {
        obstacle_id: u32,
        position: FixedVec2,
    },

    /// Obstacle destroyed and put back on an edge
    ObstacleRespawned {
        obstacle_id: u32,
        position: FixedVec2,
    },

    /// Obstacle ate a food
    ObstacleEmpowered {
        obstacle_id: u32,
        food_id: u32,
    },

    /// Placement ran out of attempts; retried next tick
    PlacementFailed {
        kind: PlacementKind,
        attempts: u32,
    },

    /// Round phase changed
    PhaseChanged {
        old_phase: RoundPhase,
        new_phase: RoundPhase,
    },

    /// Round ended
    RoundEnded {
        winner_id: Option<ActorId>,
        reason: EndReason,
        duration_ticks: u32,
    },
}

/// A game event with timing and priority.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameEvent {
    /// Tick when event occurred
    pub tick: u32,

    /// Processing priority
    pub priority: EventPriority,

    /// Actor involved (for tie-breaking)
    pub actor_id: Option<ActorId>,

    /// Event data
    pub data: GameEventData,
}

impl GameEvent {
    /// Create a new event.
    pub fn new(tick: u32, priority: EventPriority, data: GameEventData) -> Self {
        let actor_id = match &data {
            GameEventData::Redirected { actor_id, .. } => Some(*actor_id),
            GameEventData::FoodEaten { actor_id, .. } => Some(*actor_id),
            GameEventData::ForcedGrowth { actor_id, .. } => Some(*actor_id),
            GameEventData::ActorDisqualified { actor_id, .. } => Some(*actor_id),
            GameEventData::RoundEnded { winner_id, .. } => *winner_id,
            _ => None,
        };

        Self {
            tick,
            priority,
            actor_id,
            data,
        }
    }

    /// Create redirected event.
    pub fn redirected(tick: u32, actor_id: ActorId, direction: Direction) -> Self {
        Self::new(tick, EventPriority::Movement, GameEventData::Redirected { actor_id, direction })
    }

    /// Create food eaten event.
    pub fn food_eaten(tick: u32, actor_id: ActorId, food_id: u32, cell: Cell, new_length: u32) -> Self {
        Self::new(
            tick,
            EventPriority::Eat,
            GameEventData::FoodEaten {
                actor_id,
                food_id,
                cell,
                new_length,
            },
        )
    }

    /// Create forced growth event.
    pub fn forced_growth(tick: u32, actor_id: ActorId, new_length: u32) -> Self {
        Self::new(tick, EventPriority::Growth, GameEventData::ForcedGrowth { actor_id, new_length })
    }

    /// Create food placed event.
    pub fn food_placed(tick: u32, food_id: u32, cell: Cell) -> Self {
        Self::new(tick, EventPriority::Placement, GameEventData::FoodPlaced { food_id, cell })
    }

    /// Create disqualification event.
    pub fn actor_disqualified(tick: u32, actor_id: ActorId, cause: Occupant, cell: Cell) -> Self {
        Self::new(
            tick,
            EventPriority::Disqualification,
            GameEventData::ActorDisqualified { actor_id, cause, cell },
        )
    }

    /// Create obstacle spawned event.
    pub fn obstacle_spawned(tick: u32, obstacle_id: u32, position: FixedVec2) -> Self {
        Self::new(tick, EventPriority::Placement, GameEventData::ObstacleSpawned { obstacle_id, position })
    }

    /// Create obstacle respawned event.
    pub fn obstacle_respawned(tick: u32, obstacle_id: u32, position: FixedVec2) -> Self {
        Self::new(tick, EventPriority::Placement, GameEventData::ObstacleRespawned { obstacle_id, position })
    }

    /// Create obstacle empowered event.
    pub fn obstacle_empowered(tick: u32, obstacle_id: u32, food_id: u32) -> Self {
        Self::new(tick, EventPriority::Eat, GameEventData::ObstacleEmpowered { obstacle_id, food_id })
    }

    /// Create placement failed event.
    pub fn placement_failed(tick: u32, kind: PlacementKind, attempts: u32) -> Self {
        Self::new(tick, EventPriority::Placement, GameEventData::PlacementFailed { kind, attempts })
    }

    /// Create phase changed event.
    pub fn phase_changed(tick: u32, old_phase: RoundPhase, new_phase: RoundPhase) -> Self {
        Self::new(tick, EventPriority::Other, GameEventData::PhaseChanged { old_phase, new_phase })
    }

    /// Create round ended event.
    pub fn round_ended(tick: u32, winner_id: Option<ActorId>, reason: EndReason) -> Self {
        Self::new(
            tick,
            EventPriority::Other,
            GameEventData::RoundEnded {
                winner_id,
                reason,
                duration_ticks: tick,
            },
        )
    }

    /// Audio cue for this event, if any.
    pub fn sound_cue(&self) -> Option<SoundCue> {
        match self.data {
            GameEventData::Redirected { .. } => Some(SoundCue::Redirect),
            GameEventData::FoodEaten { .. } => Some(SoundCue::Eat),
            _ => None,
        }
    }
}

impl PartialEq for GameEvent {
    fn eq(&self, other: &Self) -> bool {
        self.tick == other.tick
            && self.priority == other.priority
            && self.actor_id == other.actor_id
            && self.data == other.data
    }
}

impl Eq for GameEvent {}

impl PartialOrd for GameEvent {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GameEvent {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Sort by: tick, then priority, then actor_id
        self.tick
            .cmp(&other.tick)
            .then(self.priority.cmp(&other.priority))
            .then(self.actor_id.cmp(&other.actor_id))
    }
}

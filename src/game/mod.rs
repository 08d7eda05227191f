//! Game Logic Module
//!
//! All round simulation code. 100% deterministic.
//!
//! ## Module Structure
//!
//! - `config`: Round configuration and validation
//! - `grid`: Play-area to cell grid conversion, battle boundary
//! - `input`: Directions, steering frames, intent queue, recording
//! - `motion`: Sub-cell movement and aligned turns
//! - `trail`: Body history and growth
//! - `wrap`: Edge wrapping (whole grid or per half)
//! - `occupancy`: Cell occupancy map for collisions and placement
//! - `placement`: Food placement
//! - `obstacle`: Moving obstacles
//! - `mode`: Per-mode rules
//! - `state`: Round state, actors, outcome, snapshots
//! - `tick`: Authoritative simulation loop
//! - `events`: Game events for render/audio/replay

pub mod config;
pub mod grid;
pub mod input;
pub mod motion;
pub mod trail;
pub mod wrap;
pub mod occupancy;
pub mod placement;
pub mod obstacle;
pub mod mode;
pub mod state;
pub mod tick;
pub mod events;

// Re-export key types
pub use config::{ConfigError, SimConfig};
pub use grid::{Cell, Grid};
pub use input::{ActorInputBuffer, Direction, InputFrame, IntentQueue};
pub use mode::GameMode;
pub use state::{ActorId, RoundOutcome, RoundPhase, RoundState, SnakeActor};
pub use tick::{tick, replay_round, TickResult};
pub use events::{GameEvent, GameEventData, SoundCue};

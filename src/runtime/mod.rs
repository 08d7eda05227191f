//! Runtime Layer
//!
//! Session lifecycle, the fixed-rate tokio driver and round recordings.
//! This layer is **non-deterministic** (wall clock, channels); all game
//! logic runs through `game/`.

pub mod session;
pub mod driver;
pub mod replay;

pub use session::{Control, RoundRecord, RoundSession, SessionError, SessionId, SessionStep};
pub use driver::{Driver, DriverHandle};
pub use replay::{ReplayError, RoundReplay};

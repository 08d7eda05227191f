//! # Grid Snake
//!
//! Deterministic grid snake simulation: classic, obstacle, battle,
//! cooperative, survival and survival-battle rounds.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        GRID SNAKE                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── fixed.rs    - Q16.16 fixed-point arithmetic             │
//! │  ├── vec2.rs     - 2D vector with fixed-point                │
//! │  ├── rng.rs      - Deterministic Xorshift128+ PRNG           │
//! │  └── hash.rs     - State hashing for verification            │
//! │                                                              │
//! │  game/           - Round simulation (deterministic)          │
//! │  ├── grid.rs     - Cells, status bar, battle boundary        │
//! │  ├── motion.rs   - Sub-cell motion, aligned turns            │
//! │  ├── trail.rs    - Body history and growth                   │
//! │  ├── occupancy.rs- Collision/placement oracle                │
//! │  ├── placement.rs- Food placement                            │
//! │  ├── obstacle.rs - Moving obstacles                          │
//! │  ├── wrap.rs     - Edge wrapping                             │
//! │  ├── mode.rs     - Per-mode rules                            │
//! │  └── tick.rs     - Authoritative simulation loop             │
//! │                                                              │
//! │  runtime/        - Shell plumbing (non-deterministic)        │
//! │  ├── session.rs  - Round lifecycle, controls, history        │
//! │  ├── driver.rs   - tokio fixed-rate loop                     │
//! │  └── replay.rs   - Recorded rounds                           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! The `core/` and `game/` modules are **100% deterministic**:
//! - No floating-point arithmetic in game logic
//! - No HashMap (uses BTreeMap for sorted iteration)
//! - No system time dependencies
//! - All randomness from seeded Xorshift128+
//!
//! Given identical configuration, seed and steering, a round produces
//! **identical results** on any platform.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod runtime;

// Re-export commonly used types
pub use core::fixed::{Fixed, FIXED_ONE, FIXED_HALF, FIXED_SCALE};
pub use core::vec2::FixedVec2;
pub use core::rng::DeterministicRng;
pub use game::config::SimConfig;
pub use game::input::{Direction, InputFrame};
pub use game::mode::GameMode;
pub use game::state::{ActorId, RoundOutcome, RoundState};
pub use runtime::session::{Control, RoundSession};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default simulation tick rate (Hz)
pub const DEFAULT_TICK_RATE: u32 = 30;

/// Ticks needed to cross one cell
pub const SUBSTEPS_PER_CELL: u32 = 4;

/// Snake length at round start, in cells
pub const STARTING_LENGTH: u32 = 4;

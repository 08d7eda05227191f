//! Round Recordings
//!
//! Everything needed to re-run a round and check it lands on the same state:
//! mode, configuration, seed and the steering frames each snake was fed.
//! Encoded with bincode.

use std::collections::BTreeMap;

use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::debug;

use crate::core::hash::{StateHash, hash_with_domain};
use crate::game::config::{ConfigError, SimConfig};
use crate::game::events::GameEvent;
use crate::game::input::ActorInputBuffer;
use crate::game::mode::GameMode;
use crate::game::state::{ActorId, RoundState};
use crate::game::tick::replay_round;

/// Current recording format version.
pub const REPLAY_VERSION: u8 = 1;

/// Domain tag for configuration digests.
const CONFIG_DOMAIN: &[u8] = b"GRID_SNAKE_CONFIG_V1";

/// Replay errors.
#[derive(Debug, Error)]
pub enum ReplayError {
    /// bincode failed.
    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),

    /// Recording written by an incompatible version.
    #[error("unsupported replay version {0}")]
    UnsupportedVersion(u8),

    /// Configuration does not match its digest.
    #[error("configuration digest mismatch")]
    ConfigMismatch,

    /// Recorded configuration is invalid.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Replayed state differs from the recorded one.
    #[error("state hash mismatch: expected {expected}, got {actual}")]
    HashMismatch {
        /// Recorded hash (hex)
        expected: String,
        /// Replayed hash (hex)
        actual: String,
    },
}

/// A recorded round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundReplay {
    /// Format version.
    pub version: u8,
    /// Mode played.
    pub mode: GameMode,
    /// Configuration the round ran with.
    pub config: SimConfig,
    /// Digest of `config`.
    pub config_digest: StateHash,
    /// Round seed.
    pub seed: u64,
    /// Ticks simulated.
    pub tick_count: u32,
    /// Frames fed to each snake.
    pub inputs: BTreeMap<ActorId, ActorInputBuffer>,
    /// State hash after the last tick.
    pub final_hash: StateHash,
}

impl RoundReplay {
    /// Build a recording.
    pub fn new(
        mode: GameMode,
        config: SimConfig,
        seed: u64,
        tick_count: u32,
        inputs: BTreeMap<ActorId, ActorInputBuffer>,
        final_hash: StateHash,
    ) -> Result<Self, ReplayError> {
        let config_digest = config_digest(&config)?;
        Ok(Self {
            version: REPLAY_VERSION,
            mode,
            config,
            config_digest,
            seed,
            tick_count,
            inputs,
            final_hash,
        })
    }

    /// Serialize to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ReplayError> {
        Ok(bincode::serialize(self)?)
    }

    /// Deserialize from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self, ReplayError> {
        let replay: RoundReplay = bincode::deserialize(data)?;
        if replay.version != REPLAY_VERSION {
            return Err(ReplayError::UnsupportedVersion(replay.version));
        }
        Ok(replay)
    }

    /// Re-run the round. Returns the final state and every event.
    pub fn run(&self) -> Result<(RoundState, Vec<GameEvent>), ReplayError> {
        if config_digest(&self.config)? != self.config_digest {
            return Err(ReplayError::ConfigMismatch);
        }
        let initial = RoundState::new(self.mode, self.config.clone(), self.seed)?;
        Ok(replay_round(initial, &self.inputs, self.tick_count))
    }

    /// Re-run the round and compare final hashes.
    pub fn verify(&self) -> Result<StateHash, ReplayError> {
        let (state, _) = self.run()?;
        let actual = state.compute_hash();
        if actual != self.final_hash {
            return Err(ReplayError::HashMismatch {
                expected: hex::encode(self.final_hash),
                actual: hex::encode(actual),
            });
        }
        debug!("Replay of {} verified after {} ticks", self.mode, self.tick_count);
        Ok(actual)
    }
}

/// Digest of a configuration, for binding recordings to their rules.
pub fn config_digest(config: &SimConfig) -> Result<StateHash, ReplayError> {
    let bytes = bincode::serialize(config)?;
    Ok(hash_with_domain(CONFIG_DOMAIN, &bytes))
}

// =============================================================================
// TESTS
// =============================================================================

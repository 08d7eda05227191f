//! Simulation Configuration
//!
//! `SimConfig` is handed to a round when it starts and threaded to the grid,
//! motion and placement code from there. Nothing reads settings globally.

use std::time::Duration;

use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::warn;

use crate::core::fixed::{Fixed, FIXED_ONE};
use crate::game::grid::{Grid, MAX_GRID_CELLS};
use crate::game::mode::GameMode;

/// Smallest supported cell size in pixels.
pub const MIN_CELL_SIZE: u32 = 2;

/// Largest supported sub-step count per cell.
pub const MAX_SUBSTEPS: u32 = 16;

/// Largest supported tick rate (Hz).
pub const MAX_TICK_RATE: u32 = 240;

// =============================================================================
// ERRORS
// =============================================================================

/// Rejected configuration values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Cell size below the supported minimum.
    #[error("cell size must be at least {min} px (got {got})")]
    CellTooSmall {
        /// Requested cell size
        got: u32,
        /// Minimum accepted
        min: u32,
    },

    /// Play area holds no playable cell.
    #[error("play area {width}x{height} px has no playable cells at cell size {cell_size}")]
    EmptyPlayArea {
        /// Width in pixels
        width: u32,
        /// Height in pixels
        height: u32,
        /// Cell size in pixels
        cell_size: u32,
    },

    /// Grid larger than fixed-point positions can address.
    #[error("grid of {width}x{height} cells exceeds {max} cells per axis")]
    GridTooLarge {
        /// Width in cells
        width: i32,
        /// Height in cells
        height: i32,
        /// Per-axis maximum
        max: i32,
    },

    /// Grid too small for the actors a mode places.
    #[error("grid of {width}x{rows} playable cells is too small for {mode}")]
    GridTooSmall {
        /// Mode being started
        mode: GameMode,
        /// Width in cells
        width: i32,
        /// Playable rows
        rows: i32,
    },

    /// Sub-step count out of range.
    #[error("substeps per cell must be in 1..={max} (got {got})")]
    InvalidSubsteps {
        /// Requested value
        got: u32,
        /// Maximum accepted
        max: u32,
    },

    /// Tick rate out of range.
    #[error("tick rate must be in 1..={max} Hz (got {got})")]
    InvalidTickRate {
        /// Requested value
        got: u32,
        /// Maximum accepted
        max: u32,
    },

    /// Snakes need at least a head.
    #[error("starting length must be at least 1")]
    InvalidStartingLength,

    /// Status bar must leave room to play.
    #[error("status bar must cover less than 100% of the height (got {0}%)")]
    InvalidStatusBar(u32),

    /// Placement needs at least one attempt.
    #[error("max placement attempts must be positive")]
    NoPlacementAttempts,

    /// Obstacles need a spawn cadence.
    #[error("obstacle spawn interval must be positive")]
    InvalidSpawnInterval,

    /// Configuration text could not be parsed.
    #[error("invalid configuration: {0}")]
    Parse(String),
}

// =============================================================================
// PALETTE
// =============================================================================

/// RGB colour.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Black
    pub const BLACK: Rgb = Rgb(0, 0, 0);
    /// Red
    pub const RED: Rgb = Rgb(255, 0, 0);
    /// Green
    pub const GREEN: Rgb = Rgb(0, 255, 0);
    /// Yellow
    pub const YELLOW: Rgb = Rgb(255, 255, 0);
    /// Blue
    pub const BLUE: Rgb = Rgb(0, 0, 255);
    /// Orange
    pub const ORANGE: Rgb = Rgb(255, 125, 0);
    /// Gray
    pub const GRAY: Rgb = Rgb(169, 169, 169);
}

/// Colours handed to the renderer. The simulation never reads them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    /// Empty cells
    pub background: Rgb,
    /// Food
    pub food: Rgb,
    /// Obstacles
    pub obstacle: Rgb,
    /// Obstacles after eating food
    pub empowered_obstacle: Rgb,
    /// Battle boundary band
    pub boundary: Rgb,
    /// Status bar
    pub status_bar: Rgb,
    /// One colour per actor slot
    pub actors: Vec<Rgb>,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            background: Rgb::BLACK,
            food: Rgb::YELLOW,
            obstacle: Rgb::RED,
            empowered_obstacle: Rgb::ORANGE,
            boundary: Rgb::RED,
            status_bar: Rgb::GRAY,
            actors: vec![Rgb::GREEN, Rgb::BLUE],
        }
    }
}

impl Palette {
    /// Colour for an actor slot, cycling when there are more actors than colours.
    pub fn actor(&self, index: usize) -> Rgb {
        if self.actors.is_empty() {
            return Rgb::GREEN;
        }
        self.actors[index % self.actors.len()]
    }
}

// =============================================================================
// SIM CONFIG
// =============================================================================

/// Configuration for a round.
///
/// Missing JSON fields fall back to the defaults below.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Play area width in pixels.
    pub play_width_px: u32,
    /// Play area height in pixels, status bar included.
    pub play_height_px: u32,
    /// Cell size in pixels (stride is one more).
    pub cell_size: u32,
    /// Ticks needed to cross one cell.
    pub substeps_per_cell: u32,
    /// Fixed tick rate (Hz).
    pub tick_rate: u32,
    /// Wrap at grid edges instead of disqualifying.
    pub teleport: bool,
    /// Snake length at round start, in cells.
    pub starting_length: u32,
    /// Obstacle speed in pixels per cell-crossing.
    pub obstacle_base_speed: u32,
    /// Cells a snake crosses between periodic obstacle spawns.
    pub obstacle_spawn_interval_cells: u32,
    /// Battle round length in seconds.
    pub battle_time_limit_secs: u32,
    /// Survival growth cadence base.
    pub survival_timer: u32,
    /// Optional survival-battle round length in seconds.
    pub survival_battle_time_limit_secs: Option<u32>,
    /// Share of the height reserved for the status bar.
    pub status_bar_percent: u32,
    /// Bounded retries for food and obstacle placement.
    pub max_placement_attempts: u32,
    /// Rounds open behind the pause overlay.
    pub start_paused: bool,
    /// Render colours.
    pub palette: Palette,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            play_width_px: 1262,
            play_height_px: 710,
            cell_size: 28,
            substeps_per_cell: crate::SUBSTEPS_PER_CELL,
            tick_rate: crate::DEFAULT_TICK_RATE,
            teleport: true,
            starting_length: crate::STARTING_LENGTH,
            obstacle_base_speed: 20,
            obstacle_spawn_interval_cells: 60,
            battle_time_limit_secs: 60,
            survival_timer: 20,
            survival_battle_time_limit_secs: None,
            status_bar_percent: 20,
            max_placement_attempts: 1024,
            start_paused: true,
            palette: Palette::default(),
        }
    }
}

impl SimConfig {
    /// Check every field, then derive the grid.
    pub fn validate(&self) -> Result<Grid, ConfigError> {
        if self.substeps_per_cell == 0 || self.substeps_per_cell > MAX_SUBSTEPS {
            return Err(ConfigError::InvalidSubsteps {
                got: self.substeps_per_cell,
                max: MAX_SUBSTEPS,
            });
        }
        if self.tick_rate == 0 || self.tick_rate > MAX_TICK_RATE {
            return Err(ConfigError::InvalidTickRate {
                got: self.tick_rate,
                max: MAX_TICK_RATE,
            });
        }
        if self.starting_length == 0 {
            return Err(ConfigError::InvalidStartingLength);
        }
        if self.max_placement_attempts == 0 {
            return Err(ConfigError::NoPlacementAttempts);
        }
        if self.obstacle_spawn_interval_cells == 0 {
            return Err(ConfigError::InvalidSpawnInterval);
        }
        self.grid()
    }

    /// Derive the grid from the play area.
    pub fn grid(&self) -> Result<Grid, ConfigError> {
        Grid::from_play_area(
            self.play_width_px,
            self.play_height_px,
            self.cell_size,
            self.status_bar_percent,
        )
    }

    /// Parse from JSON. Missing fields take defaults; the result is validated.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: SimConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse from JSON, falling back to defaults on any error.
    pub fn from_json_or_default(json: &str) -> Self {
        match Self::from_json(json) {
            Ok(config) => config,
            Err(e) => {
                warn!("Falling back to default configuration: {}", e);
                Self::default()
            }
        }
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Wall-clock length of one tick.
    pub fn tick_duration(&self) -> Duration {
        Duration::from_micros(1_000_000 / self.tick_rate.max(1) as u64)
    }

    /// Ticks in `secs` seconds at the configured rate.
    #[inline]
    pub fn ticks_for_secs(&self, secs: u32) -> u32 {
        secs.saturating_mul(self.tick_rate)
    }

    /// Distance moved per tick, in cells.
    #[inline]
    pub fn step_length(&self) -> Fixed {
        FIXED_ONE / self.substeps_per_cell.max(1) as i32
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SimConfig::default();
        let grid = config.validate().unwrap();

        // 1262 / 29 = 43 columns, 710 / 29 = 24 rows, 80% playable
        assert_eq!(grid.width_cells, 43);
        assert_eq!(grid.height_cells, 24);
        assert_eq!(grid.playable_rows(), 19);
        assert!(grid.width_cells <= MAX_GRID_CELLS);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad = SimConfig { substeps_per_cell: 0, ..SimConfig::default() };
        assert!(matches!(bad.validate(), Err(ConfigError::InvalidSubsteps { .. })));

        let bad = SimConfig { tick_rate: 1000, ..SimConfig::default() };
        assert!(matches!(bad.validate(), Err(ConfigError::InvalidTickRate { .. })));

        let bad = SimConfig { starting_length: 0, ..SimConfig::default() };
        assert_eq!(bad.validate(), Err(ConfigError::InvalidStartingLength));

        let bad = SimConfig { max_placement_attempts: 0, ..SimConfig::default() };
        assert_eq!(bad.validate(), Err(ConfigError::NoPlacementAttempts));

        let bad = SimConfig { cell_size: 1, ..SimConfig::default() };
        assert!(matches!(bad.validate(), Err(ConfigError::CellTooSmall { .. })));

        let bad = SimConfig { status_bar_percent: 100, ..SimConfig::default() };
        assert_eq!(bad.validate(), Err(ConfigError::InvalidStatusBar(100)));
    }

    #[test]
    fn test_from_json_partial() {
        let config = SimConfig::from_json(r#"{ "cell_size": 20, "teleport": false }"#).unwrap();
        assert_eq!(config.cell_size, 20);
        assert!(!config.teleport);
        assert_eq!(config.tick_rate, crate::DEFAULT_TICK_RATE);
    }

    #[test]
    fn test_from_json_or_default_recovers() {
        assert_eq!(SimConfig::from_json_or_default("not json"), SimConfig::default());

        // Parses, but fails validation
        let fallback = SimConfig::from_json_or_default(r#"{ "tick_rate": 0 }"#);
        assert_eq!(fallback, SimConfig::default());
    }

    #[test]
    fn test_json_round_trip() {
        let config = SimConfig { teleport: false, survival_battle_time_limit_secs: Some(90), ..SimConfig::default() };
        let json = config.to_json().unwrap();
        assert_eq!(SimConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_timing_helpers() {
        let config = SimConfig::default();
        assert_eq!(config.ticks_for_secs(60), 1800);
        assert_eq!(config.step_length(), FIXED_ONE / 4);
        assert_eq!(config.tick_duration(), Duration::from_micros(33_333));
    }

    #[test]
    fn test_palette_cycles() {
        let palette = Palette::default();
        assert_eq!(palette.actor(0), Rgb::GREEN);
        assert_eq!(palette.actor(1), Rgb::BLUE);
        assert_eq!(palette.actor(2), Rgb::GREEN);
    }
}

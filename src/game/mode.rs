//! Game Modes
//!
//! One snake type serves every mode. A mode only selects strategy values:
//! how many actors, how they wrap, how food is laid out, how growth is
//! forced, how a round ends and how it is scored.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::core::fixed::{Fixed, fixed_ratio};
use crate::game::config::{ConfigError, SimConfig};
use crate::game::grid::{Grid, Half};
use crate::game::wrap::WrapRule;

/// Divisor in the survival growth cadence.
pub const SURVIVAL_CADENCE_DIVISOR: i64 = 1792;

/// Rule variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GameMode {
    /// One snake, ends on disqualification.
    Classic,
    /// Classic plus moving obstacles.
    Obstacles,
    /// Two snakes on a split grid, timed.
    Battle,
    /// Two snakes sharing one food.
    Cooperative,
    /// One snake that keeps growing on its own.
    Survival,
    /// Battle split with survival growth.
    SurvivalBattle,
}

/// How food is laid out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FoodLayout {
    /// One food anyone may eat.
    Shared,
    /// One food per actor, on that actor's half.
    PerActor,
}

/// What a round's score measures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scoring {
    /// Sum of snake lengths.
    Length,
    /// Ticks survived.
    Elapsed,
}

/// Strategy values carried by each snake.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorRules {
    /// Edge behaviour
    pub wrap: WrapRule,
    /// Ticks between forced growths; `None` disables forced growth
    pub growth_cadence: Option<Fixed>,
}

/// Mode name could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown game mode '{0}'")]
pub struct ParseModeError(pub String);

impl GameMode {
    /// Every mode, in menu order.
    pub const ALL: [GameMode; 6] = [
        GameMode::Classic,
        GameMode::Obstacles,
        GameMode::Battle,
        GameMode::Cooperative,
        GameMode::Survival,
        GameMode::SurvivalBattle,
    ];

    /// Menu name.
    pub fn name(self) -> &'static str {
        match self {
            GameMode::Classic => "classic",
            GameMode::Obstacles => "obstacles",
            GameMode::Battle => "battle",
            GameMode::Cooperative => "cooperation",
            GameMode::Survival => "survival",
            GameMode::SurvivalBattle => "survival battle",
        }
    }

    /// One-line menu description.
    pub fn description(self) -> &'static str {
        match self {
            GameMode::Classic => "one player, until disqualified",
            GameMode::Obstacles => "one player, avoid obstacles",
            GameMode::Battle => "two players against each other",
            GameMode::Cooperative => "two players, together",
            GameMode::Survival => "eat food keep you small",
            GameMode::SurvivalBattle => "1v1 survival",
        }
    }

    /// Stable tag used in seed derivation.
    pub fn tag(self) -> &'static str {
        match self {
            GameMode::Classic => "classic",
            GameMode::Obstacles => "obstacles",
            GameMode::Battle => "battle",
            GameMode::Cooperative => "cooperative",
            GameMode::Survival => "survival",
            GameMode::SurvivalBattle => "survival_battle",
        }
    }

    /// Snakes in a round.
    pub fn actor_count(self) -> usize {
        match self {
            GameMode::Classic | GameMode::Obstacles | GameMode::Survival => 1,
            GameMode::Battle | GameMode::Cooperative | GameMode::SurvivalBattle => 2,
        }
    }

    /// True if a boundary splits the grid.
    pub fn is_split(self) -> bool {
        matches!(self, GameMode::Battle | GameMode::SurvivalBattle)
    }

    /// True if obstacles spawn.
    pub fn has_obstacles(self) -> bool {
        self == GameMode::Obstacles
    }

    /// Food layout.
    pub fn food_layout(self) -> FoodLayout {
        if self.is_split() { FoodLayout::PerActor } else { FoodLayout::Shared }
    }

    /// Scoring rule.
    pub fn scoring(self) -> Scoring {
        match self {
            GameMode::Survival | GameMode::SurvivalBattle => Scoring::Elapsed,
            _ => Scoring::Length,
        }
    }

    /// True if a round end names a winner.
    pub fn names_winner(self) -> bool {
        self.is_split()
    }

    /// Round length in ticks, if the mode is timed.
    pub fn time_limit_ticks(self, config: &SimConfig) -> Option<u32> {
        match self {
            GameMode::Battle => Some(config.ticks_for_secs(config.battle_time_limit_secs)),
            GameMode::SurvivalBattle => config
                .survival_battle_time_limit_secs
                .map(|secs| config.ticks_for_secs(secs)),
            _ => None,
        }
    }

    /// Ticks between forced growths, scaled with the grid area.
    pub fn growth_cadence(self, config: &SimConfig, grid: &Grid) -> Option<Fixed> {
        let base = fixed_ratio(
            config.survival_timer as i64
                * config.substeps_per_cell as i64
                * grid.cell_count() as i64,
            SURVIVAL_CADENCE_DIVISOR,
        );
        match self {
            GameMode::Survival => Some(base),
            GameMode::SurvivalBattle => Some(base / 2),
            _ => None,
        }
    }

    /// Strategy values for actor slot `index`.
    pub fn actor_rules(self, index: usize, config: &SimConfig, grid: &Grid) -> ActorRules {
        let wrap = if self.is_split() {
            WrapRule::Split(Half::for_actor(index))
        } else {
            WrapRule::Plain
        };
        ActorRules { wrap, growth_cadence: self.growth_cadence(config, grid) }
    }

    /// Reject grids that cannot hold this mode's actors.
    pub fn check_grid(self, grid: &Grid) -> Result<(), ConfigError> {
        let rows = grid.playable_rows();
        let min_width = if self.is_split() {
            // Each half needs a column beside the boundary band.
            5
        } else {
            self.actor_count() as i32 + 1
        };
        if grid.width_cells < min_width || rows < 2 {
            return Err(ConfigError::GridTooSmall {
                mode: self,
                width: grid.width_cells,
                rows,
            });
        }
        Ok(())
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GameMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', '_'], " ");
        match normalized.as_str() {
            "classic" => Ok(GameMode::Classic),
            "obstacles" => Ok(GameMode::Obstacles),
            "battle" => Ok(GameMode::Battle),
            "cooperation" | "cooperative" | "coop" => Ok(GameMode::Cooperative),
            "survival" => Ok(GameMode::Survival),
            "survival battle" => Ok(GameMode::SurvivalBattle),
            _ => Err(ParseModeError(s.to_string())),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::{FIXED_ONE, to_float};

    #[test]
    fn test_mode_table() {
        assert_eq!(GameMode::Classic.actor_count(), 1);
        assert_eq!(GameMode::Cooperative.actor_count(), 2);
        assert!(GameMode::Battle.is_split());
        assert!(!GameMode::Cooperative.is_split());
        assert!(GameMode::Obstacles.has_obstacles());
        assert_eq!(GameMode::Cooperative.food_layout(), FoodLayout::Shared);
        assert_eq!(GameMode::SurvivalBattle.food_layout(), FoodLayout::PerActor);
        assert_eq!(GameMode::Survival.scoring(), Scoring::Elapsed);
        assert_eq!(GameMode::Battle.scoring(), Scoring::Length);
        assert!(GameMode::SurvivalBattle.names_winner());
        assert!(!GameMode::Cooperative.names_winner());
    }

    #[test]
    fn test_names_parse_back() {
        for mode in GameMode::ALL {
            assert_eq!(mode.name().parse::<GameMode>(), Ok(mode));
            assert_eq!(mode.tag().parse::<GameMode>(), Ok(mode));
            assert!(!mode.description().is_empty());
        }
        assert_eq!("Survival-Battle".parse::<GameMode>(), Ok(GameMode::SurvivalBattle));
        assert!("tetris".parse::<GameMode>().is_err());
    }

    #[test]
    fn test_time_limits() {
        let config = SimConfig::default();
        assert_eq!(GameMode::Battle.time_limit_ticks(&config), Some(1800));
        assert_eq!(GameMode::SurvivalBattle.time_limit_ticks(&config), None);
        assert_eq!(GameMode::Classic.time_limit_ticks(&config), None);

        let config = SimConfig { survival_battle_time_limit_secs: Some(10), ..SimConfig::default() };
        assert_eq!(GameMode::SurvivalBattle.time_limit_ticks(&config), Some(300));
    }

    #[test]
    fn test_survival_cadence_for_10x8() {
        let config = SimConfig::default();
        let grid = Grid::new(10, 8, 2, 20);

        // 20 * 4 * 80 / 1792 = 3.5714...
        let cadence = GameMode::Survival.growth_cadence(&config, &grid).unwrap();
        assert!((to_float(cadence) - 3.5714).abs() < 0.001);
        assert!(cadence > 3 * FIXED_ONE && cadence < 4 * FIXED_ONE);

        let half = GameMode::SurvivalBattle.growth_cadence(&config, &grid).unwrap();
        assert_eq!(half, cadence / 2);

        assert_eq!(GameMode::Classic.growth_cadence(&config, &grid), None);
    }

    #[test]
    fn test_actor_rules() {
        let config = SimConfig::default();
        let grid = Grid::new(20, 16, 4, 20);
        assert_eq!(GameMode::Battle.actor_rules(0, &config, &grid).wrap, WrapRule::Split(Half::Left));
        assert_eq!(GameMode::Battle.actor_rules(1, &config, &grid).wrap, WrapRule::Split(Half::Right));
        assert_eq!(GameMode::Cooperative.actor_rules(1, &config, &grid).wrap, WrapRule::Plain);
    }

    #[test]
    fn test_check_grid() {
        assert!(GameMode::Classic.check_grid(&Grid::new(2, 2, 0, 20)).is_ok());
        assert!(matches!(
            GameMode::Battle.check_grid(&Grid::new(4, 10, 0, 20)),
            Err(ConfigError::GridTooSmall { .. })
        ));
        assert!(GameMode::Battle.check_grid(&Grid::new(5, 10, 0, 20)).is_ok());
    }
}

//! Round State Definitions
//!
//! All state types for round simulation. The coordinator owns every actor
//! for the length of a round; collaborators only ever see snapshots.

use std::fmt;
use serde::{Serialize, Deserialize};
use tracing::{debug, info, warn};

use crate::core::fixed::Fixed;
use crate::core::vec2::FixedVec2;
use crate::core::rng::DeterministicRng;
use crate::core::hash::{StateHash, StateHasher, compute_state_hash};
use crate::game::config::{ConfigError, Palette, SimConfig};
use crate::game::events::GameEvent;
use crate::game::grid::{BoundaryLine, Cell, Grid, Half};
use crate::game::input::Direction;
use crate::game::mode::{ActorRules, FoodLayout, GameMode, Scoring};
use crate::game::obstacle::{ObstacleState, obstacle_speed, spawn_position};
use crate::game::occupancy::{Exclusion, OccupancyGrid, Occupant, front_cell, rear_cell};
use crate::game::placement::{PlacementError, PlacementKind, Region, place_food};
use crate::game::trail::Trail;

// =============================================================================
// ACTOR ID
// =============================================================================

/// Actor slot. Player 1 is `ActorId(0)`.
///
/// Implements Ord for deterministic BTreeMap ordering.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActorId(pub u8);

impl ActorId {
    /// Slot index.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0 as u32 + 1)
    }
}

// =============================================================================
// SNAKE ACTOR
// =============================================================================

/// One snake.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SnakeActor {
    /// Slot
    pub id: ActorId,
    /// Head position, in cells
    pub position: FixedVec2,
    /// Current heading
    pub direction: Direction,
    /// Buffered turn, committed when aligned
    pub pending_direction: Option<Direction>,
    /// Ticks into the current cell (0 = aligned)
    pub sub_step_counter: u32,
    /// Body history
    pub trail: Trail,
    /// Out of the round
    pub disqualified: bool,
    /// What the head ran into
    pub disqualified_by: Option<Occupant>,
    /// Forced-growth accumulator, in ticks
    pub growth_clock: Fixed,
    /// Foods eaten this round
    pub food_eaten: u32,
    /// Mode strategy values
    pub rules: ActorRules,
    /// Start cell, reused on reset
    pub start: Cell,
}

impl SnakeActor {
    /// Create a snake at `start`.
    pub fn new(
        id: ActorId,
        start: Cell,
        direction: Direction,
        starting_length: u32,
        substeps: u32,
        rules: ActorRules,
    ) -> Self {
        Self {
            id,
            position: start.position(),
            direction,
            pending_direction: None,
            sub_step_counter: 0,
            trail: Trail::new(starting_length, substeps),
            disqualified: false,
            disqualified_by: None,
            growth_clock: 0,
            food_eaten: 0,
            rules,
            start,
        }
    }

    /// Visible length in cells.
    #[inline]
    pub fn length(&self) -> u32 {
        self.trail.len()
    }

    /// True at a cell boundary.
    #[inline]
    pub fn is_aligned(&self) -> bool {
        self.sub_step_counter == 0
    }

    /// Cell the head is entering.
    pub fn head_cell(&self) -> Cell {
        front_cell(self.position, self.direction)
    }

    /// Remove from the round.
    pub fn disqualify(&mut self, cause: Occupant) {
        self.disqualified = true;
        self.disqualified_by = Some(cause);
    }

    /// Back to the start cell, heading Up, at starting length.
    pub fn reset(&mut self, starting_length: u32) {
        self.position = self.start.position();
        self.direction = Direction::Up;
        self.pending_direction = None;
        self.sub_step_counter = 0;
        self.trail.reset(starting_length);
        self.disqualified = false;
        self.disqualified_by = None;
        self.growth_clock = 0;
        self.food_eaten = 0;
    }

    /// Hash this actor's state for verification.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_u8(self.id.0);
        hasher.update_vec2(self.position);
        hasher.update_u8(self.direction as u8);
        hasher.update_u8(self.pending_direction.map_or(u8::MAX, |d| d as u8));
        hasher.update_u32(self.sub_step_counter);
        hasher.update_u32(self.trail.entry_count() as u32);
        for entry in self.trail.entries() {
            hasher.update_vec2(entry.position);
            hasher.update_u8(entry.direction as u8);
        }
        hasher.update_u32(self.trail.growth_pending());
        hasher.update_bool(self.disqualified);
        hasher.update_fixed(self.growth_clock);
        hasher.update_u32(self.food_eaten);
    }
}

// =============================================================================
// FOOD
// =============================================================================

/// A food item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoodState {
    /// Stable id within the round
    pub id: u32,
    /// Current cell; `None` while placement keeps failing
    pub position: Option<Cell>,
    /// Last cell it occupied
    pub previous: Option<Cell>,
    /// Only this actor may eat it
    pub owner: Option<ActorId>,
    /// Allowed placement area
    pub region: Region,
    /// Times eaten this round
    pub eaten: u32,
}

impl FoodState {
    /// Create an unplaced food.
    pub fn new(id: u32, owner: Option<ActorId>, region: Region) -> Self {
        Self {
            id,
            position: None,
            previous: None,
            owner,
            region,
            eaten: 0,
        }
    }

    /// True if `actor` may eat this food.
    #[inline]
    pub fn edible_by(&self, actor: ActorId) -> bool {
        self.owner.map_or(true, |owner| owner == actor)
    }
}

// =============================================================================
// TIMER
// =============================================================================

/// Round clock in ticks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timer {
    /// Ticks since the round started
    pub ticks: u32,
}

impl Timer {
    /// Advance one tick.
    #[inline]
    pub fn tick(&mut self) {
        self.ticks = self.ticks.saturating_add(1);
    }

    /// Back to zero.
    pub fn reset(&mut self) {
        self.ticks = 0;
    }

    /// `HH:MM:SS` at `tick_rate`.
    pub fn format(&self, tick_rate: u32) -> String {
        format_elapsed(self.ticks, tick_rate)
    }
}

/// Format a tick count as `HH:MM:SS`.
pub fn format_elapsed(ticks: u32, tick_rate: u32) -> String {
    let secs = ticks / tick_rate.max(1);
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

// =============================================================================
// ROUND PHASE AND OUTCOME
// =============================================================================

/// Lifecycle of a round.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundPhase {
    /// Created, not started
    #[default]
    Lobby,
    /// Ticking
    Active,
    /// Suspended; ticks are no-ops
    Paused,
    /// Ended; waiting for a restart
    Over,
}

impl fmt::Display for RoundPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RoundPhase::Lobby => "lobby",
            RoundPhase::Active => "active",
            RoundPhase::Paused => "paused",
            RoundPhase::Over => "over",
        };
        f.write_str(name)
    }
}

/// Why a round ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndReason {
    /// At least one snake was disqualified
    Disqualification,
    /// The mode's time limit ran out
    TimeLimit,
}

/// Round score.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Score {
    /// Sum of snake lengths
    Length(u32),
    /// Ticks survived
    Elapsed(u32),
}

/// One disqualified snake.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disqualification {
    /// Snake
    pub actor: ActorId,
    /// What it ran into
    pub cause: Occupant,
}

/// Result of a finished round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundOutcome {
    /// Mode played
    pub mode: GameMode,
    /// Why it ended
    pub reason: EndReason,
    /// Winner, in modes that name one
    pub winner: Option<ActorId>,
    /// Disqualified snakes
    pub disqualified: Vec<Disqualification>,
    /// Final length of every snake
    pub lengths: Vec<u32>,
    /// Score
    pub score: Score,
    /// Round length in ticks
    pub duration_ticks: u32,
    /// Message shown to the players
    pub summary: String,
}

impl fmt::Display for RoundOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary)
    }
}

// =============================================================================
// SNAPSHOTS
// =============================================================================

/// Read-only view of one snake for rendering.
#[derive(Clone, Debug, Serialize)]
pub struct ActorSnapshot {
    /// Slot
    pub id: ActorId,
    /// Head position in cells
    pub position: (f32, f32),
    /// Head position in pixels
    pub pixels: (f32, f32),
    /// Heading
    pub direction: Direction,
    /// Head sprite rotation in degrees
    pub rotation: u16,
    /// Body cells, newest first
    pub trail: Vec<Cell>,
    /// Length in cells
    pub length: u32,
    /// Out of the round
    pub disqualified: bool,
}

/// Read-only view of one obstacle for rendering.
#[derive(Clone, Debug, Serialize)]
pub struct ObstacleSnapshot {
    /// Stable id
    pub id: u32,
    /// Top-left in pixels
    pub pixels: (f32, f32),
    /// Heading angle in radians
    pub angle: f32,
    /// Uses the empowered colour
    pub empowered: bool,
}

/// Everything the render shell needs for one frame.
#[derive(Clone, Debug, Serialize)]
pub struct RoundSnapshot {
    /// Mode
    pub mode: GameMode,
    /// Phase
    pub phase: RoundPhase,
    /// Grid
    pub grid: Grid,
    /// Elapsed time, `HH:MM:SS`
    pub timer: String,
    /// Snakes
    pub actors: Vec<ActorSnapshot>,
    /// Placed food cells
    pub foods: Vec<Cell>,
    /// Obstacles
    pub obstacles: Vec<ObstacleSnapshot>,
    /// Battle boundary
    pub boundary: Option<BoundaryLine>,
    /// Colours
    pub palette: Palette,
}

// =============================================================================
// ROUND STATE
// =============================================================================

/// Complete state of a round.
#[derive(Clone, Debug)]
pub struct RoundState {
    /// Mode being played
    pub mode: GameMode,

    /// Configuration the round started with
    pub config: SimConfig,

    /// Grid derived from the configuration
    pub grid: Grid,

    /// Current round phase
    pub phase: RoundPhase,

    /// Round clock
    pub timer: Timer,

    /// Snakes, in id order
    pub actors: Vec<SnakeActor>,

    /// Food items
    pub foods: Vec<FoodState>,

    /// Obstacles
    pub obstacles: Vec<ObstacleState>,

    /// Battle boundary (split modes)
    pub boundary: Option<BoundaryLine>,

    /// RNG seed (for verification)
    pub rng_seed: u64,

    /// Deterministic RNG state
    pub rng: DeterministicRng,

    /// Rounds played before this one under the same state
    pub round_index: u32,

    /// Time limit in ticks
    pub time_limit: Option<u32>,

    /// Next obstacle ID (monotonic counter)
    pub next_obstacle_id: u32,

    /// Obstacle spawns that failed and are retried each tick
    pub pending_obstacle_spawns: u32,

    /// Result once the round is over
    pub outcome: Option<RoundOutcome>,

    /// Occupancy map, rebuilt before every query
    pub occupancy: OccupancyGrid,

    /// Events generated this tick (cleared each tick)
    pending_events: Vec<GameEvent>,
}

impl RoundState {
    /// Create a round in the lobby.
    pub fn new(mode: GameMode, config: SimConfig, seed: u64) -> Result<Self, ConfigError> {
        let grid = config.validate()?;
        mode.check_grid(&grid)?;

        let actors = start_cells(mode, &grid)
            .into_iter()
            .enumerate()
            .map(|(index, cell)| {
                SnakeActor::new(
                    ActorId(index as u8),
                    cell,
                    Direction::Up,
                    config.starting_length,
                    config.substeps_per_cell,
                    mode.actor_rules(index, &config, &grid),
                )
            })
            .collect();

        let foods = match mode.food_layout() {
            FoodLayout::Shared => vec![FoodState::new(0, None, Region::Playable)],
            FoodLayout::PerActor => (0..mode.actor_count())
                .map(|index| {
                    let half = Half::for_actor(index);
                    FoodState::new(index as u32, Some(ActorId(index as u8)), Region::half(&grid, half))
                })
                .collect(),
        };

        Ok(Self {
            mode,
            time_limit: mode.time_limit_ticks(&config),
            boundary: mode.is_split().then(|| grid.boundary()),
            occupancy: OccupancyGrid::new(&grid),
            config,
            grid,
            phase: RoundPhase::Lobby,
            timer: Timer::default(),
            actors,
            foods,
            obstacles: Vec::new(),
            rng_seed: seed,
            rng: DeterministicRng::new(seed),
            round_index: 0,
            next_obstacle_id: 0,
            pending_obstacle_spawns: 0,
            outcome: None,
            pending_events: Vec::new(),
        })
    }

    /// Leave the lobby: place food and obstacles and start ticking (or
    /// wait behind the pause overlay when `start_paused` is set).
    pub fn begin(&mut self) {
        if self.phase != RoundPhase::Lobby {
            return;
        }
        self.populate();
        let next = if self.config.start_paused { RoundPhase::Paused } else { RoundPhase::Active };
        self.set_phase(next);
        info!(
            "Round {} of {} started (seed {}, {}x{} cells)",
            self.round_index,
            self.mode,
            self.rng_seed,
            self.grid.width_cells,
            self.grid.playable_rows()
        );
    }

    /// Start a new round in place with a fresh seed.
    pub fn reset(&mut self, seed: u64) {
        self.rng_seed = seed;
        self.rng = DeterministicRng::new(seed);
        self.round_index += 1;
        self.timer.reset();
        for actor in &mut self.actors {
            actor.reset(self.config.starting_length);
        }
        for food in &mut self.foods {
            food.position = None;
            food.previous = None;
            food.eaten = 0;
        }
        self.obstacles.clear();
        self.next_obstacle_id = 0;
        self.pending_obstacle_spawns = 0;
        self.outcome = None;
        self.phase = RoundPhase::Lobby;
        self.begin();
    }

    fn populate(&mut self) {
        for index in 0..self.foods.len() {
            self.replace_food(index);
        }
        if self.mode.has_obstacles() {
            self.spawn_obstacle();
        }
    }

    /// Suspend ticking. Returns true if the phase changed.
    pub fn pause(&mut self) -> bool {
        if self.phase != RoundPhase::Active {
            return false;
        }
        self.set_phase(RoundPhase::Paused);
        true
    }

    /// Continue ticking. Returns true if the phase changed.
    pub fn resume(&mut self) -> bool {
        if self.phase != RoundPhase::Paused {
            return false;
        }
        self.set_phase(RoundPhase::Active);
        true
    }

    /// Pause if active, resume if paused.
    pub fn toggle_pause(&mut self) -> bool {
        match self.phase {
            RoundPhase::Active => self.pause(),
            RoundPhase::Paused => self.resume(),
            _ => false,
        }
    }

    /// Change phase and record it.
    pub fn set_phase(&mut self, next: RoundPhase) {
        if self.phase == next {
            return;
        }
        let event = GameEvent::phase_changed(self.timer.ticks, self.phase, next);
        self.phase = next;
        self.push_event(event);
    }

    /// True while ticks mutate state.
    pub fn is_running(&self) -> bool {
        self.phase == RoundPhase::Active
    }

    /// True once the round has ended.
    pub fn is_over(&self) -> bool {
        self.phase == RoundPhase::Over
    }

    /// Get an actor by ID.
    pub fn actor(&self, id: ActorId) -> Option<&SnakeActor> {
        self.actors.get(id.index())
    }

    /// Get an actor mutably by ID.
    pub fn actor_mut(&mut self, id: ActorId) -> Option<&mut SnakeActor> {
        self.actors.get_mut(id.index())
    }

    /// Rebuild the occupancy map from current state.
    pub fn rebuild_occupancy(&mut self, exclude: Exclusion) {
        self.occupancy.rebuild(
            &self.grid,
            &self.actors,
            &self.foods,
            &self.obstacles,
            self.boundary,
            exclude,
        );
    }

    /// Move food `index` to a fresh free cell in its region.
    ///
    /// On failure the food stays unplaced and is retried next tick.
    pub fn replace_food(&mut self, index: usize) -> bool {
        let Some(food) = self.foods.get_mut(index) else {
            return false;
        };
        if let Some(cell) = food.position.take() {
            food.previous = Some(cell);
        }
        let (id, region, previous) = (food.id, food.region, food.previous);

        self.rebuild_occupancy(Exclusion::None);
        let placed = place_food(
            &mut self.rng,
            &self.grid,
            &self.occupancy,
            region,
            previous,
            self.config.max_placement_attempts,
        );

        match placed {
            Ok(cell) => {
                self.foods[index].position = Some(cell);
                debug!("Food {} placed at {}", id, cell);
                self.push_event(GameEvent::food_placed(self.timer.ticks, id, cell));
                true
            }
            Err(e) => {
                warn!("Food {} not placed: {}", id, e);
                if let PlacementError::Exhausted { kind, attempts } = e {
                    self.push_event(GameEvent::placement_failed(self.timer.ticks, kind, attempts));
                }
                false
            }
        }
    }

    /// Spawn a new obstacle on an edge, aimed at the first snake.
    pub fn spawn_obstacle(&mut self) -> bool {
        self.rebuild_occupancy(Exclusion::None);
        let spawned = spawn_position(
            &mut self.rng,
            &self.grid,
            &self.occupancy,
            self.config.max_placement_attempts,
        );

        match spawned {
            Ok(position) => {
                let id = self.next_obstacle_id;
                self.next_obstacle_id += 1;
                let target = ActorId(0);
                let mut obstacle = ObstacleState::new(
                    id,
                    position,
                    obstacle_speed(&self.config, &self.grid),
                    target,
                );
                if let Some(actor) = self.actor(target) {
                    obstacle.aim_at(actor.position, self.grid.footprint());
                }
                debug!("Obstacle {} spawned at {}", id, position);
                self.obstacles.push(obstacle);
                self.push_event(GameEvent::obstacle_spawned(self.timer.ticks, id, position));
                true
            }
            Err(e) => {
                warn!("Obstacle spawn skipped: {}", e);
                self.push_event(GameEvent::placement_failed(
                    self.timer.ticks,
                    PlacementKind::Obstacle,
                    self.config.max_placement_attempts,
                ));
                false
            }
        }
    }

    /// Build the outcome for a round ending now.
    pub fn conclude(&self, reason: EndReason) -> RoundOutcome {
        let lengths: Vec<u32> = self.actors.iter().map(|a| a.length()).collect();
        let total: u32 = lengths.iter().sum();

        let winner = if self.mode.names_winner() {
            // Reversed so exact ties go to the lower id
            self.actors
                .iter()
                .rev()
                .max_by_key(|a| (!a.disqualified, a.length()))
                .map(|a| a.id)
        } else {
            None
        };

        let disqualified = self
            .actors
            .iter()
            .filter_map(|a| {
                a.disqualified_by.map(|cause| Disqualification { actor: a.id, cause })
            })
            .collect();

        let score = match self.mode.scoring() {
            Scoring::Length => Score::Length(total),
            Scoring::Elapsed => Score::Elapsed(self.timer.ticks),
        };

        let body = match score {
            Score::Length(total) => format!("total score: {}", total),
            Score::Elapsed(_) => format!("total time: {}", self.timer_string()),
        };
        let summary = match winner {
            Some(id) => format!("{} win! {}", id, body),
            None => body,
        };

        RoundOutcome {
            mode: self.mode,
            reason,
            winner,
            disqualified,
            lengths,
            score,
            duration_ticks: self.timer.ticks,
            summary,
        }
    }

    /// Elapsed time as `HH:MM:SS`.
    pub fn timer_string(&self) -> String {
        self.timer.format(self.config.tick_rate)
    }

    /// Render view of the round.
    pub fn snapshot(&self) -> RoundSnapshot {
        let actors = self
            .actors
            .iter()
            .map(|actor| ActorSnapshot {
                id: actor.id,
                position: actor.position.to_floats(),
                pixels: self.grid.to_pixels(actor.position),
                direction: actor.direction,
                rotation: actor.direction.sprite_rotation(),
                trail: actor
                    .trail
                    .entries()
                    .map(|entry| rear_cell(entry.position, entry.direction))
                    .collect(),
                length: actor.length(),
                disqualified: actor.disqualified,
            })
            .collect();

        let obstacles = self
            .obstacles
            .iter()
            .map(|obstacle| ObstacleSnapshot {
                id: obstacle.id,
                pixels: self.grid.to_pixels(obstacle.position),
                angle: crate::core::fixed::to_float(obstacle.heading_angle()),
                empowered: obstacle.empowered,
            })
            .collect();

        RoundSnapshot {
            mode: self.mode,
            phase: self.phase,
            grid: self.grid,
            timer: self.timer_string(),
            actors,
            foods: self.foods.iter().filter_map(|f| f.position).collect(),
            obstacles,
            boundary: self.boundary,
            palette: self.config.palette.clone(),
        }
    }

    /// Compute hash of current state for verification.
    ///
    /// Phase and round index are session bookkeeping and stay out of the
    /// hash, so a replayed round matches the recorded one.
    pub fn compute_hash(&self) -> StateHash {
        compute_state_hash(self.timer.ticks, self.rng_seed, |hasher| {
            hasher.update_bytes(self.mode.tag().as_bytes());
            let [s0, s1] = self.rng.state();
            hasher.update_u64(s0);
            hasher.update_u64(s1);

            for actor in &self.actors {
                actor.hash_into(hasher);
            }

            for food in &self.foods {
                hasher.update_u32(food.id);
                match food.position {
                    Some(cell) => {
                        hasher.update_bool(true);
                        hasher.update_i32(cell.col);
                        hasher.update_i32(cell.row);
                    }
                    None => hasher.update_bool(false),
                }
                hasher.update_u32(food.eaten);
            }

            for obstacle in &self.obstacles {
                hasher.update_u32(obstacle.id);
                hasher.update_vec2(obstacle.position);
                hasher.update_vec2(obstacle.heading);
                hasher.update_fixed(obstacle.speed);
                hasher.update_bool(obstacle.empowered);
                hasher.update_u32(obstacle.respawns);
            }

            hasher.update_u32(self.next_obstacle_id);
            hasher.update_u32(self.pending_obstacle_spawns);
        })
    }

    /// Take pending events (consumes them).
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Push a game event.
    pub fn push_event(&mut self, event: GameEvent) {
        self.pending_events.push(event);
    }
}

/// Start cells for a mode, row = middle playable row.
pub fn start_cells(mode: GameMode, grid: &Grid) -> Vec<Cell> {
    let row = grid.playable_rows() / 2;
    let width = grid.width_cells;
    let count = mode.actor_count();

    if mode.is_split() {
        let boundary = grid.boundary();
        return (0..count)
            .map(|index| {
                let (start, end) = boundary.half_columns(Half::for_actor(index), width);
                Cell::new((start + end) / 2, row)
            })
            .collect();
    }

    if count == 1 {
        return vec![Cell::new(width / 2, row)];
    }

    (0..count)
        .map(|index| Cell::new(width * (index as i32 + 1) / (count as i32 + 1), row))
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================

//! Authoritative Simulation Tick
//!
//! The rule coordinator. One call runs one fixed-rate tick in a fixed order:
//! inputs, per-snake motion and collision, food, obstacles, clocks, end
//! check. Everything here must stay 100% deterministic.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::core::fixed::FIXED_ONE;
use crate::game::events::GameEvent;
use crate::game::grid::Cell;
use crate::game::input::{ActorInputBuffer, InputFrame};
use crate::game::motion::{advance, request_direction};
use crate::game::obstacle::{food_under, footprint_blocked, spawn_period, spawn_position};
use crate::game::occupancy::{Exclusion, Occupant};
use crate::game::placement::PlacementError;
use crate::game::state::{ActorId, EndReason, RoundOutcome, RoundPhase, RoundState};

/// Result of a tick.
#[derive(Debug, Default)]
pub struct TickResult {
    /// Events generated this tick
    pub events: Vec<GameEvent>,
    /// Set on the tick the round ended (and on every tick after)
    pub outcome: Option<RoundOutcome>,
}

impl TickResult {
    /// Whether the round is over.
    pub fn round_ended(&self) -> bool {
        self.outcome.is_some()
    }
}

/// Run one simulation tick.
///
/// # Arguments
///
/// * `state` - The round state (will be mutated)
/// * `inputs` - Steering for this tick (BTreeMap for deterministic order!)
///
/// # Determinism
///
/// This function is 100% deterministic:
/// - Uses BTreeMap for iteration order
/// - Uses fixed-point math only
/// - Uses deterministic RNG (state.rng)
/// - No system calls, no floating point
pub fn tick(state: &mut RoundState, inputs: &BTreeMap<ActorId, InputFrame>) -> TickResult {
    let mut result = TickResult::default();

    match state.phase {
        RoundPhase::Lobby | RoundPhase::Paused => {
            // Nothing moves; intents are ignored
            result.events = state.take_events();
            return result;
        }
        RoundPhase::Over => {
            result.outcome = state.outcome.clone();
            result.events = state.take_events();
            return result;
        }
        RoundPhase::Active => {}
    }

    // 1. Offer buffered steering
    apply_inputs(state, inputs);

    // 2-4. Per snake: advance, probe, eat
    move_actors(state);

    // Retry food that could not be placed earlier
    replenish_food(state);

    // 5. Obstacles
    if state.mode.has_obstacles() {
        update_obstacles(state);
        spawn_obstacles(state);
    }

    // 6. Clocks
    state.timer.tick();
    apply_forced_growth(state);

    // 7. Termination
    check_end_conditions(state, &mut result);

    result.events = state.take_events();
    result
}

/// Offer each actor its steering intent.
fn apply_inputs(state: &mut RoundState, inputs: &BTreeMap<ActorId, InputFrame>) {
    // BTreeMap iterates in sorted key order - DETERMINISTIC
    for (actor_id, frame) in inputs {
        let Some(direction) = frame.direction() else {
            continue;
        };
        if let Some(actor) = state.actor_mut(*actor_id) {
            request_direction(actor, direction);
        }
    }
}

/// Advance every snake in id order, probing occupancy after each move.
fn move_actors(state: &mut RoundState) {
    let grid = state.grid;
    let substeps = state.config.substeps_per_cell;
    let teleport = state.config.teleport;

    for index in 0..state.actors.len() {
        if state.actors[index].disqualified {
            continue;
        }

        let step = advance(&mut state.actors[index], &grid, substeps, teleport);
        let id = state.actors[index].id;
        if let Some(direction) = step.redirected {
            state.push_event(GameEvent::redirected(state.timer.ticks, id, direction));
        }

        // Later snakes see this one's new position
        state.rebuild_occupancy(Exclusion::HeadOf(id));
        let cell = state.actors[index].head_cell();
        let occupant = state.occupancy.test(cell);

        if occupant.is_collision() {
            state.actors[index].disqualify(occupant);
            info!("{} disqualified at {} ({:?})", id, cell, occupant);
            state.push_event(GameEvent::actor_disqualified(state.timer.ticks, id, occupant, cell));
            continue;
        }

        if let Occupant::Food(food_id) = occupant {
            eat(state, index, food_id, cell);
        }
    }
}

/// Snake `index` touched food `food_id`.
fn eat(state: &mut RoundState, index: usize, food_id: u32, cell: Cell) {
    let Some(food_index) = state.foods.iter().position(|f| f.id == food_id) else {
        return;
    };
    let id = state.actors[index].id;
    if !state.foods[food_index].edible_by(id) {
        return;
    }

    let actor = &mut state.actors[index];
    actor.food_eaten += 1;
    match actor.rules.growth_cadence {
        // Survival: eating holds growth back
        Some(cadence) => actor.growth_clock -= cadence,
        None => actor.trail.grow(1),
    }
    let new_length = actor.length();
    state.foods[food_index].eaten += 1;

    debug!("{} ate food {} at {} (length {})", id, food_id, cell, new_length);
    state.push_event(GameEvent::food_eaten(state.timer.ticks, id, food_id, cell, new_length));
    state.replace_food(food_index);
}

/// Place any food left unplaced by an earlier failure.
fn replenish_food(state: &mut RoundState) {
    for index in 0..state.foods.len() {
        if state.foods[index].position.is_none() {
            state.replace_food(index);
        }
    }
}

/// Move obstacles, destroy and respawn blocked ones, empower on food.
fn update_obstacles(state: &mut RoundState) {
    let footprint = state.grid.footprint();
    let mut index = 0;

    while index < state.obstacles.len() {
        let target_head = state.actor(state.obstacles[index].target).map(|a| a.position);
        let obstacle = &mut state.obstacles[index];
        if obstacle.empowered {
            if let Some(head) = target_head {
                obstacle.aim_at(head, footprint);
            }
        }
        obstacle.advance();
        let id = obstacle.id;
        let mut position = obstacle.position;

        state.rebuild_occupancy(Exclusion::Obstacle(id));

        if footprint_blocked(position, footprint, &state.occupancy) {
            let spawned = spawn_position(
                &mut state.rng,
                &state.grid,
                &state.occupancy,
                state.config.max_placement_attempts,
            );
            match spawned {
                Ok(fresh) => {
                    let obstacle = &mut state.obstacles[index];
                    obstacle.respawn(fresh);
                    if let Some(head) = target_head {
                        obstacle.aim_at(head, footprint);
                    }
                    debug!("Obstacle {} respawned at {}", id, fresh);
                    state.push_event(GameEvent::obstacle_respawned(state.timer.ticks, id, fresh));
                    position = fresh;
                }
                Err(e) => {
                    warn!("Obstacle {} could not respawn: {}", id, e);
                    if let PlacementError::Exhausted { kind, attempts } = e {
                        state.push_event(GameEvent::placement_failed(state.timer.ticks, kind, attempts));
                    }
                    state.obstacles.remove(index);
                    state.pending_obstacle_spawns += 1;
                    continue;
                }
            }
        }

        // A fresh spawn can land on food too
        if let Some(food_id) = food_under(position, footprint, &state.occupancy) {
            if let Some(food_index) = state.foods.iter().position(|f| f.id == food_id) {
                state.obstacles[index].empowered = true;
                debug!("Obstacle {} ate food {}", id, food_id);
                state.push_event(GameEvent::obstacle_empowered(state.timer.ticks, id, food_id));
                state.replace_food(food_index);
            }
        }

        index += 1;
    }
}

/// Periodic spawn, plus retries of earlier failures.
fn spawn_obstacles(state: &mut RoundState) {
    let period = spawn_period(&state.config);
    if (state.timer.ticks + 1) % period == 0 {
        state.pending_obstacle_spawns += 1;
    }
    while state.pending_obstacle_spawns > 0 {
        if !state.spawn_obstacle() {
            break;
        }
        state.pending_obstacle_spawns -= 1;
    }
}

/// Survival clocks: one forced growth each time a cadence elapses.
fn apply_forced_growth(state: &mut RoundState) {
    let now = state.timer.ticks;
    let mut events = Vec::new();

    for actor in state.actors.iter_mut().filter(|a| !a.disqualified) {
        let Some(cadence) = actor.rules.growth_cadence else {
            continue;
        };
        actor.growth_clock += FIXED_ONE;
        if actor.growth_clock >= cadence {
            actor.trail.grow(1);
            actor.growth_clock -= cadence;
            events.push(GameEvent::forced_growth(now, actor.id, actor.length()));
        }
    }

    for event in events {
        state.push_event(event);
    }
}

/// Check if the round should end.
fn check_end_conditions(state: &mut RoundState, result: &mut TickResult) {
    if state.actors.iter().any(|a| a.disqualified) {
        end_round(state, EndReason::Disqualification, result);
        return;
    }

    let timed_out = state.time_limit.map_or(false, |limit| state.timer.ticks > limit);
    if timed_out {
        end_round(state, EndReason::TimeLimit, result);
    }
}

/// End the round and record the outcome.
fn end_round(state: &mut RoundState, reason: EndReason, result: &mut TickResult) {
    let outcome = state.conclude(reason);
    info!(
        "Round {} of {} over after {} ticks: {}",
        state.round_index, state.mode, state.timer.ticks, outcome
    );

    state.set_phase(RoundPhase::Over);
    state.push_event(GameEvent::round_ended(state.timer.ticks, outcome.winner, reason));
    state.outcome = Some(outcome.clone());
    result.outcome = Some(outcome);
}

/// Replay a round from recorded inputs.
///
/// `initial` must be the round as created (lobby) or as it stood when
/// recording began. Returns the final state and every event.
pub fn replay_round(
    initial: RoundState,
    inputs: &BTreeMap<ActorId, ActorInputBuffer>,
    tick_count: u32,
) -> (RoundState, Vec<GameEvent>) {
    let mut state = initial;
    let mut all_events = Vec::new();

    state.begin();
    state.resume();
    all_events.extend(state.take_events());

    for _ in 0..tick_count {
        let now = state.timer.ticks;
        let frames: BTreeMap<ActorId, InputFrame> = inputs
            .iter()
            .map(|(id, buffer)| (*id, buffer.get_input_at(now)))
            .collect();

        let result = tick(&mut state, &frames);
        let ended = result.round_ended();
        all_events.extend(result.events);

        if ended {
            break;
        }
    }

    (state, all_events)
}

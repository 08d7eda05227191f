//! Round Session Management
//!
//! Owns one `RoundState` at a time and everything around it that the
//! simulation itself must not see: buffered steering, the pause/restart/quit
//! controls, input recording for replays and the history of finished rounds.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::core::hash::StateHash;
use crate::core::rng::derive_round_seed;
use crate::game::config::{ConfigError, SimConfig};
use crate::game::events::GameEvent;
use crate::game::input::{ActorInputBuffer, Direction, InputFrame, IntentQueue};
use crate::game::mode::GameMode;
use crate::game::state::{ActorId, RoundOutcome, RoundPhase, RoundSnapshot, RoundState};
use crate::game::tick::tick;
use crate::runtime::replay::RoundReplay;

/// Unique session identifier.
pub type SessionId = Uuid;

/// A request from the input shell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Control {
    /// Steering intent for one snake.
    Steer {
        /// Snake to steer.
        actor: ActorId,
        /// Requested heading.
        direction: Direction,
    },
    /// Suspend ticking.
    Pause,
    /// Continue ticking.
    Resume,
    /// Pause if running, resume if paused.
    TogglePause,
    /// Start the next round after the current one ended.
    Restart,
    /// Abort the session.
    Quit,
}

/// What one session step did.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionStep {
    /// Nothing moved (lobby, paused or over). Carries phase events.
    Idle(Vec<GameEvent>),
    /// One simulation tick ran.
    Ticked(Vec<GameEvent>),
    /// The round ended on this step.
    RoundOver {
        /// Result of the round.
        outcome: RoundOutcome,
        /// Events of the final tick.
        events: Vec<GameEvent>,
    },
    /// The session was aborted.
    Quit,
}

impl SessionStep {
    /// Events produced by this step.
    pub fn events(&self) -> &[GameEvent] {
        match self {
            SessionStep::Idle(events) | SessionStep::Ticked(events) => events,
            SessionStep::RoundOver { events, .. } => events,
            SessionStep::Quit => &[],
        }
    }
}

/// A finished round.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoundRecord {
    /// Rounds played before this one in the session.
    pub round_index: u32,
    /// Seed the round ran with.
    pub seed: u64,
    /// Result.
    pub outcome: RoundOutcome,
    /// Hash of the final state.
    pub final_hash: StateHash,
    /// When the round left the lobby.
    pub started_at: DateTime<Utc>,
    /// When the round ended.
    pub ended_at: DateTime<Utc>,
}

/// A play session: consecutive rounds of one mode.
pub struct RoundSession {
    /// Unique session identifier.
    pub id: SessionId,
    /// Base seed; each round derives its own from it.
    base_seed: u64,
    /// Seed of the current round.
    round_seed: u64,
    /// Current round.
    state: RoundState,
    /// Steering waiting for a free pending slot, per actor.
    intents: Vec<IntentQueue>,
    /// Frames fed to the current round.
    recording: BTreeMap<ActorId, ActorInputBuffer>,
    /// When the current round left the lobby.
    started_at: Option<DateTime<Utc>>,
    /// Finished rounds, oldest first.
    history: Vec<RoundRecord>,
    /// Set by `Control::Quit`.
    quit: bool,
}

impl RoundSession {
    /// Create a session with its first round in the lobby.
    pub fn new(mode: GameMode, config: SimConfig, base_seed: u64) -> Result<Self, SessionError> {
        let round_seed = derive_round_seed(base_seed, mode.tag(), 0);
        let state = RoundState::new(mode, config, round_seed)?;
        let actor_count = state.actors.len();

        let mut session = Self {
            id: Uuid::new_v4(),
            base_seed,
            round_seed,
            state,
            intents: vec![IntentQueue::new(); actor_count],
            recording: BTreeMap::new(),
            started_at: None,
            history: Vec::new(),
            quit: false,
        };
        session.reset_recording();

        info!("Session {} created for {}", session.id, mode);
        Ok(session)
    }

    /// Leave the lobby. No-op once the round has started.
    pub fn start(&mut self) {
        if self.state.phase != RoundPhase::Lobby {
            return;
        }
        self.state.begin();
        self.started_at = Some(Utc::now());
    }

    /// Apply one control. Returns true if it changed anything.
    pub fn apply(&mut self, control: Control) -> Result<bool, SessionError> {
        match control {
            Control::Steer { actor, direction } => self.steer(actor, direction),
            Control::Pause => Ok(self.state.pause()),
            Control::Resume => Ok(self.state.resume()),
            Control::TogglePause => Ok(self.state.toggle_pause()),
            Control::Restart => {
                self.restart()?;
                Ok(true)
            }
            Control::Quit => {
                self.abort();
                Ok(true)
            }
        }
    }

    /// Queue a steering intent. Ignored unless the round is running.
    fn steer(&mut self, actor: ActorId, direction: Direction) -> Result<bool, SessionError> {
        let queue = self
            .intents
            .get_mut(actor.index())
            .ok_or(SessionError::UnknownActor(actor))?;
        if !self.state.is_running() {
            return Ok(false);
        }
        Ok(queue.push(direction))
    }

    /// Start the next round in place with the next derived seed.
    pub fn restart(&mut self) -> Result<(), SessionError> {
        if !self.state.is_over() {
            return Err(SessionError::RoundInProgress);
        }
        self.round_seed = derive_round_seed(self.base_seed, self.state.mode.tag(), self.state.round_index + 1);
        self.state.reset(self.round_seed);
        self.started_at = Some(Utc::now());
        for queue in &mut self.intents {
            queue.clear();
        }
        self.reset_recording();
        info!("Session {} restarted (round {})", self.id, self.state.round_index);
        Ok(())
    }

    /// Abort the session. The next step reports `Quit`.
    pub fn abort(&mut self) {
        if !self.quit {
            info!("Session {} quit at tick {}", self.id, self.state.timer.ticks);
        }
        self.quit = true;
    }

    /// Advance the session by one fixed-rate step.
    pub fn step(&mut self) -> SessionStep {
        if self.quit {
            return SessionStep::Quit;
        }
        self.start();

        if !self.state.is_running() {
            let result = tick(&mut self.state, &BTreeMap::new());
            return SessionStep::Idle(result.events);
        }

        let now = self.state.timer.ticks;
        let mut frames = BTreeMap::new();
        for actor in &self.state.actors {
            let busy = actor.pending_direction.is_some();
            let frame = match self.intents.get_mut(actor.id.index()) {
                Some(queue) => queue.next_frame(busy),
                None => InputFrame::new(),
            };
            if let Some(buffer) = self.recording.get_mut(&actor.id) {
                buffer.record(now, frame);
            }
            frames.insert(actor.id, frame);
        }

        let result = tick(&mut self.state, &frames);
        match result.outcome {
            Some(outcome) => {
                self.record_outcome(&outcome);
                SessionStep::RoundOver {
                    outcome,
                    events: result.events,
                }
            }
            None => SessionStep::Ticked(result.events),
        }
    }

    fn record_outcome(&mut self, outcome: &RoundOutcome) {
        let ended_at = Utc::now();
        let record = RoundRecord {
            round_index: self.state.round_index,
            seed: self.round_seed,
            outcome: outcome.clone(),
            final_hash: self.state.compute_hash(),
            started_at: self.started_at.unwrap_or(ended_at),
            ended_at,
        };
        debug!("Session {} round {} final hash {}", self.id, record.round_index, hex::encode(record.final_hash));
        self.history.push(record);
    }

    fn reset_recording(&mut self) {
        self.recording = self
            .state
            .actors
            .iter()
            .map(|actor| (actor.id, ActorInputBuffer::new(actor.id)))
            .collect();
    }

    /// Recording of the current round so far.
    pub fn replay(&self) -> Result<RoundReplay, SessionError> {
        let replay = RoundReplay::new(
            self.state.mode,
            self.state.config.clone(),
            self.round_seed,
            self.state.timer.ticks,
            self.recording.clone(),
            self.state.compute_hash(),
        )?;
        Ok(replay)
    }

    /// Current round.
    pub fn state(&self) -> &RoundState {
        &self.state
    }

    /// Render view of the current round.
    pub fn snapshot(&self) -> RoundSnapshot {
        self.state.snapshot()
    }

    /// Configuration of the current round.
    pub fn config(&self) -> &SimConfig {
        &self.state.config
    }

    /// Finished rounds, oldest first.
    pub fn history(&self) -> &[RoundRecord] {
        &self.history
    }

    /// Intents waiting for `actor`.
    pub fn queued_intents(&self, actor: ActorId) -> usize {
        self.intents.get(actor.index()).map_or(0, |q| q.len())
    }

    /// True once `Control::Quit` was applied.
    pub fn is_quit(&self) -> bool {
        self.quit
    }
}

/// Session errors.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Configuration rejected.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// No snake with this id in the round.
    #[error("unknown actor {0}")]
    UnknownActor(ActorId),

    /// Restart requested before the round ended.
    #[error("round still in progress")]
    RoundInProgress,

    /// Driver stopped; controls can no longer be delivered.
    #[error("driver stopped")]
    DriverStopped,

    /// Recording could not be built.
    #[error("replay: {0}")]
    Replay(#[from] crate::runtime::replay::ReplayError),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::EndReason;

    fn config() -> SimConfig {
        SimConfig {
            play_width_px: 420,
            play_height_px: 420,
            cell_size: 20,
            start_paused: false,
            ..SimConfig::default()
        }
    }

    fn steer(actor: u8, direction: Direction) -> Control {
        Control::Steer { actor: ActorId(actor), direction }
    }

    fn run_to_end(session: &mut RoundSession) -> RoundOutcome {
        for _ in 0..10_000 {
            if let SessionStep::RoundOver { outcome, .. } = session.step() {
                return outcome;
            }
        }
        panic!("round did not end");
    }

    #[test]
    fn test_step_starts_round() {
        let mut session = RoundSession::new(GameMode::Classic, config(), 7).unwrap();
        assert_eq!(session.state().phase, RoundPhase::Lobby);

        let step = session.step();
        assert!(matches!(step, SessionStep::Ticked(_)));
        assert_eq!(session.state().timer.ticks, 1);
    }

    #[test]
    fn test_start_paused_idles() {
        let config = SimConfig { start_paused: true, ..config() };
        let mut session = RoundSession::new(GameMode::Classic, config, 7).unwrap();

        assert!(matches!(session.step(), SessionStep::Idle(_)));
        assert_eq!(session.state().timer.ticks, 0);

        // Steering while paused is ignored
        assert!(!session.apply(steer(0, Direction::Left)).unwrap());
        assert_eq!(session.queued_intents(ActorId(0)), 0);

        assert!(session.apply(Control::TogglePause).unwrap());
        assert!(matches!(session.step(), SessionStep::Ticked(_)));
    }

    #[test]
    fn test_second_intent_waits_for_free_slot() {
        let mut session = RoundSession::new(GameMode::Classic, config(), 7).unwrap();
        session.step();

        // Mid-cell: the first turn waits for alignment
        assert!(session.apply(steer(0, Direction::Left)).unwrap());
        assert!(session.apply(steer(0, Direction::Up)).unwrap());
        assert!(!session.apply(steer(0, Direction::Right)).unwrap());
        assert_eq!(session.queued_intents(ActorId(0)), 2);

        session.step();
        assert_eq!(session.state().actors[0].pending_direction, Some(Direction::Left));
        assert_eq!(session.queued_intents(ActorId(0)), 1);

        // Up is held while Left is pending, then offered once it commits
        for _ in 0..4 {
            session.step();
        }
        assert_eq!(session.state().actors[0].direction, Direction::Left);
        assert_eq!(session.state().actors[0].pending_direction, Some(Direction::Up));
        assert_eq!(session.queued_intents(ActorId(0)), 0);
    }

    #[test]
    fn test_unknown_actor() {
        let mut session = RoundSession::new(GameMode::Classic, config(), 7).unwrap();
        assert!(matches!(
            session.apply(steer(3, Direction::Left)),
            Err(SessionError::UnknownActor(ActorId(3)))
        ));
    }

    #[test]
    fn test_restart_only_after_round_over() {
        let config = SimConfig { teleport: false, ..config() };
        let mut session = RoundSession::new(GameMode::Classic, config, 7).unwrap();
        session.step();
        assert!(matches!(session.apply(Control::Restart), Err(SessionError::RoundInProgress)));

        let outcome = run_to_end(&mut session);
        assert_eq!(outcome.reason, EndReason::Disqualification);
        assert!(matches!(session.step(), SessionStep::Idle(_)));

        assert!(session.apply(Control::Restart).unwrap());
        assert_eq!(session.state().phase, RoundPhase::Active);
        assert_eq!(session.state().round_index, 1);
        assert_eq!(session.state().timer.ticks, 0);

        let record = &session.history()[0];
        assert_eq!(record.round_index, 0);
        assert!(record.ended_at >= record.started_at);
        assert_eq!(record.seed, derive_round_seed(7, GameMode::Classic.tag(), 0));
    }

    #[test]
    fn test_restarted_round_replays() {
        let config = SimConfig { teleport: false, ..config() };
        let mut session = RoundSession::new(GameMode::Classic, config, 8).unwrap();
        run_to_end(&mut session);
        session.apply(Control::Restart).unwrap();

        session.apply(steer(0, Direction::Left)).unwrap();
        let outcome = run_to_end(&mut session);

        let replay = session.replay().unwrap();
        assert_eq!(replay.tick_count, outcome.duration_ticks);
        assert_eq!(replay.verify().unwrap(), session.history()[1].final_hash);
    }

    #[test]
    fn test_pause_mid_round_replays() {
        let mut session = RoundSession::new(GameMode::Battle, config(), 9).unwrap();
        for _ in 0..10 {
            session.step();
        }
        session.apply(Control::Pause).unwrap();
        for _ in 0..5 {
            assert!(matches!(session.step(), SessionStep::Idle(_)));
        }
        session.apply(Control::Resume).unwrap();
        session.apply(steer(1, Direction::Right)).unwrap();
        for _ in 0..10 {
            session.step();
        }

        assert_eq!(session.state().timer.ticks, 20);
        let replay = session.replay().unwrap();
        assert_eq!(replay.verify().unwrap(), session.state().compute_hash());
    }

    #[test]
    fn test_quit() {
        let mut session = RoundSession::new(GameMode::Battle, config(), 7).unwrap();
        session.step();
        assert!(session.apply(Control::Quit).unwrap());
        assert_eq!(session.step(), SessionStep::Quit);
        assert!(session.is_quit());
    }

    #[test]
    fn test_recorded_round_verifies() {
        let mut session = RoundSession::new(GameMode::Cooperative, config(), 31).unwrap();
        let script = [Direction::Left, Direction::Down, Direction::Right, Direction::Up];

        for t in 0..240usize {
            if t % 10 == 0 {
                session.apply(steer(0, script[(t / 10) % 4])).unwrap();
                session.apply(steer(1, script[(t / 10 + 2) % 4])).unwrap();
            }
            if let SessionStep::RoundOver { .. } = session.step() {
                break;
            }
        }

        let replay = session.replay().unwrap();
        assert_eq!(replay.verify().unwrap(), session.state().compute_hash());
    }
}

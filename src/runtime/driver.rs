//! Fixed-Rate Driver
//!
//! Runs a `RoundSession` on a tokio interval. Controls arrive on an mpsc
//! channel and are drained at the start of every tick; events go out on a
//! broadcast channel. The simulation step itself never awaits.

use tokio::sync::{broadcast, mpsc};
use tokio::sync::mpsc::error::TryRecvError;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

use crate::game::events::GameEvent;
use crate::runtime::session::{Control, RoundSession, SessionError, SessionStep};

/// Control channel depth.
pub const CONTROL_CAPACITY: usize = 64;

/// Event channel depth. Slow subscribers lag rather than block the loop.
pub const EVENT_CAPACITY: usize = 1024;

/// Sending side handed to the input shell and audio/render subscribers.
#[derive(Clone)]
pub struct DriverHandle {
    controls: mpsc::Sender<Control>,
    events: broadcast::Sender<GameEvent>,
}

impl DriverHandle {
    /// Deliver a control before the next tick.
    pub async fn send(&self, control: Control) -> Result<(), SessionError> {
        self.controls
            .send(control)
            .await
            .map_err(|_| SessionError::DriverStopped)
    }

    /// Subscribe to simulation events.
    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.events.subscribe()
    }
}

/// The tick loop.
pub struct Driver {
    session: RoundSession,
    controls: mpsc::Receiver<Control>,
    events: broadcast::Sender<GameEvent>,
    stop_when_over: bool,
}

impl Driver {
    /// Wrap a session. Returns the driver and a handle for feeding it.
    pub fn new(session: RoundSession) -> (Self, DriverHandle) {
        let (control_tx, control_rx) = mpsc::channel(CONTROL_CAPACITY);
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);

        let driver = Self {
            session,
            controls: control_rx,
            events: event_tx.clone(),
            stop_when_over: false,
        };
        let handle = DriverHandle {
            controls: control_tx,
            events: event_tx,
        };
        (driver, handle)
    }

    /// Return from `run` as soon as a round ends instead of waiting for
    /// a restart or quit.
    pub fn stop_when_over(mut self, stop: bool) -> Self {
        self.stop_when_over = stop;
        self
    }

    /// Run until quit (or the first round end with `stop_when_over`).
    /// Hands the session back for inspection.
    pub async fn run(mut self) -> RoundSession {
        let tick_duration = self.session.config().tick_duration();
        let mut ticker = interval(tick_duration);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("Driver for session {} running at {:?} per tick", self.session.id, tick_duration);

        loop {
            ticker.tick().await;

            self.drain_controls();

            let step = self.session.step();
            for event in step.events() {
                // No subscribers is fine
                let _ = self.events.send(event.clone());
            }

            match step {
                SessionStep::Quit => break,
                SessionStep::RoundOver { outcome, .. } => {
                    info!("Session {}: {}", self.session.id, outcome);
                    if self.stop_when_over {
                        break;
                    }
                }
                _ => {}
            }
        }

        self.session
    }

    fn drain_controls(&mut self) {
        loop {
            match self.controls.try_recv() {
                Ok(control) => {
                    if let Err(e) = self.session.apply(control) {
                        warn!("Control {:?} rejected: {}", control, e);
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    // Nobody can quit any more; treat it as a quit
                    self.session.abort();
                    break;
                }
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::config::SimConfig;
    use crate::game::events::GameEventData;
    use crate::game::input::Direction;
    use crate::game::mode::GameMode;
    use crate::game::state::{ActorId, EndReason, RoundPhase};

    fn config() -> SimConfig {
        SimConfig {
            play_width_px: 420,
            play_height_px: 420,
            cell_size: 20,
            teleport: false,
            start_paused: false,
            ..SimConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_round_to_end() {
        let session = RoundSession::new(GameMode::Classic, config(), 3).unwrap();
        let (driver, handle) = Driver::new(session);
        let mut events = handle.subscribe();

        let session = driver.stop_when_over(true).run().await;

        assert_eq!(session.history().len(), 1);
        assert_eq!(session.history()[0].outcome.reason, EndReason::Disqualification);
        assert_eq!(session.state().phase, RoundPhase::Over);

        let mut saw_end = false;
        while let Ok(event) = events.try_recv() {
            if matches!(event.data, GameEventData::RoundEnded { .. }) {
                saw_end = true;
            }
        }
        assert!(saw_end);
        drop(handle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_quit_control() {
        let session = RoundSession::new(GameMode::Battle, config(), 3).unwrap();
        let (driver, handle) = Driver::new(session);

        handle
            .send(Control::Steer { actor: ActorId(0), direction: Direction::Left })
            .await
            .unwrap();
        handle.send(Control::Quit).await.unwrap();

        let session = driver.run().await;
        assert!(session.is_quit());
        assert!(session.history().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_handle_stops_driver() {
        let session = RoundSession::new(GameMode::Cooperative, config(), 3).unwrap();
        let (driver, handle) = Driver::new(session);
        drop(handle);

        let session = driver.run().await;
        assert!(session.is_quit());
    }

    #[tokio::test(start_paused = true)]
    async fn test_steering_reaches_session() {
        let session = RoundSession::new(GameMode::Classic, config(), 3).unwrap();
        let (driver, handle) = Driver::new(session);
        let mut events = handle.subscribe();

        let task = tokio::spawn(driver.stop_when_over(true).run());

        // First tick starts the round; steer once it is running
        let first = events.recv().await.unwrap();
        assert!(matches!(first.data, GameEventData::FoodPlaced { .. } | GameEventData::PhaseChanged { .. }));
        handle
            .send(Control::Steer { actor: ActorId(0), direction: Direction::Left })
            .await
            .unwrap();

        let mut turned = false;
        while let Ok(event) = events.recv().await {
            match event.data {
                GameEventData::Redirected { direction: Direction::Left, .. } => turned = true,
                GameEventData::RoundEnded { .. } => break,
                _ => {}
            }
        }
        assert!(turned);

        let session = task.await.unwrap();
        assert_eq!(session.history().len(), 1);
    }
}

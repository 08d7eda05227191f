//! Grid Snake Demo Runner
//!
//! Headless runner for the simulation. Plays one round per mode with a
//! simple autopilot, then replays each recording and checks the hashes.
//!
//! ```text
//! grid-snake [MODE|all] [--seed N] [--config FILE] [--realtime]
//! ```

use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use grid_snake::{
    VERSION,
    game::{
        config::SimConfig,
        events::GameEventData,
        grid::Cell,
        input::Direction,
        mode::GameMode,
        occupancy::{Exclusion, OccupancyGrid},
        state::{ActorId, RoundState},
    },
    runtime::{
        driver::Driver,
        replay::RoundReplay,
        session::{Control, RoundSession, SessionStep},
    },
};

/// Give up on rounds the autopilot survives this long.
const MAX_DEMO_TICKS: u32 = 20_000;

struct Args {
    modes: Vec<GameMode>,
    seed: u64,
    config: SimConfig,
    realtime: bool,
}

fn parse_args() -> Result<Args> {
    let mut modes = GameMode::ALL.to_vec();
    let mut seed = 12345u64;
    let mut config = SimConfig::default();
    let mut realtime = false;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--seed" => {
                let value = args.next().context("--seed needs a value")?;
                seed = value.parse().with_context(|| format!("bad seed '{}'", value))?;
            }
            "--config" => {
                let path = args.next().context("--config needs a path")?;
                let json = std::fs::read_to_string(&path)
                    .with_context(|| format!("reading {}", path))?;
                config = SimConfig::from_json_or_default(&json);
            }
            "--realtime" => realtime = true,
            "all" => modes = GameMode::ALL.to_vec(),
            other if other.starts_with("--") => bail!("unknown option '{}'", other),
            other => modes = vec![other.parse::<GameMode>()?],
        }
    }

    // The demo has no pause overlay to dismiss
    config.start_paused = false;
    Ok(Args { modes, seed, config, realtime })
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    let args = parse_args()?;
    let grid = args.config.validate()?;

    info!("Grid Snake v{}", VERSION);
    info!(
        "Tick Rate: {} Hz, grid {}x{} cells",
        args.config.tick_rate,
        grid.width_cells,
        grid.playable_rows()
    );

    for mode in &args.modes {
        if args.realtime {
            realtime_round(*mode, &args).await?;
        } else {
            demo_round(*mode, &args)?;
        }
    }

    Ok(())
}

/// Play one round as fast as possible, then verify its recording.
fn demo_round(mode: GameMode, args: &Args) -> Result<()> {
    info!("=== {} ({}) ===", mode, mode.description());

    let mut session = RoundSession::new(mode, args.config.clone(), args.seed)?;
    let mut eaten = 0;

    loop {
        for (actor, direction) in autopilot(session.state()) {
            session.apply(Control::Steer { actor, direction })?;
        }

        match session.step() {
            SessionStep::RoundOver { outcome, .. } => {
                info!("{} after {} ticks ({})", outcome, outcome.duration_ticks, session.state().timer_string());
                for dq in &outcome.disqualified {
                    info!("  {} disqualified by {:?}", dq.actor, dq.cause);
                }
                break;
            }
            SessionStep::Quit => return Ok(()),
            step => {
                eaten += step
                    .events()
                    .iter()
                    .filter(|e| matches!(e.data, GameEventData::FoodEaten { .. }))
                    .count();
            }
        }

        if session.state().timer.ticks >= MAX_DEMO_TICKS {
            warn!("Stopping {} after {} ticks", mode, MAX_DEMO_TICKS);
            session.apply(Control::Quit)?;
        }
    }

    let hash = session.state().compute_hash();
    info!("Food eaten: {}", eaten);
    info!("Final State Hash: {}", hex::encode(hash));

    // Verify determinism through an encoded recording
    let bytes = session.replay()?.to_bytes()?;
    let replay = RoundReplay::from_bytes(&bytes)?;
    let replay_hash = replay.verify()?;
    info!("Replay ({} bytes) State Hash: {}", bytes.len(), hex::encode(replay_hash));
    info!("DETERMINISM VERIFIED: Hashes match!");

    Ok(())
}

/// Play one round at the configured tick rate through the driver.
async fn realtime_round(mode: GameMode, args: &Args) -> Result<()> {
    info!("=== {} (real time) ===", mode);

    let session = RoundSession::new(mode, args.config.clone(), args.seed)?;
    let actors = session.state().actors.len();
    let (driver, handle) = Driver::new(session);
    let mut events = handle.subscribe();

    let driver_task = tokio::spawn(driver.stop_when_over(true).run());

    // Scripted steering: turn every couple of cells
    let steer_handle = handle.clone();
    let period = args.config.tick_duration() * args.config.substeps_per_cell * 3;
    let steering = tokio::spawn(async move {
        let turns = [Direction::Left, Direction::Up, Direction::Right, Direction::Up];
        for step in 0usize.. {
            tokio::time::sleep(period).await;
            let actor = ActorId((step % actors) as u8);
            let direction = turns[(step / actors) % turns.len()];
            if steer_handle.send(Control::Steer { actor, direction }).await.is_err() {
                break;
            }
        }
    });

    let listener = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event.data {
                GameEventData::FoodEaten { actor_id, new_length, .. } => {
                    info!("{} ate (length {})", actor_id, new_length);
                }
                GameEventData::RoundEnded { .. } => break,
                _ => {}
            }
        }
    });

    let session = driver_task.await.context("driver task failed")?;
    steering.abort();
    let _ = tokio::time::timeout(Duration::from_secs(1), listener).await;
    drop(handle);

    if let Some(record) = session.history().last() {
        info!("{} (final hash {})", record.outcome, hex::encode(record.final_hash));
    }
    Ok(())
}

/// Greedy steering: head for the nearest edible food, never into a
/// blocked cell if another way is open.
fn autopilot(state: &RoundState) -> Vec<(ActorId, Direction)> {
    let mut occupancy = OccupancyGrid::new(&state.grid);
    let mut plan = Vec::new();

    for actor in state.actors.iter().filter(|a| !a.disqualified) {
        if !actor.is_aligned() || actor.pending_direction.is_some() {
            continue;
        }
        occupancy.rebuild(
            &state.grid,
            &state.actors,
            &state.foods,
            &state.obstacles,
            state.boundary,
            Exclusion::HeadOf(actor.id),
        );

        let head = actor.head_cell();
        let target = state
            .foods
            .iter()
            .filter(|f| f.edible_by(actor.id))
            .filter_map(|f| f.position)
            .min_by_key(|cell| (cell.col - head.col).abs() + (cell.row - head.row).abs());

        let best = Direction::ALL
            .iter()
            .copied()
            .filter(|d| !d.is_opposite(actor.direction))
            .filter(|d| {
                let (dx, dy) = d.delta();
                !occupancy
                    .test(Cell::new(head.col + dx, head.row + dy))
                    .is_collision()
            })
            .min_by_key(|d| {
                let (dx, dy) = d.delta();
                let distance = target.map_or(0, |cell| {
                    (cell.col - head.col - dx).abs() + (cell.row - head.row - dy).abs()
                });
                // Prefer going straight on ties
                (distance, *d != actor.direction)
            });

        if let Some(direction) = best {
            if direction != actor.direction {
                plan.push((actor.id, direction));
            }
        }
    }

    plan
}

//! Tick throughput benchmarks.

use std::collections::BTreeMap;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use grid_snake::game::config::SimConfig;
use grid_snake::game::input::{Direction, InputFrame};
use grid_snake::game::mode::GameMode;
use grid_snake::game::state::{ActorId, RoundState};
use grid_snake::game::tick::tick;

fn started(mode: GameMode) -> RoundState {
    let config = SimConfig { start_paused: false, ..SimConfig::default() };
    let mut state = RoundState::new(mode, config, 42).expect("default config is valid");
    state.begin();
    state
}

fn bench_modes(c: &mut Criterion) {
    let turns = [Direction::Left, Direction::Up, Direction::Right, Direction::Up];

    for mode in GameMode::ALL {
        c.bench_function(&format!("tick_{}", mode.tag()), |b| {
            let mut state = started(mode);
            let mut t = 0usize;
            b.iter(|| {
                if state.is_over() {
                    state.reset(t as u64);
                }
                let mut inputs = BTreeMap::new();
                if t % 12 == 0 {
                    for actor in &state.actors {
                        inputs.insert(actor.id, InputFrame::steer(turns[(t / 12) % 4]));
                    }
                }
                t += 1;
                black_box(tick(&mut state, &inputs))
            });
        });
    }
}

fn bench_hash(c: &mut Criterion) {
    let mut state = started(GameMode::Battle);
    for _ in 0..200 {
        tick(&mut state, &BTreeMap::<ActorId, InputFrame>::new());
    }
    c.bench_function("compute_hash_battle", |b| b.iter(|| black_box(state.compute_hash())));
}

criterion_group!(benches, bench_modes, bench_hash);
criterion_main!(benches);

//! Benchmarks for the solvability engine.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use patience::hash::hash_state;
use patience::moves::generate_all_moves;
use patience::safety::auto_play_safe_moves;
use patience::{solve, GameState, SolverConfig};

/// Benchmark move generation on a fresh deal.
fn bench_generate_moves(c: &mut Criterion) {
    let state = GameState::deal(7);

    c.bench_function("generate_all_moves", |b| {
        b.iter(|| generate_all_moves(black_box(&state)))
    });
}

/// Benchmark canonical hashing of a fresh deal.
fn bench_hash_state(c: &mut Criterion) {
    let state = GameState::deal(7);

    c.bench_function("hash_state", |b| b.iter(|| hash_state(black_box(&state))));
}

/// Benchmark the auto-play fixed point.
fn bench_auto_play(c: &mut Criterion) {
    let state = GameState::deal(7);

    c.bench_function("auto_play_safe_moves", |b| {
        b.iter(|| auto_play_safe_moves(black_box(&state)))
    });
}

/// Benchmark a solve capped at 10k states.
fn bench_solve_budgeted(c: &mut Criterion) {
    let state = GameState::deal(7);
    let config = SolverConfig {
        max_states_explored: Some(10_000),
        ..SolverConfig::default()
    };

    let mut group = c.benchmark_group("solve");
    group.sample_size(10);
    group.bench_function("budget_10k", |b| {
        b.iter(|| solve(black_box(&state), &config))
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_generate_moves,
    bench_hash_state,
    bench_auto_play,
    bench_solve_budgeted
);
criterion_main!(benches);

//! Performance benchmarks for the matchmaking core
//!
//! Measure the pure hot paths (split scoring, rating updates) and a full
//! matcher tick over the in-memory store at different queue depths.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;

use matchpool::prelude::*;

fn bench_split_planning(c: &mut Criterion) {
    let planner = SplitPlanner::new(0.1);
    let four: Vec<Candidate> = (0..4)
        .map(|i| Candidate {
            player_id: format!("p{i}"),
            mu: 20.0 + i as f64 * 3.0,
            sigma: 8.333,
        })
        .collect();

    c.bench_function("split_plan_four_players", |b| {
        b.iter(|| black_box(planner.plan(black_box(&four))))
    });
}

fn bench_rating_update(c: &mut Criterion) {
    let env = TrueSkill::default();
    let team_a = vec![Rating::new(27.0, 6.0), Rating::new(23.0, 7.5)];
    let team_b = vec![Rating::new(25.0, 8.0), Rating::new(26.0, 4.0)];

    c.bench_function("trueskill_two_team_update", |b| {
        b.iter(|| black_box(env.rate_two_teams(black_box(&team_a), black_box(&team_b))))
    });
}

fn bench_tick_scaling(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("tick_scaling");

    for size in [16, 64, 256].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter_custom(|iters| {
                rt.block_on(async {
                    let start = std::time::Instant::now();

                    for _ in 0..iters {
                        let store: Arc<dyn MatchStore> = Arc::new(MemoryStore::new());
                        for i in 0..size {
                            let id = format!("p{i}");
                            store
                                .create_player(&Player {
                                    player_id: id.clone(),
                                    username: id.clone(),
                                    region: Region::EUW,
                                    mu: 20.0 + (i % 10) as f64,
                                    sigma: 8.333,
                                    last_active: Utc::now(),
                                })
                                .await
                                .unwrap();
                            store.enqueue(&id, None).await.unwrap();
                        }

                        let runner = MatcherRunner::new(
                            store,
                            vec![Region::EUW],
                            0.1,
                            Duration::from_millis(200),
                        );
                        black_box(runner.run_tick().await);
                    }

                    start.elapsed()
                })
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_split_planning,
    bench_rating_update,
    bench_tick_scaling
);
criterion_main!(benches);

//! Performance benchmarks for matcher passes and queue operations

use arena_matchmaker::config::tuning::MatchmakingTuning;
use arena_matchmaker::directory::InMemoryPlayerDirectory;
use arena_matchmaker::matches::MatchRegistry;
use arena_matchmaker::queue::{Matcher, QueueStore};
use arena_matchmaker::types::MatchType;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;

fn create_bench_system() -> (Arc<InMemoryPlayerDirectory>, Arc<QueueStore>, Matcher) {
    let directory = Arc::new(InMemoryPlayerDirectory::new());
    let store = Arc::new(QueueStore::new(
        directory.clone(),
        MatchmakingTuning::default(),
    ));
    let registry = Arc::new(MatchRegistry::new(directory.clone()));
    let matcher = Matcher::new(store.clone(), registry);
    (directory, store, matcher)
}

fn bench_queue_join(c: &mut Criterion) {
    let (directory, store, _matcher) = create_bench_system();
    for i in 0..10_000i64 {
        directory
            .register_player(format!("player_{}", i), 1000 + (i % 400))
            .unwrap();
    }

    let mut counter = 0usize;
    c.bench_function("queue_join", |b| {
        b.iter(|| {
            let player_id = format!("player_{}", counter % 10_000);
            counter += 1;
            // Alternate join/leave so the queue does not grow unboundedly
            if let Ok(ticket) = store.join(black_box(&player_id), MatchType::OneVsOne) {
                black_box(ticket);
            } else {
                let _ = store.leave(&player_id);
            }
        })
    });
}

fn bench_matcher_pass_empty(c: &mut Criterion) {
    let (_directory, _store, matcher) = create_bench_system();

    c.bench_function("matcher_pass_empty", |b| {
        b.iter(|| {
            black_box(matcher.run_pass().unwrap());
        })
    });
}

fn bench_matcher_pass_deep_queue(c: &mut Criterion) {
    c.bench_function("matcher_pass_deep_queue", |b| {
        b.iter_batched(
            || {
                let (directory, store, matcher) = create_bench_system();
                // Spread ratings so only a prefix of the queue is compatible
                for i in 0..500i64 {
                    let id = format!("player_{}", i);
                    directory.register_player(id.clone(), 1000 + i * 3).unwrap();
                    store.join(&id, MatchType::SixVsSix).unwrap();
                }
                matcher
            },
            |matcher| {
                black_box(matcher.run_pass().unwrap());
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

fn bench_queue_snapshot(c: &mut Criterion) {
    let (directory, store, _matcher) = create_bench_system();
    for i in 0..200 {
        let id = format!("player_{}", i);
        directory.register_player(id.clone(), 1000).unwrap();
        let match_type = MatchType::all()[i % 6];
        store.join(&id, match_type).unwrap();
    }

    c.bench_function("queue_snapshot_200_tickets", |b| {
        b.iter(|| {
            black_box(store.snapshot().unwrap());
        })
    });
}

criterion_group!(
    benches,
    bench_queue_join,
    bench_matcher_pass_empty,
    bench_matcher_pass_deep_queue,
    bench_queue_snapshot
);
criterion_main!(benches);

//! # Dynplay Performance Benchmarks
//!
//! Benchmarks for the hot paths of playlist generation.
//!
//! ## Benchmark Categories
//!
//! - **Set Algebra**: union, intersection and difference over large universes
//! - **Random Draws**: uniform selection from sparse and dense sets
//! - **Solver**: full playlist generation, with and without backtracking
//! - **Database**: tag queries against SQLite
//!
//! ## Running Benchmarks
//!
//! ```bash
//! # Run all benchmarks
//! cargo bench
//!
//! # Run specific benchmark group
//! cargo bench set_algebra
//! cargo bench solver
//! ```

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use dynplay::bias::{BiasMode, IdentifierBias, TagMatchBias};
use dynplay::config::SolverConfig;
use dynplay::solver::BiasSolver;
use dynplay::store::{MemoryTrackStore, SqliteTrackStore, TagField, TagFilter, TrackRecord, TrackStore};
use dynplay::track_set::TrackSet;
use dynplay::universe::TrackUniverse;
use futures::executor::block_on;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::hint::black_box;
use std::rc::Rc;
use std::sync::Arc;

const GENRES: [&str; 5] = ["Jazz", "Rock", "Electronic", "Classical", "Folk"];

fn identifiers(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("track-{i:06}")).collect()
}

fn universe(count: usize) -> Arc<TrackUniverse> {
    TrackUniverse::new(identifiers(count))
        .expect("identifiers are unique")
        .shared()
}

/// Every `step`-th track of the universe.
fn every_nth(universe: &Arc<TrackUniverse>, step: usize) -> TrackSet {
    TrackSet::from_identifiers(universe, universe.identifiers().step_by(step))
}

fn create_test_tracks(count: usize) -> Vec<TrackRecord> {
    (0..count)
        .map(|i| TrackRecord {
            id: format!("track-{i:06}"),
            artist: format!("Artist {}", i % 200),
            album: format!("Album {}", i % 1000),
            genre: GENRES[i % GENRES.len()].to_string(),
            title: format!("Song {i}"),
        })
        .collect()
}

fn benchmark_set_algebra(c: &mut Criterion) {
    let mut group = c.benchmark_group("set_algebra");

    for size in [1_000, 10_000, 100_000].iter() {
        let universe = universe(*size);
        let evens = every_nth(&universe, 2);
        let thirds = every_nth(&universe, 3);

        group.bench_with_input(BenchmarkId::new("intersect", size), size, |b, _| {
            b.iter_batched(
                || evens.clone(),
                |mut set| {
                    set.intersect_set(black_box(&thirds)).expect("same universe");
                    set
                },
                BatchSize::SmallInput,
            );
        });

        group.bench_with_input(BenchmarkId::new("unite", size), size, |b, _| {
            b.iter_batched(
                || evens.clone(),
                |mut set| {
                    set.unite_set(black_box(&thirds)).expect("same universe");
                    set
                },
                BatchSize::SmallInput,
            );
        });

        group.bench_with_input(BenchmarkId::new("subtract", size), size, |b, _| {
            b.iter_batched(
                || evens.clone(),
                |mut set| {
                    set.subtract_set(black_box(&thirds)).expect("same universe");
                    set
                },
                BatchSize::SmallInput,
            );
        });

        group.bench_with_input(BenchmarkId::new("track_count", size), size, |b, _| {
            b.iter(|| black_box(&evens).track_count().expect("ready"));
        });
    }

    group.finish();
}

fn benchmark_random_draws(c: &mut Criterion) {
    let mut group = c.benchmark_group("random_draws");
    let universe = universe(100_000);
    let mut rng = StdRng::seed_from_u64(42);

    let dense = TrackSet::full(&universe);
    group.bench_function("dense_100k", |b| {
        b.iter(|| {
            black_box(&dense)
                .random_track_with(&mut rng)
                .expect("non-empty")
                .len()
        });
    });

    let sparse = every_nth(&universe, 997);
    group.bench_function("sparse_100k", |b| {
        b.iter(|| {
            black_box(&sparse)
                .random_track_with(&mut rng)
                .expect("non-empty")
                .len()
        });
    });

    group.finish();
}

fn benchmark_solver(c: &mut Criterion) {
    let mut group = c.benchmark_group("solver");
    let store = MemoryTrackStore::from_identifiers(identifiers(20_000));
    let config = SolverConfig::default().with_seed(7);

    group.bench_function("no_biases_20k", |b| {
        let solver = BiasSolver::new(&store, config.clone());
        b.iter(|| block_on(solver.solve(black_box(50))).expect("solve"));
    });

    group.bench_function("two_biases_20k", |b| {
        let all = identifiers(20_000);
        let solver = BiasSolver::new(&store, config.clone())
            .with_bias(IdentifierBias::include("even", all.iter().step_by(2).cloned()))
            .with_bias(IdentifierBias::exclude("every fifth", all.iter().step_by(5).cloned()));
        b.iter(|| block_on(solver.solve(black_box(50))).expect("solve"));
    });

    group.bench_function("backtracking_20k", |b| {
        let all = identifiers(20_000);
        let solver = BiasSolver::new(&store, config.clone())
            .with_bias(IdentifierBias::include("first hundred", all.iter().take(100).cloned()))
            .with_bias(IdentifierBias::include("first ten", all.iter().take(10).cloned()));
        b.iter(|| block_on(solver.solve(black_box(50))).expect("solve"));
    });

    group.finish();
}

fn benchmark_database_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("database_operations");

    let mut sqlite = SqliteTrackStore::open_in_memory().expect("Failed to open database");
    sqlite
        .insert_tracks(&create_test_tracks(10_000))
        .expect("Failed to insert tracks");
    let store: Rc<dyn TrackStore> = Rc::new(sqlite);
    let jazz = TagFilter::new(TagField::Genre, "jazz");

    group.bench_function("fetch_all_10k", |b| {
        b.iter(|| block_on(store.fetch_all_track_identifiers()).expect("query"));
    });

    group.bench_function("genre_query_10k", |b| {
        b.iter(|| block_on(store.query(black_box(&jazz))).expect("query"));
    });

    group.bench_function("tag_solve_10k", |b| {
        let solver = BiasSolver::new(&*store, SolverConfig::default().with_seed(7))
            .with_bias(TagMatchBias::new(Rc::clone(&store), jazz.clone(), BiasMode::Include))
            .with_bias(TagMatchBias::new(
                Rc::clone(&store),
                TagFilter::new(TagField::Artist, "Artist 5"),
                BiasMode::Exclude,
            ));
        b.iter(|| block_on(solver.solve(black_box(25))).expect("solve"));
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_set_algebra,
    benchmark_random_draws,
    benchmark_solver,
    benchmark_database_operations
);
criterion_main!(benches);

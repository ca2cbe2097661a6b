// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Performance benchmarks for the looper
//!
//! Run with: cargo bench
//!
//! These benchmarks measure:
//! - Track insertion, in order and across a loop wrap
//! - Window lookup used by playback
//! - One scheduler cycle with a populated track store

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use crossbeam::channel;

use looper::engine::input_queues;
use looper::sequencer::{NoteEntry, Scheduler, SchedulerConfig, Track, TrackStore};
use looper::timing::{Clock, ManualClock, PlaybackState};

fn filled_track(size: u64) -> Track {
    let mut track = Track::new();
    for i in 0..size {
        track.append(NoteEntry::note_on(i * 4, 0, 60, 100));
        track.append(NoteEntry::note_off(i * 4 + 2, 0, 60));
    }
    track
}

/// Benchmark appending to a track
fn bench_track_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("track_append");

    for size in [100u64, 1000, 10000].iter() {
        group.bench_with_input(BenchmarkId::new("in_order", size), size, |b, &size| {
            b.iter(|| black_box(filled_track(size).len()))
        });

        // Second half recorded after a wrap lands before the first
        group.bench_with_input(BenchmarkId::new("wrapped", size), size, |b, &size| {
            b.iter(|| {
                let mut track = Track::new();
                for i in 0..size {
                    let timestamp = if i < size / 2 { i + size } else { i - size / 2 };
                    track.append(NoteEntry::note_on(timestamp, 0, 60, 100));
                }
                black_box(track.len())
            })
        });
    }

    group.finish();
}

/// Benchmark the playback window lookup
fn bench_track_window(c: &mut Criterion) {
    let mut group = c.benchmark_group("track_window");

    for size in [100u64, 1000, 10000].iter() {
        let track = filled_track(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| black_box(track.window(black_box(size * 2), black_box(size * 2 + 24)).len()))
        });
    }

    group.finish();
}

/// Benchmark one scheduler cycle
fn bench_scheduler_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("scheduler_cycle");

    for tracks in [1usize, 8, 32].iter() {
        group.bench_with_input(BenchmarkId::new("tracks", tracks), tracks, |b, &tracks| {
            let mut store = TrackStore::new();
            for index in 0..tracks {
                for step in 0..96u64 {
                    store.append(index, NoteEntry::note_on(step * 4, 0, 60, 100));
                }
            }

            let clock = ManualClock::new();
            let state = Arc::new(PlaybackState::new(384, 0));
            let (_senders, queues) = input_queues(16);
            let (out_tx, out_rx) = channel::unbounded();
            let mut scheduler =
                Scheduler::new(clock.clone(), state, SchedulerConfig::default(), queues, out_tx)
                    .with_tracks(store);

            b.iter(|| {
                clock.advance(1);
                scheduler.run_cycle();
                black_box(clock.now());
                out_rx.try_iter().count()
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_track_append,
    bench_track_window,
    bench_scheduler_cycle
);
criterion_main!(benches);

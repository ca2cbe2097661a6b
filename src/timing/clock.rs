// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Monotonic tick clocks.
//!
//! The scheduler reads time as a tick count. One tick is a pulse at the
//! configured tempo and PPQN, so 24 ticks make a quarter note by default.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Pulses Per Quarter Note - MIDI standard is 24
pub const PPQN: u32 = 24;

pub const MIN_BPM: f64 = 20.0;
pub const MAX_BPM: f64 = 300.0;

/// Source of monotonically non-decreasing tick counts
pub trait Clock {
    fn now(&self) -> u64;
}

/// Duration of one tick at `bpm` and `ppqn`.
///
/// Tempo is clamped to 20-300 BPM; a zero PPQN counts as 1.
pub fn tick_interval(bpm: f64, ppqn: u32) -> Duration {
    let bpm = bpm.clamp(MIN_BPM, MAX_BPM);
    // interval = 60 / (BPM * PPQN) seconds
    let seconds = 60.0 / (bpm * ppqn.max(1) as f64);
    Duration::from_secs_f64(seconds)
}

/// Wall clock counting ticks since construction
#[derive(Debug, Clone)]
pub struct SystemClock {
    start: Instant,
    tick: Duration,
}

impl SystemClock {
    pub fn new(bpm: f64, ppqn: u32) -> Self {
        Self {
            start: Instant::now(),
            tick: tick_interval(bpm, ppqn),
        }
    }

    pub fn tick_duration(&self) -> Duration {
        self.tick
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new(120.0, PPQN) // Default to 120 BPM
    }
}

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        let tick_nanos = self.tick.as_nanos().max(1);
        (self.start.elapsed().as_nanos() / tick_nanos) as u64
    }
}

/// Clock advanced by hand; clones share the same counter
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    ticks: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, ticks: u64) {
        self.ticks.store(ticks, Ordering::Release);
    }

    pub fn advance(&self, ticks: u64) {
        self.ticks.fetch_add(ticks, Ordering::AcqRel);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }
}

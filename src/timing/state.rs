// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Playback parameters shared across threads.
//!
//! Every field is an atomic so control threads can change loop length,
//! beat length, or request a restart without ever blocking the scheduler.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Default loop length: four bars of 4/4 at 24 PPQN
pub const DEFAULT_LOOP_LENGTH: u64 = 384;
/// Default beat length: one quarter note at 24 PPQN
pub const DEFAULT_BEAT_LENGTH: u64 = 24;

#[derive(Debug)]
pub struct PlaybackState {
    /// Loop length in ticks
    length: AtomicU64,
    /// Ticks per beat
    beat_length: AtomicU64,
    /// Set by any thread, cleared only by the scheduler
    restart: AtomicBool,
    shutdown: AtomicBool,
}

impl PlaybackState {
    pub fn new(length: u64, beat_length: u64) -> Self {
        Self {
            length: AtomicU64::new(length),
            beat_length: AtomicU64::new(beat_length),
            restart: AtomicBool::new(false),
            shutdown: AtomicBool::new(false),
        }
    }

    pub fn length(&self) -> u64 {
        self.length.load(Ordering::Acquire)
    }

    pub fn set_length(&self, ticks: u64) {
        self.length.store(ticks, Ordering::Release);
    }

    pub fn beat_length(&self) -> u64 {
        self.beat_length.load(Ordering::Acquire)
    }

    pub fn set_beat_length(&self, ticks: u64) {
        self.beat_length.store(ticks, Ordering::Release);
    }

    /// Ask the scheduler to reset the clock on its next cycle
    pub fn request_restart(&self) {
        self.restart.store(true, Ordering::Release);
    }

    /// Whether a restart is waiting to be consumed
    pub fn restart_pending(&self) -> bool {
        self.restart.load(Ordering::Acquire)
    }

    /// Test-and-clear the restart flag. Only the scheduler calls this.
    pub fn take_restart(&self) -> bool {
        self.restart
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self::new(DEFAULT_LOOP_LENGTH, DEFAULT_BEAT_LENGTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_defaults() {
        let state = PlaybackState::default();
        assert_eq!(state.length(), 384);
        assert_eq!(state.beat_length(), 24);
        assert!(!state.restart_pending());
        assert!(!state.is_shutdown());
    }

    #[test]
    fn test_restart_consumed_once() {
        let state = PlaybackState::new(16, 4);
        assert!(!state.take_restart());

        state.request_restart();
        assert!(state.restart_pending());
        assert!(state.take_restart());
        assert!(!state.take_restart());
        assert!(!state.restart_pending());
    }

    #[test]
    fn test_restart_requests_before_a_cycle_coalesce() {
        let state = PlaybackState::default();
        state.request_restart();
        state.request_restart();
        assert!(state.take_restart());
        assert!(!state.take_restart());
    }

    #[test]
    fn test_restart_across_threads() {
        let state = Arc::new(PlaybackState::default());
        let rounds = 200;

        let producer = {
            let state = state.clone();
            thread::spawn(move || {
                for _ in 0..rounds {
                    state.request_restart();
                    // Wait for the consumer before the next independent request
                    while state.restart_pending() {
                        thread::yield_now();
                    }
                }
                state.request_shutdown();
            })
        };

        let mut resets = 0;
        while !state.is_shutdown() || state.restart_pending() {
            if state.take_restart() {
                resets += 1;
            }
            thread::yield_now();
        }
        producer.join().unwrap();
        assert_eq!(resets, rounds);
    }

    #[test]
    fn test_live_parameter_changes() {
        let state = Arc::new(PlaybackState::default());
        let writer = {
            let state = state.clone();
            thread::spawn(move || {
                state.set_length(64);
                state.set_beat_length(8);
            })
        };
        writer.join().unwrap();
        assert_eq!(state.length(), 64);
        assert_eq!(state.beat_length(), 8);
    }
}

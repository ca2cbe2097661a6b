// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Looper core: recorded tracks, the pattern recorder and the player loop.

pub mod recorder;
pub mod scheduler;
pub mod track;
pub mod voices;

pub use recorder::{CapturePolicy, PatternMode, PatternRecorder, RecorderConfig};
pub use scheduler::{LooperSnapshot, Scheduler, SchedulerConfig, SnapshotRequest};
pub use track::{NoteEntry, Track, TrackStore};
pub use voices::Voices;

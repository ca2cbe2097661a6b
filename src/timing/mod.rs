// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Timing and clock module.
//!
//! Tick clocks for the scheduler, and the playback state shared between the
//! scheduler and control threads.

pub mod clock;
pub mod state;

pub use clock::{tick_interval, Clock, ManualClock, SystemClock, PPQN};
pub use state::PlaybackState;

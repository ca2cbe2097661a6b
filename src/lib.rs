// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Real-time MIDI looper.
//!
//! Hold the record key and play: notes land in a track at the current loop
//! position and are played back every time the loop comes round.

pub mod config;
pub mod engine;
pub mod error;
pub mod keyboard;
pub mod logging;
pub mod midi;
pub mod sequencer;
pub mod timing;

pub use config::LooperConfig;
pub use engine::{spawn_looper, Backends, LooperHandle};
pub use error::{LooperError, Result};

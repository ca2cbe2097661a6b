// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Configuration for the looper.
//!
//! Settings are read from a YAML file. Every section and field has a
//! default, so an empty file (or no file) gives a working looper.

pub mod watcher;

pub use watcher::{apply_reload, validate_config, ConfigEvent, ConfigWatcher};

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::keyboard::KeyMap;
use crate::midi::DeviceSelection;
use crate::sequencer::{RecorderConfig, SchedulerConfig};
use crate::timing::state::{DEFAULT_BEAT_LENGTH, DEFAULT_LOOP_LENGTH};
use crate::timing::{PlaybackState, SystemClock, PPQN};

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LooperConfig {
    pub midi: MidiConfig,
    pub timing: TimingConfig,
    pub recorder: RecorderConfig,
    pub keys: KeyMap,
    pub logging: LoggingConfig,
}

impl LooperConfig {
    /// Load a configuration from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        Self::from_yaml(&contents)
    }

    /// Parse a configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty document parses as null, not as an empty mapping
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml).context("Failed to parse YAML configuration")
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize configuration to YAML")
    }

    pub fn input_selection(&self) -> DeviceSelection {
        self.midi.selection(self.midi.input.clone())
    }

    pub fn output_selection(&self) -> DeviceSelection {
        self.midi.selection(self.midi.output.clone())
    }

    pub fn scheduler(&self) -> SchedulerConfig {
        SchedulerConfig {
            recorder: self.recorder,
            keys: self.keys.clone(),
            cycle_interval: Duration::from_micros(self.timing.cycle_interval_us),
        }
    }

    /// Fresh shared state seeded from the timing section
    pub fn playback_state(&self) -> PlaybackState {
        PlaybackState::new(self.timing.loop_length, self.timing.beat_length)
    }

    pub fn clock(&self) -> SystemClock {
        SystemClock::new(self.timing.tempo, self.timing.ppqn)
    }
}

/// MIDI device selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MidiConfig {
    /// Case-insensitive name filter for the input port
    pub input: Option<String>,
    /// Case-insensitive name filter for the output port
    pub output: Option<String>,
    /// Ports whose name contains this are skipped
    pub exclude: String,
    /// Capacity of each input hand-off queue
    pub queue_capacity: usize,
}

impl Default for MidiConfig {
    fn default() -> Self {
        Self {
            input: None,
            output: None,
            exclude: "Through".to_string(),
            queue_capacity: 1024,
        }
    }
}

impl MidiConfig {
    fn selection(&self, name_filter: Option<String>) -> DeviceSelection {
        DeviceSelection {
            name_filter,
            exclude: self.exclude.clone(),
        }
    }
}

/// Clock rate and loop geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Tempo in BPM
    pub tempo: f64,
    /// Clock ticks per quarter note
    pub ppqn: u32,
    /// Ticks the clock must run ahead before the position moves
    pub beat_length: u64,
    /// Loop length in ticks
    pub loop_length: u64,
    /// Scheduler sleep per cycle, in microseconds
    pub cycle_interval_us: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tempo: 120.0,
            ppqn: PPQN,
            beat_length: DEFAULT_BEAT_LENGTH,
            loop_length: DEFAULT_LOOP_LENGTH,
            cycle_interval_us: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when RUST_LOG is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyboard::codes;
    use crate::sequencer::CapturePolicy;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = LooperConfig::from_yaml("").unwrap();
        assert_eq!(config, LooperConfig::default());
        assert_eq!(config.timing.loop_length, 384);
        assert_eq!(config.timing.beat_length, 24);
        assert_eq!(config.midi.exclude, "Through");
        assert_eq!(config.midi.queue_capacity, 1024);
        assert_eq!(config.keys.record, codes::KEY_F1);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
midi:
  input: "launchkey"
  output: "Synth"
  queue_capacity: 64
timing:
  tempo: 90
  ppqn: 96
  beat_length: 4
  loop_length: 16
  cycle_interval_us: 500
recorder:
  track: 2
  capture: placeholder
  gate: 3
keys:
  record: 57
  panic: 16
  mute_tracks: [2, 3, 4]
logging:
  level: debug
"#;
        let config = LooperConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.midi.input.as_deref(), Some("launchkey"));
        assert_eq!(config.midi.exclude, "Through");
        assert_eq!(config.timing.tempo, 90.0);
        assert_eq!(config.timing.loop_length, 16);
        assert_eq!(config.recorder.track, 2);
        assert_eq!(config.recorder.capture, CapturePolicy::Placeholder);
        assert_eq!(config.keys.record, codes::KEY_SPACE);
        assert_eq!(config.keys.restart, codes::KEY_F2);
        assert_eq!(config.keys.panic, codes::KEY_Q);
        assert_eq!(config.keys.mute_tracks, vec![2, 3, 4]);
        assert_eq!(config.keys.record_tracks.len(), 8);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_partial_section_keeps_defaults() {
        let config = LooperConfig::from_yaml("timing:\n  loop_length: 96\n").unwrap();
        assert_eq!(config.timing.loop_length, 96);
        assert_eq!(config.timing.beat_length, 24);
        assert_eq!(config.timing.tempo, 120.0);
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(LooperConfig::from_yaml("timing: [").is_err());
        assert!(LooperConfig::from_yaml("timing:\n  loop_length: many\n").is_err());
    }

    #[test]
    fn test_derived_settings() {
        let mut config = LooperConfig::default();
        config.midi.input = Some("Keystep".to_string());
        config.timing.cycle_interval_us = 250;

        let input = config.input_selection();
        assert_eq!(input.name_filter.as_deref(), Some("Keystep"));
        assert_eq!(input.exclude, "Through");
        assert_eq!(config.output_selection().name_filter, None);

        let scheduler = config.scheduler();
        assert_eq!(scheduler.cycle_interval, Duration::from_micros(250));
        assert_eq!(scheduler.keys, config.keys);

        let state = config.playback_state();
        assert_eq!(state.length(), 384);
        assert_eq!(state.beat_length(), 24);
    }

    #[test]
    fn test_yaml_roundtrip() {
        let mut config = LooperConfig::default();
        config.recorder.gate = 5;
        let yaml = config.to_yaml().unwrap();
        assert_eq!(LooperConfig::from_yaml(&yaml).unwrap(), config);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("looper.yaml");
        std::fs::write(&path, "timing:\n  tempo: 140\n").unwrap();

        let config = LooperConfig::load(&path).unwrap();
        assert_eq!(config.timing.tempo, 140.0);

        assert!(LooperConfig::load(dir.path().join("missing.yaml")).is_err());
    }
}

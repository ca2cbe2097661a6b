// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Pattern recording.
//!
//! Holding a record key puts the looper in pattern mode; each Note On
//! played meanwhile lands in the target track as a note-on/note-off pair at
//! the current loop position.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use super::track::{NoteEntry, TrackStore};
use crate::keyboard::KeyEvent;
use crate::midi::Event;

/// Whether incoming notes are captured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PatternMode {
    #[default]
    Idle,
    Recording,
}

/// What gets written for a captured Note On
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapturePolicy {
    /// The played note's own channel, pitch and velocity
    #[default]
    Triggering,
    /// A fixed middle C at full velocity on channel 1, whatever was played
    Placeholder,
}

impl CapturePolicy {
    const PLACEHOLDER_CHANNEL: u8 = 1;
    const PLACEHOLDER_NOTE: u8 = 60;
    const PLACEHOLDER_VELOCITY: u8 = 127;

    /// (channel, note, velocity) to record for `event`
    fn capture(&self, event: &Event) -> (u8, u8, u8) {
        match self {
            CapturePolicy::Triggering => (event.channel(), event.data1, event.data2),
            CapturePolicy::Placeholder => (
                Self::PLACEHOLDER_CHANNEL,
                Self::PLACEHOLDER_NOTE,
                Self::PLACEHOLDER_VELOCITY,
            ),
        }
    }
}

/// Recorder settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Track recorded into
    pub track: usize,
    pub capture: CapturePolicy,
    /// Ticks from a recorded note-on to its note-off
    pub gate: u64,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            track: 0,
            capture: CapturePolicy::default(),
            gate: 0,
        }
    }
}

/// Idle/Recording state machine
#[derive(Debug, Default)]
pub struct PatternRecorder {
    mode: PatternMode,
    config: RecorderConfig,
    /// Track the current or last take went into
    target: usize,
}

impl PatternRecorder {
    pub fn new(config: RecorderConfig) -> Self {
        Self {
            mode: PatternMode::Idle,
            target: config.track,
            config,
        }
    }

    pub fn mode(&self) -> PatternMode {
        self.mode
    }

    pub fn is_recording(&self) -> bool {
        self.mode == PatternMode::Recording
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    pub fn target(&self) -> usize {
        self.target
    }

    /// Apply a record-key transition: down records, anything else stops.
    pub fn on_record_key(&mut self, key: &KeyEvent) -> PatternMode {
        self.on_record_key_for(key, self.config.track)
    }

    /// Record-key transition for a key bound to `track`.
    ///
    /// Down switches the take to `track`. A release only stops the take if
    /// it belongs to `track`.
    pub fn on_record_key_for(&mut self, key: &KeyEvent, track: usize) -> PatternMode {
        if key.is_down() {
            if self.mode == PatternMode::Idle {
                info!(track, "start pattern mode");
            }
            self.target = track;
            self.mode = PatternMode::Recording;
        } else if track == self.target {
            if self.mode == PatternMode::Recording {
                info!(track, "end pattern mode");
            }
            self.mode = PatternMode::Idle;
        }
        self.mode
    }

    /// Record `event` at loop `position`. Returns the number of entries added.
    ///
    /// `loop_length` bounds the note-off so it never wraps before its
    /// note-on; 0 means unbounded.
    pub fn on_midi(
        &mut self,
        event: &Event,
        position: u64,
        loop_length: u64,
        tracks: &mut TrackStore,
    ) -> usize {
        if !self.is_recording() {
            return 0;
        }
        debug!(
            status = event.status,
            data1 = event.data1,
            data2 = event.data2,
            position,
            "pattern mode input"
        );

        if event.is_sustain_on() {
            trace!("sustain ignored in pattern mode");
            return 0;
        }
        if !event.is_note_on() {
            return 0;
        }

        let (channel, note, velocity) = self.config.capture.capture(event);
        let off_at = note_off_position(position, self.config.gate, loop_length);

        let track = tracks.get_or_create(self.target);
        track.append(NoteEntry::note_on(position, channel, note, velocity));
        track.append(NoteEntry::note_off(off_at, channel, note));
        2
    }
}

fn note_off_position(on: u64, gate: u64, loop_length: u64) -> u64 {
    let off = on.saturating_add(gate);
    if loop_length == 0 {
        off
    } else {
        off.min(loop_length - 1).max(on)
    }
}

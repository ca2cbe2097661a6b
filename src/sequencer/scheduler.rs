// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Player loop.
//!
//! The scheduler is the only writer of the track store and pattern mode.
//! Each cycle it consumes a pending restart, advances the tick on beat
//! boundaries, emits the notes the loop position has passed, and drains at
//! most one event from each input queue.
//!
//! Sounding notes are tracked so that a restart, a loop length change, a
//! loop wrap, a cleared or muted track, a stop and shutdown all release
//! whatever is still held.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::channel::{Receiver, Sender};
use tracing::{debug, info, trace, warn};

use super::recorder::{PatternMode, PatternRecorder, RecorderConfig};
use super::track::{NoteEntry, TrackStore};
use super::voices::Voices;
use crate::engine::InputQueues;
use crate::keyboard::{KeyAction, KeyEvent, KeyMap};
use crate::midi::Event;
use crate::timing::{Clock, PlaybackState};

/// Configuration for the scheduler
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub recorder: RecorderConfig,
    pub keys: KeyMap,
    /// Sleep between cycles
    pub cycle_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            recorder: RecorderConfig::default(),
            keys: KeyMap::default(),
            cycle_interval: Duration::from_millis(1),
        }
    }
}

/// Read-only copy of the scheduler's state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LooperSnapshot {
    pub mode: PatternMode,
    /// Track the current or last take went into
    pub record_track: usize,
    pub playing: bool,
    pub muted: BTreeSet<usize>,
    pub tick: u64,
    pub length: u64,
    pub beat_length: u64,
    /// Clock resets performed so far
    pub resets: u64,
    /// Notes held on the output
    pub sounding: usize,
    pub tracks: BTreeMap<usize, Vec<NoteEntry>>,
}

/// Requests for a snapshot carry the channel to answer on
pub type SnapshotRequest = Sender<LooperSnapshot>;

pub struct Scheduler<C: Clock> {
    clock: C,
    state: Arc<PlaybackState>,
    tracks: TrackStore,
    recorder: PatternRecorder,
    keys: KeyMap,
    inputs: InputQueues,
    voices: Voices,
    snapshots: Option<Receiver<SnapshotRequest>>,
    cycle_interval: Duration,
    playing: bool,
    muted: BTreeSet<usize>,
    /// Loop length seen on the previous cycle
    length: u64,
    /// Clock value at loop start
    origin: u64,
    /// Position in ticks since `origin`
    tick: u64,
    /// Ticks before this have been emitted
    played_until: u64,
    resets: u64,
}

impl<C: Clock> Scheduler<C> {
    pub fn new(
        clock: C,
        state: Arc<PlaybackState>,
        config: SchedulerConfig,
        inputs: InputQueues,
        output: Sender<Event>,
    ) -> Self {
        let origin = clock.now();
        let length = state.length();
        Self {
            clock,
            state,
            tracks: TrackStore::new(),
            recorder: PatternRecorder::new(config.recorder),
            keys: config.keys,
            inputs,
            voices: Voices::new(output),
            snapshots: None,
            cycle_interval: config.cycle_interval,
            playing: true,
            muted: BTreeSet::new(),
            length,
            origin,
            tick: 0,
            played_until: 0,
            resets: 0,
        }
    }

    /// Start from previously recorded tracks
    pub fn with_tracks(mut self, tracks: TrackStore) -> Self {
        self.tracks = tracks;
        self
    }

    /// Answer snapshot requests arriving on `requests`
    pub fn with_snapshots(mut self, requests: Receiver<SnapshotRequest>) -> Self {
        self.snapshots = Some(requests);
        self
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn mode(&self) -> PatternMode {
        self.recorder.mode()
    }

    pub fn tracks(&self) -> &TrackStore {
        &self.tracks
    }

    pub fn voices(&self) -> &Voices {
        &self.voices
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_muted(&self, track: usize) -> bool {
        self.muted.contains(&track)
    }

    /// Number of clock resets performed
    pub fn resets(&self) -> u64 {
        self.resets
    }

    /// Events lost because the output queue was full or closed
    pub fn dropped(&self) -> u64 {
        self.voices.dropped()
    }

    pub fn snapshot(&self) -> LooperSnapshot {
        LooperSnapshot {
            mode: self.recorder.mode(),
            record_track: self.recorder.target(),
            playing: self.playing,
            muted: self.muted.clone(),
            tick: self.tick,
            length: self.state.length(),
            beat_length: self.state.beat_length(),
            resets: self.resets,
            sounding: self.voices.len(),
            tracks: self.tracks.snapshot(),
        }
    }

    /// Run cycles until shutdown is requested, then release held notes
    pub fn run(mut self) {
        info!("player started");
        while !self.state.is_shutdown() {
            self.run_cycle();
            thread::sleep(self.cycle_interval);
        }
        let released = self.voices.silence_all();
        info!(
            resets = self.resets,
            dropped = self.voices.dropped(),
            released,
            "player stopped"
        );
    }

    /// One pass of the player loop. Never blocks.
    pub fn run_cycle(&mut self) {
        if self.state.take_restart() {
            self.restart();
        }

        let length = self.state.length();
        let beat_length = self.state.beat_length();

        if length != self.length {
            let released = self.voices.silence_all();
            debug!(from = self.length, to = length, released, "loop length changed");
            self.length = length;
        }

        if self.playing {
            let elapsed = self.clock.now().saturating_sub(self.origin);
            if elapsed.saturating_sub(self.tick) > beat_length {
                self.tick = elapsed;
                trace!(tick = self.tick, "beat");
            }
            self.emit_due(length);
        }

        if let Ok(event) = self.inputs.midi.try_recv() {
            self.route_midi(event, length);
        }
        if let Ok(key) = self.inputs.keys.try_recv() {
            self.route_key(key);
        }

        self.serve_snapshot();
    }

    fn restart(&mut self) {
        self.voices.silence_all();
        self.origin = self.clock.now();
        self.tick = 0;
        self.played_until = 0;
        self.resets += 1;
        info!(resets = self.resets, "loop restarted");
    }

    /// Loop position of the current tick
    fn position(&self, length: u64) -> u64 {
        if length == 0 {
            self.tick
        } else {
            self.tick % length
        }
    }

    /// Queue every entry between the last emitted tick and the current one
    fn emit_due(&mut self, length: u64) {
        let from = self.played_until;
        let to = self.tick + 1;
        if to <= from {
            return;
        }
        self.played_until = to;
        if length == 0 {
            return;
        }

        let dropped_before = self.voices.dropped();
        for (lo, hi) in loop_segments(from, to, length).into_iter().flatten() {
            for (index, track) in self.tracks.iter() {
                if self.muted.contains(&index) {
                    continue;
                }
                for entry in track.window(lo, hi) {
                    self.voices.play(index, entry);
                }
            }
            if hi == length {
                // Nothing recorded outlives the loop
                let released = self.voices.silence_all();
                if released > 0 {
                    debug!(released, "notes cut at loop end");
                }
            }
        }

        let dropped = self.voices.dropped() - dropped_before;
        if dropped > 0 {
            warn!(dropped, "output queue unavailable, events dropped");
        }
    }

    fn route_midi(&mut self, event: Event, length: u64) {
        if !self.recorder.is_recording() {
            trace!(status = event.status, "MIDI in while idle");
            return;
        }
        let position = self.position(length);
        self.recorder
            .on_midi(&event, position, length, &mut self.tracks);
    }

    fn route_key(&mut self, key: KeyEvent) {
        debug!(code = key.code, value = key.value, "keyboard");
        match self.keys.action(key.code) {
            Some(KeyAction::Record) => {
                self.recorder.on_record_key(&key);
            }
            Some(KeyAction::RecordTrack(track)) => self.record_take(&key, track),
            Some(_) if !key.is_down() => {}
            Some(KeyAction::Mute(track)) => self.toggle_mute(track),
            Some(KeyAction::Play) => self.toggle_play(),
            Some(KeyAction::Panic) => self.voices.panic(),
            Some(KeyAction::Restart) => self.state.request_restart(),
            Some(KeyAction::Clear) => {
                let track = self.recorder.target();
                self.voices.silence_track(track);
                if self.tracks.clear(track) {
                    info!(track, "track cleared");
                }
            }
            Some(KeyAction::Quit) => {
                info!("quit requested");
                self.state.request_shutdown();
            }
            None => {
                if key.is_down() {
                    info!(code = key.code, "keyboard not handled");
                }
            }
        }
    }

    /// A track's record key: a new take replaces what the track held
    fn record_take(&mut self, key: &KeyEvent, track: usize) {
        let fresh = key.is_down()
            && !(self.recorder.is_recording() && self.recorder.target() == track);
        if fresh {
            self.voices.silence_track(track);
            self.tracks.clear(track);
            info!(track, "new take");
        }
        self.recorder.on_record_key_for(key, track);
    }

    fn toggle_mute(&mut self, track: usize) {
        if self.muted.remove(&track) {
            info!(track, "track unmuted");
        } else {
            self.muted.insert(track);
            let released = self.voices.silence_track(track);
            info!(track, released, "track muted");
        }
    }

    fn toggle_play(&mut self) {
        if self.playing {
            self.playing = false;
            let released = self.voices.silence_all();
            info!(released, "playback stopped");
        } else {
            self.playing = true;
            self.state.request_restart();
            info!("playback started");
        }
    }

    fn serve_snapshot(&self) {
        if let Some(requests) = &self.snapshots {
            if let Ok(reply) = requests.try_recv() {
                let _ = reply.send(self.snapshot());
            }
        }
    }
}

/// Split the tick range `[from, to)` into at most two ranges of loop
/// positions. More than one loop's worth is cut to a single loop.
fn loop_segments(from: u64, to: u64, length: u64) -> [Option<(u64, u64)>; 2] {
    let span = (to - from).min(length);
    let start = from % length;
    if start + span <= length {
        [Some((start, start + span)), None]
    } else {
        [Some((start, length)), Some((0, start + span - length))]
    }
}

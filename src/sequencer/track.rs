// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Recorded tracks and the keyed store that owns them.
//!
//! A track is a list of note entries kept in timestamp order. Tracks are
//! created on first reference and only the scheduler thread writes to them.

use std::collections::BTreeMap;

use tracing::debug;

use crate::midi::Event;

/// A note-on or note-off at an offset within the loop.
///
/// A velocity of 0 marks the entry as a note-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteEntry {
    /// Ticks since loop start
    pub timestamp: u64,
    /// MIDI channel (0-15)
    pub channel: u8,
    /// Note number (0-127)
    pub note: u8,
    /// Velocity (0-127)
    pub velocity: u8,
}

impl NoteEntry {
    pub fn note_on(timestamp: u64, channel: u8, note: u8, velocity: u8) -> Self {
        Self {
            timestamp,
            channel,
            note,
            velocity,
        }
    }

    pub fn note_off(timestamp: u64, channel: u8, note: u8) -> Self {
        Self::note_on(timestamp, channel, note, 0)
    }

    pub fn is_note_off(&self) -> bool {
        self.velocity == 0
    }

    /// The MIDI event emitted when playback reaches this entry
    pub fn to_event(&self) -> Event {
        if self.is_note_off() {
            Event::note_off(self.channel, self.note)
        } else {
            Event::note_on(self.channel, self.note, self.velocity)
        }
    }
}

/// Ordered sequence of note entries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Track {
    notes: Vec<NoteEntry>,
}

impl Track {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry, keeping timestamp order.
    ///
    /// Entries sharing a timestamp stay in insertion order.
    pub fn append(&mut self, entry: NoteEntry) {
        debug!(
            timestamp = entry.timestamp,
            note = entry.note,
            velocity = entry.velocity,
            "track add note"
        );
        match self.notes.last() {
            Some(last) if last.timestamp > entry.timestamp => {
                let at = self.notes.partition_point(|n| n.timestamp <= entry.timestamp);
                self.notes.insert(at, entry);
            }
            _ => self.notes.push(entry),
        }
    }

    pub fn notes(&self) -> &[NoteEntry] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn clear(&mut self) {
        self.notes.clear();
    }

    /// Entries with `from <= timestamp < to`
    pub fn window(&self, from: u64, to: u64) -> &[NoteEntry] {
        if from >= to {
            return &[];
        }
        let start = self.notes.partition_point(|n| n.timestamp < from);
        let end = self.notes.partition_point(|n| n.timestamp < to);
        &self.notes[start..end]
    }
}

/// Tracks keyed by index, created on demand
#[derive(Debug, Default)]
pub struct TrackStore {
    // Boxed so a track keeps its address while the map grows
    tracks: BTreeMap<usize, Box<Track>>,
}

impl TrackStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Existing track at `index`, or a new empty one stored there
    pub fn get_or_create(&mut self, index: usize) -> &mut Track {
        self.tracks.entry(index).or_default()
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(&index).map(|t| t.as_ref())
    }

    /// Append to the track at `index`, creating it if needed
    pub fn append(&mut self, index: usize, entry: NoteEntry) {
        self.get_or_create(index).append(entry);
    }

    /// Empty the track at `index`. Returns false if it never existed.
    pub fn clear(&mut self, index: usize) -> bool {
        match self.tracks.get_mut(&index) {
            Some(track) => {
                track.clear();
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &Track)> {
        self.tracks.iter().map(|(i, t)| (*i, t.as_ref()))
    }

    /// Number of tracks created so far
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Copy of every track's entries
    pub fn snapshot(&self) -> BTreeMap<usize, Vec<NoteEntry>> {
        self.tracks
            .iter()
            .map(|(i, t)| (*i, t.notes().to_vec()))
            .collect()
    }
}

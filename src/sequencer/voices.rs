// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Sounding-note bookkeeping.
//!
//! Every note-on the player sends is remembered until its note-off goes
//! out, so a track can be silenced at any time and a note-off is never
//! sent for a note that is not sounding.

use std::collections::BTreeSet;

use crossbeam::channel::{Sender, TrySendError};
use tracing::{debug, info, trace};

use super::track::NoteEntry;
use crate::midi::{messages, Event};

const CHANNELS: u8 = 16;

/// Notes currently held on the output, keyed by (track, channel, note)
pub struct Voices {
    output: Sender<Event>,
    sounding: BTreeSet<(usize, u8, u8)>,
    dropped: u64,
}

impl Voices {
    pub fn new(output: Sender<Event>) -> Self {
        Self {
            output,
            sounding: BTreeSet::new(),
            dropped: 0,
        }
    }

    /// Send a track entry. A note-off for a note that is not sounding is
    /// skipped. Returns whether anything was queued.
    pub fn play(&mut self, track: usize, entry: &NoteEntry) -> bool {
        let key = (track, entry.channel, entry.note);
        if entry.is_note_off() {
            if !self.sounding.contains(&key) {
                trace!(track, note = entry.note, "note-off without note-on skipped");
                return false;
            }
            if self.send(entry.to_event()) {
                self.sounding.remove(&key);
                return true;
            }
            false
        } else if self.send(entry.to_event()) {
            self.sounding.insert(key);
            true
        } else {
            false
        }
    }

    /// Send a note-off for every note `track` holds
    pub fn silence_track(&mut self, track: usize) -> usize {
        let held: Vec<_> = self
            .sounding
            .range((track, 0, 0)..=(track, u8::MAX, u8::MAX))
            .copied()
            .collect();
        self.release(held)
    }

    /// Send a note-off for every sounding note
    pub fn silence_all(&mut self) -> usize {
        let held: Vec<_> = self.sounding.iter().copied().collect();
        self.release(held)
    }

    /// Silence everything, then All Sound Off and Reset All Controllers on
    /// every channel
    pub fn panic(&mut self) {
        let released = self.silence_all();
        // Whatever is left could not be sent; the controllers cover it
        self.sounding.clear();
        for channel in 0..CHANNELS {
            self.send(Event::control_change(channel, messages::CC_ALL_SOUND_OFF, 0));
            self.send(Event::control_change(
                channel,
                messages::CC_RESET_ALL_CONTROLLERS,
                0,
            ));
        }
        info!(released, "panic");
    }

    pub fn is_sounding(&self, track: usize, channel: u8, note: u8) -> bool {
        self.sounding.contains(&(track, channel, note))
    }

    /// Number of sounding notes
    pub fn len(&self) -> usize {
        self.sounding.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sounding.is_empty()
    }

    /// Events lost because the output queue was full or closed
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    fn release(&mut self, held: Vec<(usize, u8, u8)>) -> usize {
        let mut released = 0;
        for key in held {
            let (track, channel, note) = key;
            if self.send(Event::note_off(channel, note)) {
                self.sounding.remove(&key);
                released += 1;
            } else {
                debug!(track, channel, note, "note-off not sent, still sounding");
            }
        }
        released
    }

    fn send(&mut self, event: Event) -> bool {
        match self.output.try_send(event) {
            Ok(()) => true,
            Err(e) => {
                if let TrySendError::Disconnected(_) = e {
                    trace!("output queue closed");
                }
                self.dropped += 1;
                false
            }
        }
    }
}

// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Raw MIDI event value type.

use super::messages;

/// A single MIDI message: status byte plus two data bytes.
///
/// The status high nibble is the message kind and the low nibble the
/// channel. Messages shorter than three bytes carry zero in the unused
/// data fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Event {
    pub status: u8,
    pub data1: u8,
    pub data2: u8,
}

impl Event {
    pub const fn new(status: u8, data1: u8, data2: u8) -> Self {
        Self {
            status,
            data1,
            data2,
        }
    }

    /// Note On on `channel` (0-15)
    pub fn note_on(channel: u8, note: u8, velocity: u8) -> Self {
        Self::new(messages::NOTE_ON | (channel & 0x0F), note, velocity)
    }

    /// Note Off on `channel` (0-15)
    pub fn note_off(channel: u8, note: u8) -> Self {
        Self::new(messages::NOTE_OFF | (channel & 0x0F), note, 0)
    }

    /// Control Change on `channel` (0-15)
    pub fn control_change(channel: u8, controller: u8, value: u8) -> Self {
        Self::new(messages::CONTROL_CHANGE | (channel & 0x0F), controller, value)
    }

    /// Build an event from raw bytes as delivered by a MIDI driver
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        let (&status, rest) = data.split_first()?;
        let data1 = rest.first().copied().unwrap_or(0);
        let data2 = rest.get(1).copied().unwrap_or(0);
        Some(Self::new(status, data1, data2))
    }

    /// Message kind (status high nibble)
    pub fn status_class(&self) -> u8 {
        self.status & 0xF0
    }

    /// Channel (status low nibble)
    pub fn channel(&self) -> u8 {
        self.status & 0x0F
    }

    /// Note On with a non-zero velocity
    pub fn is_note_on(&self) -> bool {
        self.status_class() == messages::NOTE_ON && self.data2 != 0
    }

    /// Realtime clock tick (0xF8)
    pub fn is_timing_clock(&self) -> bool {
        self.status == messages::TIMING_CLOCK
    }

    /// Sustain pedal fully down on channel 0
    pub fn is_sustain_on(&self) -> bool {
        self.status_class() == messages::CONTROL_CHANGE
            && self.channel() == 0
            && self.data1 == messages::CC_SUSTAIN
            && self.data2 == 127
    }

    /// Number of bytes this message occupies on the wire
    pub fn wire_len(&self) -> usize {
        if self.status >= 0xF8 {
            return 1;
        }
        match self.status_class() {
            messages::PROGRAM_CHANGE | messages::CHANNEL_AFTERTOUCH => 2,
            _ => 3,
        }
    }

    /// Wire bytes; only the first `wire_len()` are meaningful
    pub fn to_bytes(&self) -> [u8; 3] {
        [self.status, self.data1, self.data2]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_and_channel() {
        let ev = Event::new(0x93, 60, 100);
        assert_eq!(ev.status_class(), messages::NOTE_ON);
        assert_eq!(ev.channel(), 3);

        let ev = Event::new(0xBF, 64, 127);
        assert_eq!(ev.status_class(), messages::CONTROL_CHANGE);
        assert_eq!(ev.channel(), 15);
    }

    #[test]
    fn test_note_on_velocity_zero_is_not_note_on() {
        assert!(Event::new(0x90, 60, 100).is_note_on());
        assert!(!Event::new(0x90, 60, 0).is_note_on());
        assert!(!Event::new(0x80, 60, 64).is_note_on());
    }

    #[test]
    fn test_sustain_detection() {
        assert!(Event::control_change(0, 64, 127).is_sustain_on());
        assert!(!Event::control_change(1, 64, 127).is_sustain_on());
        assert!(!Event::control_change(0, 64, 0).is_sustain_on());
        assert!(!Event::control_change(0, 1, 127).is_sustain_on());
    }

    #[test]
    fn test_from_bytes() {
        assert_eq!(Event::from_bytes(&[]), None);
        assert_eq!(Event::from_bytes(&[0xF8]), Some(Event::new(0xF8, 0, 0)));
        assert_eq!(Event::from_bytes(&[0xC2, 5]), Some(Event::new(0xC2, 5, 0)));
        assert_eq!(
            Event::from_bytes(&[0x90, 60, 100]),
            Some(Event::note_on(0, 60, 100))
        );
    }

    #[test]
    fn test_wire_len() {
        assert_eq!(Event::note_on(0, 60, 100).wire_len(), 3);
        assert_eq!(Event::new(0xC0, 5, 0).wire_len(), 2);
        assert_eq!(Event::new(0xD4, 90, 0).wire_len(), 2);
        assert_eq!(Event::new(messages::TIMING_CLOCK, 0, 0).wire_len(), 1);
    }

    #[test]
    fn test_constructors_mask_channel() {
        assert_eq!(Event::note_on(17, 60, 1).status, 0x91);
        assert_eq!(Event::note_off(2, 64), Event::new(0x82, 64, 0));
    }
}

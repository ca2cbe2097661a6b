// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! MIDI I/O abstraction layer.
//!
//! The engine talks to MIDI hardware only through the traits in this module,
//! so that the midir backend and in-memory test backends are
//! interchangeable.

pub mod event;
pub mod midir_backend;

use std::time::Duration;

use crate::error::{Direction, LooperError, Result};

pub use event::Event;
pub use midir_backend::{list_destinations, list_sources, MidirInput, MidirOutput};

/// A MIDI port as reported by a backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    /// Position in the backend's port list
    pub index: usize,
    /// Display name
    pub name: String,
    pub supports_input: bool,
    pub supports_output: bool,
}

impl DeviceDescriptor {
    pub fn input(index: usize, name: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
            supports_input: true,
            supports_output: false,
        }
    }

    pub fn output(index: usize, name: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
            supports_input: false,
            supports_output: true,
        }
    }

    fn supports(&self, direction: Direction) -> bool {
        match direction {
            Direction::Input => self.supports_input,
            Direction::Output => self.supports_output,
        }
    }
}

/// Device selection rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSelection {
    /// Only consider devices whose name contains this (case-insensitive)
    pub name_filter: Option<String>,
    /// Skip devices whose name contains this substring
    pub exclude: String,
}

impl Default for DeviceSelection {
    fn default() -> Self {
        Self {
            name_filter: None,
            exclude: "Through".to_string(),
        }
    }
}

/// Pick the first device capable of `direction` that passes `selection`.
pub fn select_device(
    devices: &[DeviceDescriptor],
    direction: Direction,
    selection: &DeviceSelection,
) -> Result<DeviceDescriptor> {
    let wanted = selection.name_filter.as_ref().map(|n| n.to_lowercase());
    devices
        .iter()
        .filter(|d| d.supports(direction))
        .filter(|d| selection.exclude.is_empty() || !d.name.contains(&selection.exclude))
        .find(|d| match &wanted {
            Some(w) => d.name.to_lowercase().contains(w),
            None => true,
        })
        .cloned()
        .ok_or(LooperError::DeviceNotFound { direction })
}

/// Source of incoming MIDI events (a driver before a port is opened)
pub trait MidiInputSink {
    type Stream: MidiInputStream;

    fn enumerate(&self) -> Vec<DeviceDescriptor>;

    fn open(self, device: &DeviceDescriptor) -> Result<Self::Stream>;
}

/// An open MIDI input port
pub trait MidiInputStream {
    /// Wait up to `timeout` for the next event.
    ///
    /// `Ok(None)` means nothing arrived in time; `Err` means the port is gone.
    fn next_event(&mut self, timeout: Duration) -> Result<Option<Event>>;
}

/// Destination for outgoing MIDI events (a driver before a port is opened)
pub trait MidiOutputSink {
    type Port: MidiOutput;

    fn enumerate(&self) -> Vec<DeviceDescriptor>;

    fn open(self, device: &DeviceDescriptor) -> Result<Self::Port>;
}

/// An open MIDI output port
pub trait MidiOutput {
    /// Write one event immediately
    fn write(&mut self, event: &Event) -> Result<()>;
}

/// MIDI message constants
pub mod messages {
    // Channel Voice Messages (upper nibble, lower nibble is channel 0-15)
    pub const NOTE_OFF: u8 = 0x80;
    pub const NOTE_ON: u8 = 0x90;
    pub const POLY_AFTERTOUCH: u8 = 0xA0;
    pub const CONTROL_CHANGE: u8 = 0xB0;
    pub const PROGRAM_CHANGE: u8 = 0xC0;
    pub const CHANNEL_AFTERTOUCH: u8 = 0xD0;
    pub const PITCH_BEND: u8 = 0xE0;

    // System Real-Time Messages
    pub const TIMING_CLOCK: u8 = 0xF8;
    pub const START: u8 = 0xFA;
    pub const CONTINUE: u8 = 0xFB;
    pub const STOP: u8 = 0xFC;

    // Controllers
    pub const CC_SUSTAIN: u8 = 64;
    pub const CC_ALL_SOUND_OFF: u8 = 120;
    pub const CC_RESET_ALL_CONTROLLERS: u8 = 121;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn devices() -> Vec<DeviceDescriptor> {
        vec![
            DeviceDescriptor::input(0, "Midi Through Port-0"),
            DeviceDescriptor::output(1, "Midi Through Port-0"),
            DeviceDescriptor::input(2, "Launchkey Mini MIDI 1"),
            DeviceDescriptor::output(3, "Launchkey Mini MIDI 1"),
            DeviceDescriptor::output(4, "Volca Keys"),
        ]
    }

    #[test]
    fn test_select_skips_through() {
        let dev = select_device(&devices(), Direction::Input, &DeviceSelection::default()).unwrap();
        assert_eq!(dev.index, 2);

        let dev = select_device(&devices(), Direction::Output, &DeviceSelection::default()).unwrap();
        assert_eq!(dev.index, 3);
    }

    #[test]
    fn test_select_by_name() {
        let selection = DeviceSelection {
            name_filter: Some("volca".to_string()),
            ..Default::default()
        };
        let dev = select_device(&devices(), Direction::Output, &selection).unwrap();
        assert_eq!(dev.name, "Volca Keys");

        let err = select_device(&devices(), Direction::Input, &selection).unwrap_err();
        assert!(matches!(
            err,
            LooperError::DeviceNotFound {
                direction: Direction::Input
            }
        ));
    }

    #[test]
    fn test_select_only_through_available() {
        let only_through = vec![DeviceDescriptor::input(0, "Midi Through Port-0")];
        let result = select_device(&only_through, Direction::Input, &DeviceSelection::default());
        assert!(result.is_err());

        let result = select_device(&[], Direction::Output, &DeviceSelection::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_midi_message_constants() {
        assert_eq!(messages::NOTE_ON, 0x90);
        assert_eq!(messages::NOTE_OFF, 0x80);
        assert_eq!(messages::TIMING_CLOCK, 248);
        assert_eq!(messages::CC_SUSTAIN, 64);
    }
}

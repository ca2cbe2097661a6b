// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Engine error taxonomy.

use std::fmt;

use thiserror::Error;

/// Which side of the MIDI transport a device serves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Input => write!(f, "input"),
            Direction::Output => write!(f, "output"),
        }
    }
}

/// Errors raised by the looper engine and its device collaborators
#[derive(Debug, Error)]
pub enum LooperError {
    /// No suitable MIDI device was enumerated
    #[error("no MIDI {direction} device connected")]
    DeviceNotFound { direction: Direction },

    /// An enumerated MIDI device could not be opened
    #[error("failed to open device '{name}': {reason}")]
    DeviceOpen { name: String, reason: String },

    /// The keyboard device list could not be obtained
    #[error("keyboard enumeration failed: {0}")]
    KeyboardEnumeration(String),

    /// The keyboard was found but could not be put into key-event mode
    #[error("failed to open keyboard: {0}")]
    KeyboardOpen(String),

    /// Writing to or reading from an open device failed
    #[error("device I/O failed: {0}")]
    Io(String),

    /// The other end of an engine channel went away
    #[error("{0} disconnected")]
    Disconnected(&'static str),
}

pub type Result<T> = std::result::Result<T, LooperError>;

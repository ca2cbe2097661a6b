// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Computer keyboard as a control surface.
//!
//! Key events use Linux input key codes and values (1 = down, 0 = up,
//! 2 = auto-repeat) whatever the backend, so bindings stay portable.

pub mod terminal;

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use terminal::TerminalKeyboard;

/// Linux input key codes for the keys the looper binds
pub mod codes {
    pub const KEY_ESC: u16 = 1;
    pub const KEY_1: u16 = 2;
    pub const KEY_0: u16 = 11;
    pub const KEY_Q: u16 = 16;
    pub const KEY_A: u16 = 30;
    pub const KEY_S: u16 = 31;
    pub const KEY_K: u16 = 37;
    pub const KEY_Z: u16 = 44;
    pub const KEY_X: u16 = 45;
    pub const KEY_COMMA: u16 = 51;
    pub const KEY_ENTER: u16 = 28;
    pub const KEY_SPACE: u16 = 57;
    pub const KEY_F1: u16 = 59;
    pub const KEY_F2: u16 = 60;
    pub const KEY_F3: u16 = 61;
    pub const KEY_F4: u16 = 62;
    pub const KEY_F10: u16 = 68;
    pub const KEY_F11: u16 = 87;
    pub const KEY_F12: u16 = 88;
}

/// A key transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub code: u16,
    pub value: i32,
}

impl KeyEvent {
    pub const UP: i32 = 0;
    pub const DOWN: i32 = 1;
    pub const REPEAT: i32 = 2;

    pub fn down(code: u16) -> Self {
        Self {
            code,
            value: Self::DOWN,
        }
    }

    pub fn up(code: u16) -> Self {
        Self {
            code,
            value: Self::UP,
        }
    }

    pub fn is_down(&self) -> bool {
        self.value == Self::DOWN
    }

    pub fn is_repeat(&self) -> bool {
        self.value == Self::REPEAT
    }
}

/// A keyboard driver before a device is opened
pub trait KeyboardDevice {
    type Stream: KeyStream;

    /// Names of the available keyboards
    fn enumerate(&self) -> Result<Vec<String>>;

    fn open(self, device: &str) -> Result<Self::Stream>;
}

/// An open keyboard
pub trait KeyStream {
    /// Wait up to `timeout` for the next key event.
    fn next_key(&mut self, timeout: Duration) -> Result<Option<KeyEvent>>;
}

/// What a bound key does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Hold to overdub into the configured record track
    Record,
    /// Hold to record a fresh take into the given track
    RecordTrack(usize),
    /// Toggle a track's mute
    Mute(usize),
    /// Start or stop playback
    Play,
    /// Silence every channel and reset controllers
    Panic,
    /// Restart the loop from tick 0
    Restart,
    /// Clear the recorded track
    Clear,
    /// Stop the looper
    Quit,
}

/// Key code bindings.
///
/// `record_tracks[i]` and `mute_tracks[i]` act on track index `i`. The
/// defaults are the bottom and home rows, left to right.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyMap {
    pub record: u16,
    pub restart: u16,
    pub clear: u16,
    pub play: u16,
    pub panic: u16,
    pub quit: u16,
    pub record_tracks: Vec<u16>,
    pub mute_tracks: Vec<u16>,
}

impl Default for KeyMap {
    fn default() -> Self {
        Self {
            record: codes::KEY_F1,
            restart: codes::KEY_F2,
            clear: codes::KEY_F3,
            play: codes::KEY_SPACE,
            panic: codes::KEY_ESC,
            quit: codes::KEY_F10,
            record_tracks: (codes::KEY_Z..=codes::KEY_COMMA).collect(),
            mute_tracks: (codes::KEY_A..=codes::KEY_K).collect(),
        }
    }
}

impl KeyMap {
    /// Keys whose release matters: the record keys
    pub fn hold_keys(&self) -> Vec<u16> {
        let mut keys = vec![self.record];
        keys.extend(&self.record_tracks);
        keys
    }

    /// Look up the action bound to `code`
    pub fn action(&self, code: u16) -> Option<KeyAction> {
        // Record first so an overlapping binding still records
        let fixed = [
            (self.record, KeyAction::Record),
            (self.restart, KeyAction::Restart),
            (self.clear, KeyAction::Clear),
            (self.play, KeyAction::Play),
            (self.panic, KeyAction::Panic),
            (self.quit, KeyAction::Quit),
        ];
        if let Some((_, action)) = fixed.iter().find(|(bound, _)| *bound == code) {
            return Some(*action);
        }
        if let Some(i) = self.record_tracks.iter().position(|&k| k == code) {
            return Some(KeyAction::RecordTrack(i));
        }
        self.mute_tracks
            .iter()
            .position(|&k| k == code)
            .map(KeyAction::Mute)
    }
}

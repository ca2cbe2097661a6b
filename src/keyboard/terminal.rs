// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Terminal keyboard backend on crossterm.
//!
//! Puts the terminal in raw mode and asks for key release reporting. On
//! terminals without the keyboard enhancement protocol only presses arrive,
//! so for hold keys a second press is reported as the release and every
//! other key is a plain press.

use std::collections::HashSet;
use std::io;
use std::time::Duration;

use crossterm::event::{
    self, KeyCode, KeyEventKind, KeyModifiers, KeyboardEnhancementFlags,
    PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use crossterm::terminal;
use crossterm::tty::IsTty;
use tracing::{debug, warn};

use super::{codes, KeyEvent, KeyStream, KeyboardDevice};
use crate::error::{LooperError, Result};

const DEVICE_NAME: &str = "terminal";

/// The controlling terminal's keyboard
#[derive(Debug, Default)]
pub struct TerminalKeyboard {
    hold_keys: HashSet<u16>,
}

impl TerminalKeyboard {
    /// `hold_keys` latch on press when releases are not reported
    pub fn new<I: IntoIterator<Item = u16>>(hold_keys: I) -> Self {
        Self {
            hold_keys: hold_keys.into_iter().collect(),
        }
    }
}

/// Raw-mode terminal key reader; restores the terminal on drop
pub struct TerminalKeyStream {
    enhanced: bool,
    hold_keys: HashSet<u16>,
    held: HashSet<u16>,
}

impl KeyboardDevice for TerminalKeyboard {
    type Stream = TerminalKeyStream;

    fn enumerate(&self) -> Result<Vec<String>> {
        if io::stdin().is_tty() {
            Ok(vec![DEVICE_NAME.to_string()])
        } else {
            Err(LooperError::KeyboardEnumeration(
                "stdin is not a terminal".to_string(),
            ))
        }
    }

    fn open(self, device: &str) -> Result<Self::Stream> {
        let open_err = |e: io::Error| LooperError::KeyboardOpen(format!("{}: {}", device, e));

        terminal::enable_raw_mode().map_err(open_err)?;

        let enhanced = matches!(terminal::supports_keyboard_enhancement(), Ok(true));
        if enhanced {
            let pushed = execute!(
                io::stdout(),
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            );
            or_undo(pushed, || {
                let _ = terminal::disable_raw_mode();
            })
            .map_err(open_err)?;
        } else {
            warn!("terminal does not report key releases, hold keys latch on press");
        }

        Ok(TerminalKeyStream {
            enhanced,
            hold_keys: self.hold_keys,
            held: HashSet::new(),
        })
    }
}

/// Pass `result` through, running `undo` first when it failed
fn or_undo<T, F: FnOnce()>(result: io::Result<T>, undo: F) -> io::Result<T> {
    if result.is_err() {
        undo();
    }
    result
}

impl TerminalKeyStream {
    fn translate(&mut self, key: event::KeyEvent) -> Option<KeyEvent> {
        let code = linux_code(key.code, key.modifiers)?;

        let value = if self.enhanced {
            match key.kind {
                KeyEventKind::Press => KeyEvent::DOWN,
                KeyEventKind::Release => KeyEvent::UP,
                KeyEventKind::Repeat => KeyEvent::REPEAT,
            }
        } else if !self.hold_keys.contains(&code) {
            KeyEvent::DOWN
        } else if self.held.remove(&code) {
            KeyEvent::UP
        } else {
            self.held.insert(code);
            KeyEvent::DOWN
        };

        Some(KeyEvent { code, value })
    }
}

impl KeyStream for TerminalKeyStream {
    fn next_key(&mut self, timeout: Duration) -> Result<Option<KeyEvent>> {
        let io_err = |e: io::Error| LooperError::Io(e.to_string());

        if !event::poll(timeout).map_err(io_err)? {
            return Ok(None);
        }

        match event::read().map_err(io_err)? {
            event::Event::Key(key) => {
                let translated = self.translate(key);
                if translated.is_none() {
                    debug!(code = ?key.code, "unmapped terminal key");
                }
                Ok(translated)
            }
            _ => Ok(None),
        }
    }
}

impl Drop for TerminalKeyStream {
    fn drop(&mut self) {
        if self.enhanced {
            let _ = execute!(io::stdout(), PopKeyboardEnhancementFlags);
        }
        let _ = terminal::disable_raw_mode();
    }
}

const TOP_ROW: &str = "qwertyuiop";
const HOME_ROW: &str = "asdfghjkl";
const BOTTOM_ROW: &str = "zxcvbnm,";

/// Map a crossterm key to its Linux input key code.
///
/// Ctrl+C maps to F10, the default quit key, since raw mode swallows the
/// interrupt signal.
fn linux_code(code: KeyCode, modifiers: KeyModifiers) -> Option<u16> {
    match code {
        KeyCode::Esc => Some(codes::KEY_ESC),
        KeyCode::Enter => Some(codes::KEY_ENTER),
        KeyCode::F(n @ 1..=10) => Some(codes::KEY_F1 + n as u16 - 1),
        KeyCode::F(11) => Some(codes::KEY_F11),
        KeyCode::F(12) => Some(codes::KEY_F12),
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => Some(codes::KEY_F10),
        KeyCode::Char(' ') => Some(codes::KEY_SPACE),
        KeyCode::Char('0') => Some(codes::KEY_0),
        KeyCode::Char(c @ '1'..='9') => Some(codes::KEY_1 + (c as u16 - '1' as u16)),
        KeyCode::Char(c) => {
            let c = c.to_ascii_lowercase();
            [
                (TOP_ROW, codes::KEY_Q),
                (HOME_ROW, codes::KEY_A),
                (BOTTOM_ROW, codes::KEY_Z),
            ]
            .iter()
            .find_map(|(row, base)| row.find(c).map(|i| base + i as u16))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, kind: KeyEventKind) -> event::KeyEvent {
        event::KeyEvent::new_with_kind(code, KeyModifiers::NONE, kind)
    }

    #[test]
    fn test_linux_codes() {
        assert_eq!(linux_code(KeyCode::F(1), KeyModifiers::NONE), Some(59));
        assert_eq!(linux_code(KeyCode::F(10), KeyModifiers::NONE), Some(68));
        assert_eq!(linux_code(KeyCode::F(12), KeyModifiers::NONE), Some(88));
        assert_eq!(linux_code(KeyCode::Char('1'), KeyModifiers::NONE), Some(2));
        assert_eq!(linux_code(KeyCode::Char('0'), KeyModifiers::NONE), Some(11));
        assert_eq!(linux_code(KeyCode::Char('r'), KeyModifiers::NONE), Some(19));
        assert_eq!(linux_code(KeyCode::Char('L'), KeyModifiers::SHIFT), Some(38));
        assert_eq!(linux_code(KeyCode::Char('m'), KeyModifiers::NONE), Some(50));
        assert_eq!(
            linux_code(KeyCode::Char(','), KeyModifiers::NONE),
            Some(codes::KEY_COMMA)
        );
        assert_eq!(linux_code(KeyCode::Esc, KeyModifiers::NONE), Some(codes::KEY_ESC));
        assert_eq!(
            linux_code(KeyCode::Char('c'), KeyModifiers::CONTROL),
            Some(codes::KEY_F10)
        );
        assert_eq!(linux_code(KeyCode::Tab, KeyModifiers::NONE), None);
    }

    #[test]
    fn test_enhanced_translation() {
        let mut stream = TerminalKeyStream {
            enhanced: true,
            hold_keys: HashSet::new(),
            held: HashSet::new(),
        };
        let down = stream.translate(key(KeyCode::F(1), KeyEventKind::Press));
        assert_eq!(down, Some(KeyEvent::down(codes::KEY_F1)));
        let repeat = stream.translate(key(KeyCode::F(1), KeyEventKind::Repeat)).unwrap();
        assert!(repeat.is_repeat());
        let up = stream.translate(key(KeyCode::F(1), KeyEventKind::Release));
        assert_eq!(up, Some(KeyEvent::up(codes::KEY_F1)));
    }

    #[test]
    fn test_latched_translation() {
        let keyboard = TerminalKeyboard::new([codes::KEY_F1]);
        let mut stream = TerminalKeyStream {
            enhanced: false,
            hold_keys: keyboard.hold_keys,
            held: HashSet::new(),
        };
        let first = stream.translate(key(KeyCode::F(1), KeyEventKind::Press));
        assert_eq!(first, Some(KeyEvent::down(codes::KEY_F1)));
        let second = stream.translate(key(KeyCode::F(1), KeyEventKind::Press));
        assert_eq!(second, Some(KeyEvent::up(codes::KEY_F1)));

        // Toggle keys act on every press
        for _ in 0..2 {
            let press = stream.translate(key(KeyCode::Char(' '), KeyEventKind::Press));
            assert_eq!(press, Some(KeyEvent::down(codes::KEY_SPACE)));
        }
    }

    #[test]
    fn test_failed_setup_is_undone() {
        let undone = std::cell::Cell::new(false);
        let failed: io::Result<()> = Err(io::Error::new(io::ErrorKind::Other, "no tty"));
        assert!(or_undo(failed, || undone.set(true)).is_err());
        assert!(undone.get());

        let undone = std::cell::Cell::new(false);
        assert!(or_undo(Ok(()), || undone.set(true)).is_ok());
        assert!(!undone.get());
    }
}

// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Input multiplexer.
//!
//! MIDI-in and keyboard each get an ingestion thread that blocks on its
//! device and hands events to the scheduler over a bounded queue. The
//! scheduler polls both queues without blocking.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, Sender};
use tracing::{debug, error, info, warn};

use crate::error::{Direction, LooperError, Result};
use crate::keyboard::{KeyEvent, KeyStream, KeyboardDevice};
use crate::midi::{select_device, DeviceSelection, Event, MidiInputSink, MidiInputStream};
use crate::timing::PlaybackState;

/// How long an ingestion thread blocks before re-checking for shutdown
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Scheduler side of the hand-off queues
#[derive(Debug)]
pub struct InputQueues {
    pub midi: Receiver<Event>,
    pub keys: Receiver<KeyEvent>,
}

/// Producer side of the hand-off queues
#[derive(Debug, Clone)]
pub struct InputSenders {
    pub midi: Sender<Event>,
    pub keys: Sender<KeyEvent>,
}

/// Create both hand-off queues, each holding up to `capacity` events
pub fn input_queues(capacity: usize) -> (InputSenders, InputQueues) {
    let (midi_tx, midi_rx) = channel::bounded(capacity);
    let (keys_tx, keys_rx) = channel::bounded(capacity);
    (
        InputSenders {
            midi: midi_tx,
            keys: keys_tx,
        },
        InputQueues {
            midi: midi_rx,
            keys: keys_rx,
        },
    )
}

fn spawn_named<F>(name: &str, body: F) -> Result<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new()
        .name(name.to_string())
        .spawn(body)
        .map_err(|e| LooperError::Io(format!("failed to spawn {} thread: {}", name, e)))
}

/// Start the MIDI-in ingestion thread.
///
/// The device is selected and opened on the new thread (drivers are built
/// there by `make_sink`); this call waits for the outcome so that a missing
/// or unopenable input device is returned to the caller.
pub fn spawn_midi_in<S, F>(
    make_sink: F,
    selection: DeviceSelection,
    tx: Sender<Event>,
    state: Arc<PlaybackState>,
) -> Result<JoinHandle<()>>
where
    S: MidiInputSink + 'static,
    F: FnOnce() -> Result<S> + Send + 'static,
{
    let (ready_tx, ready_rx) = channel::bounded::<Result<()>>(1);

    let handle = spawn_named("midi-in", move || {
        let stream = match open_midi_in(make_sink, &selection) {
            Ok(stream) => {
                let _ = ready_tx.send(Ok(()));
                stream
            }
            Err(e) => {
                let _ = ready_tx.send(Err(e));
                return;
            }
        };
        midi_in_loop(stream, &tx, &state);
    })?;

    match ready_rx.recv() {
        Ok(Ok(())) => Ok(handle),
        Ok(Err(e)) => {
            let _ = handle.join();
            Err(e)
        }
        Err(_) => {
            let _ = handle.join();
            Err(LooperError::Disconnected("MIDI input thread"))
        }
    }
}

fn open_midi_in<S, F>(make_sink: F, selection: &DeviceSelection) -> Result<S::Stream>
where
    S: MidiInputSink,
    F: FnOnce() -> Result<S>,
{
    let sink = make_sink()?;
    let device = select_device(&sink.enumerate(), Direction::Input, selection)?;
    info!(device = %device.name, "MIDI in");
    sink.open(&device)
}

/// Forward events from `stream` to `tx` until shutdown, dropping clock ticks.
///
/// Returns the number of events forwarded.
pub fn midi_in_loop<St: MidiInputStream>(
    mut stream: St,
    tx: &Sender<Event>,
    state: &PlaybackState,
) -> usize {
    let mut forwarded = 0;
    while !state.is_shutdown() {
        match stream.next_event(POLL_INTERVAL) {
            Ok(Some(event)) if event.is_timing_clock() => {}
            Ok(Some(event)) => {
                if tx.send(event).is_err() {
                    debug!("scheduler gone, stopping MIDI in");
                    break;
                }
                forwarded += 1;
            }
            Ok(None) => {}
            Err(e) => {
                error!(error = %e, "MIDI input failed");
                break;
            }
        }
    }
    forwarded
}

/// Start the keyboard ingestion thread.
///
/// Keyboard failures are not fatal: they are logged and the thread exits,
/// leaving the looper running without keyboard control.
pub fn spawn_keyboard<K, F>(
    make_device: F,
    tx: Sender<KeyEvent>,
    state: Arc<PlaybackState>,
) -> Result<JoinHandle<()>>
where
    K: KeyboardDevice + 'static,
    F: FnOnce() -> Result<K> + Send + 'static,
{
    spawn_named("keyboard", move || match open_keyboard(make_device) {
        Ok(stream) => {
            keyboard_loop(stream, &tx, &state);
        }
        Err(e) => {
            warn!(error = %e, "keyboard unavailable, continuing without keyboard control");
        }
    })
}

fn open_keyboard<K, F>(make_device: F) -> Result<K::Stream>
where
    K: KeyboardDevice,
    F: FnOnce() -> Result<K>,
{
    let device = make_device()?;
    let name = device
        .enumerate()?
        .into_iter()
        .next()
        .ok_or_else(|| LooperError::KeyboardEnumeration("no keyboard found".to_string()))?;
    info!(device = %name, "keyboard");
    device.open(&name)
}

/// Forward key events to `tx` until shutdown, dropping auto-repeats.
///
/// Returns the number of events forwarded.
pub fn keyboard_loop<St: KeyStream>(
    mut stream: St,
    tx: &Sender<KeyEvent>,
    state: &PlaybackState,
) -> usize {
    let mut forwarded = 0;
    while !state.is_shutdown() {
        match stream.next_key(POLL_INTERVAL) {
            Ok(Some(key)) if key.is_repeat() => {}
            Ok(Some(key)) => {
                if tx.send(key).is_err() {
                    debug!("scheduler gone, stopping keyboard");
                    break;
                }
                forwarded += 1;
            }
            Ok(None) => {}
            Err(e) => {
                error!(error = %e, "keyboard input failed");
                break;
            }
        }
    }
    forwarded
}

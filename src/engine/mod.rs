// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Engine wiring.
//!
//! Starts the four looper threads (MIDI-in, keyboard, output dispatcher and
//! scheduler) around one shared `PlaybackState`, and hands back a handle for
//! control and shutdown.

pub mod input;
pub mod output;

pub use input::{
    input_queues, keyboard_loop, midi_in_loop, spawn_keyboard, spawn_midi_in, InputQueues,
    InputSenders, POLL_INTERVAL,
};
pub use output::{dispatch, spawn_output};

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Sender};
use tracing::{info, warn};

use crate::config::LooperConfig;
use crate::error::{LooperError, Result};
use crate::keyboard::KeyboardDevice;
use crate::midi::{MidiInputSink, MidiOutputSink};
use crate::sequencer::{LooperSnapshot, Scheduler, SnapshotRequest};
use crate::timing::{Clock, PlaybackState};

/// Device factories for one looper run.
///
/// Each factory runs on the thread that owns the device.
pub struct Backends<I, O, K> {
    pub midi_in: I,
    pub midi_out: O,
    pub keyboard: K,
}

/// Control surface of a running looper
pub struct LooperHandle {
    state: Arc<PlaybackState>,
    snapshots: Sender<SnapshotRequest>,
    scheduler: Option<JoinHandle<()>>,
    midi_in: Option<JoinHandle<()>>,
    keyboard: Option<JoinHandle<()>>,
    output: Option<JoinHandle<()>>,
}

/// Start the looper.
///
/// MIDI devices are selected and opened before this returns, so a missing
/// or unopenable port comes back as an error and no thread is left behind.
/// A keyboard problem only disables keyboard control.
pub fn spawn_looper<C, SI, SO, KD, I, O, K>(
    config: &LooperConfig,
    clock: C,
    backends: Backends<I, O, K>,
) -> Result<LooperHandle>
where
    C: Clock + Send + 'static,
    SI: MidiInputSink + 'static,
    SO: MidiOutputSink + 'static,
    KD: KeyboardDevice + 'static,
    I: FnOnce() -> Result<SI> + Send + 'static,
    O: FnOnce() -> Result<SO> + Send + 'static,
    K: FnOnce() -> Result<KD> + Send + 'static,
{
    let state = Arc::new(config.playback_state());
    let (senders, queues) = input_queues(config.midi.queue_capacity);
    let (out_tx, out_rx) = channel::bounded(config.midi.queue_capacity);

    let output = spawn_output(backends.midi_out, config.output_selection(), out_rx)?;

    let midi_in = match spawn_midi_in(
        backends.midi_in,
        config.input_selection(),
        senders.midi,
        state.clone(),
    ) {
        Ok(handle) => handle,
        Err(e) => {
            // Dropping the only sender ends the output thread
            drop(out_tx);
            let _ = output.join();
            return Err(e);
        }
    };

    let keyboard = match spawn_keyboard(backends.keyboard, senders.keys, state.clone()) {
        Ok(handle) => handle,
        Err(e) => {
            drop(out_tx);
            abort(&state, vec![midi_in, output]);
            return Err(e);
        }
    };

    let (snap_tx, snap_rx) = channel::bounded(1);
    let scheduler = Scheduler::new(clock, state.clone(), config.scheduler(), queues, out_tx)
        .with_snapshots(snap_rx);
    let scheduler = match thread::Builder::new()
        .name("scheduler".to_string())
        .spawn(move || scheduler.run())
    {
        Ok(handle) => handle,
        Err(e) => {
            abort(&state, vec![midi_in, keyboard, output]);
            return Err(LooperError::Io(format!(
                "failed to spawn scheduler thread: {}",
                e
            )));
        }
    };

    info!(
        loop_length = state.length(),
        beat_length = state.beat_length(),
        "looper running"
    );

    Ok(LooperHandle {
        state,
        snapshots: snap_tx,
        scheduler: Some(scheduler),
        midi_in: Some(midi_in),
        keyboard: Some(keyboard),
        output: Some(output),
    })
}

/// Stop threads started before a failed spawn
fn abort(state: &PlaybackState, handles: Vec<JoinHandle<()>>) {
    state.request_shutdown();
    for handle in handles {
        let _ = handle.join();
    }
}

impl LooperHandle {
    pub fn state(&self) -> &Arc<PlaybackState> {
        &self.state
    }

    pub fn request_restart(&self) {
        self.state.request_restart();
    }

    pub fn set_length(&self, ticks: u64) {
        self.state.set_length(ticks);
    }

    pub fn set_beat_length(&self, ticks: u64) {
        self.state.set_beat_length(ticks);
    }

    /// Ask the scheduler for a copy of its state, waiting at most `timeout`
    pub fn snapshot(&self, timeout: Duration) -> Option<LooperSnapshot> {
        let (reply_tx, reply_rx) = channel::bounded(1);
        self.snapshots.send_timeout(reply_tx, timeout).ok()?;
        reply_rx.recv_timeout(timeout).ok()
    }

    /// Whether the scheduler has stopped (quit key or shutdown)
    pub fn is_finished(&self) -> bool {
        self.scheduler.as_ref().map_or(true, |h| h.is_finished())
    }

    /// Stop every thread and wait for them
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.state.request_shutdown();
        // Scheduler first: it owns the output sender
        for (name, handle) in [
            ("scheduler", self.scheduler.take()),
            ("midi-in", self.midi_in.take()),
            ("keyboard", self.keyboard.take()),
            ("midi-out", self.output.take()),
        ] {
            if let Some(handle) = handle {
                if handle.join().is_err() {
                    warn!(thread = name, "thread panicked");
                }
            }
        }
    }
}

impl Drop for LooperHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Output dispatcher.
//!
//! Writes scheduled events to the MIDI output port on its own thread, in
//! the order they were queued, so a slow port never holds up the clock.

use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver};
use tracing::{debug, info, warn};

use crate::error::{Direction, LooperError, Result};
use crate::midi::{select_device, DeviceSelection, Event, MidiOutput, MidiOutputSink};

/// Start the output thread.
///
/// Like MIDI-in, the device is opened on the new thread and the outcome is
/// returned here. The thread ends once every sender of `rx` is dropped.
pub fn spawn_output<S, F>(
    make_sink: F,
    selection: DeviceSelection,
    rx: Receiver<Event>,
) -> Result<JoinHandle<()>>
where
    S: MidiOutputSink + 'static,
    F: FnOnce() -> Result<S> + Send + 'static,
{
    let (ready_tx, ready_rx) = channel::bounded::<Result<()>>(1);

    let handle = thread::Builder::new()
        .name("midi-out".to_string())
        .spawn(move || {
            let mut port = match open_output(make_sink, &selection) {
                Ok(port) => {
                    let _ = ready_tx.send(Ok(()));
                    port
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            let written = dispatch(&mut port, &rx);
            debug!(written, "output dispatcher finished");
        })
        .map_err(|e| LooperError::Io(format!("failed to spawn midi-out thread: {}", e)))?;

    match ready_rx.recv() {
        Ok(Ok(())) => Ok(handle),
        Ok(Err(e)) => {
            let _ = handle.join();
            Err(e)
        }
        Err(_) => {
            let _ = handle.join();
            Err(LooperError::Disconnected("MIDI output thread"))
        }
    }
}

fn open_output<S, F>(make_sink: F, selection: &DeviceSelection) -> Result<S::Port>
where
    S: MidiOutputSink,
    F: FnOnce() -> Result<S>,
{
    let sink = make_sink()?;
    let device = select_device(&sink.enumerate(), Direction::Output, selection)?;
    info!(device = %device.name, "MIDI out");
    sink.open(&device)
}

/// Write every event from `rx` to `port` in FIFO order until the queue closes.
///
/// Failed writes are logged and skipped. Returns the number written.
pub fn dispatch<P: MidiOutput>(port: &mut P, rx: &Receiver<Event>) -> usize {
    let mut written = 0;
    for event in rx.iter() {
        match port.write(&event) {
            Ok(()) => written += 1,
            Err(e) => warn!(error = %e, status = event.status, "MIDI write failed"),
        }
    }
    written
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::DeviceDescriptor;
    use std::sync::{Arc, Mutex};

    /// Mock MIDI output for testing
    #[derive(Clone, Default)]
    struct MockMidiOutput {
        written: Arc<Mutex<Vec<Event>>>,
        fail_on: Option<u8>,
    }

    impl MidiOutput for MockMidiOutput {
        fn write(&mut self, event: &Event) -> Result<()> {
            if Some(event.data1) == self.fail_on {
                return Err(LooperError::Io("device busy".into()));
            }
            self.written.lock().unwrap().push(*event);
            Ok(())
        }
    }

    impl MidiOutputSink for MockMidiOutput {
        type Port = MockMidiOutput;

        fn enumerate(&self) -> Vec<DeviceDescriptor> {
            vec![
                DeviceDescriptor::output(0, "Midi Through Port-0"),
                DeviceDescriptor::output(1, "Synth"),
            ]
        }

        fn open(self, device: &DeviceDescriptor) -> Result<Self::Port> {
            assert_eq!(device.name, "Synth");
            Ok(self)
        }
    }

    struct Unopenable;

    impl MidiOutputSink for Unopenable {
        type Port = MockMidiOutput;

        fn enumerate(&self) -> Vec<DeviceDescriptor> {
            vec![DeviceDescriptor::output(0, "Synth")]
        }

        fn open(self, device: &DeviceDescriptor) -> Result<Self::Port> {
            Err(LooperError::DeviceOpen {
                name: device.name.clone(),
                reason: "permission denied".into(),
            })
        }
    }

    #[test]
    fn test_dispatch_fifo() {
        let mut port = MockMidiOutput::default();
        let (tx, rx) = channel::unbounded();
        for note in [64, 60, 67, 60] {
            tx.send(Event::note_on(0, note, 100)).unwrap();
        }
        drop(tx);

        assert_eq!(dispatch(&mut port, &rx), 4);
        let notes: Vec<u8> = port.written.lock().unwrap().iter().map(|e| e.data1).collect();
        assert_eq!(notes, vec![64, 60, 67, 60]);
    }

    #[test]
    fn test_dispatch_skips_failed_writes() {
        let mut port = MockMidiOutput {
            fail_on: Some(61),
            ..Default::default()
        };
        let (tx, rx) = channel::unbounded();
        for note in 60..63 {
            tx.send(Event::note_on(0, note, 100)).unwrap();
        }
        drop(tx);

        assert_eq!(dispatch(&mut port, &rx), 2);
    }

    #[test]
    fn test_spawn_output_thread() {
        let sink = MockMidiOutput::default();
        let written = sink.written.clone();
        let (tx, rx) = channel::unbounded();

        let handle = spawn_output(move || Ok(sink), DeviceSelection::default(), rx).unwrap();
        tx.send(Event::note_on(0, 60, 100)).unwrap();
        tx.send(Event::note_off(0, 60)).unwrap();
        drop(tx);
        handle.join().unwrap();

        assert_eq!(
            *written.lock().unwrap(),
            vec![Event::note_on(0, 60, 100), Event::note_off(0, 60)]
        );
    }

    #[test]
    fn test_spawn_output_open_failure() {
        let (_tx, rx) = channel::unbounded();
        let result = spawn_output(|| Ok(Unopenable), DeviceSelection::default(), rx);
        assert!(matches!(result, Err(LooperError::DeviceOpen { .. })));
    }
}

// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Hot reload of the configuration file.
//!
//! Saving the config while the looper runs changes loop and beat length
//! on the next scheduler cycle. Other settings take effect on restart.

use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{info, warn};

use super::LooperConfig;
use crate::timing::PlaybackState;

const DEFAULT_DEBOUNCE_MS: u64 = 500;

/// Events emitted by the config watcher
#[derive(Debug, Clone)]
pub enum ConfigEvent {
    /// File was modified and parsed
    Reloaded(Box<LooperConfig>),
    /// File was modified but failed to load
    Error(String),
}

/// Watches one config file, debouncing bursts of writes
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    events: Receiver<ConfigEvent>,
    path: PathBuf,
}

impl ConfigWatcher {
    /// Watch `path`. Changes are reported once no write has been seen for
    /// `debounce_ms` (500 when `None`).
    pub fn new<P: AsRef<Path>>(path: P, debounce_ms: Option<u64>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let debounce = Duration::from_millis(debounce_ms.unwrap_or(DEFAULT_DEBOUNCE_MS));

        let (event_tx, event_rx) = channel::unbounded();
        let (notify_tx, notify_rx) = channel::unbounded::<Event>();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                if let Ok(event) = res {
                    let _ = notify_tx.send(event);
                }
            },
            Config::default(),
        )
        .map_err(|e| anyhow!("Failed to create file watcher: {}", e))?;

        // Editors often replace the file, so watch its directory
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();
        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|e| anyhow!("Failed to watch path {:?}: {}", dir, e))?;

        let target = path.clone();
        thread::Builder::new()
            .name("config-watch".to_string())
            .spawn(move || debounce_loop(&target, debounce, &notify_rx, &event_tx))
            .map_err(|e| anyhow!("Failed to spawn watcher thread: {}", e))?;

        Ok(Self {
            _watcher: watcher,
            events: event_rx,
            path,
        })
    }

    /// Next pending event, without blocking
    pub fn try_recv(&self) -> Option<ConfigEvent> {
        self.events.try_recv().ok()
    }

    /// All pending events
    pub fn recv_all(&self) -> Vec<ConfigEvent> {
        self.events.try_iter().collect()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<ConfigEvent> {
        self.events.recv_timeout(timeout).ok()
    }

    pub fn watched_path(&self) -> &Path {
        &self.path
    }
}

fn debounce_loop(
    target: &Path,
    debounce: Duration,
    notify_rx: &Receiver<Event>,
    event_tx: &Sender<ConfigEvent>,
) {
    let file_name = target.file_name();
    let mut last_change: Option<Instant> = None;

    loop {
        match notify_rx.recv_timeout(Duration::from_millis(100)) {
            Ok(event) => {
                let relevant = matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
                    && event.paths.iter().any(|p| p.file_name() == file_name);
                if relevant {
                    last_change = Some(Instant::now());
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                if last_change.is_some_and(|t| t.elapsed() >= debounce) {
                    last_change = None;
                    let event = match LooperConfig::load(target) {
                        Ok(config) => ConfigEvent::Reloaded(Box::new(config)),
                        Err(e) => ConfigEvent::Error(format!("Failed to load {:?}: {:#}", target, e)),
                    };
                    if event_tx.send(event).is_err() {
                        break;
                    }
                }
            }
            // Watcher dropped
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

/// Apply a watcher event to the running looper.
///
/// Returns true when new values were stored.
pub fn apply_reload(event: &ConfigEvent, state: &PlaybackState) -> bool {
    match event {
        ConfigEvent::Reloaded(config) => {
            let timing = &config.timing;
            state.set_length(timing.loop_length);
            state.set_beat_length(timing.beat_length);
            info!(
                loop_length = timing.loop_length,
                beat_length = timing.beat_length,
                "configuration reloaded"
            );
            true
        }
        ConfigEvent::Error(message) => {
            warn!(error = %message, "configuration reload failed, keeping current values");
            false
        }
    }
}

/// Load a configuration without applying it
pub fn validate_config<P: AsRef<Path>>(path: P) -> Result<LooperConfig> {
    LooperConfig::load(path)
}

// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tracing::{info, warn};

use looper::config::{apply_reload, ConfigWatcher};
use looper::keyboard::TerminalKeyboard;
use looper::logging;
use looper::midi::{list_destinations, list_sources, MidirInput, MidirOutput};
use looper::{spawn_looper, Backends, LooperConfig};

fn print_usage() {
    println!("looper - MIDI pattern looper");
    println!();
    println!("Usage: looper [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --config <PATH>   Load settings from a YAML file (reloaded on change)");
    println!("  --list-midi       List available MIDI destinations (outputs)");
    println!("  --list-sources    List available MIDI sources (inputs)");
    println!("  --help            Show this help message");
    println!();
    println!("Keys (defaults, set under `keys:` in the config file):");
    println!("  F1                hold to record into the record track");
    println!("  z x c v b n m ,   hold to record a new take on tracks 1-8");
    println!("  a s d f g h j k   mute or unmute tracks 1-8");
    println!("  Space             start or stop playback");
    println!("  F2                restart the loop");
    println!("  F3                clear the last recorded track");
    println!("  Esc               panic: all notes and sound off");
    println!("  F10, Ctrl+C       quit");
}

fn print_ports(title: &str, ports: &[(usize, String)]) {
    println!("{}:", title);
    if ports.is_empty() {
        println!("  (none)");
    }
    for (index, name) in ports {
        println!("  {}: {}", index, name);
    }
}

fn run(config_path: Option<PathBuf>) -> Result<()> {
    let config = match &config_path {
        Some(path) => LooperConfig::load(path)?,
        None => LooperConfig::default(),
    };
    logging::init(&config.logging.level);

    let watcher = match &config_path {
        Some(path) => match ConfigWatcher::new(path, None) {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                warn!(error = %e, "config hot reload disabled");
                None
            }
        },
        None => None,
    };

    let backends = Backends {
        midi_in: MidirInput::new,
        midi_out: MidirOutput::new,
        keyboard: {
            let hold_keys = config.keys.hold_keys();
            move || Ok(TerminalKeyboard::new(hold_keys))
        },
    };
    let looper = spawn_looper(&config, config.clock(), backends).context("Failed to start looper")?;

    while !looper.is_finished() {
        match &watcher {
            Some(watcher) => {
                if let Some(event) = watcher.recv_timeout(Duration::from_millis(100)) {
                    apply_reload(&event, looper.state());
                }
            }
            None => std::thread::sleep(Duration::from_millis(100)),
        }
    }

    looper.shutdown();
    info!("looper stopped");
    Ok(())
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        None => run(None)?,
        Some("--config") => {
            let path = args
                .get(2)
                .ok_or_else(|| anyhow!("--config requires a file path"))?;
            run(Some(PathBuf::from(path)))?;
        }
        Some("--list-midi") => {
            print_ports("MIDI destinations", &list_destinations()?);
        }
        Some("--list-sources") => {
            print_ports("MIDI sources", &list_sources()?);
        }
        Some("--help") | Some("-h") => {
            print_usage();
        }
        Some(other) => {
            eprintln!("Unknown option: {}", other);
            print_usage();
            std::process::exit(1);
        }
    }

    Ok(())
}

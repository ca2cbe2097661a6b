// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Log output.
//!
//! The terminal keyboard runs in raw mode, where a bare `\n` moves down a
//! line without returning to column 0. Log lines go to stderr through
//! [`CrlfWriter`] so they stay left-aligned.

use std::io::{self, Write};

use tracing_subscriber::EnvFilter;

/// Writer that turns every `\n` into `\r\n`
#[derive(Debug)]
pub struct CrlfWriter<W> {
    inner: W,
}

impl<W: Write> CrlfWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for CrlfWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for line in buf.split_inclusive(|&b| b == b'\n') {
            match line.split_last() {
                Some((&b'\n', text)) => {
                    self.inner.write_all(text)?;
                    self.inner.write_all(b"\r\n")?;
                }
                _ => self.inner.write_all(line)?,
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Stderr with raw-mode line endings
pub fn stderr() -> CrlfWriter<io::Stderr> {
    CrlfWriter::new(io::stderr())
}

/// Install the global subscriber. `RUST_LOG` overrides `level`.
pub fn init(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(stderr)
        .init();
}

//! Tracing setup.
//!
//! Text and JSON modes log to stderr. The TUI owns the terminal, so it only
//! logs when a log file is given.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub enum LogSink<'a> {
    Stderr,
    File(&'a Path),
    Disabled,
}

pub fn init_tracing(sink: LogSink<'_>, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let registry = tracing_subscriber::registry().with(filter);

    match sink {
        LogSink::Disabled => Ok(()),
        LogSink::Stderr if json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
            .context("install tracing subscriber"),
        LogSink::Stderr => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
            .context("install tracing subscriber"),
        LogSink::File(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("open log file {}", path.display()))?;
            let writer = Mutex::new(file);
            if json {
                registry
                    .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
                    .try_init()
                    .context("install tracing subscriber")
            } else {
                registry
                    .with(
                        tracing_subscriber::fmt::layer()
                            .with_ansi(false)
                            .with_writer(writer),
                    )
                    .try_init()
                    .context("install tracing subscriber")
            }
        }
    }
}

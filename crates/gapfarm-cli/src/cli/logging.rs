use anyhow::Context;
use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

pub(super) const LOG_FILE_EXTENSION: &str = "log";

#[derive(Debug, Clone, Default)]
pub(super) struct LoggingOptions {
    pub(super) debug: bool,
    /// Log file; `None` logs to stderr only.
    pub(super) file: Option<PathBuf>,
    pub(super) append: bool,
}

/// Installs the global subscriber. `RUST_LOG` overrides the level chosen by `debug`.
pub(super) fn init_logging(options: &LoggingOptions) -> anyhow::Result<()> {
    let default_level = if options.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let stderr_layer = fmt::layer().with_target(false).with_writer(io::stderr);

    let file_layer = match &options.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .append(options.append)
                .truncate(!options.append)
                .open(path)
                .with_context(|| format!("failed to open log file '{}'", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("failed to install the log subscriber")
}

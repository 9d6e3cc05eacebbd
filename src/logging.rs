//! Logging via `tracing` / `tracing-subscriber`.
//!
//! Logs go to stderr so stdout stays clean for tables and exports. The TUI
//! owns the terminal, so in TUI mode logs are dropped unless a log file is
//! configured (`--log-file` or `RDS_LOG_FILE`).
//!
//! Levels:
//! - `warn` (default): datasets loaded with unresolved names or bad rows
//! - `info` (`-v`): dataset loads, selections
//! - `debug` (`-vv`): resolution misses, duplicate rows, stale loads
//! - `trace` (`-vvv`)
//!
//! `RUST_LOG` overrides the verbosity flag.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: Level,
    pub with_ansi: bool,
    /// Write to this file instead of stderr.
    pub log_file: Option<PathBuf>,
    /// Discard everything (TUI without a log file).
    pub silent: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            with_ansi: true,
            log_file: None,
            silent: false,
        }
    }
}

impl LogConfig {
    pub fn from_verbosity(verbosity: u8) -> Self {
        let level = match verbosity {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        };
        Self {
            level,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_log_file(mut self, path: Option<PathBuf>) -> Self {
        self.log_file = path;
        self
    }

    /// Configure for the TUI: silent unless a log file was given.
    #[must_use]
    pub fn for_tui(mut self) -> Self {
        self.silent = self.log_file.is_none();
        self
    }
}

/// Install the global subscriber. Calling it twice is harmless.
pub fn init_logging(config: &LogConfig) -> Result<(), AppError> {
    if config.silent {
        return Ok(());
    }

    let filter = build_env_filter(config.level);

    let result = match &config.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| AppError::new(2, format!("Failed to open log file '{}': {e}", path.display())))?;
            let layer = fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(false);
            tracing_subscriber::registry().with(filter).with(layer).try_init()
        }
        None => {
            let layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(config.with_ansi)
                .with_target(false)
                .without_time();
            tracing_subscriber::registry().with(filter).with(layer).try_init()
        }
    };

    if let Err(e) = result {
        tracing::debug!("logging already initialized: {e}");
    }
    Ok(())
}

/// `RUST_LOG` wins; otherwise our crate at `level`, dependencies at `warn`.
fn build_env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = level.as_str().to_lowercase();
        EnvFilter::new(format!("warn,rd_series={level}"))
    })
}

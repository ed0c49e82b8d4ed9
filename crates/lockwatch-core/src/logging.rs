//! Structured logging for lockwatch
//!
//! Diagnostic output goes through `tracing` with a pretty or JSON format on
//! stderr, plus an optional diagnostic log file. This is separate from the
//! alert log: alert reports are written by [`crate::sink`], never through
//! the tracing subscriber.
//!
//! The `lockwatch` binary takes no logging flags and always starts from
//! [`LogConfig::default`]: pretty output on stderr at `info` unless
//! `RUST_LOG` is set.
//! JSON output and the diagnostic log file are for programs that embed
//! `lockwatch-core` and build their own [`LogConfig`].
//!
//! # Usage
//!
//! ```ignore
//! use lockwatch_core::logging::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::default())?;
//! ```
//!
//! # Correlation Fields
//!
//! Use these field names consistently in events:
//! - `trx_id`, `thread_id`: transaction and owning session
//! - `waited_secs`, `threshold_secs`: lock-wait timing
//! - `active`, `lock_waiting`, `tracked`, `alerts`: per-cycle counters
//! - `sink`: alert log path
//!
//! Passwords are never logged.

pub use crate::config::LogFormat;
use serde::{Deserialize, Serialize};
use std::io;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use tracing_subscriber::fmt::time::SystemTime;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

static LOGGING_INITIALIZED: OnceLock<bool> = OnceLock::new();

/// Tracing target of the MySQL driver, kept at `warn` or quieter.
const DRIVER_TARGET: &str = "mysql_async";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Level for lockwatch's own events (trace, debug, info, warn, error).
    /// Ignored when `RUST_LOG` is set.
    pub level: String,

    /// Output format (pretty or json)
    pub format: LogFormat,

    /// Optional diagnostic log file, written in addition to stderr
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            file: None,
        }
    }
}

/// Error type for logging initialization
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("logging already initialized")]
    AlreadyInitialized,

    #[error("invalid log level: {0}")]
    InvalidLevel(String),

    #[error("failed to open diagnostic log: {0}")]
    FileCreate(#[from] io::Error),

    #[error("failed to set global subscriber: {0}")]
    SetSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Filter directives for a configured level: lockwatch at `level`, the
/// driver at `level` or `warn`, whichever is quieter.
fn default_directives(level: &str) -> Result<String, LogError> {
    let level: LogLevel = level.parse().map_err(LogError::InvalidLevel)?;
    let driver = level.max(LogLevel::Warn);
    Ok(format!("{},{DRIVER_TARGET}={}", level.as_str(), driver.as_str()))
}

fn build_filter(level: &str) -> Result<EnvFilter, LogError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => Ok(EnvFilter::new(default_directives(level)?)),
    }
}

fn open_log_file(path: &Path) -> io::Result<std::fs::File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let existed = path.exists();
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    // Diagnostic logs carry host and account names.
    #[cfg(unix)]
    if !existed {
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }
    Ok(file)
}

fn stderr_layer(format: LogFormat) -> BoxedLayer {
    match format {
        LogFormat::Pretty => fmt::layer()
            .with_writer(io::stderr)
            .with_target(true)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_timer(SystemTime)
            .with_writer(io::stderr)
            .with_current_span(true)
            .flatten_event(true)
            .boxed(),
    }
}

fn file_layer(format: LogFormat, file: std::fs::File) -> BoxedLayer {
    let writer = Mutex::new(file);
    match format {
        LogFormat::Pretty => fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_ansi(false)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_timer(SystemTime)
            .with_writer(writer)
            .flatten_event(true)
            .boxed(),
    }
}

/// Initialize the global logging subscriber
///
/// Call once at startup. Subsequent calls return
/// `Err(LogError::AlreadyInitialized)`.
///
/// `RUST_LOG` replaces the configured level entirely, e.g.
/// `RUST_LOG=lockwatch_core=debug,mysql_async=debug`.
pub fn init_logging(config: &LogConfig) -> Result<(), LogError> {
    if LOGGING_INITIALIZED.get().is_some() {
        return Err(LogError::AlreadyInitialized);
    }

    let filter = build_filter(&config.level)?;

    let mut layers = vec![stderr_layer(config.format)];
    if let Some(path) = config.file.as_deref() {
        layers.push(file_layer(config.format, open_log_file(path)?));
    }

    let subscriber = tracing_subscriber::registry().with(layers).with(filter);
    tracing::subscriber::set_global_default(subscriber)?;
    let _ = LOGGING_INITIALIZED.set(true);

    tracing::debug!(
        log_level = %config.level,
        log_format = %config.format,
        log_file = ?config.file,
        "Logging initialized"
    );

    Ok(())
}

/// Log levels accepted in [`LogConfig::level`], most verbose first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive spelling understood by `EnvFilter`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(format!(
                "{s:?} (expected trace, debug, info, warn or error)"
            )),
        }
    }
}

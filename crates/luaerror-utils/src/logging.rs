//! # Logging Utilities
//!
//! Logging infrastructure for luaerror using `tracing`.
//!
//! Two situations are covered:
//! - a standalone process (the CLI): events go to stderr, optionally mirrored
//!   to a daily rolling file;
//! - a module loaded into a host: the host owns the console, so events go to
//!   a dated file only.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use luaerror_utils::init_logging;
//!
//! // Keep the guard alive for as long as events should be flushed
//! let _guard = init_logging().expect("Failed to initialize logging");
//! tracing::info!("Application started");
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: level filter (e.g. `RUST_LOG=debug`, `RUST_LOG=luaerror_core=trace`)
//! - `LUAERROR_LOG_FORMAT`: output format (`json` or `pretty`, default: `pretty`)
//! - `LUAERROR_LOG_FILE`: optional file to mirror console output into
//!
//! ## Examples
//!
//! ```rust,no_run
//! use luaerror_utils::{LogFormat, LogLevel, init_logging_for_module, init_logging_with_level};
//!
//! let _guard = init_logging_with_level(LogLevel::Debug, LogFormat::Json)
//!     .expect("Failed to initialize logging");
//!
//! // Inside a host process
//! let guard = init_logging_for_module(Some(LogLevel::Debug)).expect("Failed to initialize logging");
//! println!("logging to {}", guard.path().unwrap().display());
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{env, fs, io};

use chrono::{NaiveDate, Utc};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

const FORMAT_VAR: &str = "LUAERROR_LOG_FORMAT";
const FILE_VAR: &str = "LUAERROR_LOG_FILE";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat
{
    /// Pretty-printed, human-readable format (default)
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat
{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "pretty" | "dev" | "text" => Ok(LogFormat::Pretty),
            "json" | "prod" => Ok(LogFormat::Json),
            _ => Err(format!("Unknown log format: {s}. Use 'pretty' or 'json'")),
        }
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel
{
    /// Error level
    Error,
    /// Warning level
    Warn,
    /// Info level (default)
    Info,
    /// Debug level
    Debug,
    /// Trace level (most verbose)
    Trace,
}

impl From<LogLevel> for Level
{
    fn from(level: LogLevel) -> Self
    {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

impl FromStr for LogLevel
{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "error" | "err" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" | "dbg" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(format!(
                "Unknown log level: {s}. Use 'error', 'warn', 'info', 'debug', or 'trace'"
            )),
        }
    }
}

/// Keeps background log writers flushing.
///
/// Dropping it flushes and stops file output.
#[derive(Debug, Default)]
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard
{
    path: Option<PathBuf>,
    _worker: Option<WorkerGuard>,
}

impl LoggingGuard
{
    /// File events are written to, if any.
    pub fn path(&self) -> Option<&Path>
    {
        self.path.as_deref()
    }
}

/// Initialize logging from the environment
///
/// Reads `RUST_LOG`, `LUAERROR_LOG_FORMAT` and `LUAERROR_LOG_FILE`.
///
/// ## Errors
///
/// Returns an error if a global subscriber is already installed or the log
/// file cannot be opened.
pub fn init_logging() -> Result<LoggingGuard, LoggingError>
{
    let format = env::var(FORMAT_VAR)
        .ok()
        .and_then(|s| LogFormat::from_str(&s).ok())
        .unwrap_or_default();
    init_console(format, None)
}

/// Initialize logging with an explicit level and format
///
/// The level replaces `RUST_LOG`; `LUAERROR_LOG_FILE` is still honoured.
///
/// ## Errors
///
/// Returns an error if a global subscriber is already installed or the log
/// file cannot be opened.
pub fn init_logging_with_level(level: LogLevel, format: LogFormat) -> Result<LoggingGuard, LoggingError>
{
    init_console(format, Some(level.into()))
}

/// Initialize file-only logging for a module loaded into a host process
///
/// Events go to `~/.luaerror/YYYY-MM-DD-luaerror.log`, or to the same file
/// name under `/tmp` when there is no home directory.
///
/// ## Errors
///
/// Returns an error if a global subscriber is already installed or the log
/// directory cannot be created.
pub fn init_logging_for_module(level: Option<LogLevel>) -> Result<LoggingGuard, LoggingError>
{
    let home = env::var_os("HOME").map(PathBuf::from);
    let log_file = module_log_path(home.as_deref(), Utc::now().date_naive());
    if let Some(dir) = log_file.parent() {
        fs::create_dir_all(dir)?;
    }

    // The date is already in the file name
    let appender = tracing_appender::rolling::never(parent_or_cwd(&log_file), file_name(&log_file)?);
    let (writer, worker) = tracing_appender::non_blocking(appender);
    let format = env::var(FORMAT_VAR)
        .ok()
        .and_then(|s| LogFormat::from_str(&s).ok())
        .unwrap_or_default();

    Registry::default()
        .with(event_layer(format, writer, false).with_filter(build_filter(level.map(Into::into))))
        .try_init()
        .map_err(|err| LoggingError::InitializationFailed(err.to_string()))?;

    Ok(LoggingGuard {
        path: Some(log_file),
        _worker: Some(worker),
    })
}

/// Location of the module log file for `today`.
pub fn module_log_path(home: Option<&Path>, today: NaiveDate) -> PathBuf
{
    let name = format!("{}-luaerror.log", today.format("%Y-%m-%d"));
    match home {
        Some(home) => home.join(".luaerror").join(name),
        None => PathBuf::from("/tmp").join(name),
    }
}

fn init_console(format: LogFormat, explicit_level: Option<Level>) -> Result<LoggingGuard, LoggingError>
{
    let mut layers = vec![event_layer(format, io::stderr, true)
        .with_filter(build_filter(explicit_level))
        .boxed()];

    let mut guard = LoggingGuard::default();
    if let Some(log_file) = env::var_os(FILE_VAR).map(PathBuf::from) {
        let appender = tracing_appender::rolling::daily(parent_or_cwd(&log_file), file_name(&log_file)?);
        let (writer, worker) = tracing_appender::non_blocking(appender);
        layers.push(
            event_layer(format, writer, false)
                .with_filter(build_filter(explicit_level))
                .boxed(),
        );
        guard = LoggingGuard {
            path: Some(log_file),
            _worker: Some(worker),
        };
    }

    Registry::default()
        .with(layers)
        .try_init()
        .map_err(|err| LoggingError::InitializationFailed(err.to_string()))?;
    Ok(guard)
}

/// Filter priority: explicit level, then `RUST_LOG`, then `info`.
fn build_filter(explicit_level: Option<Level>) -> EnvFilter
{
    if let Some(level) = explicit_level {
        return EnvFilter::new(level.to_string());
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string()))
}

fn event_layer<W>(format: LogFormat, writer: W, ansi: bool) -> Box<dyn Layer<Registry> + Send + Sync>
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    let layer = fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_timer(ChronoUtc::rfc_3339());
    match format {
        LogFormat::Pretty => layer.with_ansi(ansi).boxed(),
        LogFormat::Json => layer.json().with_current_span(true).with_span_list(true).boxed(),
    }
}

fn parent_or_cwd(path: &Path) -> &Path
{
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

fn file_name(path: &Path) -> Result<&std::ffi::OsStr, LoggingError>
{
    path.file_name()
        .ok_or_else(|| LoggingError::InvalidPath(path.display().to_string()))
}

/// Logging initialization error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError
{
    /// Invalid log format
    #[error("Invalid log format: {0}")]
    InvalidFormat(String),

    /// Invalid log level
    #[error("Invalid log level: {0}")]
    InvalidLevel(String),

    /// Log file path has no file name
    #[error("Invalid log file path: {0}")]
    InvalidPath(String),

    /// Failed to initialize logging
    #[error("Failed to initialize logging: {0}")]
    InitializationFailed(String),

    /// File logging error
    #[error("File logging error: {0}")]
    FileError(#[from] io::Error),
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_log_format_from_str()
    {
        assert_eq!(LogFormat::from_str("pretty").unwrap(), LogFormat::Pretty);
        assert_eq!(LogFormat::from_str("JSON").unwrap(), LogFormat::Json);
        assert_eq!(LogFormat::from_str("text").unwrap(), LogFormat::Pretty);
        assert!(LogFormat::from_str("xml").is_err());
    }

    #[test]
    fn test_log_level_from_str()
    {
        assert_eq!(LogLevel::from_str("err").unwrap(), LogLevel::Error);
        assert_eq!(LogLevel::from_str("Warning").unwrap(), LogLevel::Warn);
        assert_eq!(LogLevel::from_str("trace").unwrap(), LogLevel::Trace);
        assert!(LogLevel::from_str("verbose").is_err());
        assert_eq!(Level::from(LogLevel::Debug), Level::DEBUG);
    }

    #[test]
    fn test_module_log_path()
    {
        let day = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(
            module_log_path(Some(Path::new("/home/srcds")), day),
            PathBuf::from("/home/srcds/.luaerror/2024-03-09-luaerror.log")
        );
        assert_eq!(module_log_path(None, day), PathBuf::from("/tmp/2024-03-09-luaerror.log"));
    }

    #[test]
    fn test_parent_or_cwd()
    {
        assert_eq!(parent_or_cwd(Path::new("luaerror.log")), Path::new("."));
        assert_eq!(parent_or_cwd(Path::new("/var/log/luaerror.log")), Path::new("/var/log"));
        assert!(file_name(Path::new("/")).is_err());
    }
}

//! Structured logging bootstrap (spec.md §6 `--log`, `--verbose`).
//!
//! Grounded in `tunez-core::logging`'s `BoxMakeWriter` fan-out shape;
//! generalized to spec.md's three-way `--log` destination (`PATH`,
//! `"syslog"`, `"-"`) instead of the teacher's fixed stdout+file pair.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::fmt;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

/// Holds the worker guard for a non-blocking file appender, if any. Dropping
/// this flushes pending log lines; the caller keeps it alive for the
/// process lifetime.
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// `--verbose N` (spec.md §6): 0=error, 1=warning, 2=info, >=3=debug.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
}

impl LogLevel {
    pub fn from_verbosity(n: u8) -> Self {
        match n {
            0 => LogLevel::Error,
            1 => LogLevel::Warn,
            2 => LogLevel::Info,
            _ => LogLevel::Debug,
        }
    }

    pub fn as_filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }
}

/// Where log output goes, resolved from `--log PATH|"syslog"|"-"`.
pub enum LogDestination {
    File(PathBuf),
    Stderr,
    /// No syslog crate carried in this workspace; degrades to stdout with a
    /// warning emitted by the caller once the subscriber is live.
    SyslogUnavailable,
}

impl LogDestination {
    pub fn parse(value: &str) -> Self {
        match value {
            "-" => LogDestination::Stderr,
            "syslog" => LogDestination::SyslogUnavailable,
            path => LogDestination::File(PathBuf::from(path)),
        }
    }
}

pub fn init_logging(
    level: LogLevel,
    destination: &LogDestination,
) -> Result<LoggingGuard, LoggingError> {
    let env_filter = EnvFilter::try_new(level.as_filter_directive()).map_err(|source| {
        LoggingError::ParseLevel {
            level: level.as_filter_directive().to_string(),
            source,
        }
    })?;

    let (writer, guard) = match destination {
        LogDestination::Stderr | LogDestination::SyslogUnavailable => {
            (BoxMakeWriter::new(std::io::stderr), None)
        }
        LogDestination::File(path) => {
            let (file_writer, guard) = build_file_writer(path)?;
            (BoxMakeWriter::new(file_writer), Some(guard))
        }
    };

    fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(matches!(destination, LogDestination::Stderr))
        .with_writer(writer)
        .try_init()
        .map_err(LoggingError::SubscriberInstall)?;

    if matches!(destination, LogDestination::SyslogUnavailable) {
        tracing::warn!("syslog logging is not available; falling back to stdout");
    }

    Ok(LoggingGuard {
        _file_guard: guard,
    })
}

fn build_file_writer(path: &Path) -> Result<(NonBlocking, WorkerGuard), LoggingError> {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(dir) = dir {
        std::fs::create_dir_all(dir).map_err(|source| LoggingError::CreateDirectory {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "scrobbled.log".to_string());
    let appender = tracing_appender::rolling::daily(dir.unwrap_or(Path::new(".")), file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);
    Ok((non_blocking, guard))
}

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to create log directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse log level {level}: {source}")]
    ParseLevel {
        level: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },
    #[error("failed to install tracing subscriber: {0}")]
    SubscriberInstall(Box<dyn std::error::Error + Send + Sync>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_mapping_matches_spec() {
        assert_eq!(LogLevel::from_verbosity(0), LogLevel::Error);
        assert_eq!(LogLevel::from_verbosity(1), LogLevel::Warn);
        assert_eq!(LogLevel::from_verbosity(2), LogLevel::Info);
        assert_eq!(LogLevel::from_verbosity(9), LogLevel::Debug);
    }

    #[test]
    fn destination_parses_dash_and_syslog_specially() {
        assert!(matches!(LogDestination::parse("-"), LogDestination::Stderr));
        assert!(matches!(
            LogDestination::parse("syslog"),
            LogDestination::SyslogUnavailable
        ));
        assert!(matches!(
            LogDestination::parse("/var/log/scrobbled.log"),
            LogDestination::File(_)
        ));
    }
}

//! Level-tagged log sink.
//!
//! Components log through `tracing` directly. [`log`] exists for callers
//! that carry a level as data, such as the driver's outcome reporting.

use std::fmt;
use tracing::{debug, error, info, warn};

/// Severity of a log message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    /// Diagnostic detail
    Debug,
    /// Normal progress
    Info,
    /// Something was skipped or degraded
    Warning,
    /// A resource failed
    Error,
    /// The run cannot continue
    Critical,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        })
    }
}

/// Emit `message` at `level`.
pub fn log(level: Level, message: &str) {
    match level {
        Level::Debug => debug!("{message}"),
        Level::Info => info!("{message}"),
        Level::Warning => warn!("{message}"),
        Level::Error => error!("{message}"),
        Level::Critical => error!(critical = true, "{message}"),
    }
}

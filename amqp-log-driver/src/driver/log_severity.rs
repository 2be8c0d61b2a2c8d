/// Log severity derived from the source stream
use crate::driver::LogSource;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity attached to an envelope when severity reporting is enabled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogSeverity {
    #[default]
    Info,
    Error,
}

impl From<LogSource> for LogSeverity {
    fn from(source: LogSource) -> Self {
        match source {
            LogSource::Stdout => LogSeverity::Info,
            LogSource::Stderr => LogSeverity::Error,
        }
    }
}

impl fmt::Display for LogSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogSeverity::Info => write!(f, "INFO"),
            LogSeverity::Error => write!(f, "ERROR"),
        }
    }
}

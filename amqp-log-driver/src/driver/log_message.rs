/// A single captured log line
use crate::driver::LogSource;
use std::fmt;

/// One line of workload output as handed to a log driver
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LogMessage {
    pub line: String,
    pub source: LogSource,
}

impl LogMessage {
    /// Create a new LogMessage
    pub fn new(line: impl Into<String>, source: LogSource) -> Self {
        Self {
            line: line.into(),
            source,
        }
    }

    /// Create a line captured from stdout
    pub fn stdout(line: impl Into<String>) -> Self {
        Self::new(line, LogSource::Stdout)
    }

    /// Create a line captured from stderr
    pub fn stderr(line: impl Into<String>) -> Self {
        Self::new(line, LogSource::Stderr)
    }
}

impl fmt::Display for LogMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.source, self.line)
    }
}

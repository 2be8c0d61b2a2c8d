use strum_macros::{EnumString, VariantNames};

/// The stream a log line was captured from.
#[derive(EnumString, VariantNames, Debug, Clone, Copy, Default, Eq, Hash, PartialEq)]
#[strum(serialize_all = "lowercase")]
pub enum LogSource {
    #[default]
    Stdout,
    Stderr,
}

use std::fmt;

impl fmt::Display for LogSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogSource::Stdout => write!(f, "stdout"),
            LogSource::Stderr => write!(f, "stderr"),
        }
    }
}

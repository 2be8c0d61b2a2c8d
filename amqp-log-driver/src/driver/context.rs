//! Construction input handed to a log driver by its host.

use crate::error::ConfigError;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::Path;

const KERNEL_HOSTNAME: &str = "/proc/sys/kernel/hostname";

/// Everything a host knows about a workload when it creates a log driver:
/// the driver's option map and the container metadata.
#[derive(Debug, Clone, Default)]
pub struct DriverContext {
    pub config: HashMap<String, String>,
    pub container_id: String,
    pub container_name: String,
    pub container_entrypoint: String,
    pub container_args: Vec<String>,
    pub container_image_id: String,
    pub container_image_name: String,
    pub container_created: DateTime<Utc>,
    /// Host name to report. Looked up from the kernel when unset.
    pub hostname: Option<String>,
}

impl DriverContext {
    pub fn new(config: HashMap<String, String>) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    pub fn option(&self, key: &str) -> Option<&str> {
        self.config.get(key).map(String::as_str)
    }

    /// The command line of the workload: entrypoint followed by its arguments.
    pub fn command(&self) -> String {
        std::iter::once(self.container_entrypoint.as_str())
            .chain(self.container_args.iter().map(String::as_str))
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// The host name to stamp on every message.
    pub fn hostname(&self) -> Result<String, ConfigError> {
        match self.hostname.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => Ok(name.to_string()),
            Some(_) => Err(ConfigError::Hostname("hostname is empty".to_string())),
            None => read_hostname(Path::new(KERNEL_HOSTNAME)),
        }
    }
}

fn read_hostname(path: &Path) -> Result<String, ConfigError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Hostname(format!("{}: {e}", path.display())))?;
    let name = raw.trim();
    if name.is_empty() {
        return Err(ConfigError::Hostname(format!(
            "{} is empty",
            path.display()
        )));
    }
    Ok(name.to_string())
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_command_joins_entrypoint_and_args() {
        let ctx = DriverContext {
            container_entrypoint: "/bin/sh".to_string(),
            container_args: vec!["-c".to_string(), "echo hi".to_string()],
            ..DriverContext::default()
        };
        assert_eq!(ctx.command(), "/bin/sh -c echo hi");
    }

    #[test]
    fn test_command_without_entrypoint() {
        let ctx = DriverContext {
            container_args: vec!["nginx".to_string()],
            ..DriverContext::default()
        };
        assert_eq!(ctx.command(), "nginx");
    }

    #[test]
    fn test_explicit_hostname_wins() {
        let ctx = DriverContext::default().with_hostname(" web-01 ");
        assert_eq!(ctx.hostname().ok().as_deref(), Some("web-01"));
    }

    #[test]
    fn test_blank_hostname_is_rejected() {
        let ctx = DriverContext::default().with_hostname("   ");
        assert!(matches!(ctx.hostname(), Err(ConfigError::Hostname(_))));
    }

    #[test]
    fn test_read_hostname_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "node-7").expect("write hostname");
        assert_eq!(read_hostname(file.path()).ok().as_deref(), Some("node-7"));
    }

    #[test]
    fn test_read_hostname_missing_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let result = read_hostname(&dir.path().join("hostname"));
        assert!(matches!(result, Err(ConfigError::Hostname(_))));
    }

    #[test]
    fn test_with_option() {
        let ctx = DriverContext::default().with_option("amqp-url", "amqp://localhost");
        assert_eq!(ctx.option("amqp-url"), Some("amqp://localhost"));
        assert_eq!(ctx.option("amqp-queue"), None);
    }
}

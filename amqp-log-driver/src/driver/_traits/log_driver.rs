/// Log driver trait definition
use crate::driver::log_message::LogMessage;
use crate::error::DriverError;

/// Main trait for implementing log drivers
///
/// A log driver receives every line a workload writes to stdout/stderr and is
/// responsible for shipping it somewhere. The host calls [`log`](Self::log)
/// once per line and [`close`](Self::close) when the workload goes away.
///
/// # Example
///
/// ```
/// use amqp_log_driver::driver::{LogDriver, LogMessage};
/// use amqp_log_driver::DriverError;
///
/// struct ConsoleDriver;
///
/// impl LogDriver for ConsoleDriver {
///     fn name(&self) -> &'static str {
///         "console"
///     }
///
///     fn log(&self, message: &LogMessage) -> Result<(), DriverError> {
///         println!("[{}] {}", message.source, message.line);
///         Ok(())
///     }
/// }
/// ```
pub trait LogDriver: Send + Sync {
    /// Returns the identifier the driver is registered under
    fn name(&self) -> &'static str;

    /// Ship a single log line.
    ///
    /// Must not block indefinitely: implementations either deliver the line,
    /// drop it deliberately, or return an error.
    fn log(&self, message: &LogMessage) -> Result<(), DriverError>;

    /// Release every resource held by the driver.
    ///
    /// Calling this more than once is allowed and must not fail.
    fn close(&self) -> Result<(), DriverError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct CollectingDriver {
        lines: Mutex<Vec<String>>,
    }

    impl LogDriver for CollectingDriver {
        fn name(&self) -> &'static str {
            "collect"
        }

        fn log(&self, message: &LogMessage) -> Result<(), DriverError> {
            if let Ok(mut lines) = self.lines.lock() {
                lines.push(message.line.clone());
            }
            Ok(())
        }
    }

    #[test]
    fn test_log_driver_default_close() {
        let driver = CollectingDriver {
            lines: Mutex::new(Vec::new()),
        };
        assert!(driver.close().is_ok());
        assert!(driver.close().is_ok());
    }

    #[test]
    fn test_log_driver_as_trait_object() {
        let driver: Box<dyn LogDriver> = Box::new(CollectingDriver {
            lines: Mutex::new(Vec::new()),
        });

        assert_eq!(driver.name(), "collect");
        assert!(driver.log(&LogMessage::stdout("first")).is_ok());
        assert!(driver.log(&LogMessage::stderr("second")).is_ok());
    }
}

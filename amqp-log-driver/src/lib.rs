#![forbid(unsafe_code)]

pub mod amqp;
pub mod driver;
pub mod error;

pub use crate::amqp::AmqpLogger;
pub use crate::driver::{DriverContext, DriverRegistry, LogDriver, LogMessage};
pub use crate::error::DriverError;

///
/// Expose all structures required to set up and feed a log driver
///
/// ```
/// use amqp_log_driver::prelude::*;
/// ```
pub mod prelude {
    pub use crate::amqp::AmqpLogger;
    pub use crate::driver::{
        DriverContext, DriverRegistry, LogDriver, LogMessage, LogSeverity, LogSource,
    };
    pub use crate::error::{ConfigError, DriverError};
}

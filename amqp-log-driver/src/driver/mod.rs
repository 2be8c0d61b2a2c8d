mod _enums;
mod _traits;
mod context;
mod log_message;
mod log_severity;
mod registry;

// Re-exporting all public structures
pub use _enums::log_source::LogSource;

pub use _traits::log_driver::LogDriver;

pub use context::DriverContext;
pub use log_message::LogMessage;
pub use log_severity::LogSeverity;
pub use registry::{DriverConstructor, DriverRegistry, OptionValidator};

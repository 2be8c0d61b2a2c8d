//! Error types for the log driver.
//!
//! Errors are split by where they can happen: building a driver
//! ([`ConfigError`]), establishing a broker connection ([`ConnectError`]),
//! publishing a single message ([`PublishError`]) and tearing a connection
//! down ([`CloseError`]). [`DriverError`] is what a caller of
//! [`LogDriver`](crate::driver::LogDriver) sees.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while validating options or building a driver.
///
/// These are fatal to driver construction and are never retried.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("unknown log opt '{key}' for {driver} log driver")]
    UnknownOption { key: String, driver: String },

    #[error("missing required log opt '{0}'")]
    MissingOption(&'static str),

    #[error("log opts '{0}' and '{1}' cannot be used together")]
    ConflictingOptions(&'static str, &'static str),

    #[error("invalid value '{value}' for log opt '{key}': {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("invalid broker URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("cannot access hostname to set source field: {0}")]
    Hostname(String),

    #[error("no log driver registered under the name '{0}'")]
    UnknownDriver(String),

    #[error("a log driver named '{0}' is already registered")]
    DuplicateDriver(String),
}

/// The step of connection setup that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectStage {
    Dial,
    Tls,
    Handshake,
    Channel,
    ExchangeDeclare,
    QueueDeclare,
    QueueBind,
    ConfirmSelect,
}

impl fmt::Display for ConnectStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectStage::Dial => write!(f, "connect to AMQP server"),
            ConnectStage::Tls => write!(f, "build TLS context"),
            ConnectStage::Handshake => write!(f, "complete AMQP handshake"),
            ConnectStage::Channel => write!(f, "open channel"),
            ConnectStage::ExchangeDeclare => write!(f, "create exchange"),
            ConnectStage::QueueDeclare => write!(f, "create queue"),
            ConnectStage::QueueBind => write!(f, "bind queue to exchange"),
            ConnectStage::ConfirmSelect => write!(f, "enable publisher confirms"),
        }
    }
}

/// A connection attempt against a single broker failed.
#[derive(Debug, Clone, Error)]
#[error("could not {stage} at {broker}: {reason}")]
pub struct ConnectError {
    pub broker: String,
    pub stage: ConnectStage,
    pub reason: String,
}

impl ConnectError {
    pub fn new(broker: impl Into<String>, stage: ConnectStage, reason: impl ToString) -> Self {
        Self {
            broker: broker.into(),
            stage,
            reason: reason.to_string(),
        }
    }
}

/// Publishing a single envelope failed.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PublishError {
    /// The envelope could not be encoded. Retrying cannot help.
    #[error("could not serialise event: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("no open connection to a broker")]
    NotConnected,

    #[error("unable to send message to AMQP broker: {0}")]
    Transport(String),

    #[error("broker rejected message with delivery tag {0}")]
    Nacked(u64),

    #[error("no confirmation from broker within {0:?}")]
    ConfirmTimeout(Duration),

    #[error("confirmation channel closed before the broker answered")]
    ConfirmChannelClosed,
}

impl PublishError {
    /// Whether a failover to another broker could make a retry succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, PublishError::Serialize(_))
    }
}

/// Tearing down a channel or connection failed. Only ever logged.
#[derive(Debug, Error)]
#[error("could not close {resource}: {reason}")]
pub struct CloseError {
    pub resource: &'static str,
    pub reason: String,
}

/// Errors surfaced to the caller of a log driver.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DriverError {
    #[error("log driver is closed")]
    Closed,

    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    Publish(#[from] PublishError),

    /// The message could not be delivered even after failing over.
    #[error("could not deliver message after failover: {0}")]
    Delivery(#[source] PublishError),
}

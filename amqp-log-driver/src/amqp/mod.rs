//! AMQP log driver.
//!
//! Every log line becomes one persistent JSON message published to a durable
//! direct exchange. When a broker stops answering, the driver moves to the
//! next configured broker and retries the message once.

mod connection;
mod endpoint;
mod envelope;
mod logger;
mod options;
mod reconnect;
mod session;
mod tls;
mod transport;

use crate::driver::DriverRegistry;
use crate::error::ConfigError;

/// Name the driver is registered under.
pub const NAME: &str = "amqp";

// Re-exporting all public structures
pub use connection::ConnectionManager;
pub use endpoint::{BrokerEndpoint, BrokerList, AMQPS_PORT, AMQPS_SCHEME, AMQP_PORT, AMQP_SCHEME};
pub use envelope::{LogEnvelope, MessageFormatter, ShipperMetadata, CONTENT_TYPE, ENVELOPE_VERSION};
pub use logger::{new_driver, AmqpLogger};
pub use options::{
    validate_log_opt, AmqpOptions, DriverSettings, FailoverPolicy, LogOpt, DEFAULT_CONFIRM_TIMEOUT,
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_EXCHANGE, DEFAULT_QUEUE,
};
pub use reconnect::ReconnectController;
pub use session::{BrokerSession, Connector};
pub use tls::{client_identity, load_identity, tls_connector};
pub use transport::{AmqpConnector, AmqpSession};

/// Make the AMQP driver available in `registry`.
pub fn register(registry: &mut DriverRegistry) -> Result<(), ConfigError> {
    registry.register(NAME, new_driver, validate_log_opt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::DriverContext;

    #[test]
    fn test_register_adds_amqp_driver() {
        let mut registry = DriverRegistry::new();
        assert!(register(&mut registry).is_ok());
        assert!(registry.contains(NAME));
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["amqp"]);
    }

    #[test]
    fn test_register_twice_is_rejected() {
        let mut registry = DriverRegistry::new();
        assert!(register(&mut registry).is_ok());
        assert!(matches!(
            register(&mut registry),
            Err(ConfigError::DuplicateDriver(name)) if name == "amqp"
        ));
    }

    #[test]
    fn test_registry_validates_before_constructing() {
        let mut registry = DriverRegistry::new();
        assert!(register(&mut registry).is_ok());

        let ctx = DriverContext::default()
            .with_option("amqp-url", "amqp://localhost")
            .with_option("max-size", "10m");
        let result = registry.create(NAME, &ctx);
        assert!(matches!(result, Err(ConfigError::UnknownOption { key, .. }) if key == "max-size"));
    }
}

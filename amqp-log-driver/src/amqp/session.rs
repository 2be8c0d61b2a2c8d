/// Trait definitions for broker communication
use crate::amqp::endpoint::BrokerEndpoint;
use crate::error::{CloseError, ConnectError, PublishError};
use std::time::Duration;

/// An open connection and channel to one broker, with its topology declared.
///
/// This trait exposes only what the publish pipeline needs, so tests can
/// substitute a mock session for a real broker.
#[cfg_attr(test, mockall::automock)]
pub trait BrokerSession: Send {
    /// Publish `body` as a persistent JSON message. Non-mandatory,
    /// non-immediate.
    fn publish(&mut self, exchange: &str, routing_key: &str, body: &[u8])
        -> Result<(), PublishError>;

    /// Wait at most `timeout` for the broker to confirm the last publish.
    fn wait_for_confirm(&mut self, timeout: Duration) -> Result<(), PublishError>;

    /// Close the channel, then the connection. Safe to call on a session
    /// whose transport already failed, and more than once.
    fn close(&mut self) -> Result<(), CloseError>;
}

/// Dials brokers and hands back ready-to-use sessions.
#[cfg_attr(test, mockall::automock)]
pub trait Connector: Send {
    /// Dial `endpoint`, open a channel, declare the exchange and queue, bind
    /// them, and enable publisher confirms when requested. Nothing is
    /// returned unless every step succeeded.
    fn connect(
        &self,
        endpoint: &BrokerEndpoint,
        timeout: Duration,
    ) -> Result<Box<dyn BrokerSession>, ConnectError>;
}

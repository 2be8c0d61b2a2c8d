/// Ownership of the single live broker session
use crate::amqp::endpoint::BrokerEndpoint;
use crate::amqp::session::{BrokerSession, Connector};
use crate::error::{ConnectError, PublishError};
use std::time::Duration;

struct ActiveSession {
    session: Box<dyn BrokerSession>,
    broker: usize,
}

/// Holds at most one open session. A new session is only installed after the
/// previous one has been closed.
pub struct ConnectionManager<C: Connector> {
    connector: C,
    connect_timeout: Duration,
    active: Option<ActiveSession>,
}

impl<C: Connector> ConnectionManager<C> {
    pub fn new(connector: C, connect_timeout: Duration) -> Self {
        Self {
            connector,
            connect_timeout,
            active: None,
        }
    }

    /// Close the current session, if any, then connect to `endpoint`.
    /// `broker` is the position of `endpoint` in the broker list.
    pub fn connect(&mut self, endpoint: &BrokerEndpoint, broker: usize) -> Result<(), ConnectError> {
        self.close();
        let session = self.connector.connect(endpoint, self.connect_timeout)?;
        self.active = Some(ActiveSession { session, broker });
        Ok(())
    }

    /// Close the current session. Close errors are logged and dropped.
    pub fn close(&mut self) {
        if let Some(mut active) = self.active.take() {
            match active.session.close() {
                Ok(()) => log::debug!("Closed connection to broker {}", active.broker),
                Err(e) => log::warn!("Error closing connection to broker {}: {e}", active.broker),
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        self.active.is_some()
    }

    /// Position in the broker list of the connected broker.
    pub fn connected_broker(&self) -> Option<usize> {
        self.active.as_ref().map(|active| active.broker)
    }

    /// Publish `body` on the open session and, when `endpoint` asks for it,
    /// wait up to `confirm_timeout` for the broker to confirm it.
    pub fn publish(
        &mut self,
        endpoint: &BrokerEndpoint,
        body: &[u8],
        confirm_timeout: Duration,
    ) -> Result<(), PublishError> {
        let active = self.active.as_mut().ok_or(PublishError::NotConnected)?;
        active
            .session
            .publish(&endpoint.exchange, &endpoint.routing_key, body)?;
        if endpoint.confirm {
            active.session.wait_for_confirm(confirm_timeout)?;
        }
        Ok(())
    }
}

impl<C: Connector> Drop for ConnectionManager<C> {
    fn drop(&mut self) {
        self.close();
    }
}

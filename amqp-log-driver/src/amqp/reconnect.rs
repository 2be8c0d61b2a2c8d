/// Round-robin failover across the configured brokers
use crate::amqp::connection::ConnectionManager;
use crate::amqp::endpoint::{BrokerEndpoint, BrokerList};
use crate::amqp::options::FailoverPolicy;
use crate::amqp::session::Connector;
use crate::error::ConnectError;

/// Owns the broker cursor. The cursor only moves through [`Self::reconnect`].
#[derive(Debug, Clone)]
pub struct ReconnectController {
    brokers: BrokerList,
    policy: FailoverPolicy,
}

impl ReconnectController {
    pub fn new(brokers: BrokerList, policy: FailoverPolicy) -> Self {
        Self { brokers, policy }
    }

    pub fn brokers(&self) -> &BrokerList {
        &self.brokers
    }

    pub fn current_index(&self) -> usize {
        self.brokers.current_index()
    }

    pub fn current_endpoint(&self) -> &BrokerEndpoint {
        self.brokers.current()
    }

    /// Connect to the current broker without moving the cursor.
    pub fn connect_current<C: Connector>(
        &self,
        manager: &mut ConnectionManager<C>,
    ) -> Result<(), ConnectError> {
        manager.connect(self.brokers.current(), self.brokers.current_index())
    }

    /// Drop the current connection, move to the next broker and connect to it.
    ///
    /// With [`FailoverPolicy::Exhaustive`] this keeps moving until a broker
    /// accepts or every broker was tried once. The error of the last attempt
    /// is returned.
    pub fn reconnect<C: Connector>(
        &mut self,
        manager: &mut ConnectionManager<C>,
    ) -> Result<(), ConnectError> {
        manager.close();

        let attempts = match self.policy {
            FailoverPolicy::OneStep => 1,
            FailoverPolicy::Exhaustive => self.brokers.len(),
        };

        let mut result = self.step(manager);
        for _ in 1..attempts {
            if result.is_ok() {
                break;
            }
            result = self.step(manager);
        }
        result
    }

    fn step<C: Connector>(&mut self, manager: &mut ConnectionManager<C>) -> Result<(), ConnectError> {
        let index = self.brokers.advance();
        let endpoint = self.brokers.current();
        log::info!("Reconnecting to broker {index}: {endpoint}");

        match manager.connect(endpoint, index) {
            Ok(()) => {
                log::info!("Reconnected to {endpoint}");
                Ok(())
            }
            Err(e) => {
                log::error!("Reconnect failed: {e}");
                Err(e)
            }
        }
    }
}

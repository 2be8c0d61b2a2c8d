/// AMQP 0-9-1 implementation of the broker traits
use crate::amqp::endpoint::BrokerEndpoint;
use crate::amqp::envelope::CONTENT_TYPE;
use crate::amqp::session::{BrokerSession, Connector};
use crate::amqp::tls::tls_connector;
use crate::error::{CloseError, ConnectError, ConnectStage, PublishError};
use amiquip::{
    AmqpProperties, Auth, Channel, Confirm, ConfirmPayload, Connection, ConnectionOptions,
    ConnectionTuning, ExchangeDeclareOptions, ExchangeType, FieldTable, Publish,
    QueueDeclareOptions,
};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::net::{SocketAddr, TcpStream};
use std::thread;
use std::time::{Duration, Instant};

/// Delivery mode 2 asks the broker to persist the message.
const PERSISTENT: u8 = 2;

/// Production implementation of [`Connector`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AmqpConnector;

impl Connector for AmqpConnector {
    fn connect(
        &self,
        endpoint: &BrokerEndpoint,
        timeout: Duration,
    ) -> Result<Box<dyn BrokerSession>, ConnectError> {
        Ok(Box::new(AmqpSession::open(endpoint, timeout)?))
    }
}

/// A live connection plus channel to one broker.
pub struct AmqpSession {
    broker: String,
    app_id: Option<String>,
    connection: Option<Connection>,
    channel: Option<Channel>,
    confirms: Option<Receiver<Confirm>>,
    /// Delivery tag of the most recent publish on this channel.
    delivery_tag: u64,
}

impl AmqpSession {
    /// Run every connection step against `endpoint`. Anything opened before a
    /// failing step is closed again.
    pub fn open(endpoint: &BrokerEndpoint, timeout: Duration) -> Result<Self, ConnectError> {
        let broker = endpoint.address();
        log::info!("Connecting to AMQP: {endpoint}");

        let stream = dial(endpoint, timeout)?;
        let stream = mio::net::TcpStream::from_stream(stream)
            .map_err(|e| ConnectError::new(&broker, ConnectStage::Dial, e))?;

        let (username, password) = endpoint.credentials();
        let options = ConnectionOptions::<Auth>::default()
            .auth(Auth::Plain { username, password })
            .virtual_host(endpoint.vhost())
            .connection_timeout(Some(timeout));

        let connection = if endpoint.is_secure() {
            let connector = tls_connector(endpoint)?;
            Connection::open_tls_stream(
                connector,
                endpoint.host(),
                stream,
                options,
                ConnectionTuning::default(),
            )
        } else {
            Connection::insecure_open_stream(stream, options, ConnectionTuning::default())
        }
        .map_err(|e| ConnectError::new(&broker, ConnectStage::Handshake, e))?;

        let mut session = AmqpSession {
            broker,
            app_id: Some(endpoint.tag.clone()).filter(|tag| !tag.is_empty()),
            connection: Some(connection),
            channel: None,
            confirms: None,
            delivery_tag: 0,
        };

        if let Err(e) = session.prepare_channel(endpoint) {
            log::error!("{e}");
            if let Err(close_err) = session.close() {
                log::debug!("Ignoring error while abandoning {}: {close_err}", session.broker);
            }
            return Err(e);
        }

        log::info!("Connection set up to {}", session.broker);
        Ok(session)
    }

    fn prepare_channel(&mut self, endpoint: &BrokerEndpoint) -> Result<(), ConnectError> {
        let broker = self.broker.clone();
        let fail = |stage: ConnectStage| {
            let broker = broker.clone();
            move |e: amiquip::Error| ConnectError::new(broker, stage, e)
        };

        let connection = self
            .connection
            .as_mut()
            .ok_or_else(|| ConnectError::new(&broker, ConnectStage::Channel, "connection closed"))?;
        let channel = connection
            .open_channel(None)
            .map_err(fail(ConnectStage::Channel))?;

        // Installed before declaring so a failure below still closes it.
        let channel = self.channel.insert(channel);

        let exchange = channel
            .exchange_declare(
                ExchangeType::Direct,
                endpoint.exchange.as_str(),
                ExchangeDeclareOptions {
                    durable: true,
                    ..ExchangeDeclareOptions::default()
                },
            )
            .map_err(fail(ConnectStage::ExchangeDeclare))?;

        let queue = channel
            .queue_declare(
                endpoint.queue.as_str(),
                QueueDeclareOptions {
                    durable: true,
                    ..QueueDeclareOptions::default()
                },
            )
            .map_err(fail(ConnectStage::QueueDeclare))?;

        queue
            .bind(&exchange, endpoint.routing_key.as_str(), FieldTable::default())
            .map_err(fail(ConnectStage::QueueBind))?;

        if endpoint.confirm {
            // Listen before confirm.select so the first confirm is not missed.
            let receiver = channel
                .listen_for_publisher_confirms()
                .map_err(fail(ConnectStage::ConfirmSelect))?;
            channel
                .enable_publisher_confirms()
                .map_err(fail(ConnectStage::ConfirmSelect))?;
            self.confirms = Some(receiver);
        }
        Ok(())
    }

    fn properties(&self) -> AmqpProperties {
        let now = u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default();
        let properties = AmqpProperties::default()
            .with_content_type(CONTENT_TYPE.to_string().into())
            .with_delivery_mode(PERSISTENT)
            .with_timestamp(now);
        match &self.app_id {
            Some(app_id) => properties.with_app_id(app_id.clone().into()),
            None => properties,
        }
    }
}

impl BrokerSession for AmqpSession {
    fn publish(
        &mut self,
        exchange: &str,
        routing_key: &str,
        body: &[u8],
    ) -> Result<(), PublishError> {
        let properties = self.properties();
        let channel = self.channel.as_ref().ok_or(PublishError::NotConnected)?;
        channel
            .basic_publish(
                exchange,
                Publish {
                    body,
                    routing_key: routing_key.to_string(),
                    mandatory: false,
                    immediate: false,
                    properties,
                },
            )
            .map_err(|e| PublishError::Transport(e.to_string()))?;
        self.delivery_tag += 1;
        Ok(())
    }

    fn wait_for_confirm(&mut self, timeout: Duration) -> Result<(), PublishError> {
        let Some(confirms) = &self.confirms else {
            // Confirms were not requested for this broker.
            return Ok(());
        };
        let expected = self.delivery_tag;
        let deadline = Instant::now() + timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match confirms.recv_timeout(remaining) {
                Ok(Confirm::Ack(payload)) if covers(&payload, expected) => return Ok(()),
                Ok(Confirm::Nack(payload)) if covers(&payload, expected) => {
                    return Err(PublishError::Nacked(expected))
                }
                // A late answer for an earlier message.
                Ok(_) => continue,
                Err(RecvTimeoutError::Timeout) => return Err(PublishError::ConfirmTimeout(timeout)),
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(PublishError::ConfirmChannelClosed)
                }
            }
        }
    }

    fn close(&mut self) -> Result<(), CloseError> {
        self.confirms = None;
        let mut result = Ok(());

        if let Some(channel) = self.channel.take() {
            if let Err(e) = channel.close() {
                result = Err(CloseError {
                    resource: "channel",
                    reason: e.to_string(),
                });
            }
        }
        if let Some(connection) = self.connection.take() {
            if let Err(e) = connection.close() {
                if result.is_ok() {
                    result = Err(CloseError {
                        resource: "connection",
                        reason: e.to_string(),
                    });
                }
            }
        }
        result
    }
}

/// Whether a confirmation for `payload` includes delivery tag `tag`.
fn covers(payload: &ConfirmPayload, tag: u64) -> bool {
    payload.delivery_tag == tag || (payload.multiple && payload.delivery_tag >= tag)
}

/// Resolve the broker host on a helper thread so a stalled resolver cannot
/// hold the caller past `timeout`.
fn resolve(endpoint: &BrokerEndpoint, timeout: Duration) -> Result<Vec<SocketAddr>, ConnectError> {
    let broker = endpoint.address();
    let url = endpoint.url.clone();
    let port = endpoint.port();
    let (sender, receiver) = crossbeam_channel::bounded(1);

    thread::Builder::new()
        .name("amqp-resolve".to_string())
        .spawn(move || {
            // The receiver is gone when the caller already timed out.
            let _ = sender.send(url.socket_addrs(|| Some(port)));
        })
        .map_err(|e| ConnectError::new(&broker, ConnectStage::Dial, e))?;

    match receiver.recv_timeout(timeout) {
        Ok(Ok(addrs)) => Ok(addrs),
        Ok(Err(e)) => Err(ConnectError::new(&broker, ConnectStage::Dial, e)),
        Err(_) => Err(ConnectError::new(
            &broker,
            ConnectStage::Dial,
            format!("name resolution timed out after {timeout:?}"),
        )),
    }
}

/// Open a TCP connection to the first address of `endpoint` that answers.
/// Resolution and every connect attempt share one `timeout` budget.
fn dial(endpoint: &BrokerEndpoint, timeout: Duration) -> Result<TcpStream, ConnectError> {
    let broker = endpoint.address();
    let deadline = Instant::now() + timeout;
    let addrs = resolve(endpoint, timeout)?;

    let mut last_error = None;
    for addr in addrs {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            last_error = Some(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                format!("connect timed out after {timeout:?}"),
            ));
            break;
        }
        match TcpStream::connect_timeout(&addr, remaining) {
            Ok(stream) => {
                stream
                    .set_nodelay(true)
                    .map_err(|e| ConnectError::new(&broker, ConnectStage::Dial, e))?;
                return Ok(stream);
            }
            Err(e) => {
                log::debug!("Could not reach {addr} for {broker}: {e}");
                last_error = Some(e);
            }
        }
    }

    Err(ConnectError::new(
        &broker,
        ConnectStage::Dial,
        last_error.map_or_else(|| "no address resolved".to_string(), |e| e.to_string()),
    ))
}

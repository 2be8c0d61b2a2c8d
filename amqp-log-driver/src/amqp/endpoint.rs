//! Broker endpoints and the round-robin broker list.

use crate::error::ConfigError;
use std::fmt;
use std::path::PathBuf;
use url::Url;

pub const AMQP_SCHEME: &str = "amqp";
pub const AMQPS_SCHEME: &str = "amqps";
pub const AMQP_PORT: u16 = 5672;
pub const AMQPS_PORT: u16 = 5671;

/// Connection settings for one broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerEndpoint {
    pub url: Url,
    pub exchange: String,
    pub queue: String,
    pub routing_key: String,
    pub tag: String,
    pub cert_path: Option<PathBuf>,
    pub key_path: Option<PathBuf>,
    pub confirm: bool,
}

impl BrokerEndpoint {
    /// Parse and check a broker URL. Only `amqp` and `amqps` are accepted.
    pub fn parse_url(raw: &str) -> Result<Url, ConfigError> {
        let url = Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidUrl {
            url: raw.to_string(),
            reason: e.to_string(),
        })?;

        if url.scheme() != AMQP_SCHEME && url.scheme() != AMQPS_SCHEME {
            return Err(ConfigError::InvalidUrl {
                url: raw.to_string(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }
        if !matches!(url.host_str(), Some(host) if !host.is_empty()) {
            return Err(ConfigError::InvalidUrl {
                url: raw.to_string(),
                reason: "missing host".to_string(),
            });
        }
        Ok(url)
    }

    pub fn is_secure(&self) -> bool {
        self.url.scheme() == AMQPS_SCHEME
    }

    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    pub fn port(&self) -> u16 {
        self.url.port().unwrap_or(if self.is_secure() {
            AMQPS_PORT
        } else {
            AMQP_PORT
        })
    }

    /// Virtual host named by the URL path, `/` when the path is empty.
    pub fn vhost(&self) -> String {
        let path = self.url.path();
        let raw = path.strip_prefix('/').unwrap_or(path);
        if raw.is_empty() {
            return "/".to_string();
        }
        percent_encoding::percent_decode_str(raw)
            .decode_utf8_lossy()
            .into_owned()
    }

    /// Credentials from the URL, defaulting to `guest`/`guest`.
    pub fn credentials(&self) -> (String, String) {
        let decode = |raw: &str| {
            percent_encoding::percent_decode_str(raw)
                .decode_utf8_lossy()
                .into_owned()
        };
        let username = match self.url.username() {
            "" => "guest".to_string(),
            name => decode(name),
        };
        let password = self.url.password().map_or_else(|| "guest".to_string(), decode);
        (username, password)
    }

    /// `host:port/vhost`, safe to log because it carries no credentials.
    pub fn address(&self) -> String {
        format!("{}:{}/{}", self.host(), self.port(), self.vhost())
    }
}

impl fmt::Display for BrokerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.url.scheme(), self.address())
    }
}

/// Ordered, non-empty list of brokers with a cursor on the current one.
#[derive(Debug, Clone)]
pub struct BrokerList {
    head: BrokerEndpoint,
    tail: Vec<BrokerEndpoint>,
    current: usize,
}

impl BrokerList {
    pub fn new(endpoints: Vec<BrokerEndpoint>) -> Result<Self, ConfigError> {
        let mut endpoints = endpoints.into_iter();
        let head = endpoints
            .next()
            .ok_or(ConfigError::MissingOption("amqp-url"))?;
        Ok(Self {
            head,
            tail: endpoints.collect(),
            current: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.tail.len() + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn get(&self, index: usize) -> Option<&BrokerEndpoint> {
        match index {
            0 => Some(&self.head),
            n => self.tail.get(n - 1),
        }
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> &BrokerEndpoint {
        self.get(self.current).unwrap_or(&self.head)
    }

    /// Move the cursor to the next broker, wrapping to the start.
    pub fn advance(&mut self) -> usize {
        self.current = (self.current + 1) % self.len();
        self.current
    }

    pub fn iter(&self) -> impl Iterator<Item = &BrokerEndpoint> {
        std::iter::once(&self.head).chain(self.tail.iter())
    }
}

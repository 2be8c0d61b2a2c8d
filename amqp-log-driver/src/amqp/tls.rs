//! TLS context for `amqps` brokers.

use crate::amqp::endpoint::BrokerEndpoint;
use crate::error::{ConnectError, ConnectStage};
use native_tls::{Identity, TlsConnector};
use std::path::Path;

/// Load a PEM certificate and PKCS#8 PEM key as a client identity.
pub fn load_identity(cert_path: &Path, key_path: &Path) -> Result<Identity, String> {
    let cert = std::fs::read(cert_path)
        .map_err(|e| format!("could not read {}: {e}", cert_path.display()))?;
    let key = std::fs::read(key_path)
        .map_err(|e| format!("could not read {}: {e}", key_path.display()))?;
    Identity::from_pkcs8(&cert, &key).map_err(|e| format!("invalid certificate or key: {e}"))
}

/// The client identity configured for `endpoint`, if any loads.
///
/// A missing half of the pair or a pair that fails to load is logged and
/// yields `None`: the connection then proceeds without client authentication.
pub fn client_identity(endpoint: &BrokerEndpoint) -> Option<Identity> {
    match (&endpoint.cert_path, &endpoint.key_path) {
        (Some(cert), Some(key)) => match load_identity(cert, key) {
            Ok(identity) => Some(identity),
            Err(e) => {
                log::warn!(
                    "Could not load client certificate for {endpoint}, connecting without it: {e}"
                );
                None
            }
        },
        (None, None) => None,
        _ => {
            log::warn!(
                "Only one of certificate and key configured for {endpoint}, connecting without a client certificate"
            );
            None
        }
    }
}

/// Build the TLS connector for `endpoint`.
pub fn tls_connector(endpoint: &BrokerEndpoint) -> Result<TlsConnector, ConnectError> {
    let mut builder = TlsConnector::builder();
    if let Some(identity) = client_identity(endpoint) {
        builder.identity(identity);
    }
    builder
        .build()
        .map_err(|e| ConnectError::new(endpoint.address(), ConnectStage::Tls, e))
}

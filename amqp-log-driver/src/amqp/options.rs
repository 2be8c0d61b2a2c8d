//! Option keys accepted by the AMQP driver and their parsed form.

use crate::amqp::endpoint::{BrokerEndpoint, BrokerList};
use crate::amqp::NAME;
use crate::error::ConfigError;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use strum_macros::{EnumString, IntoStaticStr, VariantNames};

pub const DEFAULT_EXCHANGE: &str = "docker-logs";
pub const DEFAULT_QUEUE: &str = "docker-logs";
pub const DEFAULT_CONFIRM_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Every option key the driver understands.
#[derive(EnumString, IntoStaticStr, VariantNames, Debug, Clone, Copy, Eq, Hash, PartialEq)]
#[strum(serialize_all = "kebab_case")]
pub enum LogOpt {
    AmqpUrl,
    AmqpExchange,
    AmqpQueue,
    AmqpRoutingkey,
    AmqpTag,
    AmqpCert,
    AmqpKey,
    AmqpConfirm,
    AmqpSettings,
    AmqpConfirmTimeoutMs,
    AmqpConnectTimeoutMs,
    AmqpFailover,
    AmqpSeverity,
}

impl LogOpt {
    pub fn key(self) -> &'static str {
        self.into()
    }
}

/// Checks every key against the allow-list. Values are not inspected.
pub fn validate_log_opt(config: &HashMap<String, String>) -> Result<(), ConfigError> {
    for key in config.keys() {
        if LogOpt::from_str(key).is_err() {
            return Err(ConfigError::UnknownOption {
                key: key.clone(),
                driver: NAME.to_string(),
            });
        }
    }
    Ok(())
}

/// What to do when a publish fails.
#[derive(EnumString, IntoStaticStr, VariantNames, Debug, Clone, Copy, Default, Eq, PartialEq)]
#[strum(serialize_all = "kebab_case")]
pub enum FailoverPolicy {
    /// Move to the next broker once, then give up.
    #[default]
    OneStep,
    /// Try every configured broker once before giving up.
    Exhaustive,
}

/// Driver wide settings that are not tied to a broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverSettings {
    pub confirm_timeout: Duration,
    pub connect_timeout: Duration,
    pub failover: FailoverPolicy,
    pub include_severity: bool,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            confirm_timeout: DEFAULT_CONFIRM_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            failover: FailoverPolicy::default(),
            include_severity: false,
        }
    }
}

/// One entry of the `amqp-settings` JSON array. Missing fields fall back to
/// the flat options.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct BrokerSettings {
    url: String,
    exchange: Option<String>,
    queue: Option<String>,
    routing_key: Option<String>,
    tag: Option<String>,
    cert: Option<PathBuf>,
    key: Option<PathBuf>,
    confirm: Option<bool>,
}

/// The parsed option map.
#[derive(Debug, Clone)]
pub struct AmqpOptions {
    pub brokers: BrokerList,
    pub settings: DriverSettings,
    /// Value of `amqp-tag`, reported in every envelope.
    pub tag: String,
}

impl AmqpOptions {
    pub fn from_config(config: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let opts = RawOptions { config };
        let defaults = opts.endpoint_defaults()?;

        let endpoints = match (opts.get(LogOpt::AmqpUrl), opts.get(LogOpt::AmqpSettings)) {
            (Some(_), Some(_)) => {
                return Err(ConfigError::ConflictingOptions(
                    LogOpt::AmqpUrl.key(),
                    LogOpt::AmqpSettings.key(),
                ))
            }
            (Some(urls), None) => parse_url_list(urls, &defaults)?,
            (None, Some(json)) => parse_settings(json, &defaults)?,
            (None, None) => return Err(ConfigError::MissingOption(LogOpt::AmqpUrl.key())),
        };

        let settings = DriverSettings {
            confirm_timeout: opts
                .millis(LogOpt::AmqpConfirmTimeoutMs)?
                .unwrap_or(DEFAULT_CONFIRM_TIMEOUT),
            connect_timeout: opts
                .millis(LogOpt::AmqpConnectTimeoutMs)?
                .unwrap_or(DEFAULT_CONNECT_TIMEOUT),
            failover: opts.failover()?,
            include_severity: opts.flag(LogOpt::AmqpSeverity)?.unwrap_or(false),
        };

        Ok(Self {
            brokers: BrokerList::new(endpoints)?,
            settings,
            tag: opts.get(LogOpt::AmqpTag).unwrap_or_default().to_string(),
        })
    }
}

struct RawOptions<'a> {
    config: &'a HashMap<String, String>,
}

impl RawOptions<'_> {
    fn get(&self, opt: LogOpt) -> Option<&str> {
        self.config.get(opt.key()).map(String::as_str)
    }

    fn invalid(opt: LogOpt, value: &str, reason: impl ToString) -> ConfigError {
        ConfigError::InvalidValue {
            key: opt.key(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    fn flag(&self, opt: LogOpt) -> Result<Option<bool>, ConfigError> {
        self.get(opt)
            .map(|raw| bool::from_str(raw.trim()).map_err(|e| Self::invalid(opt, raw, e)))
            .transpose()
    }

    fn millis(&self, opt: LogOpt) -> Result<Option<Duration>, ConfigError> {
        let Some(raw) = self.get(opt) else {
            return Ok(None);
        };
        let ms = u64::from_str(raw.trim()).map_err(|e| Self::invalid(opt, raw, e))?;
        if ms == 0 {
            return Err(Self::invalid(opt, raw, "must be greater than zero"));
        }
        Ok(Some(Duration::from_millis(ms)))
    }

    fn failover(&self) -> Result<FailoverPolicy, ConfigError> {
        let Some(raw) = self.get(LogOpt::AmqpFailover) else {
            return Ok(FailoverPolicy::default());
        };
        FailoverPolicy::from_str(raw.trim()).map_err(|_| {
            Self::invalid(
                LogOpt::AmqpFailover,
                raw,
                "expected 'one-step' or 'exhaustive'",
            )
        })
    }

    fn path(&self, opt: LogOpt) -> Option<PathBuf> {
        self.get(opt)
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
    }

    fn endpoint_defaults(&self) -> Result<EndpointDefaults, ConfigError> {
        let queue = self.get(LogOpt::AmqpQueue).unwrap_or(DEFAULT_QUEUE).to_string();
        Ok(EndpointDefaults {
            exchange: self
                .get(LogOpt::AmqpExchange)
                .unwrap_or(DEFAULT_EXCHANGE)
                .to_string(),
            routing_key: self
                .get(LogOpt::AmqpRoutingkey)
                .map_or_else(|| queue.clone(), str::to_string),
            queue,
            tag: self.get(LogOpt::AmqpTag).unwrap_or_default().to_string(),
            cert_path: self.path(LogOpt::AmqpCert),
            key_path: self.path(LogOpt::AmqpKey),
            confirm: self.flag(LogOpt::AmqpConfirm)?.unwrap_or(false),
        })
    }
}

struct EndpointDefaults {
    exchange: String,
    queue: String,
    routing_key: String,
    tag: String,
    cert_path: Option<PathBuf>,
    key_path: Option<PathBuf>,
    confirm: bool,
}

impl EndpointDefaults {
    fn endpoint(&self, raw_url: &str) -> Result<BrokerEndpoint, ConfigError> {
        Ok(BrokerEndpoint {
            url: BrokerEndpoint::parse_url(raw_url)?,
            exchange: self.exchange.clone(),
            queue: self.queue.clone(),
            routing_key: self.routing_key.clone(),
            tag: self.tag.clone(),
            cert_path: self.cert_path.clone(),
            key_path: self.key_path.clone(),
            confirm: self.confirm,
        })
    }
}

fn parse_url_list(
    urls: &str,
    defaults: &EndpointDefaults,
) -> Result<Vec<BrokerEndpoint>, ConfigError> {
    let endpoints = urls
        .split(',')
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(|u| defaults.endpoint(u))
        .collect::<Result<Vec<_>, _>>()?;

    endpoints
        .first()
        .ok_or_else(|| RawOptions::invalid(LogOpt::AmqpUrl, urls, "no broker URL given"))?;
    Ok(endpoints)
}

fn parse_settings(
    json: &str,
    defaults: &EndpointDefaults,
) -> Result<Vec<BrokerEndpoint>, ConfigError> {
    let entries: Vec<BrokerSettings> = serde_json::from_str(json)
        .map_err(|e| RawOptions::invalid(LogOpt::AmqpSettings, json, e))?;

    entries
        .into_iter()
        .map(|entry| {
            let mut endpoint = defaults.endpoint(&entry.url)?;
            if let Some(exchange) = entry.exchange {
                endpoint.exchange = exchange;
            }
            if let Some(queue) = entry.queue {
                if entry.routing_key.is_none() && defaults.routing_key == defaults.queue {
                    endpoint.routing_key = queue.clone();
                }
                endpoint.queue = queue;
            }
            if let Some(routing_key) = entry.routing_key {
                endpoint.routing_key = routing_key;
            }
            if let Some(tag) = entry.tag {
                endpoint.tag = tag;
            }
            if entry.cert.is_some() {
                endpoint.cert_path = entry.cert;
            }
            if entry.key.is_some() {
                endpoint.key_path = entry.key;
            }
            if let Some(confirm) = entry.confirm {
                endpoint.confirm = confirm;
            }
            Ok(endpoint)
        })
        .collect::<Result<Vec<_>, _>>()
        .and_then(|endpoints| {
            endpoints.first().ok_or_else(|| {
                RawOptions::invalid(LogOpt::AmqpSettings, json, "no brokers configured")
            })?;
            Ok(endpoints)
        })
}

#[cfg(test)]
#[allow(clippy::panic)] // Tests are allowed to panic on setup failures
mod tests {
    use super::*;
    use strum::VariantNames;

    fn config(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_log_opt_keys() {
        assert_eq!(LogOpt::AmqpUrl.key(), "amqp-url");
        assert_eq!(LogOpt::AmqpRoutingkey.key(), "amqp-routingkey");
        assert_eq!(LogOpt::AmqpConfirmTimeoutMs.key(), "amqp-confirm-timeout-ms");
        assert_eq!(LogOpt::VARIANTS.len(), 13);
        assert!(LogOpt::VARIANTS.contains(&"amqp-settings"));
    }

    #[test]
    fn test_validate_accepts_known_keys() {
        let cfg = config(&[
            ("amqp-url", "amqp://localhost"),
            ("amqp-cert", "/etc/cert.pem"),
            ("amqp-key", "/etc/key.pem"),
            ("amqp-exchange", "ex"),
            ("amqp-queue", "q"),
            ("amqp-routingkey", "rk"),
            ("amqp-tag", "web"),
            ("amqp-confirm", "true"),
        ]);
        assert!(validate_log_opt(&cfg).is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_key() {
        let cfg = config(&[("amqp-url", "amqp://localhost"), ("max-size", "10m")]);
        let result = validate_log_opt(&cfg);
        assert!(matches!(
            result,
            Err(ConfigError::UnknownOption { key, driver }) if key == "max-size" && driver == "amqp"
        ));
    }

    #[test]
    fn test_defaults() {
        let opts = AmqpOptions::from_config(&config(&[("amqp-url", "amqp://localhost")]))
            .unwrap_or_else(|e| panic!("{e}"));
        let broker = opts.brokers.current();
        assert_eq!(broker.exchange, DEFAULT_EXCHANGE);
        assert_eq!(broker.queue, DEFAULT_QUEUE);
        assert_eq!(broker.routing_key, DEFAULT_QUEUE);
        assert!(!broker.confirm);
        assert_eq!(opts.settings, DriverSettings::default());
        assert!(opts.tag.is_empty());
    }

    #[test]
    fn test_routing_key_defaults_to_queue() {
        let opts = AmqpOptions::from_config(&config(&[
            ("amqp-url", "amqp://localhost"),
            ("amqp-queue", "web-logs"),
        ]))
        .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(opts.brokers.current().routing_key, "web-logs");
    }

    #[test]
    fn test_comma_separated_urls() {
        let opts = AmqpOptions::from_config(&config(&[
            ("amqp-url", "amqp://b1, amqps://b2:5999 ,"),
            ("amqp-exchange", "ex"),
            ("amqp-confirm", "true"),
        ]))
        .unwrap_or_else(|e| panic!("{e}"));

        assert_eq!(opts.brokers.len(), 2);
        let hosts: Vec<_> = opts.brokers.iter().map(|b| b.address()).collect();
        assert_eq!(hosts, vec!["b1:5672//", "b2:5999//"]);
        assert!(opts.brokers.iter().all(|b| b.exchange == "ex" && b.confirm));
    }

    #[test]
    fn test_bad_url_is_config_error() {
        let result = AmqpOptions::from_config(&config(&[("amqp-url", "amqp://ok,ftp://bad")]));
        assert!(matches!(result, Err(ConfigError::InvalidUrl { url, .. }) if url == "ftp://bad"));
    }

    #[test]
    fn test_missing_url() {
        let result = AmqpOptions::from_config(&config(&[("amqp-queue", "q")]));
        assert!(matches!(result, Err(ConfigError::MissingOption("amqp-url"))));

        let result = AmqpOptions::from_config(&config(&[("amqp-url", " , ")]));
        assert!(matches!(result, Err(ConfigError::InvalidValue { key: "amqp-url", .. })));
    }

    #[test]
    fn test_url_and_settings_conflict() {
        let result = AmqpOptions::from_config(&config(&[
            ("amqp-url", "amqp://b1"),
            ("amqp-settings", r#"[{"url": "amqp://b2"}]"#),
        ]));
        assert!(matches!(result, Err(ConfigError::ConflictingOptions(_, _))));
    }

    #[test]
    fn test_settings_override_flat_options() {
        let opts = AmqpOptions::from_config(&config(&[
            ("amqp-exchange", "shared"),
            ("amqp-cert", "/etc/shared.pem"),
            (
                "amqp-settings",
                r#"[
                    {"url": "amqps://primary", "confirm": true, "tag": "p"},
                    {"url": "amqp://backup", "queue": "backup-q", "exchange": "ex2"}
                ]"#,
            ),
        ]))
        .unwrap_or_else(|e| panic!("{e}"));

        let primary = opts.brokers.get(0).unwrap_or_else(|| panic!("primary"));
        assert_eq!(primary.exchange, "shared");
        assert!(primary.confirm);
        assert_eq!(primary.tag, "p");
        assert_eq!(primary.cert_path, Some(PathBuf::from("/etc/shared.pem")));

        let backup = opts.brokers.get(1).unwrap_or_else(|| panic!("backup"));
        assert_eq!(backup.exchange, "ex2");
        assert_eq!(backup.queue, "backup-q");
        assert_eq!(backup.routing_key, "backup-q");
        assert!(!backup.confirm);
    }

    #[test]
    fn test_settings_reject_unknown_fields_and_empty_lists() {
        let result = AmqpOptions::from_config(&config(&[(
            "amqp-settings",
            r#"[{"url": "amqp://b1", "vhost": "x"}]"#,
        )]));
        assert!(matches!(result, Err(ConfigError::InvalidValue { key: "amqp-settings", .. })));

        let result = AmqpOptions::from_config(&config(&[("amqp-settings", "[]")]));
        assert!(matches!(result, Err(ConfigError::InvalidValue { key: "amqp-settings", .. })));
    }

    #[test]
    fn test_driver_settings() {
        let opts = AmqpOptions::from_config(&config(&[
            ("amqp-url", "amqp://b1"),
            ("amqp-confirm-timeout-ms", "250"),
            ("amqp-connect-timeout-ms", "1500"),
            ("amqp-failover", "exhaustive"),
            ("amqp-severity", "true"),
            ("amqp-tag", "frontend"),
        ]))
        .unwrap_or_else(|e| panic!("{e}"));

        assert_eq!(opts.settings.confirm_timeout, Duration::from_millis(250));
        assert_eq!(opts.settings.connect_timeout, Duration::from_millis(1500));
        assert_eq!(opts.settings.failover, FailoverPolicy::Exhaustive);
        assert!(opts.settings.include_severity);
        assert_eq!(opts.tag, "frontend");
    }

    #[test]
    fn test_invalid_values() {
        for (key, value) in [
            ("amqp-confirm", "yes"),
            ("amqp-severity", "1"),
            ("amqp-confirm-timeout-ms", "soon"),
            ("amqp-connect-timeout-ms", "0"),
            ("amqp-failover", "random"),
        ] {
            let result = AmqpOptions::from_config(&config(&[("amqp-url", "amqp://b1"), (key, value)]));
            assert!(
                matches!(&result, Err(ConfigError::InvalidValue { key: k, .. }) if *k == key),
                "{key}={value} should be rejected, got {result:?}"
            );
        }
    }
}

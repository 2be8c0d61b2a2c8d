//! Integration tests for driver registration and option validation.
//!
//! These go through the registry exactly as a host would at startup. None of
//! them reach a broker: every case fails validation before a dial happens.

#![allow(clippy::panic)] // Tests are allowed to panic on setup failures

use amqp_log_driver::amqp::{self, LogOpt};
use amqp_log_driver::prelude::*;
use std::collections::HashMap;
use strum::VariantNames;

fn registry() -> DriverRegistry {
    let mut registry = DriverRegistry::new();
    if let Err(e) = amqp::register(&mut registry) {
        panic!("registering the AMQP driver failed: {e}");
    }
    registry
}

fn options(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_every_documented_key_is_accepted() {
    let registry = registry();
    let all: Vec<(&str, &str)> = LogOpt::VARIANTS.iter().map(|key| (*key, "x")).collect();
    assert_eq!(all.len(), 13);
    assert!(registry.validate(amqp::NAME, &options(&all)).is_ok());
}

#[test]
fn test_unknown_key_names_key_and_driver() {
    let registry = registry();
    let result = registry.validate(
        "amqp",
        &options(&[("amqp-url", "amqp://localhost"), ("amqp-bogus", "1")]),
    );
    match result {
        Err(ConfigError::UnknownOption { key, driver }) => {
            assert_eq!(key, "amqp-bogus");
            assert_eq!(driver, "amqp");
        }
        other => panic!("expected UnknownOption, got {other:?}"),
    }
}

#[test]
fn test_unknown_driver() {
    let registry = registry();
    let ctx = DriverContext::default().with_option("amqp-url", "amqp://localhost");
    assert!(matches!(
        registry.create("syslog", &ctx),
        Err(ConfigError::UnknownDriver(name)) if name == "syslog"
    ));
}

#[test]
fn test_create_rejects_conflicting_broker_options() {
    let registry = registry();
    let ctx = DriverContext::default()
        .with_option("amqp-url", "amqp://localhost")
        .with_option("amqp-settings", r#"[{"url": "amqp://localhost"}]"#)
        .with_hostname("docker-host");
    assert!(matches!(
        registry.create(amqp::NAME, &ctx),
        Err(ConfigError::ConflictingOptions(_, _))
    ));
}

#[test]
fn test_create_requires_a_broker() {
    let registry = registry();
    let ctx = DriverContext::default()
        .with_option("amqp-exchange", "logs")
        .with_hostname("docker-host");
    assert!(matches!(
        registry.create(amqp::NAME, &ctx),
        Err(ConfigError::MissingOption("amqp-url"))
    ));
}

#[test]
fn test_create_rejects_bad_values() {
    let registry = registry();
    let cases = [
        ("amqp-confirm", "yes"),
        ("amqp-severity", "1"),
        ("amqp-confirm-timeout-ms", "soon"),
        ("amqp-failover", "random"),
    ];
    for (key, value) in cases {
        let ctx = DriverContext::default()
            .with_option("amqp-url", "amqp://localhost")
            .with_option(key, value)
            .with_hostname("docker-host");
        assert!(
            matches!(
                registry.create(amqp::NAME, &ctx),
                Err(ConfigError::InvalidValue { .. })
            ),
            "{key}={value} should be rejected"
        );
    }
}

#[test]
fn test_create_rejects_blank_hostname() {
    let registry = registry();
    let ctx = DriverContext::default()
        .with_option("amqp-url", "amqp://localhost")
        .with_hostname("   ");
    assert!(matches!(
        registry.create(amqp::NAME, &ctx),
        Err(ConfigError::Hostname(_))
    ));
}

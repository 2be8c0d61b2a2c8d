//! The JSON envelope published for every log line.

use crate::driver::{DriverContext, LogMessage, LogSeverity};
use crate::error::{ConfigError, PublishError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const ENVELOPE_VERSION: &str = "1";
pub const CONTENT_TYPE: &str = "application/json";

/// Host and container details captured once, when the driver is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipperMetadata {
    #[serde(rename = "Hostname")]
    pub hostname: String,
    #[serde(rename = "ContainerID")]
    pub container_id: String,
    #[serde(rename = "ContainerName")]
    pub container_name: String,
    #[serde(rename = "ImageID")]
    pub image_id: String,
    #[serde(rename = "ImageName")]
    pub image_name: String,
    #[serde(rename = "Command")]
    pub command: String,
    #[serde(rename = "Tag")]
    pub tag: String,
    #[serde(rename = "Created")]
    pub created: DateTime<Utc>,
}

impl ShipperMetadata {
    pub fn from_context(ctx: &DriverContext, tag: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            hostname: ctx.hostname()?,
            container_id: ctx.container_id.clone(),
            container_name: ctx.container_name.trim_start_matches('/').to_string(),
            image_id: ctx.container_image_id.clone(),
            image_name: ctx.container_image_name.clone(),
            command: ctx.command(),
            tag: tag.to_string(),
            created: ctx.container_created,
        })
    }
}

/// The message body placed on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEnvelope {
    pub message: String,
    #[serde(rename = "@version")]
    pub version: String,
    /// Publish time, not the time the line was written.
    #[serde(rename = "@timestamp")]
    pub timestamp: DateTime<Utc>,
    pub tags: ShipperMetadata,
    pub host: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<LogSeverity>,
}

/// Turns captured lines into envelopes.
#[derive(Debug, Clone)]
pub struct MessageFormatter {
    metadata: ShipperMetadata,
    include_severity: bool,
}

impl MessageFormatter {
    pub fn new(metadata: ShipperMetadata, include_severity: bool) -> Self {
        Self {
            metadata,
            include_severity,
        }
    }

    pub fn metadata(&self) -> &ShipperMetadata {
        &self.metadata
    }

    /// Build the envelope for `message`, or `None` when the line is blank.
    pub fn format(&self, message: &LogMessage, now: DateTime<Utc>) -> Option<LogEnvelope> {
        let text = message.line.trim();
        if text.is_empty() {
            return None;
        }

        Some(LogEnvelope {
            message: text.to_string(),
            version: ENVELOPE_VERSION.to_string(),
            timestamp: now,
            tags: self.metadata.clone(),
            host: self.metadata.hostname.clone(),
            path: self.metadata.container_id.clone(),
            level: self
                .include_severity
                .then(|| LogSeverity::from(message.source)),
        })
    }

    pub fn encode(envelope: &LogEnvelope) -> Result<Vec<u8>, PublishError> {
        Ok(serde_json::to_vec(envelope)?)
    }
}

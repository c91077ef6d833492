//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// HTTP listener settings (bind address, TLS enforcement, body limit).
    pub listener: ListenerConfig,

    /// Token table: user name -> credential.
    pub credentials: HashMap<String, CredentialConfig>,

    /// Query-derived structured-data settings.
    pub metadata: MetadataConfig,

    /// Outlet queue between ingress and forwarders.
    pub outlet: OutletConfig,

    /// Downstream drain transport.
    pub forwarder: ForwarderConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:5000").
    pub bind_address: String,

    /// Reject requests whose `X-Forwarded-Proto` is not `https`.
    pub enforce_ssl: bool,

    /// Maximum request body size in bytes (after transfer, before gunzip).
    pub max_body_size: usize,

    /// Longest gap between body chunks before the request is abandoned,
    /// in milliseconds.
    pub body_timeout_ms: u64,
}

impl ListenerConfig {
    pub fn body_timeout(&self) -> Duration {
        Duration::from_millis(self.body_timeout_ms)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5000".to_string(),
            enforce_ssl: false,
            max_body_size: 10 * 1024 * 1024, // 10MB
            body_timeout_ms: 30_000,
        }
    }
}

/// One entry of the token table.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CredentialConfig {
    /// Shared secret presented as the Basic auth password.
    pub secret: String,

    /// Rotation stage label (e.g. "current", "previous").
    #[serde(default = "default_stage")]
    pub stage: String,

    /// Deprecated credentials are accepted but tagged in emitted metadata.
    #[serde(default)]
    pub deprecated: bool,
}

fn default_stage() -> String {
    "current".to_string()
}

/// Query-derived structured-data configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MetadataConfig {
    /// SD-ID of the query metadata element (e.g. "metadata@123").
    /// Empty disables the element.
    pub id: String,

    /// Query parameters copied into the element, in emission order.
    pub query_keys: Vec<String>,

    /// Subset of `query_keys` grouped under a single `fields="k=v,..."`.
    pub field_keys: Vec<String>,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            query_keys: vec![
                "index".to_string(),
                "source".to_string(),
                "sourcetype".to_string(),
            ],
            field_keys: Vec::new(),
        }
    }
}

/// Outlet (bounded hand-off queue) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutletConfig {
    /// Maximum queued payloads. The only backpressure mechanism.
    pub capacity: usize,

    /// Deadline for enqueue plus acknowledgment, in milliseconds.
    pub deliver_timeout_ms: u64,

    /// Number of forwarder workers draining the outlet.
    pub forwarders: usize,
}

impl OutletConfig {
    pub fn deliver_timeout(&self) -> Duration {
        Duration::from_millis(self.deliver_timeout_ms)
    }
}

impl Default for OutletConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            deliver_timeout_ms: 5000,
            forwarders: 4,
        }
    }
}

/// Downstream drain transport configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ForwarderConfig {
    /// Drain address (e.g., "127.0.0.1:6514").
    pub destination: String,

    /// Connection establishment timeout in milliseconds.
    pub connect_timeout_ms: u64,

    /// Attempts per payload before it is accepted as failed.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            destination: "127.0.0.1:6514".to_string(),
            connect_timeout_ms: 5000,
            max_attempts: 3,
            base_delay_ms: 100,
            max_delay_ms: 2000,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log line format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

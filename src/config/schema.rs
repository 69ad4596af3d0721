//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::retrieval::Strategy;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RealIpConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Where resolved requests are forwarded.
    pub upstream: UpstreamConfig,

    /// Client address retrieval policy.
    pub retriever: RetrieverConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Upstream configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the upstream (e.g., "http://127.0.0.1:3000").
    /// Without one, the server answers with the resolved address itself.
    pub url: Option<String>,
}

/// Retrieval policy: which header to read and whom to trust.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetrieverConfig {
    /// Forwarding header holding the address chain.
    pub header: String,

    /// Trust rule applied to the chain.
    pub strategy: Strategy,

    /// Number of trusted proxies in front of us (`proxy-count` only).
    pub proxy_count: Option<i64>,

    /// Networks whose members are proxies (`proxy-cidr` only).
    pub proxy_cidrs: Vec<String>,

    /// Header the resolved address is written to before forwarding.
    pub target_header: String,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            header: "X-Forwarded-For".to_string(),
            strategy: Strategy::Direct,
            proxy_count: None,
            proxy_cidrs: Vec::new(),
            target_header: "X-Real-Ip".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

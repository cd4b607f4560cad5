//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the router.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct RouterConfig {
    /// Mapping API listener.
    pub listener: ListenerConfig,

    /// Load balancer configuration files.
    pub haproxy: HaproxyConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration for the mapping API.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:9999").
    pub bind_address: String,

    /// Maximum accepted request body in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:9999".to_string(),
            max_body_bytes: 1024 * 1024,
            request_timeout_secs: 30,
        }
    }
}

/// HAProxy configuration files.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct HaproxyConfig {
    /// Template every generated configuration starts from. Never modified.
    pub base_config_path: String,

    /// Live configuration read by HAProxy. Replaced on every sync.
    pub config_path: String,
}

impl Default for HaproxyConfig {
    fn default() -> Self {
        Self {
            base_config_path: "/var/vcap/jobs/haproxy/config/haproxy.conf".to_string(),
            config_path: "/var/vcap/data/haproxy/haproxy.conf".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus endpoint.
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

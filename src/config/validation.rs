//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Reject file layouts that would overwrite the base template
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RouterConfig → Result<(), Vec<ConfigValidationError>>
//! - File existence is checked later, when the configurer is built

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::RouterConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigValidationError {
    #[error("{field}: invalid socket address {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field} must not be empty")]
    EmptyPath { field: &'static str },

    #[error("haproxy.base_config_path and haproxy.config_path must differ")]
    SamePaths,

    #[error("{field} must be greater than 0")]
    Zero { field: &'static str },

    #[error("observability.log_level: unknown level {0:?}")]
    UnknownLogLevel(String),
}

pub fn validate_config(config: &RouterConfig) -> Result<(), Vec<ConfigValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ConfigValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.listener.max_body_bytes == 0 {
        errors.push(ConfigValidationError::Zero { field: "listener.max_body_bytes" });
    }
    if config.listener.request_timeout_secs == 0 {
        errors.push(ConfigValidationError::Zero { field: "listener.request_timeout_secs" });
    }

    let haproxy = &config.haproxy;
    if haproxy.base_config_path.trim().is_empty() {
        errors.push(ConfigValidationError::EmptyPath { field: "haproxy.base_config_path" });
    }
    if haproxy.config_path.trim().is_empty() {
        errors.push(ConfigValidationError::EmptyPath { field: "haproxy.config_path" });
    }
    if !haproxy.config_path.trim().is_empty() && haproxy.base_config_path == haproxy.config_path {
        errors.push(ConfigValidationError::SamePaths);
    }

    let observability = &config.observability;
    if !LOG_LEVELS.contains(&observability.log_level.to_lowercase().as_str()) {
        errors.push(ConfigValidationError::UnknownLogLevel(observability.log_level.clone()));
    }
    if observability.metrics_enabled && observability.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ConfigValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

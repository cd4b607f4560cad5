//! Inbound port-mapping requests.
//!
//! # Wire Format
//! ```json
//! [{"external_port": 2222, "backends": [{"ip": "10.1.1.12", "port": 60000}]}]
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::configurer::render::is_valid_address;
use crate::routing::table::RoutingTable;

/// One backend as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendHostInfo {
    #[serde(rename = "ip", alias = "address")]
    pub address: String,
    pub port: u16,
}

impl BackendHostInfo {
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
        }
    }
}

/// Request to expose `external_port` and balance it across `backends`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRequest {
    pub external_port: u16,
    pub backends: Vec<BackendHostInfo>,
}

impl MappingRequest {
    pub fn new(external_port: u16, backends: Vec<BackendHostInfo>) -> Self {
        Self {
            external_port,
            backends,
        }
    }
}

/// Reasons a mapping request batch is rejected before it reaches the table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("request {index}: external_port must be greater than 0")]
    InvalidExternalPort { index: usize },

    #[error("request {index}: at least one backend is required")]
    NoBackends { index: usize },

    #[error("request {index}: backend {backend} has an empty ip")]
    EmptyBackendAddress { index: usize, backend: usize },

    #[error("request {index}: backend {backend} ip may only contain letters, digits, '.', '-', '_' and ':'")]
    InvalidBackendAddress { index: usize, backend: usize },

    #[error("request {index}: backend {backend} port must be greater than 0")]
    InvalidBackendPort { index: usize, backend: usize },
}

/// Check a batch of mapping requests. Stops at the first invalid request.
pub fn validate(requests: &[MappingRequest]) -> Result<(), ValidationError> {
    for (index, request) in requests.iter().enumerate() {
        if request.external_port == 0 {
            return Err(ValidationError::InvalidExternalPort { index });
        }
        if request.backends.is_empty() {
            return Err(ValidationError::NoBackends { index });
        }
        for (backend, info) in request.backends.iter().enumerate() {
            if info.address.trim().is_empty() {
                return Err(ValidationError::EmptyBackendAddress { index, backend });
            }
            if !is_valid_address(&info.address) {
                return Err(ValidationError::InvalidBackendAddress { index, backend });
            }
            if info.port == 0 {
                return Err(ValidationError::InvalidBackendPort { index, backend });
            }
        }
    }
    Ok(())
}

/// Render the table back into wire form, ordered by external port.
pub fn from_routing_table(table: &RoutingTable) -> Vec<MappingRequest> {
    table
        .iter()
        .map(|(key, entry)| MappingRequest {
            external_port: key.port,
            backends: entry
                .backends()
                .map(|b| BackendHostInfo::new(b.address.clone(), b.port))
                .collect(),
        })
        .collect()
}

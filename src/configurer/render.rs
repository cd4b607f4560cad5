//! Routing table entry -> HAProxy `listen` block.
//!
//! ```text
//! listen listen_cfg_2222
//!   mode tcp
//!   bind :2222
//!   server server_10.1.1.12_60000 10.1.1.12:60000
//! ```
//!
//! Servers are emitted in the entry's iteration order (address, then port),
//! so the same entry always renders to the same bytes.

use std::fmt::Write;

use thiserror::Error;

use crate::routing::{BackendServerInfo, RoutingKey, RoutingTableEntry};

/// A key or backend that cannot be expressed in HAProxy syntax.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("listen configuration port cannot be 0")]
    InvalidExternalPort,

    #[error("backend server address for port {external_port} cannot be empty")]
    EmptyBackendAddress { external_port: u16 },

    #[error("backend server address {address:?} contains characters HAProxy cannot parse")]
    InvalidBackendAddress { address: String },

    #[error("backend server port for {address} cannot be 0")]
    InvalidBackendPort { address: String },
}

/// Name of the `listen` section for an external port.
pub fn listen_name(key: RoutingKey) -> String {
    format!("listen_cfg_{}", key.port)
}

/// Name of a `server` line inside a `listen` section.
pub fn server_name(backend: &BackendServerInfo) -> String {
    format!("server_{}_{}", backend.address, backend.port)
}

/// Addresses are limited to ASCII alphanumerics and `.`, `-`, `_`, `:`.
///
/// Anything else (whitespace, `#`, quotes) would change how HAProxy tokenizes
/// the `server` line.
pub(crate) fn is_valid_address(address: &str) -> bool {
    !address.is_empty()
        && address
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | ':'))
}

/// Render one routing entry as a complete `listen` block.
pub fn render_listen_block(key: RoutingKey, entry: &RoutingTableEntry) -> Result<String, RenderError> {
    if key.port == 0 {
        return Err(RenderError::InvalidExternalPort);
    }

    let mut block = String::new();
    // Writing into a String cannot fail.
    let _ = writeln!(block, "listen {}", listen_name(key));
    let _ = writeln!(block, "  mode tcp");
    let _ = writeln!(block, "  bind :{}", key.port);

    for backend in entry.backends() {
        block.push_str(&render_server_line(key, backend)?);
    }

    Ok(block)
}

fn render_server_line(key: RoutingKey, backend: &BackendServerInfo) -> Result<String, RenderError> {
    if backend.address.is_empty() {
        return Err(RenderError::EmptyBackendAddress {
            external_port: key.port,
        });
    }
    if !is_valid_address(&backend.address) {
        return Err(RenderError::InvalidBackendAddress {
            address: backend.address.clone(),
        });
    }
    if backend.port == 0 {
        return Err(RenderError::InvalidBackendPort {
            address: backend.address.clone(),
        });
    }

    Ok(format!("  server {} {}\n", server_name(backend), backend))
}

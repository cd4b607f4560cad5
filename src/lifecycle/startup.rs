//! Startup orchestration.
//!
//! # Design Decisions
//! - Subsystems initialize in order, not concurrently
//! - The routing table starts empty; it is rebuilt from mapping requests

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;

use crate::config::RouterConfig;
use crate::configurer::{ConfigurerError, HaproxyConfigurer};
use crate::observability::metrics;
use crate::routing::Updater;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid metrics address {0:?}")]
    MetricsAddress(String),

    #[error("failed to start metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error(transparent)]
    Configurer(#[from] ConfigurerError),
}

/// Bring up metrics and the HAProxy configurer, returning the process's `Updater`.
pub fn init(config: &RouterConfig) -> Result<Arc<Updater>, StartupError> {
    if config.observability.metrics_enabled {
        let addr: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|_| StartupError::MetricsAddress(config.observability.metrics_address.clone()))?;
        metrics::init_metrics(addr)?;
    }

    let configurer = HaproxyConfigurer::new(
        &config.haproxy.base_config_path,
        &config.haproxy.config_path,
    )?;
    tracing::info!(
        base_config_file = %configurer.base_config_path().display(),
        config_file = %configurer.config_path().display(),
        "HAProxy configurer ready"
    );

    metrics::record_routing_table_size(0);
    Ok(Arc::new(Updater::new(Arc::new(configurer))))
}

//! TCP router
//!
//! Exposes an HTTP API that maps external TCP ports to backend sets and
//! rewrites the HAProxy configuration whenever the mapping changes.
//!
//! # Architecture Overview
//!
//! ```text
//!   POST /v0/external_ports
//!   ───────────────────────▶ http::handlers ──▶ routing::Updater
//!                                                 │  validate
//!                                                 │  RoutingTable::set (changed?)
//!                                                 ▼
//!                                         configurer::HaproxyConfigurer
//!                                                 │  <live>.bak  ← live
//!                                                 │  base + listen blocks
//!                                                 │  <live>.tmp → rename → <live>
//!                                                 ▼
//!                                           haproxy.conf (reloaded externally)
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use tcp_router::config::loader::{load_config, parse_config, ConfigError};
use tcp_router::config::validation::validate_config;
use tcp_router::config::RouterConfig;
use tcp_router::http::HttpServer;
use tcp_router::lifecycle::{signals, startup, Shutdown};
use tcp_router::observability::logging;

#[derive(Parser, Debug)]
#[command(name = "tcp-router")]
#[command(about = "Maps external TCP ports to backends through HAProxy", long_about = None)]
struct Args {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Mapping API bind address.
    #[arg(long)]
    bind_address: Option<String>,

    /// HAProxy base template.
    #[arg(long)]
    base_config: Option<String>,

    /// Live HAProxy configuration file.
    #[arg(long)]
    config_file: Option<String>,

    #[arg(long)]
    log_level: Option<String>,
}

impl Args {
    fn has_overrides(&self) -> bool {
        self.bind_address.is_some()
            || self.base_config.is_some()
            || self.config_file.is_some()
            || self.log_level.is_some()
    }

    fn into_config(self) -> Result<RouterConfig, ConfigError> {
        if let (Some(path), false) = (&self.config, self.has_overrides()) {
            return load_config(path);
        }

        let mut config = match &self.config {
            Some(path) => parse_config(path)?,
            None => RouterConfig::default(),
        };

        if let Some(bind_address) = self.bind_address {
            config.listener.bind_address = bind_address;
        }
        if let Some(base_config) = self.base_config {
            config.haproxy.base_config_path = base_config;
        }
        if let Some(config_file) = self.config_file {
            config.haproxy.config_path = config_file;
        }
        if let Some(log_level) = self.log_level {
            config.observability.log_level = log_level;
        }

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Args::parse().into_config()?;

    logging::init_logging(&config.observability.log_level);
    tracing::info!("tcp-router v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        base_config_file = %config.haproxy.base_config_path,
        config_file = %config.haproxy.config_path,
        "Configuration loaded"
    );

    let updater = startup::init(&config)?;

    let shutdown = Arc::new(Shutdown::new());
    signals::spawn_signal_listener(shutdown.clone());

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(&config.listener, updater);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

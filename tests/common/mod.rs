//! Shared fixtures for integration tests.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use tcp_router::config::ListenerConfig;
use tcp_router::configurer::HaproxyConfigurer;
use tcp_router::http::HttpServer;
use tcp_router::routing::Updater;
use tempfile::TempDir;

pub const BASE_CONFIG: &str = "global\n    daemon\n";
pub const INITIAL_LIVE_CONFIG: &str = "global\n    daemon\n# previous deployment\n";

/// A temp directory holding a base template and a live configuration file.
pub struct Fixture {
    pub dir: TempDir,
    pub base: PathBuf,
    pub live: PathBuf,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("haproxy.conf.base");
        let live = dir.path().join("haproxy.conf");
        fs::write(&base, BASE_CONFIG).unwrap();
        fs::write(&live, INITIAL_LIVE_CONFIG).unwrap();
        Self { dir, base, live }
    }

    pub fn configurer(&self) -> HaproxyConfigurer {
        HaproxyConfigurer::new(&self.base, &self.live).unwrap()
    }

    pub fn updater(&self) -> Arc<Updater> {
        Arc::new(Updater::new(Arc::new(self.configurer())))
    }

    #[allow(dead_code)]
    pub fn server(&self) -> (HttpServer, Arc<Updater>) {
        let updater = self.updater();
        (HttpServer::new(&ListenerConfig::default(), updater.clone()), updater)
    }

    pub fn live_content(&self) -> String {
        fs::read_to_string(&self.live).unwrap()
    }

    #[allow(dead_code)]
    pub fn backup_content(&self) -> String {
        let mut backup = self.live.clone().into_os_string();
        backup.push(".bak");
        fs::read_to_string(PathBuf::from(backup)).unwrap()
    }
}

//! HAProxy configuration file synchronizer.
//!
//! # Responsibilities
//! - Keep `<live>.bak` as a copy of the live file before each sync
//! - Rebuild the live file as base template + one `listen` block per entry
//! - Publish through `<live>.tmp` and a rename so readers never see a partial file

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use crate::configurer::fs::{FileSystem, LocalFileSystem};
use crate::configurer::render::render_listen_block;
use crate::configurer::{Configurer, ConfigurerError};
use crate::observability::metrics;
use crate::routing::RoutingTable;

/// Writes the routing table into an HAProxy configuration file.
#[derive(Debug)]
pub struct HaproxyConfigurer<F: FileSystem = LocalFileSystem> {
    fs: F,
    base_config_path: PathBuf,
    config_path: PathBuf,
    backup_path: PathBuf,
    temp_path: PathBuf,
    /// Held for the whole backup → render → publish sequence.
    config_file_lock: Mutex<()>,
}

impl HaproxyConfigurer<LocalFileSystem> {
    /// Create a configurer for files on the local disk.
    ///
    /// Both the base template and the live configuration must already exist.
    pub fn new(
        base_config_path: impl Into<PathBuf>,
        config_path: impl Into<PathBuf>,
    ) -> Result<Self, ConfigurerError> {
        Self::with_file_system(LocalFileSystem, base_config_path, config_path)
    }
}

impl<F: FileSystem> HaproxyConfigurer<F> {
    /// Create a configurer on top of an arbitrary [`FileSystem`].
    pub fn with_file_system(
        fs: F,
        base_config_path: impl Into<PathBuf>,
        config_path: impl Into<PathBuf>,
    ) -> Result<Self, ConfigurerError> {
        let base_config_path = base_config_path.into();
        let config_path = config_path.into();

        for path in [&base_config_path, &config_path] {
            if !fs.exists(path) {
                tracing::error!(path = %path.display(), "Router configuration file not found");
                return Err(ConfigurerError::ConfigFileNotFound(path.clone()));
            }
        }

        Ok(Self {
            backup_path: with_suffix(&config_path, ".bak"),
            temp_path: with_suffix(&config_path, ".tmp"),
            fs,
            base_config_path,
            config_path,
            config_file_lock: Mutex::new(()),
        })
    }

    pub fn base_config_path(&self) -> &Path {
        &self.base_config_path
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn backup_path(&self) -> &Path {
        &self.backup_path
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    fn sync(&self, table: &RoutingTable) -> Result<(), ConfigurerError> {
        self.create_config_backup()?;
        let content = self.build_config(table)?;
        self.write_to_config(&content)
    }

    fn create_config_backup(&self) -> Result<(), ConfigurerError> {
        tracing::debug!(config_file = %self.config_path.display(), "Reading config file for backup");
        let current = self.fs.read(&self.config_path).map_err(|source| {
            tracing::error!(config_file = %self.config_path.display(), error = %source, "Failed reading config file");
            ConfigurerError::Io {
                op: "read",
                path: self.config_path.clone(),
                source,
            }
        })?;

        self.fs.write(&self.backup_path, &current).map_err(|source| {
            tracing::error!(backup_file = %self.backup_path.display(), error = %source, "Failed to back up config");
            ConfigurerError::Io {
                op: "write",
                path: self.backup_path.clone(),
                source,
            }
        })
    }

    fn build_config(&self, table: &RoutingTable) -> Result<Vec<u8>, ConfigurerError> {
        let mut content = self.fs.read(&self.base_config_path).map_err(|source| {
            tracing::error!(base_config_file = %self.base_config_path.display(), error = %source, "Failed reading base config file");
            ConfigurerError::Io {
                op: "read",
                path: self.base_config_path.clone(),
                source,
            }
        })?;

        for (key, entry) in table.iter() {
            let block = render_listen_block(*key, entry).map_err(|e| {
                tracing::error!(external_port = key.port, error = %e, "Failed rendering routing table entry");
                e
            })?;
            content.push(b'\n');
            content.extend_from_slice(block.as_bytes());
        }

        Ok(content)
    }

    fn write_to_config(&self, content: &[u8]) -> Result<(), ConfigurerError> {
        self.fs.write(&self.temp_path, content).map_err(|source| {
            tracing::error!(temp_config_file = %self.temp_path.display(), error = %source, "Failed to write temp config");
            ConfigurerError::Io {
                op: "write",
                path: self.temp_path.clone(),
                source,
            }
        })?;

        self.fs
            .rename(&self.temp_path, &self.config_path)
            .map_err(|source| {
                tracing::error!(
                    config_file = %self.config_path.display(),
                    temp_config_file = %self.temp_path.display(),
                    error = %source,
                    "Failed renaming temp config file"
                );
                ConfigurerError::Rename {
                    from: self.temp_path.clone(),
                    to: self.config_path.clone(),
                    source,
                }
            })
    }
}

impl<F: FileSystem> Configurer for HaproxyConfigurer<F> {
    fn configure(&self, table: &RoutingTable) -> Result<(), ConfigurerError> {
        // The guard protects no data, so a poisoned lock is still usable.
        let _guard = self
            .config_file_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let start_time = Instant::now();
        let result = self.sync(table);
        metrics::record_config_sync(result.is_ok(), start_time);

        if result.is_ok() {
            tracing::info!(
                config_file = %self.config_path.display(),
                external_ports = table.len(),
                "HAProxy configuration published"
            );
        }
        result
    }
}

/// `haproxy.conf` + `.bak` → `haproxy.conf.bak`
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

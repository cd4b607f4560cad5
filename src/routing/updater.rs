//! Applies mapping requests to the routing table and syncs the load balancer.
//!
//! # Responsibilities
//! - Serialize table mutation + configuration sync across concurrent callers
//! - Skip the sync entirely when a batch changes nothing
//! - Keep the in-memory table equal to what was last published

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;

use crate::configurer::{Configurer, ConfigurerError};
use crate::observability::metrics;
use crate::routing::request::{validate, MappingRequest, ValidationError};
use crate::routing::table::{to_routing_table_entry, RoutingTable};

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("invalid mapping request: {0}")]
    Invalid(#[from] ValidationError),

    #[error("failed to configure load balancer: {0}")]
    Configure(#[from] ConfigurerError),
}

/// Owner of the process's routing table.
pub struct Updater {
    table: Mutex<RoutingTable>,
    configurer: Arc<dyn Configurer>,
}

impl Updater {
    /// Start with an empty table.
    pub fn new(configurer: Arc<dyn Configurer>) -> Self {
        Self {
            table: Mutex::new(RoutingTable::new()),
            configurer,
        }
    }

    /// Apply a batch of mapping requests.
    ///
    /// Returns `Ok(true)` when the table changed and the new configuration was
    /// published, `Ok(false)` when the batch was a no-op. If publishing fails
    /// the table is left as it was, so retrying the same batch syncs again.
    pub fn update(&self, requests: &[MappingRequest]) -> Result<bool, UpdateError> {
        validate(requests)?;

        let mut table = self.lock_table();
        let mut candidate = table.clone();
        let mut changed = false;
        for request in requests {
            let (key, entry) = to_routing_table_entry(request);
            changed |= candidate.set(key, entry);
        }

        if !changed {
            tracing::debug!(requests = requests.len(), "Routing table unchanged, skipping sync");
            return Ok(false);
        }

        if let Err(e) = self.configurer.configure(&candidate) {
            tracing::error!(error = %e, "Routing table update not applied");
            return Err(e.into());
        }

        *table = candidate;
        metrics::record_routing_table_size(table.len());
        tracing::info!(external_ports = table.len(), "Routing table updated");
        Ok(true)
    }

    /// A copy of the current table.
    pub fn snapshot(&self) -> RoutingTable {
        self.lock_table().clone()
    }

    fn lock_table(&self) -> MutexGuard<'_, RoutingTable> {
        // The table is only replaced wholesale, so it is consistent even after a panic.
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Updater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Updater")
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::request::BackendHostInfo;
    use crate::routing::table::RoutingKey;
    use std::io;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct RecordingConfigurer {
        calls: AtomicUsize,
        fail: AtomicBool,
        last: Mutex<Option<RoutingTable>>,
    }

    impl Configurer for RecordingConfigurer {
        fn configure(&self, table: &RoutingTable) -> Result<(), ConfigurerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(ConfigurerError::Io {
                    op: "write",
                    path: "haproxy.conf.tmp".into(),
                    source: io::Error::new(io::ErrorKind::Other, "disk full"),
                });
            }
            *self.last.lock().unwrap() = Some(table.clone());
            Ok(())
        }
    }

    fn request(port: u16, backends: &[(&str, u16)]) -> MappingRequest {
        MappingRequest::new(
            port,
            backends.iter().map(|(a, p)| BackendHostInfo::new(*a, *p)).collect(),
        )
    }

    #[test]
    fn test_update_syncs_only_on_change() {
        let configurer = Arc::new(RecordingConfigurer::default());
        let updater = Updater::new(configurer.clone());
        let batch = vec![request(2222, &[("10.1.1.12", 60000), ("10.1.1.13", 60000)])];

        assert!(updater.update(&batch).unwrap());
        assert_eq!(configurer.calls.load(Ordering::SeqCst), 1);

        assert!(!updater.update(&batch).unwrap());
        assert_eq!(configurer.calls.load(Ordering::SeqCst), 1);

        // Same backends, different order.
        let reordered = vec![request(2222, &[("10.1.1.13", 60000), ("10.1.1.12", 60000)])];
        assert!(!updater.update(&reordered).unwrap());
        assert_eq!(configurer.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_update_passes_full_table() {
        let configurer = Arc::new(RecordingConfigurer::default());
        let updater = Updater::new(configurer.clone());

        updater.update(&[request(80, &[("10.0.0.1", 8080)])]).unwrap();
        updater.update(&[request(443, &[("10.0.0.2", 8443)])]).unwrap();

        let published = configurer.last.lock().unwrap().clone().unwrap();
        assert_eq!(published.len(), 2);
        assert_eq!(published.get(RoutingKey::new(80)).len(), 1);
        assert_eq!(published.get(RoutingKey::new(443)).len(), 1);
    }

    #[test]
    fn test_invalid_batch_is_rejected_without_sync() {
        let configurer = Arc::new(RecordingConfigurer::default());
        let updater = Updater::new(configurer.clone());

        let err = updater
            .update(&[request(80, &[("10.0.0.1", 8080)]), request(0, &[("10.0.0.1", 8080)])])
            .unwrap_err();

        assert!(matches!(err, UpdateError::Invalid(ValidationError::InvalidExternalPort { index: 1 })));
        assert_eq!(configurer.calls.load(Ordering::SeqCst), 0);
        assert!(updater.snapshot().is_empty());
    }

    #[test]
    fn test_unrenderable_address_is_invalid_not_sync_error() {
        let configurer = Arc::new(RecordingConfigurer::default());
        let updater = Updater::new(configurer.clone());

        let err = updater.update(&[request(80, &[("10.0.0.1 ", 8080)])]).unwrap_err();

        assert!(matches!(
            err,
            UpdateError::Invalid(ValidationError::InvalidBackendAddress { index: 0, backend: 0 })
        ));
        assert_eq!(configurer.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_failed_sync_keeps_previous_table() {
        let configurer = Arc::new(RecordingConfigurer::default());
        let updater = Updater::new(configurer.clone());
        let batch = vec![request(80, &[("10.0.0.1", 8080)])];

        configurer.fail.store(true, Ordering::SeqCst);
        assert!(matches!(updater.update(&batch), Err(UpdateError::Configure(_))));
        assert!(updater.snapshot().is_empty());

        // The retry is still a change, so it is synced.
        configurer.fail.store(false, Ordering::SeqCst);
        assert!(updater.update(&batch).unwrap());
        assert_eq!(configurer.calls.load(Ordering::SeqCst), 2);
        assert_eq!(updater.snapshot().len(), 1);
    }
}

//! In-memory routing table.
//!
//! # Responsibilities
//! - Map each external port to one deduplicated set of backends
//! - Report whether a `set` actually changed the observable content
//!
//! # Design Decisions
//! - Backends live in a `BTreeSet`, so iteration is ordered by address then port
//! - Entries live in a `BTreeMap`, so iteration is ordered by external port
//! - Not internally synchronized: callers serialize `set`/`get`
//!   (see `routing::updater::Updater`)

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::routing::request::MappingRequest;

/// Externally exposed TCP port identifying one routing entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoutingKey {
    pub port: u16,
}

impl RoutingKey {
    pub fn new(port: u16) -> Self {
        Self { port }
    }
}

impl From<u16> for RoutingKey {
    fn from(port: u16) -> Self {
        Self { port }
    }
}

impl fmt::Display for RoutingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.port)
    }
}

/// One backend instance eligible to receive traffic for a routing key.
///
/// Ordering is derived field by field: address first, then port.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BackendServerInfo {
    pub address: String,
    pub port: u16,
}

impl BackendServerInfo {
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
        }
    }
}

impl fmt::Display for BackendServerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}

/// The backend set for a single external port.
#[derive(Debug, Clone, Default)]
pub struct RoutingTableEntry {
    backends: BTreeSet<BackendServerInfo>,
}

impl RoutingTableEntry {
    /// Build an entry from backends in any order. Duplicates collapse.
    pub fn new<I>(backends: I) -> Self
    where
        I: IntoIterator<Item = BackendServerInfo>,
    {
        Self {
            backends: backends.into_iter().collect(),
        }
    }

    /// Backends ordered by address, then port.
    pub fn backends(&self) -> impl Iterator<Item = &BackendServerInfo> {
        self.backends.iter()
    }

    pub fn contains(&self, backend: &BackendServerInfo) -> bool {
        self.backends.contains(backend)
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// Set equality: same size and every backend of `self` present in `other`.
    pub fn same_backends(&self, other: &RoutingTableEntry) -> bool {
        self.backends.len() == other.backends.len()
            && self.backends.iter().all(|b| other.backends.contains(b))
    }
}

impl PartialEq for RoutingTableEntry {
    fn eq(&self, other: &Self) -> bool {
        self.same_backends(other)
    }
}

impl Eq for RoutingTableEntry {}

/// External port -> backend set.
///
/// Not thread-safe on its own. Concurrent writers must hold an external lock
/// across `set` and the configuration sync that follows it.
#[derive(Debug, Clone, Default)]
pub struct RoutingTable {
    entries: BTreeMap<RoutingKey, RoutingTableEntry>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entry for `key`.
    ///
    /// Returns `false` (and leaves the table untouched) when an entry with
    /// the same backend set already exists for `key`.
    pub fn set(&mut self, key: RoutingKey, entry: RoutingTableEntry) -> bool {
        if let Some(existing) = self.entries.get(&key) {
            if existing.same_backends(&entry) {
                return false;
            }
        }
        self.entries.insert(key, entry);
        true
    }

    /// Current entry for `key`, or an empty entry when absent.
    pub fn get(&self, key: RoutingKey) -> RoutingTableEntry {
        self.entries.get(&key).cloned().unwrap_or_default()
    }

    /// Entries ordered by external port.
    pub fn iter(&self) -> impl Iterator<Item = (&RoutingKey, &RoutingTableEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Convert an inbound mapping request into the pair consumed by `RoutingTable::set`.
pub fn to_routing_table_entry(request: &MappingRequest) -> (RoutingKey, RoutingTableEntry) {
    let key = RoutingKey::new(request.external_port);
    let entry = RoutingTableEntry::new(
        request
            .backends
            .iter()
            .map(|b| BackendServerInfo::new(b.address.clone(), b.port)),
    );
    (key, entry)
}

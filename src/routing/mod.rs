//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! MappingRequest[] (external port + backends)
//!     → request.rs (validate)
//!     → table.rs (to_routing_table_entry, set → changed?)
//!     → updater.rs (if changed: configure full table, then commit)
//! ```
//!
//! # Design Decisions
//! - One table per process, owned by the `Updater` and passed around explicitly
//! - Backends are a value-ordered set; duplicates collapse on insert
//! - Change detection is set equality, independent of request order
//! - Deterministic: the same table always iterates in the same order

pub mod request;
pub mod table;
pub mod updater;

pub use request::{BackendHostInfo, MappingRequest, ValidationError};
pub use table::{to_routing_table_entry, BackendServerInfo, RoutingKey, RoutingTable, RoutingTableEntry};
pub use updater::{UpdateError, Updater};

//! Load balancer configuration subsystem.
//!
//! # Data Flow
//! ```text
//! RoutingTable (full, after a change)
//!     → haproxy.rs (lock, back up live file)
//!     → render.rs (one `listen` block per entry, appended to the base template)
//!     → haproxy.rs (write <live>.tmp, rename onto <live>)
//! ```
//!
//! # Design Decisions
//! - The live file is rebuilt from the base template on every sync, never patched
//! - One lock per configurer serializes backup → render → publish
//! - All I/O is blocking; async callers run it on the blocking pool
//! - Any failure aborts the whole sync; the live file is either old or new, never partial

pub mod fs;
pub mod haproxy;
pub mod render;

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::routing::RoutingTable;

pub use fs::{FileSystem, LocalFileSystem};
pub use haproxy::HaproxyConfigurer;
pub use render::RenderError;

/// Errors that can occur while publishing load balancer configuration.
#[derive(Debug, Error)]
pub enum ConfigurerError {
    /// Base template or live configuration file missing at construction.
    #[error("router configuration file not found: [{}]", .0.display())]
    ConfigFileNotFound(PathBuf),

    /// Reading or writing one of the configuration files failed.
    #[error("failed to {op} {}: {source}", .path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A routing entry cannot be expressed in load balancer syntax.
    #[error("failed to render routing table: {0}")]
    Render(#[from] RenderError),

    /// The temporary file could not be moved onto the live path.
    #[error("failed to rename {} to {}: {source}", .from.display(), .to.display())]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Publishes the full routing table to a load balancer.
///
/// Implementations serialize concurrent calls themselves.
pub trait Configurer: Send + Sync {
    fn configure(&self, table: &RoutingTable) -> Result<(), ConfigurerError>;
}

//! Mapping API subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware: request ID, body limit, timeout, trace)
//!     → handlers.rs (decode JSON, hand off to the Updater on the blocking pool)
//!     → routing::Updater (table + configuration sync)
//!     → status code back to the caller
//! ```

pub mod handlers;
pub mod request;
pub mod server;

pub use request::{MakeRouterRequestId, X_REQUEST_ID};
pub use server::{AppState, HttpServer};

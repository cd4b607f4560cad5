//! TCP router: keeps an HAProxy configuration in sync with external port mappings.

pub mod config;
pub mod configurer;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use config::schema::RouterConfig;
pub use configurer::{Configurer, HaproxyConfigurer};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::{RoutingTable, Updater};

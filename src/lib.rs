//! Voice server control service library.
//!
//! Exposes an HTTP control surface for per-feature bot configuration,
//! persists it, and tells the live worker bot to reload changed features.

pub mod catalog;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod query;
pub mod reconcile;
pub mod reload;
pub mod resilience;
pub mod store;

pub use config::schema::AppConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use reconcile::ConfigReconciler;

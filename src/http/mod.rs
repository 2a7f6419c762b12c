//! HTTP control surface.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID, span, metrics)
//!     → feature.rs (catalog + config reads/writes, reloads)
//!     → voice.rs (live server views, degrade to [])
//!     → response.rs (status/body conventions)
//! ```

pub mod feature;
pub mod request;
pub mod response;
pub mod server;
pub mod voice;

pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer};

//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Query connection lost:
//!     → backoff.rs (delay before the next reconnect attempt)
//! Reload propagation:
//!     → bounded by tokio::time::timeout in reload::Reloader
//! ```
//!
//! # Design Decisions
//! - Every remote call on a write path has a deadline
//! - Jittered backoff prevents reconnect storms

pub mod backoff;

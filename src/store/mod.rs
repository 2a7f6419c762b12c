//! Persisted per-feature configuration.
//!
//! # Data Flow
//! ```text
//! reconcile (read)  → find_by_name → Option<FeatureConfigRecord>
//! reconcile (write) → update_by_name(patch) → match count (0 = not found)
//!                   → create(record) → record | Duplicate
//! ```
//!
//! # Design Decisions
//! - One record type in one collection, keyed by the unique feature name
//! - `config` is opaque JSON and is never inspected here
//! - Backends: `MemoryStore` (dashmap) and `SledStore` (embedded, on disk)

pub mod disk;
pub mod memory;
pub mod record;

use async_trait::async_trait;
use thiserror::Error;

pub use disk::SledStore;
pub use memory::MemoryStore;
pub use record::{FeatureConfigRecord, FeatureType, RecordPatch};

/// Errors raised by a store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The underlying database failed.
    #[error("storage backend error: {0}")]
    Backend(#[from] sled::Error),

    /// A stored document could not be encoded or decoded.
    #[error("record codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// A record with this name already exists.
    #[error("record '{0}' already exists")]
    Duplicate(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// CRUD access to feature configuration records.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Look up the record for a feature name.
    async fn find_by_name(&self, name: &str) -> StoreResult<Option<FeatureConfigRecord>>;

    /// Apply a partial update, returning how many records matched.
    async fn update_by_name(&self, name: &str, patch: RecordPatch) -> StoreResult<u64>;

    /// Insert a new record. Fails with `Duplicate` if the name is taken.
    async fn create(&self, record: FeatureConfigRecord) -> StoreResult<FeatureConfigRecord>;
}

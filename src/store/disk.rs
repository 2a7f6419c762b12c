//! Sled-backed store.
//!
//! Records live in a single tree keyed by feature name, encoded as JSON
//! documents. Writes use compare-and-swap so concurrent updates to the same
//! name never lose each other.

use async_trait::async_trait;
use std::path::Path;

use crate::store::{ConfigStore, FeatureConfigRecord, RecordPatch, StoreError, StoreResult};

const TREE_NAME: &str = "feature_configs";

/// Persistent store on local disk.
#[derive(Clone)]
pub struct SledStore {
    tree: sled::Tree,
}

impl SledStore {
    /// Open (or create) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let db = sled::open(path.as_ref())?;
        let tree = db.open_tree(TREE_NAME)?;
        tracing::info!(path = ?path.as_ref(), records = tree.len(), "Feature config store opened");
        Ok(Self { tree })
    }

    fn decode(bytes: &[u8]) -> StoreResult<FeatureConfigRecord> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

impl std::fmt::Debug for SledStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SledStore")
            .field("tree", &TREE_NAME)
            .field("records", &self.tree.len())
            .finish()
    }
}

#[async_trait]
impl ConfigStore for SledStore {
    async fn find_by_name(&self, name: &str) -> StoreResult<Option<FeatureConfigRecord>> {
        match self.tree.get(name)? {
            Some(bytes) => Ok(Some(Self::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    // sled reads and swaps are synchronous but served from its page cache;
    // only the flush yields to the runtime.
    async fn update_by_name(&self, name: &str, patch: RecordPatch) -> StoreResult<u64> {
        loop {
            let Some(current) = self.tree.get(name)? else {
                return Ok(0);
            };

            let mut record = Self::decode(&current)?;
            patch.clone().apply(&mut record);
            let encoded = serde_json::to_vec(&record)?;

            match self.tree.compare_and_swap(name, Some(current), Some(encoded))? {
                Ok(()) => {
                    self.tree.flush_async().await?;
                    return Ok(1);
                }
                Err(_) => {
                    tracing::debug!(name = %name, "Concurrent update detected, retrying");
                    continue;
                }
            }
        }
    }

    async fn create(&self, record: FeatureConfigRecord) -> StoreResult<FeatureConfigRecord> {
        let encoded = serde_json::to_vec(&record)?;
        let swapped = self
            .tree
            .compare_and_swap(record.name.as_str(), None as Option<&[u8]>, Some(encoded))?;

        if swapped.is_err() {
            return Err(StoreError::Duplicate(record.name));
        }
        self.tree.flush_async().await?;
        Ok(record)
    }
}

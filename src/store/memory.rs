//! In-process store backed by a concurrent map.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

use crate::store::{ConfigStore, FeatureConfigRecord, RecordPatch, StoreError, StoreResult};

/// Volatile store. Contents are lost on restart.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Arc<DashMap<String, FeatureConfigRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl ConfigStore for MemoryStore {
    async fn find_by_name(&self, name: &str) -> StoreResult<Option<FeatureConfigRecord>> {
        Ok(self.records.get(name).map(|r| r.value().clone()))
    }

    async fn update_by_name(&self, name: &str, patch: RecordPatch) -> StoreResult<u64> {
        match self.records.get_mut(name) {
            Some(mut record) => {
                patch.apply(record.value_mut());
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn create(&self, record: FeatureConfigRecord) -> StoreResult<FeatureConfigRecord> {
        match self.records.entry(record.name.clone()) {
            Entry::Occupied(_) => Err(StoreError::Duplicate(record.name)),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(record)
            }
        }
    }
}

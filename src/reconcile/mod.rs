//! Configuration reconciliation.
//!
//! # Data Flow
//! ```text
//! read:   FeatureCatalog × ConfigStore  → FeatureOverview / config payload
//! write:  ConfigStore (authoritative)   → Reloader (best effort)
//! ```
//!
//! # Design Decisions
//! - Persistence first, notification second, independent outcomes
//! - A failed reload never turns a successful write into an error; it is
//!   logged and returned as `ReloadOutcome::Skipped`
//! - Listing resolves per-feature lookups concurrently but reports them in
//!   catalog order, and degrades a failed lookup to `enabled: null`

pub mod overview;

use futures_util::future::join_all;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

use crate::catalog::FeatureCatalog;
use crate::observability::metrics;
use crate::query::ClientId;
use crate::reload::{ReloadError, ReloadOutcome, Reloader};
use crate::store::{ConfigStore, FeatureConfigRecord, FeatureType, RecordPatch, StoreError};

pub use overview::{FeatureOverview, FeatureState};

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// No record exists for this feature.
    #[error("feature '{0}' has no stored configuration")]
    NotFound(String),

    /// New feature whose name matches no known type prefix.
    #[error("cannot infer feature type from name '{0}'")]
    InvalidFeatureName(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What a write did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    Created(FeatureType),
    Updated,
}

/// Acknowledgment of a persisted write.
#[derive(Debug)]
pub struct WriteReceipt {
    pub write: WriteKind,
    pub reload: ReloadOutcome,
}

pub struct ConfigReconciler {
    catalog: Arc<FeatureCatalog>,
    store: Arc<dyn ConfigStore>,
    reloader: Reloader,
}

impl ConfigReconciler {
    pub fn new(catalog: Arc<FeatureCatalog>, store: Arc<dyn ConfigStore>, reloader: Reloader) -> Self {
        Self {
            catalog,
            store,
            reloader,
        }
    }

    /// Every cataloged feature with its enablement state. Never fails.
    pub async fn list_all(&self) -> FeatureOverview {
        let categories = self.catalog.categories().iter().map(|category| async move {
            let states = join_all(category.features.iter().map(|name| self.feature_state(name))).await;
            (category.name.clone(), states)
        });
        FeatureOverview::new(join_all(categories).await)
    }

    async fn feature_state(&self, name: &str) -> FeatureState {
        let enabled = match self.store.find_by_name(name).await {
            Ok(record) => record.map(|r| r.enabled),
            Err(e) => {
                metrics::record_store_error("find");
                tracing::warn!(feature = %name, error = %e, "Feature lookup failed, listing as unset");
                None
            }
        };
        FeatureState {
            name: name.to_string(),
            enabled,
        }
    }

    /// Stored config payload, or an empty array when nothing is stored.
    pub async fn get_one(&self, name: &str) -> Result<Value, ReconcileError> {
        let record = self
            .store
            .find_by_name(name)
            .await
            .inspect_err(|_| metrics::record_store_error("find"))?;
        Ok(record
            .map(|r| r.config)
            .unwrap_or_else(|| Value::Array(Vec::new())))
    }

    /// Toggle an existing feature, then try to reload it.
    pub async fn set_enabled(&self, name: &str, enabled: bool) -> Result<WriteReceipt, ReconcileError> {
        let matched = self
            .store
            .update_by_name(name, RecordPatch::Enabled(enabled))
            .await
            .inspect_err(|_| metrics::record_store_error("update"))?;
        if matched == 0 {
            return Err(ReconcileError::NotFound(name.to_string()));
        }

        tracing::info!(feature = %name, enabled, "Feature enablement updated");
        Ok(WriteReceipt {
            write: WriteKind::Updated,
            reload: self.propagate(name).await,
        })
    }

    /// Replace the config of a feature, creating its record on first use.
    pub async fn set_config(&self, name: &str, config: Value) -> Result<WriteReceipt, ReconcileError> {
        let existing = self
            .store
            .find_by_name(name)
            .await
            .inspect_err(|_| metrics::record_store_error("find"))?;

        let write = match existing {
            Some(_) => {
                self.replace_config(name, config).await?;
                WriteKind::Updated
            }
            None => self.create(name, config).await?,
        };

        tracing::info!(feature = %name, write = ?write, "Feature config saved");
        Ok(WriteReceipt {
            write,
            reload: self.propagate(name).await,
        })
    }

    /// Explicit reload request. Unlike writes, the failure is returned.
    pub async fn reload(&self, name: &str) -> Result<ClientId, ReloadError> {
        self.reloader.reload(name).await
    }

    async fn create(&self, name: &str, config: Value) -> Result<WriteKind, ReconcileError> {
        let kind = FeatureType::from_name(name)
            .ok_or_else(|| ReconcileError::InvalidFeatureName(name.to_string()))?;

        match self
            .store
            .create(FeatureConfigRecord::new(name, kind, config.clone()))
            .await
        {
            Ok(_) => Ok(WriteKind::Created(kind)),
            Err(StoreError::Duplicate(_)) => {
                // Lost a race with a concurrent create.
                self.replace_config(name, config).await?;
                Ok(WriteKind::Updated)
            }
            Err(e) => {
                metrics::record_store_error("create");
                Err(e.into())
            }
        }
    }

    async fn replace_config(&self, name: &str, config: Value) -> Result<(), ReconcileError> {
        self.store
            .update_by_name(name, RecordPatch::Config(config))
            .await
            .inspect_err(|_| metrics::record_store_error("update"))?;
        Ok(())
    }

    async fn propagate(&self, name: &str) -> ReloadOutcome {
        let outcome = ReloadOutcome::from(self.reloader.reload(name).await);
        if let ReloadOutcome::Skipped(e) = &outcome {
            tracing::warn!(feature = %name, error = %e, "Config saved but reload was not propagated");
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Category;
    use crate::reload::test_support::StubQuery;
    use crate::store::{MemoryStore, StoreResult};
    use async_trait::async_trait;
    use serde_json::json;
    use std::time::Duration;

    fn catalog() -> Arc<FeatureCatalog> {
        Arc::new(
            FeatureCatalog::new(vec![
                Category {
                    name: "commands".to_string(),
                    features: vec!["commandHelp".to_string(), "commandAfk".to_string()],
                },
                Category {
                    name: "intervals".to_string(),
                    features: vec!["doCleanup".to_string()],
                },
                Category {
                    name: "events".to_string(),
                    features: vec!["getJoin".to_string()],
                },
            ])
            .unwrap(),
        )
    }

    fn reconciler_with(store: Arc<dyn ConfigStore>, query: Arc<StubQuery>) -> ConfigReconciler {
        let reloader = Reloader::new(query, "!", Duration::from_secs(1));
        ConfigReconciler::new(catalog(), store, reloader)
    }

    fn reconciler() -> (ConfigReconciler, Arc<MemoryStore>, Arc<StubQuery>) {
        let store = Arc::new(MemoryStore::new());
        let query = Arc::new(StubQuery::new(vec![1, 2], 1));
        (reconciler_with(store.clone(), query.clone()), store, query)
    }

    struct BrokenStore;

    #[async_trait]
    impl ConfigStore for BrokenStore {
        async fn find_by_name(&self, _name: &str) -> StoreResult<Option<FeatureConfigRecord>> {
            Err(serde_json::from_str::<Value>("{").unwrap_err().into())
        }

        async fn update_by_name(&self, _name: &str, _patch: RecordPatch) -> StoreResult<u64> {
            Err(serde_json::from_str::<Value>("{").unwrap_err().into())
        }

        async fn create(&self, _record: FeatureConfigRecord) -> StoreResult<FeatureConfigRecord> {
            Err(serde_json::from_str::<Value>("{").unwrap_err().into())
        }
    }

    #[tokio::test]
    async fn test_list_all_follows_catalog() {
        let (reconciler, store, _) = reconciler();
        let mut record = FeatureConfigRecord::new("doCleanup", FeatureType::Interval, json!([]));
        record.enabled = true;
        store.create(record).await.unwrap();
        store
            .create(FeatureConfigRecord::new("commandAfk", FeatureType::Command, json!([])))
            .await
            .unwrap();

        let overview = reconciler.list_all().await;
        assert_eq!(
            serde_json::to_value(&overview).unwrap(),
            json!({
                "commands": [
                    {"name": "commandHelp", "enabled": null},
                    {"name": "commandAfk", "enabled": false}
                ],
                "intervals": [{"name": "doCleanup", "enabled": true}],
                "events": [{"name": "getJoin", "enabled": null}]
            })
        );
        assert_eq!(overview.feature_count(), 4);
    }

    #[tokio::test]
    async fn test_list_all_survives_store_failure() {
        let query = Arc::new(StubQuery::new(vec![1, 2], 1));
        let reconciler = reconciler_with(Arc::new(BrokenStore), query);

        let overview = reconciler.list_all().await;
        assert_eq!(overview.feature_count(), 4);
        assert!(overview
            .categories()
            .iter()
            .flat_map(|(_, states)| states)
            .all(|s| s.enabled.is_none()));
    }

    #[tokio::test]
    async fn test_get_one_missing_is_empty_array() {
        let (reconciler, _, _) = reconciler();
        assert_eq!(reconciler.get_one("commandNope").await.unwrap(), json!([]));
    }

    #[tokio::test]
    async fn test_set_config_round_trip_new_and_existing() {
        let (reconciler, _, _) = reconciler();

        let receipt = reconciler.set_config("commandHelp", json!([{"reply": "hi"}])).await.unwrap();
        assert_eq!(receipt.write, WriteKind::Created(FeatureType::Command));
        assert_eq!(reconciler.get_one("commandHelp").await.unwrap(), json!([{"reply": "hi"}]));

        let receipt = reconciler.set_config("commandHelp", json!({"reply": "bye"})).await.unwrap();
        assert_eq!(receipt.write, WriteKind::Updated);
        assert_eq!(reconciler.get_one("commandHelp").await.unwrap(), json!({"reply": "bye"}));
    }

    #[tokio::test]
    async fn test_set_config_infers_type() {
        let (reconciler, store, _) = reconciler();

        reconciler.set_config("command_foo", json!([])).await.unwrap();
        reconciler.set_config("do_task", json!([])).await.unwrap();
        reconciler.set_config("get_x", json!([])).await.unwrap();

        let command = store.find_by_name("command_foo").await.unwrap().unwrap();
        assert_eq!(command.kind, FeatureType::Command);
        assert!(!command.enabled);
        assert_eq!(store.find_by_name("do_task").await.unwrap().unwrap().kind, FeatureType::Interval);
        assert_eq!(store.find_by_name("get_x").await.unwrap().unwrap().kind, FeatureType::Event);
    }

    #[tokio::test]
    async fn test_set_config_keeps_enabled_flag() {
        let (reconciler, store, _) = reconciler();
        reconciler.set_config("getJoin", json!([1])).await.unwrap();
        reconciler.set_enabled("getJoin", true).await.unwrap();
        reconciler.set_config("getJoin", json!([2])).await.unwrap();

        let record = store.find_by_name("getJoin").await.unwrap().unwrap();
        assert!(record.enabled);
        assert_eq!(record.config, json!([2]));
    }

    #[tokio::test]
    async fn test_set_config_unknown_prefix_creates_nothing() {
        let (reconciler, store, query) = reconciler();

        let err = reconciler.set_config("unknownprefix", json!([])).await.unwrap_err();
        assert!(matches!(err, ReconcileError::InvalidFeatureName(name) if name == "unknownprefix"));
        assert!(store.is_empty());
        assert!(query.sent().is_empty());
    }

    #[tokio::test]
    async fn test_existing_record_keeps_its_type_regardless_of_prefix() {
        let (reconciler, store, _) = reconciler();
        store
            .create(FeatureConfigRecord::new("legacy", FeatureType::Event, json!([])))
            .await
            .unwrap();

        let receipt = reconciler.set_config("legacy", json!({"x": 1})).await.unwrap();
        assert_eq!(receipt.write, WriteKind::Updated);
        assert_eq!(store.find_by_name("legacy").await.unwrap().unwrap().kind, FeatureType::Event);
    }

    #[tokio::test]
    async fn test_set_enabled_missing_is_not_found() {
        let (reconciler, store, query) = reconciler();

        let err = reconciler.set_enabled("commandHelp", true).await.unwrap_err();
        assert!(matches!(err, ReconcileError::NotFound(_)));
        assert!(store.is_empty());
        assert!(query.sent().is_empty());
    }

    #[tokio::test]
    async fn test_writes_trigger_reload() {
        let (reconciler, _, query) = reconciler();

        let receipt = reconciler.set_config("doCleanup", json!([])).await.unwrap();
        assert!(receipt.reload.is_delivered());
        reconciler.set_enabled("doCleanup", true).await.unwrap();

        assert_eq!(
            query.sent(),
            vec![
                (2, "!reload doCleanup".to_string()),
                (2, "!reload doCleanup".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_reload_failure_does_not_fail_write() {
        let store = Arc::new(MemoryStore::new());
        let query = Arc::new(StubQuery::new(vec![1, 2], 1).failing_sends());
        let reconciler = reconciler_with(store.clone(), query);

        let receipt = reconciler.set_config("getJoin", json!([])).await.unwrap();
        assert!(matches!(receipt.reload, ReloadOutcome::Skipped(ReloadError::Protocol(_))));

        let receipt = reconciler.set_enabled("getJoin", true).await.unwrap();
        assert!(!receipt.reload.is_delivered());
        assert!(store.find_by_name("getJoin").await.unwrap().unwrap().enabled);
    }

    #[tokio::test]
    async fn test_missing_worker_does_not_fail_write() {
        let store = Arc::new(MemoryStore::new());
        let query = Arc::new(StubQuery::new(vec![1], 1));
        let reconciler = reconciler_with(store, query);

        let receipt = reconciler.set_config("getJoin", json!([])).await.unwrap();
        assert!(matches!(receipt.reload, ReloadOutcome::Skipped(ReloadError::WorkerNotFound)));
        assert!(matches!(reconciler.reload("getJoin").await, Err(ReloadError::WorkerNotFound)));
    }

    #[tokio::test]
    async fn test_store_failure_surfaces_on_writes() {
        let query = Arc::new(StubQuery::new(vec![1, 2], 1));
        let reconciler = reconciler_with(Arc::new(BrokenStore), query.clone());

        assert!(matches!(
            reconciler.set_enabled("getJoin", true).await,
            Err(ReconcileError::Store(_))
        ));
        assert!(matches!(
            reconciler.set_config("getJoin", json!([])).await,
            Err(ReconcileError::Store(_))
        ));
        assert!(query.sent().is_empty());
    }
}

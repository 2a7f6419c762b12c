//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize all subsystems in dependency order
//! - Bind the listener and serve until shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The query session is created here and handed to its consumers

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::catalog::{CatalogError, FeatureCatalog};
use crate::config::{AppConfig, DatabaseConfig, StoreBackend};
use crate::http::{AppState, HttpServer};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::query::{QueryError, QuerySession, ServerQuery};
use crate::reconcile::ConfigReconciler;
use crate::reload::Reloader;
use crate::store::{ConfigStore, MemoryStore, SledStore, StoreError};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("catalog: {0}")]
    Catalog(#[from] CatalogError),

    #[error("store: {0}")]
    Store(#[from] StoreError),

    #[error("voice server query: {0}")]
    Query(#[from] QueryError),

    #[error("listener: {0}")]
    Io(#[from] std::io::Error),
}

/// Open the configured store backend.
pub fn open_store(config: &DatabaseConfig) -> Result<Arc<dyn ConfigStore>, StoreError> {
    match config.backend {
        StoreBackend::Sled => Ok(Arc::new(SledStore::open(&config.path)?)),
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory feature store, configs are lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

/// Bring the service up and serve until shutdown.
pub async fn run(config: AppConfig) -> Result<(), StartupError> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let catalog = Arc::new(FeatureCatalog::load(Path::new(&config.catalog.path))?);
    let store = open_store(&config.database)?;

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    let session = QuerySession::connect(config.query.clone(), shutdown.subscribe()).await?;
    let query: Arc<dyn ServerQuery> = Arc::new(session);

    let reloader = Reloader::new(
        query.clone(),
        config.reload.command_prefix.clone(),
        Duration::from_secs(config.reload.timeout_secs),
    );
    let reconciler = Arc::new(ConfigReconciler::new(catalog, store, reloader));
    let state = AppState { reconciler, query };

    let listener = TcpListener::bind(&config.http.bind_address).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        "Listening for connections"
    );

    HttpServer::new(&config.http, state)
        .run(listener, shutdown.subscribe())
        .await?;
    Ok(())
}

//! Reload propagation to the live worker.
//!
//! # Data Flow
//! ```text
//! Reloader::reload(name)
//!     → locator.rs (client list + whoami, exclude self)
//!     → notifier.rs (text message "<prefix>reload <name>")
//!     → ReloadOutcome (Delivered | Skipped(reason))
//! ```
//!
//! # Design Decisions
//! - Fire-and-forget: delivery means the server accepted the message
//! - The whole locate + notify path runs under one deadline
//! - Callers on write paths log a skipped reload and carry on

pub mod locator;
pub mod notifier;

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;

use crate::observability::metrics;
use crate::query::{ClientId, QueryError, ServerQuery};

pub use locator::WorkerLocator;
pub use notifier::ReloadNotifier;

#[derive(Debug, Error)]
pub enum ReloadError {
    #[error("no worker connection found")]
    WorkerNotFound,

    #[error("query failed: {0}")]
    Protocol(#[from] QueryError),

    #[error("reload timed out after {0:?}")]
    TimedOut(Duration),
}

impl ReloadError {
    fn label(&self) -> &'static str {
        match self {
            ReloadError::WorkerNotFound => "worker_not_found",
            ReloadError::Protocol(_) => "protocol_error",
            ReloadError::TimedOut(_) => "timed_out",
        }
    }
}

/// Result of a best-effort reload attempt.
#[derive(Debug)]
pub enum ReloadOutcome {
    Delivered { worker: ClientId },
    Skipped(ReloadError),
}

impl ReloadOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, ReloadOutcome::Delivered { .. })
    }
}

impl From<Result<ClientId, ReloadError>> for ReloadOutcome {
    fn from(result: Result<ClientId, ReloadError>) -> Self {
        match result {
            Ok(worker) => ReloadOutcome::Delivered { worker },
            Err(e) => ReloadOutcome::Skipped(e),
        }
    }
}

/// Locates the worker and tells it to reload a feature.
#[derive(Clone)]
pub struct Reloader {
    locator: WorkerLocator,
    notifier: ReloadNotifier,
    deadline: Duration,
}

impl Reloader {
    pub fn new(query: Arc<dyn ServerQuery>, command_prefix: impl Into<String>, deadline: Duration) -> Self {
        Self {
            locator: WorkerLocator::new(query.clone()),
            notifier: ReloadNotifier::new(query, command_prefix),
            deadline,
        }
    }

    /// Returns the worker the notification was addressed to.
    pub async fn reload(&self, feature: &str) -> Result<ClientId, ReloadError> {
        let attempt = async {
            let worker = self.locator.locate().await?;
            self.notifier.notify(worker, feature).await?;
            Ok::<_, ReloadError>(worker)
        };

        let result = match timeout(self.deadline, attempt).await {
            Ok(result) => result,
            Err(_) => Err(ReloadError::TimedOut(self.deadline)),
        };

        match &result {
            Ok(worker) => {
                metrics::record_reload("delivered");
                tracing::info!(feature = %feature, worker, "Reload propagated");
            }
            Err(e) => metrics::record_reload(e.label()),
        }
        result
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::StubQuery;
    use super::*;

    #[tokio::test]
    async fn test_reload_delivers_to_worker() {
        let query = Arc::new(StubQuery::new(vec![3, 8], 3));
        let reloader = Reloader::new(query.clone(), "!", Duration::from_secs(1));

        let outcome = ReloadOutcome::from(reloader.reload("get_join").await);
        assert!(outcome.is_delivered());
        assert_eq!(query.sent(), vec![(8, "!reload get_join".to_string())]);
    }

    #[tokio::test]
    async fn test_stalled_session_hits_deadline() {
        let query = Arc::new(StubQuery::new(vec![3, 8], 3).stalled(Duration::from_secs(5)));
        let reloader = Reloader::new(query.clone(), "!", Duration::from_millis(50));

        let result = reloader.reload("get_join").await;
        assert!(matches!(result, Err(ReloadError::TimedOut(_))));
        assert!(query.sent().is_empty());
    }
}

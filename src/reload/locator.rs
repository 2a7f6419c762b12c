//! Worker discovery.
//!
//! The controller and the worker bot are both connected as query clients on
//! the same virtual server. The worker is whichever of those is not us. With
//! more than one candidate the first one in server listing order is chosen;
//! that order is not guaranteed to be stable across calls.

use std::sync::Arc;

use crate::query::{ClientId, ClientKind, ServerQuery};
use crate::reload::ReloadError;

#[derive(Clone)]
pub struct WorkerLocator {
    query: Arc<dyn ServerQuery>,
}

impl WorkerLocator {
    pub fn new(query: Arc<dyn ServerQuery>) -> Self {
        Self { query }
    }

    /// Find the connection id of the live worker.
    pub async fn locate(&self) -> Result<ClientId, ReloadError> {
        let clients = self.query.client_list(ClientKind::Query).await?;
        let me = self.query.whoami().await?;

        clients
            .iter()
            .find(|client| client.clid != me.client_id)
            .map(|client| client.clid)
            .ok_or(ReloadError::WorkerNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reload::test_support::StubQuery;

    #[tokio::test]
    async fn test_skips_own_connection() {
        let query = Arc::new(StubQuery::new(vec![1, 2], 1));
        let locator = WorkerLocator::new(query);
        assert_eq!(locator.locate().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_first_listed_wins() {
        let query = Arc::new(StubQuery::new(vec![9, 4, 7], 4));
        let locator = WorkerLocator::new(query);
        assert_eq!(locator.locate().await.unwrap(), 9);
    }

    #[tokio::test]
    async fn test_only_self_connected() {
        let query = Arc::new(StubQuery::new(vec![1], 1));
        let locator = WorkerLocator::new(query);
        assert!(matches!(locator.locate().await, Err(ReloadError::WorkerNotFound)));
    }

    #[tokio::test]
    async fn test_no_clients_at_all() {
        let query = Arc::new(StubQuery::new(vec![], 1));
        let locator = WorkerLocator::new(query);
        assert!(matches!(locator.locate().await, Err(ReloadError::WorkerNotFound)));
    }
}

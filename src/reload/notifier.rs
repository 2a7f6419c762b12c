//! Reload notification delivery.

use std::sync::Arc;

use crate::query::{ClientId, ServerQuery, TextTarget};
use crate::reload::ReloadError;

/// Sends `<prefix>reload <feature>` to the worker as a private text message.
#[derive(Clone)]
pub struct ReloadNotifier {
    query: Arc<dyn ServerQuery>,
    command_prefix: String,
}

impl ReloadNotifier {
    pub fn new(query: Arc<dyn ServerQuery>, command_prefix: impl Into<String>) -> Self {
        Self {
            query,
            command_prefix: command_prefix.into(),
        }
    }

    pub fn message_for(&self, feature: &str) -> String {
        format!("{}reload {}", self.command_prefix, feature)
    }

    /// No acknowledgment is awaited from the worker.
    pub async fn notify(&self, worker: ClientId, feature: &str) -> Result<(), ReloadError> {
        let message = self.message_for(feature);
        self.query
            .send_text_message(TextTarget::Client, worker, &message)
            .await?;
        tracing::debug!(worker, feature = %feature, "Reload notification sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reload::test_support::StubQuery;

    #[tokio::test]
    async fn test_message_format_and_target() {
        let query = Arc::new(StubQuery::new(vec![1, 2], 1));
        let notifier = ReloadNotifier::new(query.clone(), "!");

        notifier.notify(2, "command_help").await.unwrap();

        let sent = query.sent();
        assert_eq!(sent, vec![(2, "!reload command_help".to_string())]);
    }

    #[tokio::test]
    async fn test_send_failure_is_protocol_error() {
        let query = Arc::new(StubQuery::new(vec![1, 2], 1).failing_sends());
        let notifier = ReloadNotifier::new(query, "!");
        assert!(matches!(
            notifier.notify(2, "do_task").await,
            Err(ReloadError::Protocol(_))
        ));
    }
}

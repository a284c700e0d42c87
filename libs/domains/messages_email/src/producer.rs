//! Producer side: queue a new message for email delivery.

use crate::config::{EMAIL_METHOD, UserSettings};
use crate::error::NotificationResult;
use push_queue::{JobFilter, JobQueue};
use tracing::debug;

/// Queue `message_id` for `recipient` according to their settings.
///
/// Returns `false` without touching the queue when email is disabled.
pub async fn queue_message(
    queue: &dyn JobQueue,
    recipient: &str,
    message_id: &str,
    settings: &UserSettings,
) -> NotificationResult<bool> {
    if !settings.enable {
        debug!(recipient = %recipient, "Email disabled, not queued");
        return Ok(false);
    }

    let filter = JobFilter::new(EMAIL_METHOD, settings.interval);
    queue.enqueue(recipient, message_id, &filter).await?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use push_queue::{InMemoryJobQueue, Interval};

    #[tokio::test]
    async fn test_queues_for_chosen_interval() {
        let queue = InMemoryJobQueue::new();
        let settings = UserSettings {
            enable: true,
            interval: Interval::Daily,
        };

        assert!(queue_message(&queue, "alice", "m1", &settings).await.unwrap());

        let daily = JobFilter::new("email", Interval::Daily);
        let immediate = JobFilter::new("email", Interval::Immediate);
        assert_eq!(queue.pending_count(&daily).await.unwrap(), 1);
        assert_eq!(queue.pending_count(&immediate).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_disabled_is_not_queued() {
        let queue = InMemoryJobQueue::new();
        let settings = UserSettings {
            enable: false,
            interval: Interval::Immediate,
        };

        assert!(!queue_message(&queue, "alice", "m1", &settings).await.unwrap());
        assert!(queue.messages_for("alice").await.is_empty());
    }
}

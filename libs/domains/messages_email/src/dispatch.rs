//! Publishing resolved jobs and removing them from the queue.

use crate::error::NotificationResult;
use crate::event_bus::EventBus;
use crate::models::{DispatchEvent, ResolvedBatch};
use push_queue::{Job, JobQueue};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Clone)]
pub struct Dispatcher {
    queue: Arc<dyn JobQueue>,
    bus: Arc<dyn EventBus>,
    event_type: String,
}

impl Dispatcher {
    pub fn new(queue: Arc<dyn JobQueue>, bus: Arc<dyn EventBus>, event_type: impl Into<String>) -> Self {
        Self {
            queue,
            bus,
            event_type: event_type.into(),
        }
    }

    /// Publish one event for `batch`, then delete the job.
    ///
    /// If publishing fails the job is left in the queue.
    pub async fn dispatch(&self, job: &Job, batch: ResolvedBatch) -> NotificationResult<()> {
        let message_count = batch.messages.len();
        self.bus
            .publish_later(DispatchEvent::new(self.event_type.clone(), batch))
            .await?;

        info!(
            job_id = %job.id,
            recipient = %job.recipient,
            messages = message_count,
            "Dispatched email event"
        );

        self.cleanup(job).await
    }

    /// Delete the job. A job that is already gone is not an error.
    pub async fn cleanup(&self, job: &Job) -> NotificationResult<()> {
        if !self.queue.delete(&job.id).await? {
            debug!(job_id = %job.id, "Job already removed");
        }
        Ok(())
    }
}

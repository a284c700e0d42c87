//! The job queue contract consumed by drain loops and producers.

use crate::error::QueueResult;
use crate::job::{Job, JobFilter, JobId};
use async_trait::async_trait;

/// Storage-agnostic job queue.
///
/// Implementations guarantee that a pulled job is invisible to every other
/// pull until it is deleted or its lock expires.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Lock and return the oldest eligible job matching `filter`.
    ///
    /// The job is locked under `job_id` and returned with that id.
    /// `None` means the queue is exhausted for this filter.
    async fn pull(&self, job_id: JobId, filter: &JobFilter) -> QueueResult<Option<Job>>;

    /// Remove the job locked under `job_id`.
    ///
    /// Returns `false` if no such job exists (already deleted, or the lock
    /// expired and the job was pulled again under another id).
    async fn delete(&self, job_id: &JobId) -> QueueResult<bool>;

    /// Unlock the job held under `job_id` so the next pull can take it again.
    ///
    /// The job keeps its place in pull order. Returns `false` if no job is
    /// locked under `job_id`.
    async fn release(&self, job_id: &JobId) -> QueueResult<bool>;

    /// Add a message reference to the recipient's open job for `filter`,
    /// creating the job if none is open. Duplicate references are ignored.
    async fn enqueue(&self, recipient: &str, message_id: &str, filter: &JobFilter)
    -> QueueResult<()>;

    /// Number of live jobs (locked or not) for `filter`.
    async fn pending_count(&self, filter: &JobFilter) -> QueueResult<usize>;
}

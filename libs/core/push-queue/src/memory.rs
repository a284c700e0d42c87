//! In-process job queue.

use crate::config::QueueConfig;
use crate::error::QueueResult;
use crate::job::{Job, JobFilter, JobId};
use crate::queue::JobQueue;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug)]
struct Record {
    filter: JobFilter,
    recipient: String,
    messages: Vec<String>,
    created_at: DateTime<Utc>,
    /// Still accepting new messages; cleared by the first pull.
    open: bool,
    lock: Option<Lock>,
}

#[derive(Debug, Clone, Copy)]
struct Lock {
    job_id: JobId,
    expires_at: Instant,
}

impl Record {
    fn is_visible(&self, now: Instant) -> bool {
        self.lock.is_none_or(|lock| lock.expires_at <= now)
    }
}

/// Job queue kept in memory with the same locking rules as the Redis backend.
///
/// Records are kept oldest first. Lock expiry follows `tokio::time`, so
/// tests can drive it with a paused clock.
#[derive(Clone)]
pub struct InMemoryJobQueue {
    records: Arc<Mutex<Vec<Record>>>,
    lock_ttl: Duration,
}

impl InMemoryJobQueue {
    pub fn new() -> Self {
        Self::with_config(&QueueConfig::default())
    }

    pub fn with_config(config: &QueueConfig) -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
            lock_ttl: config.lock_ttl,
        }
    }

    /// Message references of every live job for `recipient`, oldest first.
    pub async fn messages_for(&self, recipient: &str) -> Vec<Vec<String>> {
        let records = self.records.lock().await;
        records
            .iter()
            .filter(|r| r.recipient == recipient)
            .map(|r| r.messages.clone())
            .collect()
    }

    /// Whether any job is currently locked (and not expired) under `job_id`.
    pub async fn is_locked(&self, job_id: &JobId) -> bool {
        let now = Instant::now();
        let records = self.records.lock().await;
        records.iter().any(|r| {
            r.lock
                .is_some_and(|lock| lock.job_id == *job_id && lock.expires_at > now)
        })
    }
}

impl Default for InMemoryJobQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobQueue for InMemoryJobQueue {
    async fn pull(&self, job_id: JobId, filter: &JobFilter) -> QueueResult<Option<Job>> {
        let now = Instant::now();
        let mut records = self.records.lock().await;

        let Some(record) = records
            .iter_mut()
            .find(|r| r.filter == *filter && r.is_visible(now))
        else {
            return Ok(None);
        };

        record.open = false;
        record.lock = Some(Lock {
            job_id,
            expires_at: now + self.lock_ttl,
        });

        debug!(job_id = %job_id, recipient = %record.recipient, "Locked job");

        Ok(Some(Job {
            id: job_id,
            method: record.filter.method.clone(),
            interval: record.filter.interval,
            recipient: record.recipient.clone(),
            messages: record.messages.clone(),
            created_at: record.created_at,
        }))
    }

    async fn delete(&self, job_id: &JobId) -> QueueResult<bool> {
        let mut records = self.records.lock().await;
        let before = records.len();
        records.retain(|r| r.lock.is_none_or(|lock| lock.job_id != *job_id));
        Ok(records.len() < before)
    }

    async fn release(&self, job_id: &JobId) -> QueueResult<bool> {
        let mut records = self.records.lock().await;
        let Some(record) = records
            .iter_mut()
            .find(|r| r.lock.is_some_and(|lock| lock.job_id == *job_id))
        else {
            return Ok(false);
        };

        record.lock = None;
        debug!(job_id = %job_id, recipient = %record.recipient, "Released job");
        Ok(true)
    }

    async fn enqueue(
        &self,
        recipient: &str,
        message_id: &str,
        filter: &JobFilter,
    ) -> QueueResult<()> {
        let mut records = self.records.lock().await;

        let open = records
            .iter_mut()
            .find(|r| r.open && r.filter == *filter && r.recipient == recipient);

        match open {
            Some(record) => {
                if !record.messages.iter().any(|m| m == message_id) {
                    record.messages.push(message_id.to_string());
                }
            }
            None => records.push(Record {
                filter: filter.clone(),
                recipient: recipient.to_string(),
                messages: vec![message_id.to_string()],
                created_at: Utc::now(),
                open: true,
                lock: None,
            }),
        }

        Ok(())
    }

    async fn pending_count(&self, filter: &JobFilter) -> QueueResult<usize> {
        let records = self.records.lock().await;
        Ok(records.iter().filter(|r| r.filter == *filter).count())
    }
}

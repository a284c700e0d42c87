//! Turns a pulled job into a deliverable batch.

use crate::clients::{IdentityStore, MessageStore};
use crate::error::{NotificationError, NotificationResult};
use crate::models::{Identity, Message, ResolvedBatch};
use push_queue::Job;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Outcome of resolving a job that did not fail transiently.
#[derive(Debug)]
pub enum Resolution {
    Ready(ResolvedBatch),
    /// Something the job refers to is gone; the error says what.
    Stale(NotificationError),
}

/// Fetches a job's messages and recipient identity in parallel.
#[derive(Clone)]
pub struct JobResolver {
    identities: Arc<dyn IdentityStore>,
    messages: Arc<dyn MessageStore>,
}

/// Inner `Err` is a stale reference; outer `Err` is a transient failure.
type Lookup<T> = NotificationResult<Result<T, NotificationError>>;

fn split_stale<T>(result: NotificationResult<T>) -> Lookup<T> {
    match result {
        Ok(value) => Ok(Ok(value)),
        Err(e) if e.is_stale() => Ok(Err(e)),
        Err(e) => Err(e),
    }
}

impl JobResolver {
    pub fn new(identities: Arc<dyn IdentityStore>, messages: Arc<dyn MessageStore>) -> Self {
        Self {
            identities,
            messages,
        }
    }

    /// Resolve `job`, failing fast on the first transient error from either
    /// lookup. A transient failure wins over a stale reference found by the
    /// other lookup.
    pub async fn resolve(&self, job: &Job) -> NotificationResult<Resolution> {
        let hydrate = async {
            split_stale(self.messages.hydrate(&job.messages, &job.recipient).await)
        };
        let identity = async { split_stale(self.identities.get(&job.recipient).await) };

        let (messages, identity): (Result<Vec<Message>, _>, Result<Identity, _>) =
            tokio::try_join!(hydrate, identity)?;

        let identity = match identity {
            Ok(identity) => identity,
            Err(stale) => return Ok(Resolution::Stale(stale)),
        };
        let messages = match messages {
            Ok(messages) => in_job_order(&job.messages, messages),
            Err(stale) => return Ok(Resolution::Stale(stale)),
        };

        if messages.is_empty() {
            return Ok(Resolution::Stale(NotificationError::MessagesNotFound(
                job.recipient.clone(),
            )));
        }

        if messages.len() < job.messages.len() {
            debug!(
                job_id = %job.id,
                found = messages.len(),
                queued = job.messages.len(),
                "Some queued messages no longer exist"
            );
        }

        Ok(Resolution::Ready(ResolvedBatch { messages, identity }))
    }
}

/// Order `found` as the job lists them, dropping anything the job did not ask for.
fn in_job_order(ids: &[String], found: Vec<Message>) -> Vec<Message> {
    let mut by_id: HashMap<String, Message> =
        found.into_iter().map(|m| (m.id.clone(), m)).collect();
    ids.iter().filter_map(|id| by_id.remove(id)).collect()
}

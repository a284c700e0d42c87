//! Queue configuration

use std::time::Duration;

/// Default key prefix shared by all push queue keys.
pub const DEFAULT_PREFIX: &str = "messages:push";

/// Configuration for a job queue backend
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Prefix for every Redis key the queue owns
    pub prefix: String,

    /// How long a pulled job stays invisible to other pulls
    pub lock_ttl: Duration,
}

impl QueueConfig {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            lock_ttl: Duration::from_secs(300),
        }
    }

    /// Set the lock (visibility) timeout
    pub fn with_lock_ttl(mut self, ttl: Duration) -> Self {
        self.lock_ttl = ttl;
        self
    }

    pub(crate) fn lock_ttl_ms(&self) -> u64 {
        self.lock_ttl.as_millis().min(u64::MAX as u128) as u64
    }

    pub(crate) fn pending_key(&self, method: &str, interval: &str) -> String {
        format!("{}:pending:{}:{}", self.prefix, method, interval)
    }

    pub(crate) fn open_key(&self, method: &str, interval: &str, recipient: &str) -> String {
        format!("{}:open:{}:{}:{}", self.prefix, method, interval, recipient)
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

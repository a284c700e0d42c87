//! Redis connection helpers for queue backends.

use redis::Client;
use redis::aio::ConnectionManager;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Backoff policy for establishing the initial connection.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Attempts after the first one
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl RetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Delay before retry number `attempt` (1-based), doubling up to `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
        }
    }
}

/// Open a managed connection and verify it with `PING`.
///
/// The returned [`ConnectionManager`] reconnects on its own after the
/// initial handshake, so it can be cloned into every queue and bus.
pub async fn connect(url: &str) -> redis::RedisResult<ConnectionManager> {
    debug!(url = %url, "Connecting to Redis");

    let client = Client::open(url)?;
    let manager = ConnectionManager::new(client).await?;

    let mut conn = manager.clone();
    let _: String = redis::cmd("PING").query_async(&mut conn).await?;

    info!("Connected to Redis");
    Ok(manager)
}

/// [`connect`], retried with exponential backoff.
pub async fn connect_with_retry(
    url: &str,
    retry: &RetryConfig,
) -> redis::RedisResult<ConnectionManager> {
    let mut attempt = 0;

    loop {
        match connect(url).await {
            Ok(manager) => return Ok(manager),
            Err(e) if attempt < retry.max_retries => {
                attempt += 1;
                let delay = retry.delay_for(attempt);
                warn!(
                    error = %e,
                    attempt,
                    max_retries = retry.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    "Redis connection failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

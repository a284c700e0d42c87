//! Hand-off of dispatch events to the delivery subsystem.
//!
//! Publishing returns once the event has left the drain; there is no
//! delivery acknowledgement.

use crate::error::{NotificationError, NotificationResult};
use crate::models::DispatchEvent;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use tokio::sync::mpsc;
use tracing::debug;

/// Default Redis stream for email dispatch events.
pub const DEFAULT_EVENT_STREAM: &str = "messages:email:events";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish_later(&self, event: DispatchEvent) -> NotificationResult<()>;
}

/// In-process bus backed by an unbounded channel.
#[derive(Clone)]
pub struct ChannelEventBus {
    tx: mpsc::UnboundedSender<DispatchEvent>,
}

impl ChannelEventBus {
    /// Bus plus the receiver the delivery worker reads from.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DispatchEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl EventBus for ChannelEventBus {
    async fn publish_later(&self, event: DispatchEvent) -> NotificationResult<()> {
        self.tx
            .send(event)
            .map_err(|_| NotificationError::EventBus("event channel closed".to_string()))
    }
}

/// Approximate cap on the dispatch event stream (`XADD MAXLEN ~`).
pub const DEFAULT_EVENT_STREAM_MAX_LEN: usize = 100_000;

/// Bus that appends events to a capped Redis stream under the field `event`.
#[derive(Clone)]
pub struct StreamEventBus {
    conn: ConnectionManager,
    stream: String,
    max_len: usize,
}

impl StreamEventBus {
    pub fn new(conn: ConnectionManager, stream: impl Into<String>) -> Self {
        Self {
            conn,
            stream: stream.into(),
            max_len: DEFAULT_EVENT_STREAM_MAX_LEN,
        }
    }

    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }

    pub fn stream(&self) -> &str {
        &self.stream
    }
}

#[async_trait]
impl EventBus for StreamEventBus {
    async fn publish_later(&self, event: DispatchEvent) -> NotificationResult<()> {
        let payload = serde_json::to_string(&event)?;
        let mut conn = self.conn.clone();

        let entry_id: String = redis::cmd("XADD")
            .arg(&self.stream)
            .arg("MAXLEN")
            .arg("~")
            .arg(self.max_len)
            .arg("*")
            .arg("event")
            .arg(payload)
            .query_async(&mut conn)
            .await?;

        debug!(stream = %self.stream, entry_id = %entry_id, "Published dispatch event");
        Ok(())
    }
}

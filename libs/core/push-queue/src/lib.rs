//! Push Queue
//!
//! Job queue for pending push notifications. Messages for the same recipient,
//! delivery method and interval accumulate into a single job; a consumer pulls
//! one job at a time under a lock it names, and deletes it when done.
//!
//! ## Backends
//!
//! - [`RedisJobQueue`]: sorted set of job records scored by visible-at time,
//!   all mutations done by Lua scripts so pull/delete/enqueue are atomic.
//! - [`InMemoryJobQueue`]: same semantics behind a mutex, for tests and local runs.
//!
//! ## Example
//!
//! ```rust,ignore
//! use push_queue::{InMemoryJobQueue, Interval, JobFilter, JobId, JobQueue};
//!
//! let queue = InMemoryJobQueue::new();
//! let filter = JobFilter::new("email", Interval::Daily);
//! queue.enqueue("https://example.com/i/alice", "message-1", &filter).await?;
//!
//! while let Some(job) = queue.pull(JobId::new(), &filter).await? {
//!     // ... deliver ...
//!     queue.delete(&job.id).await?;
//! }
//! ```

mod config;
mod connection;
mod error;
mod job;
mod memory;
mod queue;
mod redis_store;

pub use config::{DEFAULT_PREFIX, QueueConfig};
pub use connection::{RetryConfig, connect, connect_with_retry};
pub use error::{QueueError, QueueResult};
pub use job::{Interval, Job, JobFilter, JobId};
pub use memory::InMemoryJobQueue;
pub use queue::JobQueue;
pub use redis_store::RedisJobQueue;

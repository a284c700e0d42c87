//! Queue error types

use thiserror::Error;

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;

/// Errors raised by a job queue backend.
///
/// Every variant is a storage-side failure; "no job available" and
/// "job already deleted" are ordinary return values, not errors.
#[derive(Error, Debug)]
pub enum QueueError {
    /// Redis connection or command error
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// A stored job record could not be decoded
    #[error("Corrupt job record {record}: {details}")]
    Corrupt { record: String, details: String },
}

impl QueueError {
    pub fn corrupt(record: impl Into<String>, details: impl Into<String>) -> Self {
        QueueError::Corrupt {
            record: record.into(),
            details: details.into(),
        }
    }
}

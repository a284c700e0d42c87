//! Error types for the email drain.
//!
//! Every error falls into one of two categories, which decide what the
//! drain loop does with the job it was working on:
//! - **Stale**: something the job refers to is gone; delete the job and move on
//! - **Transient**: anything else; abort the run and leave the job queued

use push_queue::QueueError;
use thiserror::Error;

/// Result type for drain operations.
pub type NotificationResult<T> = Result<T, NotificationError>;

/// How the drain loop reacts to an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Stale,
    Transient,
}

#[derive(Debug, Error)]
pub enum NotificationError {
    /// The recipient's identity no longer exists.
    #[error("Identity not found: {0}")]
    IdentityNotFound(String),

    /// None of the job's messages exist anymore.
    #[error("Messages not found for recipient {0}")]
    MessagesNotFound(String),

    /// Identity service failure.
    #[error("Identity store error: {0}")]
    IdentityStore(String),

    /// Message service failure.
    #[error("Message store error: {0}")]
    MessageStore(String),

    /// Job queue failure.
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    /// The event could not be handed off.
    #[error("Event bus error: {0}")]
    EventBus(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl NotificationError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            NotificationError::IdentityNotFound(_) | NotificationError::MessagesNotFound(_) => {
                ErrorCategory::Stale
            }
            _ => ErrorCategory::Transient,
        }
    }

    pub fn is_stale(&self) -> bool {
        self.category() == ErrorCategory::Stale
    }
}

impl From<serde_json::Error> for NotificationError {
    fn from(err: serde_json::Error) -> Self {
        NotificationError::Internal(format!("JSON serialization error: {}", err))
    }
}

impl From<redis::RedisError> for NotificationError {
    fn from(err: redis::RedisError) -> Self {
        NotificationError::EventBus(err.to_string())
    }
}

impl From<core_config::ConfigError> for NotificationError {
    fn from(err: core_config::ConfigError) -> Self {
        NotificationError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_is_stale() {
        assert!(NotificationError::IdentityNotFound("alice".into()).is_stale());
        assert!(NotificationError::MessagesNotFound("alice".into()).is_stale());
    }

    #[test]
    fn test_everything_else_is_transient() {
        let errors = [
            NotificationError::IdentityStore("503".into()),
            NotificationError::MessageStore("timeout".into()),
            NotificationError::Queue(QueueError::corrupt("7", "job has no messages")),
            NotificationError::EventBus("closed".into()),
            NotificationError::Config("bad".into()),
            NotificationError::Internal("oops".into()),
        ];
        for err in errors {
            assert_eq!(err.category(), ErrorCategory::Transient, "{err}");
        }
    }
}

//! Clients for the services a job refers to.
//!
//! Both stores report a missing entity with a `*NotFound` error so the drain
//! can tell a stale job from a failing dependency.

mod http;
mod memory;

pub use http::{HttpClientConfig, HttpIdentityClient, HttpMessageClient};
pub use memory::{InMemoryIdentityStore, InMemoryMessageStore};

use crate::error::NotificationResult;
use crate::models::{Identity, Message};
use async_trait::async_trait;

/// Looks up recipient identities.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// `IdentityNotFound` if the recipient no longer exists.
    async fn get(&self, recipient: &str) -> NotificationResult<Identity>;
}

/// Loads message bodies by reference.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Messages among `ids` that belong to `recipient`, in any order.
    ///
    /// `MessagesNotFound` if none of them exist.
    async fn hydrate(&self, ids: &[String], recipient: &str) -> NotificationResult<Vec<Message>>;
}

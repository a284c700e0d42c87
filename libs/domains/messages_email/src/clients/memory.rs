//! In-memory stores for tests and local runs.

use super::{IdentityStore, MessageStore};
use crate::error::{NotificationError, NotificationResult};
use crate::models::{Identity, Message};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone, Default)]
pub struct InMemoryIdentityStore {
    identities: Arc<RwLock<HashMap<String, Identity>>>,
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, identity: Identity) {
        self.identities
            .write()
            .await
            .insert(identity.id.clone(), identity);
    }

    pub async fn remove(&self, id: &str) -> Option<Identity> {
        self.identities.write().await.remove(id)
    }
}

#[async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn get(&self, recipient: &str) -> NotificationResult<Identity> {
        self.identities
            .read()
            .await
            .get(recipient)
            .cloned()
            .ok_or_else(|| NotificationError::IdentityNotFound(recipient.to_string()))
    }
}

#[derive(Clone, Default)]
pub struct InMemoryMessageStore {
    messages: Arc<RwLock<HashMap<String, Message>>>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, message: Message) {
        self.messages
            .write()
            .await
            .insert(message.id.clone(), message);
    }

    pub async fn remove(&self, id: &str) -> Option<Message> {
        self.messages.write().await.remove(id)
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn hydrate(&self, ids: &[String], recipient: &str) -> NotificationResult<Vec<Message>> {
        let messages = self.messages.read().await;
        let found: Vec<Message> = ids
            .iter()
            .filter_map(|id| messages.get(id))
            .filter(|m| m.recipient == recipient)
            .cloned()
            .collect();

        if found.is_empty() {
            return Err(NotificationError::MessagesNotFound(recipient.to_string()));
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_identity_lookup() {
        let store = InMemoryIdentityStore::new();
        store.insert(Identity::new("alice")).await;

        assert_eq!(store.get("alice").await.unwrap().id, "alice");
        assert!(store.get("bob").await.unwrap_err().is_stale());
    }

    #[tokio::test]
    async fn test_hydrate_is_scoped_to_recipient() {
        let store = InMemoryMessageStore::new();
        store.insert(Message::new("m1", "alice")).await;
        store.insert(Message::new("m2", "bob")).await;

        let ids = vec!["m1".to_string(), "m2".to_string()];
        let found = store.hydrate(&ids, "alice").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "m1");

        let err = store.hydrate(&ids, "carol").await.unwrap_err();
        assert!(matches!(err, NotificationError::MessagesNotFound(_)));
    }
}

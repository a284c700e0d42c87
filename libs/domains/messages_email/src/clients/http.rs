//! HTTP clients for the identity and message services.

use super::{IdentityStore, MessageStore};
use crate::error::{NotificationError, NotificationResult};
use crate::models::{Identity, Message};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Connection settings shared by the HTTP clients.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Service base URL without a trailing slash.
    pub base_url: String,
    pub timeout: Duration,
}

impl HttpClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn build_client(&self) -> NotificationResult<Client> {
        Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| NotificationError::Config(format!("HTTP client: {}", e)))
    }
}

/// Identity service client: `GET {base}/identities/{id}`.
#[derive(Clone)]
pub struct HttpIdentityClient {
    config: HttpClientConfig,
    client: Client,
}

impl HttpIdentityClient {
    pub fn new(config: HttpClientConfig) -> NotificationResult<Self> {
        let client = config.build_client()?;
        Ok(Self { config, client })
    }

    fn identity_url(&self, recipient: &str) -> String {
        format!(
            "{}/identities/{}",
            self.config.base_url,
            urlencoding::encode(recipient)
        )
    }
}

#[async_trait]
impl IdentityStore for HttpIdentityClient {
    async fn get(&self, recipient: &str) -> NotificationResult<Identity> {
        let url = self.identity_url(recipient);
        debug!(recipient = %recipient, "Fetching identity");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| NotificationError::IdentityStore(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(NotificationError::IdentityNotFound(recipient.to_string())),
            status if status.is_success() => response
                .json::<Identity>()
                .await
                .map_err(|e| NotificationError::IdentityStore(format!("invalid identity: {}", e))),
            status => {
                let body = response.text().await.unwrap_or_default();
                warn!(recipient = %recipient, status = %status, "Identity service error");
                Err(NotificationError::IdentityStore(format!(
                    "{} returned {}: {}",
                    url, status, body
                )))
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct MessageQuery<'a> {
    ids: &'a [String],
    recipient: &'a str,
}

/// Message service client: `POST {base}/messages/query`.
#[derive(Clone)]
pub struct HttpMessageClient {
    config: HttpClientConfig,
    client: Client,
}

impl HttpMessageClient {
    pub fn new(config: HttpClientConfig) -> NotificationResult<Self> {
        let client = config.build_client()?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl MessageStore for HttpMessageClient {
    async fn hydrate(&self, ids: &[String], recipient: &str) -> NotificationResult<Vec<Message>> {
        let url = format!("{}/messages/query", self.config.base_url);
        debug!(recipient = %recipient, count = ids.len(), "Hydrating messages");

        let response = self
            .client
            .post(&url)
            .json(&MessageQuery { ids, recipient })
            .send()
            .await
            .map_err(|e| NotificationError::MessageStore(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(NotificationError::MessagesNotFound(recipient.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(recipient = %recipient, status = %status, "Message service error");
            return Err(NotificationError::MessageStore(format!(
                "{} returned {}: {}",
                url, status, body
            )));
        }

        let messages: Vec<Message> = response
            .json()
            .await
            .map_err(|e| NotificationError::MessageStore(format!("invalid messages: {}", e)))?;

        if messages.is_empty() {
            return Err(NotificationError::MessagesNotFound(recipient.to_string()));
        }
        Ok(messages)
    }
}

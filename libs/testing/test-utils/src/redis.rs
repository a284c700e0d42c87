//! Redis test infrastructure

use redis::Client;
use redis::aio::ConnectionManager;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::redis::Redis;

/// Redis container that lives as long as this value.
///
/// Set `TEST_REDIS_URL` to reuse an already running server instead of
/// starting a container.
pub struct TestRedis {
    _container: Option<ContainerAsync<Redis>>,
    pub connection_string: String,
}

impl TestRedis {
    pub async fn new() -> Self {
        if let Ok(url) = std::env::var("TEST_REDIS_URL") {
            return Self {
                _container: None,
                connection_string: url,
            };
        }

        let container = Redis::default()
            .with_tag("8-alpine")
            .start()
            .await
            .expect("Failed to start Redis container");

        let host_port = container
            .get_host_port_ipv4(6379)
            .await
            .expect("Failed to get Redis port");

        tracing::info!(port = host_port, "Test Redis ready");

        Self {
            _container: Some(container),
            connection_string: format!("redis://127.0.0.1:{}", host_port),
        }
    }

    /// A fresh managed connection, the kind queues and event buses take
    pub async fn manager(&self) -> ConnectionManager {
        let client = Client::open(self.connection_string.as_str())
            .expect("Failed to create Redis client");
        ConnectionManager::new(client)
            .await
            .expect("Failed to connect to Redis")
    }

    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }
}

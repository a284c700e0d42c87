//! Shared test utilities for the push notification crates
//!
//! - `TestRedis`: Redis container with automatic cleanup (feature: "redis")
//! - `TestDataBuilder`: deterministic recipients, message ids and key prefixes
//! - `assertions`: assertion helpers
//!
//! ## Redis Testing
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { workspace = true, features = ["redis"] }
//! ```
//!
//! ```rust,ignore
//! use test_utils::{TestDataBuilder, TestRedis};
//!
//! #[tokio::test]
//! async fn my_queue_test() {
//!     let redis = TestRedis::new().await;
//!     let data = TestDataBuilder::from_test_name("my_queue_test");
//!     let queue = RedisJobQueue::new(redis.manager().await, QueueConfig::new(data.key_prefix()));
//! }
//! ```

use uuid::Uuid;

#[cfg(feature = "redis")]
mod redis;

#[cfg(feature = "redis")]
pub use self::redis::TestRedis;

/// Deterministic test data derived from a seed.
///
/// Two builders with the same seed produce the same references, so a test
/// can rebuild the ids it queued when asserting on what was dispatched.
pub struct TestDataBuilder {
    seed: u64,
}

impl TestDataBuilder {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Seed from the test name
    pub fn from_test_name(name: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    /// Identity reference for a named recipient
    pub fn recipient(&self, name: &str) -> String {
        format!("https://identity.test/{}/{}", self.seed, name)
    }

    /// Message reference; `n` orders messages within a test
    pub fn message_id(&self, n: u32) -> String {
        format!("urn:uuid:{}", self.uuid(u64::from(n)))
    }

    /// `count` message references in order
    pub fn message_ids(&self, count: u32) -> Vec<String> {
        (1..=count).map(|n| self.message_id(n)).collect()
    }

    /// Redis key prefix private to this test
    pub fn key_prefix(&self) -> String {
        format!("test:{}:push", self.seed)
    }

    fn uuid(&self, salt: u64) -> Uuid {
        let mut bytes = [0u8; 16];
        bytes[..8].copy_from_slice(&self.seed.to_le_bytes());
        bytes[8..].copy_from_slice(&salt.to_le_bytes());
        Uuid::from_bytes(bytes)
    }
}

/// Test assertion helpers
pub mod assertions {
    use std::fmt::Debug;

    /// Assert that two slices hold the same items, ignoring order
    pub fn assert_same_items<T: Ord + Clone + Debug>(actual: &[T], expected: &[T], context: &str) {
        let mut actual = actual.to_vec();
        let mut expected = expected.to_vec();
        actual.sort();
        expected.sort();
        assert_eq!(actual, expected, "{}: items differ", context);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_builder_deterministic() {
        let a = TestDataBuilder::new(42);
        let b = TestDataBuilder::new(42);

        assert_eq!(a.recipient("alice"), b.recipient("alice"));
        assert_eq!(a.message_ids(3), b.message_ids(3));
        assert_eq!(a.key_prefix(), "test:42:push");
    }

    #[test]
    fn test_message_ids_are_distinct() {
        let data = TestDataBuilder::from_test_name("distinct");
        let ids = data.message_ids(3);
        assert_eq!(ids.len(), 3);
        assert_ne!(ids[0], ids[1]);
        assert_ne!(ids[1], ids[2]);
    }

    #[test]
    fn test_different_names_differ() {
        let a = TestDataBuilder::from_test_name("test1");
        let b = TestDataBuilder::from_test_name("test2");
        assert_ne!(a.recipient("alice"), b.recipient("alice"));
    }

    #[test]
    fn test_assert_same_items() {
        assertions::assert_same_items(&[3, 1, 2], &[1, 2, 3], "reordered");
    }
}

//! Queue contract tests
//!
//! Each scenario runs against the in-memory backend, and against Redis when
//! a container is available (`cargo test -- --ignored`).

use push_queue::*;
use std::collections::HashSet;
use std::time::Duration;
use test_utils::{TestDataBuilder, TestRedis};

fn email(interval: Interval) -> JobFilter {
    JobFilter::new("email", interval)
}

async fn exhausted_queue_returns_none(queue: &dyn JobQueue) {
    let pulled = queue.pull(JobId::new(), &email(Interval::Daily)).await.unwrap();
    assert!(pulled.is_none());
}

async fn pull_returns_job_under_given_id(queue: &dyn JobQueue, data: &TestDataBuilder) {
    let filter = email(Interval::Immediate);
    let alice = data.recipient("alice");
    for id in data.message_ids(3) {
        queue.enqueue(&alice, &id, &filter).await.unwrap();
    }

    let job_id = JobId::new();
    let job = queue.pull(job_id, &filter).await.unwrap().unwrap();

    assert_eq!(job.id, job_id);
    assert_eq!(job.recipient, alice);
    assert_eq!(job.method, "email");
    assert_eq!(job.interval, Interval::Immediate);
    assert_eq!(job.messages, data.message_ids(3));

    assert!(queue.delete(&job_id).await.unwrap());
    assert!(!queue.delete(&job_id).await.unwrap());
    assert!(queue.pull(JobId::new(), &filter).await.unwrap().is_none());
}

async fn locked_jobs_are_not_pulled_twice(queue: &dyn JobQueue, data: &TestDataBuilder) {
    let filter = email(Interval::Daily);
    for name in ["alice", "bob", "carol"] {
        queue
            .enqueue(&data.recipient(name), &data.message_id(1), &filter)
            .await
            .unwrap();
    }

    let mut seen = HashSet::new();
    while let Some(job) = queue.pull(JobId::new(), &filter).await.unwrap() {
        assert!(seen.insert(job.recipient.clone()), "pulled twice: {}", job.recipient);
    }
    assert_eq!(seen.len(), 3);
    assert_eq!(queue.pending_count(&filter).await.unwrap(), 3);
}

async fn jobs_come_out_oldest_first(queue: &dyn JobQueue, data: &TestDataBuilder) {
    let filter = email(Interval::Daily);
    let names = ["first", "second", "third"];
    for name in names {
        queue
            .enqueue(&data.recipient(name), &data.message_id(1), &filter)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let mut order = Vec::new();
    while let Some(job) = queue.pull(JobId::new(), &filter).await.unwrap() {
        order.push(job.recipient.clone());
        queue.delete(&job.id).await.unwrap();
    }
    let expected: Vec<String> = names.iter().map(|n| data.recipient(n)).collect();
    assert_eq!(order, expected);
}

async fn messages_after_pull_open_a_new_job(queue: &dyn JobQueue, data: &TestDataBuilder) {
    let filter = email(Interval::Daily);
    let alice = data.recipient("alice");

    queue.enqueue(&alice, &data.message_id(1), &filter).await.unwrap();
    let first = queue.pull(JobId::new(), &filter).await.unwrap().unwrap();

    queue.enqueue(&alice, &data.message_id(2), &filter).await.unwrap();
    queue.enqueue(&alice, &data.message_id(2), &filter).await.unwrap();
    let second = queue.pull(JobId::new(), &filter).await.unwrap().unwrap();

    assert_eq!(first.messages, vec![data.message_id(1)]);
    assert_eq!(second.messages, vec![data.message_id(2)]);

    // Deleting the first job leaves the second one alone.
    assert!(queue.delete(&first.id).await.unwrap());
    assert_eq!(queue.pending_count(&filter).await.unwrap(), 1);
}

async fn expired_lock_makes_job_visible(queue: &dyn JobQueue, data: &TestDataBuilder) {
    let filter = email(Interval::Immediate);
    queue
        .enqueue(&data.recipient("alice"), &data.message_id(1), &filter)
        .await
        .unwrap();

    let stale = JobId::new();
    assert!(queue.pull(stale, &filter).await.unwrap().is_some());
    assert!(queue.pull(JobId::new(), &filter).await.unwrap().is_none());

    tokio::time::sleep(Duration::from_millis(300)).await;

    let fresh = JobId::new();
    let job = queue.pull(fresh, &filter).await.unwrap().unwrap();
    assert_eq!(job.id, fresh);
    assert!(!queue.delete(&stale).await.unwrap());
    assert!(queue.delete(&fresh).await.unwrap());
}

async fn released_job_is_pulled_again(queue: &dyn JobQueue, data: &TestDataBuilder) {
    let filter = email(Interval::Daily);
    let alice = data.recipient("alice");
    queue.enqueue(&alice, &data.message_id(1), &filter).await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    queue
        .enqueue(&data.recipient("bob"), &data.message_id(2), &filter)
        .await
        .unwrap();

    let first = queue.pull(JobId::new(), &filter).await.unwrap().unwrap();
    assert_eq!(first.recipient, alice);
    assert!(queue.release(&first.id).await.unwrap());
    assert!(!queue.release(&first.id).await.unwrap());

    // Back at the head of the queue, well before the lock would expire.
    let again = queue.pull(JobId::new(), &filter).await.unwrap().unwrap();
    assert_eq!(again.recipient, alice);
    assert_eq!(again.messages, vec![data.message_id(1)]);
    assert!(!queue.delete(&first.id).await.unwrap());
    assert!(queue.delete(&again.id).await.unwrap());
    assert_eq!(queue.pending_count(&filter).await.unwrap(), 1);
}

fn short_lock() -> Duration {
    Duration::from_millis(200)
}

// ---------------------------------------------------------------------------
// In-memory backend
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_memory_exhausted_queue_returns_none() {
    exhausted_queue_returns_none(&InMemoryJobQueue::new()).await;
}

#[tokio::test]
async fn test_memory_pull_returns_job_under_given_id() {
    let data = TestDataBuilder::from_test_name("memory_pull");
    pull_returns_job_under_given_id(&InMemoryJobQueue::new(), &data).await;
}

#[tokio::test]
async fn test_memory_locked_jobs_are_not_pulled_twice() {
    let data = TestDataBuilder::from_test_name("memory_locked");
    locked_jobs_are_not_pulled_twice(&InMemoryJobQueue::new(), &data).await;
}

#[tokio::test]
async fn test_memory_jobs_come_out_oldest_first() {
    let data = TestDataBuilder::from_test_name("memory_order");
    jobs_come_out_oldest_first(&InMemoryJobQueue::new(), &data).await;
}

#[tokio::test]
async fn test_memory_messages_after_pull_open_a_new_job() {
    let data = TestDataBuilder::from_test_name("memory_reopen");
    messages_after_pull_open_a_new_job(&InMemoryJobQueue::new(), &data).await;
}

#[tokio::test]
async fn test_memory_expired_lock_makes_job_visible() {
    let data = TestDataBuilder::from_test_name("memory_expiry");
    let queue = InMemoryJobQueue::with_config(&QueueConfig::default().with_lock_ttl(short_lock()));
    expired_lock_makes_job_visible(&queue, &data).await;
}

#[tokio::test]
async fn test_memory_released_job_is_pulled_again() {
    let data = TestDataBuilder::from_test_name("memory_release");
    released_job_is_pulled_again(&InMemoryJobQueue::new(), &data).await;
}

// ---------------------------------------------------------------------------
// Redis backend
// ---------------------------------------------------------------------------

async fn redis_queue(redis: &TestRedis, data: &TestDataBuilder, lock_ttl: Duration) -> RedisJobQueue {
    let config = QueueConfig::new(data.key_prefix()).with_lock_ttl(lock_ttl);
    RedisJobQueue::new(redis.manager().await, config)
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_redis_queue_contract() {
    let redis = TestRedis::new().await;

    let data = TestDataBuilder::from_test_name("redis_empty");
    exhausted_queue_returns_none(&redis_queue(&redis, &data, short_lock()).await).await;

    let data = TestDataBuilder::from_test_name("redis_pull");
    pull_returns_job_under_given_id(&redis_queue(&redis, &data, short_lock()).await, &data).await;

    let data = TestDataBuilder::from_test_name("redis_locked");
    let queue = redis_queue(&redis, &data, Duration::from_secs(60)).await;
    locked_jobs_are_not_pulled_twice(&queue, &data).await;

    let data = TestDataBuilder::from_test_name("redis_order");
    jobs_come_out_oldest_first(&redis_queue(&redis, &data, short_lock()).await, &data).await;

    let data = TestDataBuilder::from_test_name("redis_reopen");
    let queue = redis_queue(&redis, &data, Duration::from_secs(60)).await;
    messages_after_pull_open_a_new_job(&queue, &data).await;

    let data = TestDataBuilder::from_test_name("redis_expiry");
    expired_lock_makes_job_visible(&redis_queue(&redis, &data, short_lock()).await, &data).await;

    let data = TestDataBuilder::from_test_name("redis_release");
    let queue = redis_queue(&redis, &data, Duration::from_secs(60)).await;
    released_job_is_pulled_again(&queue, &data).await;
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_redis_connect_with_retry() {
    let redis = TestRedis::new().await;
    let retry = RetryConfig::new().with_max_retries(2);
    assert!(connect_with_retry(redis.connection_string(), &retry).await.is_ok());
}

//! The drain loop: pull, resolve, dispatch, delete until the queue is empty.

use crate::clients::{IdentityStore, MessageStore};
use crate::config::{DrainConfig, MessagesEmailConfig};
use crate::dispatch::Dispatcher;
use crate::error::NotificationResult;
use crate::event_bus::EventBus;
use crate::metrics::DrainMetrics;
use crate::resolver::{JobResolver, Resolution};
use futures::future::join_all;
use push_queue::{Interval, Job, JobFilter, JobId, JobQueue};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

/// Which jobs a run drains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessOptions {
    pub method: String,
    pub interval: Interval,
}

impl ProcessOptions {
    pub fn new(method: impl Into<String>, interval: Interval) -> Self {
        Self {
            method: method.into(),
            interval,
        }
    }

    pub fn filter(&self) -> JobFilter {
        JobFilter::new(self.method.clone(), self.interval)
    }
}

/// What happened to a single job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Dispatched,
    /// Deleted without dispatch because something it referenced is gone.
    Removed,
}

#[derive(Debug, Default, Clone, Copy)]
struct LaneStats {
    dispatched: u64,
    removed: u64,
}

impl LaneStats {
    fn merge(self, other: LaneStats) -> LaneStats {
        LaneStats {
            dispatched: self.dispatched + other.dispatched,
            removed: self.removed + other.removed,
        }
    }
}

/// Drains email jobs into dispatch events.
#[derive(Clone)]
pub struct EmailNotifier {
    queue: Arc<dyn JobQueue>,
    resolver: JobResolver,
    dispatcher: Dispatcher,
    config: MessagesEmailConfig,
    drain: DrainConfig,
}

impl EmailNotifier {
    pub fn new(
        queue: Arc<dyn JobQueue>,
        identities: Arc<dyn IdentityStore>,
        messages: Arc<dyn MessageStore>,
        bus: Arc<dyn EventBus>,
        config: MessagesEmailConfig,
    ) -> Self {
        Self {
            dispatcher: Dispatcher::new(queue.clone(), bus, config.event_type.clone()),
            resolver: JobResolver::new(identities, messages),
            queue,
            config,
            drain: DrainConfig::default(),
        }
    }

    pub fn with_drain_config(mut self, drain: DrainConfig) -> Self {
        self.drain = drain;
        self
    }

    pub fn config(&self) -> &MessagesEmailConfig {
        &self.config
    }

    /// Drain every eligible job for `options`.
    ///
    /// Returns `Ok` once a pull finds nothing. Stale jobs are deleted and
    /// skipped. Any other error ends the run; the job being worked on is
    /// released back to the queue so the next run picks it up. If the release
    /// itself fails the job becomes visible again when its lock expires.
    ///
    /// With several lanes, the first lane to fail stops the others from
    /// pulling and its error is returned.
    #[instrument(skip(self), fields(method = %options.method, interval = %options.interval))]
    pub async fn process(&self, options: &ProcessOptions) -> NotificationResult<()> {
        let filter = options.filter();
        let metrics = DrainMetrics::new(&filter);
        let failed_lane = OnceLock::new();
        let started = Instant::now();

        let lanes = self.drain.max_concurrent_jobs.max(1);
        let result = if lanes == 1 {
            self.run_lane(0, &filter, &metrics, &failed_lane).await
        } else {
            let results = join_all(
                (0..lanes).map(|lane| self.run_lane(lane, &filter, &metrics, &failed_lane)),
            )
            .await;
            merge_lanes(results, failed_lane.get().copied())
        };

        let elapsed = started.elapsed();
        match result {
            Ok(stats) => {
                metrics.run_finished("success", elapsed);
                info!(
                    dispatched = stats.dispatched,
                    removed = stats.removed,
                    duration_ms = elapsed.as_millis() as u64,
                    "Drain run complete"
                );
                Ok(())
            }
            Err(e) => {
                metrics.run_finished("error", elapsed);
                error!(error = %e, "Drain run aborted");
                Err(e)
            }
        }
    }

    /// Sequential pull loop. `failed_lane` is set by the first lane to fail
    /// and stops every lane before its next pull.
    async fn run_lane(
        &self,
        lane: usize,
        filter: &JobFilter,
        metrics: &DrainMetrics,
        failed_lane: &OnceLock<usize>,
    ) -> NotificationResult<LaneStats> {
        let mut stats = LaneStats::default();

        while failed_lane.get().is_none() {
            let job = match self.queue.pull(JobId::new(), filter).await {
                Ok(Some(job)) => job,
                Ok(None) => break,
                Err(e) => {
                    let _ = failed_lane.set(lane);
                    return Err(e.into());
                }
            };

            match self.process_job(&job).await {
                Ok(JobOutcome::Dispatched) => {
                    stats.dispatched += 1;
                    metrics.job_dispatched();
                }
                Ok(JobOutcome::Removed) => {
                    stats.removed += 1;
                    metrics.job_stale();
                }
                Err(e) => {
                    let _ = failed_lane.set(lane);
                    warn!(job_id = %job.id, recipient = %job.recipient, error = %e, "Job failed, aborting run");
                    self.release(&job).await;
                    return Err(e);
                }
            }
        }

        Ok(stats)
    }

    /// Hand an unfinished job back to the queue. Lock expiry covers a failed release.
    async fn release(&self, job: &Job) {
        match self.queue.release(&job.id).await {
            Ok(true) => debug!(job_id = %job.id, "Released job"),
            Ok(false) => debug!(job_id = %job.id, "Job no longer locked, nothing to release"),
            Err(e) => warn!(
                job_id = %job.id,
                error = %e,
                "Failed to release job, it stays locked until the lock expires"
            ),
        }
    }

    /// Resolve one pulled job and either dispatch it or delete it as stale.
    pub async fn process_job(&self, job: &Job) -> NotificationResult<JobOutcome> {
        match self.resolver.resolve(job).await? {
            Resolution::Ready(batch) => {
                self.dispatcher.dispatch(job, batch).await?;
                Ok(JobOutcome::Dispatched)
            }
            Resolution::Stale(reason) => {
                info!(job_id = %job.id, recipient = %job.recipient, reason = %reason, "Removing stale job");
                self.dispatcher.cleanup(job).await?;
                Ok(JobOutcome::Removed)
            }
        }
    }
}

/// Sum the lane stats, or return the error of the lane that stopped the run.
fn merge_lanes(
    results: Vec<NotificationResult<LaneStats>>,
    failed_lane: Option<usize>,
) -> NotificationResult<LaneStats> {
    let mut total = LaneStats::default();
    let mut first_error = None;

    for (lane, result) in results.into_iter().enumerate() {
        match result {
            Ok(stats) => total = total.merge(stats),
            Err(e) if Some(lane) == failed_lane => first_error = Some(e),
            Err(e) => debug!(lane, error = %e, "Lane failed after the run was stopped"),
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(total),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{InMemoryIdentityStore, InMemoryMessageStore, MockIdentityStore};
    use crate::error::NotificationError;
    use crate::event_bus::{ChannelEventBus, MockEventBus};
    use crate::models::{Identity, Message};
    use push_queue::InMemoryJobQueue;

    async fn seeded() -> (InMemoryJobQueue, InMemoryIdentityStore, InMemoryMessageStore) {
        let queue = InMemoryJobQueue::new();
        let identities = InMemoryIdentityStore::new();
        let messages = InMemoryMessageStore::new();

        identities.insert(Identity::new("alice")).await;
        messages.insert(Message::new("m1", "alice")).await;
        queue
            .enqueue("alice", "m1", &JobFilter::new("email", Interval::Daily))
            .await
            .unwrap();

        (queue, identities, messages)
    }

    #[test]
    fn test_options_filter() {
        let options = ProcessOptions::new("email", Interval::Daily);
        assert_eq!(options.filter(), JobFilter::new("email", Interval::Daily));
    }

    #[tokio::test]
    async fn test_identity_failure_aborts_without_publish() {
        let (queue, _, messages) = seeded().await;

        let mut identities = MockIdentityStore::new();
        identities
            .expect_get()
            .times(1)
            .returning(|_| Err(NotificationError::IdentityStore("connection reset".into())));
        let mut bus = MockEventBus::new();
        bus.expect_publish_later().never();

        let notifier = EmailNotifier::new(
            Arc::new(queue.clone()),
            Arc::new(identities),
            Arc::new(messages),
            Arc::new(bus),
            MessagesEmailConfig::default(),
        );

        let err = notifier
            .process(&ProcessOptions::new("email", Interval::Daily))
            .await
            .unwrap_err();
        assert!(matches!(err, NotificationError::IdentityStore(_)));

        let filter = JobFilter::new("email", Interval::Daily);
        assert_eq!(queue.pending_count(&filter).await.unwrap(), 1);
        let job = queue.pull(JobId::new(), &filter).await.unwrap();
        assert!(job.is_some(), "aborted job is released, not left locked");
    }

    #[test]
    fn test_merge_lanes_returns_failing_lane_error() {
        let results = vec![
            Ok(LaneStats {
                dispatched: 2,
                removed: 1,
            }),
            Err(NotificationError::MessageStore("later".into())),
            Err(NotificationError::IdentityStore("first".into())),
        ];
        let err = merge_lanes(results, Some(2)).unwrap_err();
        assert!(matches!(err, NotificationError::IdentityStore(ref m) if m == "first"));
    }

    #[test]
    fn test_merge_lanes_sums_stats() {
        let lane = |dispatched, removed| Ok(LaneStats { dispatched, removed });
        let total = merge_lanes(vec![lane(2, 0), lane(1, 3)], None).unwrap();
        assert_eq!(total.dispatched, 3);
        assert_eq!(total.removed, 3);
    }

    #[tokio::test]
    async fn test_process_job_reports_outcome() {
        let (queue, identities, messages) = seeded().await;
        let (bus, mut rx) = ChannelEventBus::new();
        let notifier = EmailNotifier::new(
            Arc::new(queue.clone()),
            Arc::new(identities.clone()),
            Arc::new(messages),
            Arc::new(bus),
            MessagesEmailConfig::default(),
        );
        let filter = JobFilter::new("email", Interval::Daily);

        let job = queue.pull(JobId::new(), &filter).await.unwrap().unwrap();
        assert_eq!(notifier.process_job(&job).await.unwrap(), JobOutcome::Dispatched);
        assert!(rx.try_recv().is_ok());

        identities.remove("alice").await;
        queue.enqueue("alice", "m1", &filter).await.unwrap();
        let job = queue.pull(JobId::new(), &filter).await.unwrap().unwrap();
        assert_eq!(notifier.process_job(&job).await.unwrap(), JobOutcome::Removed);
        assert!(rx.try_recv().is_err());
        assert_eq!(queue.pending_count(&filter).await.unwrap(), 0);
    }
}

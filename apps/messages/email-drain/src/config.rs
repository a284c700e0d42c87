//! Configuration for the email drain worker

use core_config::redis::RedisConfig;
use core_config::{ConfigError, FromEnv, env_or_default, env_parse, env_required};
use domain_messages_email::{
    DEFAULT_EVENT_STREAM, DEFAULT_EVENT_STREAM_MAX_LEN, DrainConfig, MessagesEmailConfig,
};
use push_queue::{DEFAULT_PREFIX, Interval};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub redis: RedisConfig,
    pub messages_email: MessagesEmailConfig,
    pub drain: DrainConfig,

    /// Identity service base URL
    pub identity_url: String,
    /// Message service base URL
    pub messages_url: String,
    pub http_timeout: Duration,

    /// Prefix for every push queue key
    pub queue_prefix: String,
    /// Visibility timeout for pulled jobs
    pub lock_ttl: Duration,
    /// Redis stream that receives dispatch events
    pub event_stream: String,
    pub event_stream_max_len: usize,

    /// Cron expressions (with seconds) per interval
    pub cron_immediate: String,
    pub cron_daily: String,

    /// Prometheus exporter port used by `schedule`
    pub metrics_port: u16,
}

impl Config {
    pub fn cron_for(&self, interval: Interval) -> &str {
        match interval {
            Interval::Immediate => &self.cron_immediate,
            Interval::Daily => &self.cron_daily,
        }
    }
}

impl FromEnv for Config {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            redis: RedisConfig::from_env()?,
            messages_email: MessagesEmailConfig::from_env()?,
            drain: DrainConfig::from_env()?,
            identity_url: env_required("IDENTITY_SERVICE_URL")?,
            messages_url: env_required("MESSAGES_SERVICE_URL")?,
            http_timeout: Duration::from_millis(env_parse("HTTP_TIMEOUT_MS", 10_000)?),
            queue_prefix: env_or_default("PUSH_QUEUE_PREFIX", DEFAULT_PREFIX),
            lock_ttl: Duration::from_millis(env_parse("PUSH_QUEUE_LOCK_TTL_MS", 300_000)?),
            event_stream: env_or_default("EMAIL_EVENT_STREAM", DEFAULT_EVENT_STREAM),
            event_stream_max_len: env_parse(
                "EMAIL_EVENT_STREAM_MAXLEN",
                DEFAULT_EVENT_STREAM_MAX_LEN,
            )?,
            // every minute
            cron_immediate: env_or_default("DRAIN_CRON_IMMEDIATE", "0 * * * * *"),
            // 08:00 UTC
            cron_daily: env_or_default("DRAIN_CRON_DAILY", "0 0 8 * * *"),
            metrics_port: env_parse("METRICS_PORT", 9090)?,
        })
    }
}

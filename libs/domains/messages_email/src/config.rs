//! Configuration for the email drain.

use core_config::{ConfigError, FromEnv, env_flag, env_or_default, env_parse};
use push_queue::Interval;
use serde::{Deserialize, Serialize};

/// Delivery method tag used for email jobs.
pub const EMAIL_METHOD: &str = "email";

/// Event type tag attached to every dispatch event unless overridden.
pub const DEFAULT_EVENT_TYPE: &str = "messages-email.messageEmailEventType";

/// Per-recipient email preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSettings {
    pub enable: bool,
    pub interval: Interval,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            enable: true,
            interval: Interval::Immediate,
        }
    }
}

/// Process-wide settings injected into the controller at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct MessagesEmailConfig {
    /// Tag placed in `DispatchEvent::event_type`.
    pub event_type: String,
    /// Settings applied to recipients who never chose their own.
    pub default_user_settings: UserSettings,
}

impl MessagesEmailConfig {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            default_user_settings: UserSettings::default(),
        }
    }

    pub fn with_default_user_settings(mut self, settings: UserSettings) -> Self {
        self.default_user_settings = settings;
        self
    }
}

impl Default for MessagesEmailConfig {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_TYPE)
    }
}

impl FromEnv for MessagesEmailConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = UserSettings::default();
        Ok(Self {
            event_type: env_or_default("MESSAGES_EMAIL_EVENT_TYPE", DEFAULT_EVENT_TYPE),
            default_user_settings: UserSettings {
                enable: env_flag("MESSAGES_EMAIL_DEFAULT_ENABLE", defaults.enable)?,
                interval: env_parse("MESSAGES_EMAIL_DEFAULT_INTERVAL", defaults.interval)?,
            },
        })
    }
}

/// How a drain run is executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrainConfig {
    /// Number of jobs processed at the same time. Each lane is sequential.
    pub max_concurrent_jobs: usize,
}

impl DrainConfig {
    pub fn with_max_concurrent_jobs(mut self, n: usize) -> Self {
        self.max_concurrent_jobs = n.max(1);
        self
    }
}

impl Default for DrainConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 1,
        }
    }
}

impl FromEnv for DrainConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let lanes: usize = env_parse("DRAIN_MAX_CONCURRENT_JOBS", 1)?;
        Ok(Self::default().with_max_concurrent_jobs(lanes))
    }
}

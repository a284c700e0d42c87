//! How the email method describes itself to the notification registry.

use crate::config::{EMAIL_METHOD, UserSettings};
use crate::drain::{EmailNotifier, ProcessOptions};
use crate::error::NotificationResult;
use async_trait::async_trait;
use push_queue::Interval;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalOption {
    pub label: String,
    pub value: Interval,
}

/// Options advertised for a delivery method, used to build the per-user
/// settings form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodOptions {
    pub label: String,
    #[serde(rename = "type")]
    pub method_type: String,
    pub intervals: Vec<IntervalOption>,
    pub interval_label: String,
    pub default_user_settings: UserSettings,
}

/// A delivery method the notification registry can schedule.
#[async_trait]
pub trait NotificationMethod: Send + Sync {
    /// Method tag used in job filters.
    fn name(&self) -> &'static str;

    fn options(&self) -> MethodOptions;

    /// Drain all jobs for one interval.
    async fn process(&self, options: &ProcessOptions) -> NotificationResult<()>;
}

fn interval_label(interval: Interval) -> &'static str {
    match interval {
        Interval::Daily => "Daily",
        Interval::Immediate => "Immediate",
    }
}

/// Options for the email method with the given defaults.
pub fn email_method_options(default_user_settings: UserSettings) -> MethodOptions {
    MethodOptions {
        label: "Email".to_string(),
        method_type: EMAIL_METHOD.to_string(),
        intervals: Interval::all()
            .map(|value| IntervalOption {
                label: interval_label(value).to_string(),
                value,
            })
            .collect(),
        interval_label: "Email interval".to_string(),
        default_user_settings,
    }
}

#[async_trait]
impl NotificationMethod for EmailNotifier {
    fn name(&self) -> &'static str {
        EMAIL_METHOD
    }

    fn options(&self) -> MethodOptions {
        email_method_options(self.config().default_user_settings)
    }

    async fn process(&self, options: &ProcessOptions) -> NotificationResult<()> {
        EmailNotifier::process(self, options).await
    }
}

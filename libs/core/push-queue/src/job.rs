//! Job model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};
use uuid::Uuid;

/// Identifier a consumer assigns when it pulls a job.
///
/// The queue records it as the job's lock; the same value is later used to
/// delete the job. A fresh id is generated for every pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Delivery cadence for a notification method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, AsRefStr, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    /// Collected and sent once a day.
    Daily,
    /// Sent on the next drain run.
    Immediate,
}

impl Interval {
    pub fn all() -> impl Iterator<Item = Self> {
        Self::iter()
    }
}

/// Selects the jobs a pull may return: one delivery method and one interval.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobFilter {
    pub method: String,
    pub interval: Interval,
}

impl JobFilter {
    pub fn new(method: impl Into<String>, interval: Interval) -> Self {
        Self {
            method: method.into(),
            interval,
        }
    }
}

impl fmt::Display for JobFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.method, self.interval)
    }
}

/// A pulled job: one recipient's pending messages for one method/interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Lock id assigned by the pull that returned this job.
    pub id: JobId,
    pub method: String,
    pub interval: Interval,
    /// Identity reference of the recipient.
    pub recipient: String,
    /// Message references in arrival order. Never empty for a live job.
    pub messages: Vec<String>,
    /// When the first message of this job was queued.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_strings() {
        assert_eq!(Interval::Daily.to_string(), "daily");
        assert_eq!(Interval::Immediate.as_ref(), "immediate");
        assert_eq!("DAILY".parse::<Interval>().unwrap(), Interval::Daily);
        assert!("weekly".parse::<Interval>().is_err());
        assert_eq!(Interval::all().count(), 2);
    }

    #[test]
    fn test_interval_serde() {
        let json = serde_json::to_string(&Interval::Immediate).unwrap();
        assert_eq!(json, "\"immediate\"");
    }

    #[test]
    fn test_job_id_is_unique_per_pull() {
        assert_ne!(JobId::new(), JobId::new());
    }

    #[test]
    fn test_filter_display() {
        let filter = JobFilter::new("email", Interval::Daily);
        assert_eq!(filter.to_string(), "email/daily");
    }
}

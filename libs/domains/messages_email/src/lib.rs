//! Messages Email Domain
//!
//! Drains queued message notifications for the email method and hands each
//! recipient's batch to the delivery subsystem as a dispatch event.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │    Producer     │  ← queue_message(): one open job per recipient/interval
//! └────────┬────────┘
//!          │
//! ┌────────▼────────┐
//! │   Push Queue    │  ← locked pulls, delete by job id
//! └────────┬────────┘
//!          │
//! ┌────────▼────────┐     ┌──────────────────────┐
//! │  EmailNotifier  │ ──▶ │ Identity + Messages  │  (resolved in parallel)
//! └────────┬────────┘     └──────────────────────┘
//!          │
//! ┌────────▼────────┐
//! │    Event Bus    │  ← DispatchEvent, then the job is deleted
//! └─────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use domain_messages_email::{EmailNotifier, MessagesEmailConfig, ProcessOptions};
//! use push_queue::Interval;
//!
//! let notifier = EmailNotifier::new(queue, identities, messages, bus, MessagesEmailConfig::default());
//! notifier.process(&ProcessOptions::new("email", Interval::Daily)).await?;
//! ```

pub mod clients;
pub mod config;
pub mod dispatch;
pub mod drain;
pub mod error;
pub mod event_bus;
pub mod metrics;
pub mod models;
pub mod options;
pub mod producer;
pub mod resolver;

pub use clients::{
    HttpClientConfig, HttpIdentityClient, HttpMessageClient, IdentityStore, InMemoryIdentityStore,
    InMemoryMessageStore, MessageStore,
};
pub use config::{DEFAULT_EVENT_TYPE, DrainConfig, EMAIL_METHOD, MessagesEmailConfig, UserSettings};
pub use dispatch::Dispatcher;
pub use drain::{EmailNotifier, JobOutcome, ProcessOptions};
pub use error::{ErrorCategory, NotificationError, NotificationResult};
pub use event_bus::{
    ChannelEventBus, DEFAULT_EVENT_STREAM, DEFAULT_EVENT_STREAM_MAX_LEN, EventBus, StreamEventBus,
};
pub use models::{DispatchDetails, DispatchEvent, Identity, Message, ResolvedBatch};
pub use options::{IntervalOption, MethodOptions, NotificationMethod, email_method_options};
pub use producer::queue_message;
pub use resolver::{JobResolver, Resolution};

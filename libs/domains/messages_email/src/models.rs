//! Domain models for the email drain.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A stored message, as returned by the message store.
///
/// Fields the drain does not interpret are kept in `extra` and passed
/// through to the delivery subsystem untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub recipient: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default)]
    pub content: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Message {
    pub fn new(id: impl Into<String>, recipient: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            recipient: recipient.into(),
            sender: None,
            subject: None,
            content: Value::Null,
            date: None,
            extra: Map::new(),
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }
}

/// A recipient's identity record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Identity {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
            name: None,
            extra: Map::new(),
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Messages and identity resolved for one job. Only built when both
/// lookups succeeded.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedBatch {
    pub messages: Vec<Message>,
    pub identity: Identity,
}

/// Payload of a dispatch event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchDetails {
    pub messages: Vec<Message>,
    pub identity: Identity,
}

/// Event handed to the delivery subsystem for one resolved job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub details: DispatchDetails,
}

impl DispatchEvent {
    pub fn new(event_type: impl Into<String>, batch: ResolvedBatch) -> Self {
        Self {
            event_type: event_type.into(),
            details: DispatchDetails {
                messages: batch.messages,
                identity: batch.identity,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dispatch_event_wire_shape() {
        let batch = ResolvedBatch {
            messages: vec![Message::new("m1", "alice").with_subject("Hi")],
            identity: Identity::new("alice").with_email("alice@example.com"),
        };
        let event = DispatchEvent::new("messages-email.event", batch);

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "messages-email.event");
        assert_eq!(value["details"]["messages"][0]["id"], "m1");
        assert_eq!(value["details"]["messages"][0]["subject"], "Hi");
        assert_eq!(value["details"]["identity"]["email"], "alice@example.com");
    }

    #[test]
    fn test_unknown_fields_pass_through() {
        let raw = json!({
            "id": "m1",
            "recipient": "alice",
            "type": "task-assigned",
            "content": {"body": "hello"}
        });
        let message: Message = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(message.extra["type"], "task-assigned");
        assert_eq!(serde_json::to_value(&message).unwrap(), raw);
    }
}

//! Event records
//!
//! The record shape mirrors the cluster events API so remote sinks can
//! forward it without translation:
//! - `metadata` carries the generated name and namespace
//! - `involvedObject` references the node the event is about
//! - `source` names the reporting component and host

pub mod format;
pub mod reference;

use chrono::{DateTime, Utc};
use eyre::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use format::format_message;
pub use reference::ObjectReference;

/// Namespace used when the subject has none
pub const DEFAULT_NAMESPACE: &str = "default";

/// Event severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum EventType {
    Normal,
    Warning,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Normal => "Normal",
            EventType::Warning => "Warning",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Normal" => Ok(EventType::Normal),
            "Warning" => Ok(EventType::Warning),
            other => eyre::bail!("Invalid event type '{}': expected Normal or Warning", other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ObjectMeta {
    pub name: String,
    pub namespace: String,
}

/// Component and host that reported an event
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EventSource {
    pub component: String,
    pub host: String,
}

/// A single recorded occurrence
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub metadata: ObjectMeta,
    pub involved_object: ObjectReference,
    pub reason: String,
    pub message: String,
    pub source: EventSource,
    pub first_timestamp: DateTime<Utc>,
    pub last_timestamp: DateTime<Utc>,
    pub count: u32,
    #[serde(rename = "type")]
    pub event_type: EventType,
}

impl Event {
    /// Build a fresh event stamped at `timestamp`
    pub fn new(
        subject: &ObjectReference,
        event_type: EventType,
        reason: &str,
        message: String,
        source: &EventSource,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let namespace = if subject.namespace.is_empty() {
            DEFAULT_NAMESPACE.to_string()
        } else {
            subject.namespace.clone()
        };
        let nanos = timestamp.timestamp_nanos_opt().unwrap_or_default();

        Self {
            metadata: ObjectMeta {
                name: format!("{}.{:x}", subject.name, nanos),
                namespace,
            },
            involved_object: subject.clone(),
            reason: reason.to_string(),
            message,
            source: source.clone(),
            first_timestamp: timestamp,
            last_timestamp: timestamp,
            count: 1,
            event_type,
        }
    }

    /// One-line diagnostic form: name, namespace, type, reason, subject, message
    pub fn diagnostic_line(&self) -> String {
        format!(
            "{} {} {} {} {} {}",
            self.metadata.name,
            self.metadata.namespace,
            self.event_type,
            self.reason,
            self.involved_object.name,
            self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn source() -> EventSource {
        EventSource {
            component: "EventClient".to_string(),
            host: "testNode".to_string(),
        }
    }

    #[test]
    fn test_event_type_parse() {
        assert_eq!("Normal".parse::<EventType>().unwrap(), EventType::Normal);
        assert_eq!("Warning".parse::<EventType>().unwrap(), EventType::Warning);
    }

    #[test]
    fn test_event_type_rejects_unknown() {
        let err = "Critical".parse::<EventType>().unwrap_err();
        assert!(err.to_string().contains("Critical"));
        assert!("normal".parse::<EventType>().is_err());
        assert!("".parse::<EventType>().is_err());
    }

    #[test]
    fn test_event_new_generates_name() {
        let subject = ObjectReference::node("default", "testNode");
        let ts = Utc.timestamp_opt(1_700_000_000, 255).unwrap();
        let event = Event::new(&subject, EventType::Normal, "Test", "msg".to_string(), &source(), ts);

        let expected = format!("testNode.{:x}", 1_700_000_000_000_000_255i64);
        assert_eq!(event.metadata.name, expected);
        assert_eq!(event.metadata.namespace, "default");
        assert_eq!(event.first_timestamp, ts);
        assert_eq!(event.last_timestamp, ts);
        assert_eq!(event.count, 1);
    }

    #[test]
    fn test_event_defaults_empty_namespace() {
        let subject = ObjectReference::node("", "testNode");
        let event = Event::new(&subject, EventType::Warning, "Test", "msg".to_string(), &source(), Utc::now());
        assert_eq!(event.metadata.namespace, DEFAULT_NAMESPACE);
        assert_eq!(event.involved_object.namespace, "");
    }

    #[test]
    fn test_diagnostic_line_fields() {
        for event_type in [EventType::Normal, EventType::Warning] {
            let subject = ObjectReference::node("default", "testNode");
            let event = Event::new(
                &subject,
                event_type,
                "Test",
                "[this is an event: helloworld]".to_string(),
                &source(),
                Utc::now(),
            );

            let line = event.diagnostic_line();
            let expected = format!(
                "{} default {} Test testNode [this is an event: helloworld]",
                event.metadata.name, event_type
            );
            assert_eq!(line, expected);
        }
    }

    #[test]
    fn test_event_json_shape() {
        let subject = ObjectReference::node("default", "testNode");
        let event = Event::new(&subject, EventType::Normal, "Test", "hi".to_string(), &source(), Utc::now());
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "Normal");
        assert_eq!(json["involvedObject"]["kind"], "Node");
        assert_eq!(json["source"]["component"], "EventClient");
        assert!(json.get("firstTimestamp").is_some());
        assert_eq!(json["count"], 1);
    }
}

//! Event recording pipeline
//!
//! A [`Broadcaster`] owns the destinations; [`Recorder`] handles bound to a
//! source component and host are what callers use to record events.

pub mod broadcaster;
pub mod log_sink;

use chrono::Utc;
use std::sync::Arc;

use crate::event::{Event, EventSource, EventType, ObjectReference, format_message};
use broadcaster::Destinations;

pub use broadcaster::{Broadcaster, DEFAULT_QUEUE_CAPACITY, DEFAULT_SHUTDOWN_TIMEOUT};
pub use log_sink::LogSink;

/// Records events about a subject on behalf of one source.
///
/// Cheap to clone; recording never waits on delivery.
#[derive(Clone)]
pub struct Recorder {
    destinations: Arc<Destinations>,
    source: EventSource,
}

impl Recorder {
    pub(crate) fn new(destinations: Arc<Destinations>, source: EventSource) -> Self {
        Self { destinations, source }
    }

    pub fn source(&self) -> &EventSource {
        &self.source
    }

    /// Record an event with a literal message
    pub fn event(&self, subject: &ObjectReference, event_type: EventType, reason: &str, message: &str) {
        self.record(subject, event_type, reason, message.to_string());
    }

    /// Record an event whose message is `template` formatted with `args`
    pub fn eventf<S: AsRef<str>>(
        &self,
        subject: &ObjectReference,
        event_type: EventType,
        reason: &str,
        template: &str,
        args: &[S],
    ) {
        self.record(subject, event_type, reason, format_message(template, args));
    }

    fn record(&self, subject: &ObjectReference, event_type: EventType, reason: &str, message: String) {
        let event = Event::new(subject, event_type, reason, message, &self.source, Utc::now());
        log::debug!("Recording event {} ({} {})", event.metadata.name, event_type, reason);
        self.destinations.dispatch(event);
    }
}

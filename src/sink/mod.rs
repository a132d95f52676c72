//! Persistence sinks for recorded events
//!
//! A sink receives one fully-formed event at a time and forwards it:
//! - Http - POSTs to the cluster events API
//! - File - appends JSONL under a date-partitioned directory
//! - Null - discards

pub mod file;
pub mod http;

use eyre::Result;
use std::sync::Arc;

use crate::config::{ServerSettings, SinkKind};
use crate::event::Event;

pub use file::FileSink;
pub use http::HttpSink;

/// Destination for recorded events.
///
/// `write` may block; callers run it off the async runtime.
pub trait EventSink: Send + Sync {
    fn name(&self) -> &str;
    fn write(&self, event: &Event) -> Result<()>;
}

/// Sink that drops everything
pub struct NullSink;

impl EventSink for NullSink {
    fn name(&self) -> &str {
        "none"
    }

    fn write(&self, event: &Event) -> Result<()> {
        log::trace!("Discarding event {}", event.metadata.name);
        Ok(())
    }
}

/// Build the persistence sink selected in the configuration
pub fn from_settings(server: &ServerSettings) -> Result<Arc<dyn EventSink>> {
    Ok(match server.sink {
        SinkKind::Http => Arc::new(HttpSink::new(server)?),
        SinkKind::File => Arc::new(FileSink::new(server.file_dir.clone())),
        SinkKind::None => Arc::new(NullSink),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_from_settings_picks_sink() {
        let mut config = Config::default();
        for (kind, name) in [(SinkKind::Http, "http"), (SinkKind::File, "file"), (SinkKind::None, "none")] {
            config.server.sink = kind;
            let settings = config.validate().unwrap();
            assert_eq!(from_settings(&settings.server).unwrap().name(), name);
        }
    }
}

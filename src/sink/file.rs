//! JSONL file sink

use eyre::{Context, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use super::EventSink;
use crate::event::Event;

/// Appends events to `<dir>/<YYYY-MM>/<YYYY-MM-DD>.jsonl`
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// File an event lands in, keyed by its UTC timestamp
    pub fn path_for(&self, event: &Event) -> PathBuf {
        let ts = event.last_timestamp;
        self.dir
            .join(ts.format("%Y-%m").to_string())
            .join(format!("{}.jsonl", ts.format("%Y-%m-%d")))
    }
}

impl EventSink for FileSink {
    fn name(&self) -> &str {
        "file"
    }

    fn write(&self, event: &Event) -> Result<()> {
        let log_file = self.path_for(event);
        if let Some(parent) = log_file.parent() {
            fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .with_context(|| format!("Failed to open {}", log_file.display()))?;

        let json = serde_json::to_string(event).context("Failed to serialize event")?;
        writeln!(file, "{}", json)?;

        Ok(())
    }
}

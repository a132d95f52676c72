//! Local diagnostic destination

use eyre::Result;
use std::io::{self, Write};
use std::sync::Mutex;

use crate::event::Event;
use crate::sink::EventSink;

/// Writes one diagnostic line per event and traces the full record.
///
/// Never fails: write errors are logged at debug level and dropped.
pub struct LogSink {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl LogSink {
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            writer: Mutex::new(Box::new(writer)),
        }
    }

    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl EventSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    fn write(&self, event: &Event) -> Result<()> {
        log::trace!(
            "Event({:?}): type: '{}' reason: '{}' {}",
            event.involved_object,
            event.event_type,
            event.reason,
            event.message
        );

        let line = event.diagnostic_line();
        match self.writer.lock() {
            Ok(mut writer) => {
                if let Err(e) = writeln!(writer, "{}", line).and_then(|_| writer.flush()) {
                    log::debug!("Diagnostic stream unavailable: {}", e);
                }
            }
            Err(_) => log::debug!("Diagnostic writer poisoned, dropping line"),
        }

        Ok(())
    }
}

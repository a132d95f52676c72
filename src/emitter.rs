//! Periodic event emission
//!
//! Waits one interval, records one event, repeats. Stops when the shutdown
//! signal fires or an optional tick limit is reached.

use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::config::{EventSettings, Mode, Settings};
use crate::event::ObjectReference;
use crate::recorder::Recorder;

/// Counters reported when the loop exits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub ticks: u64,
    pub emitted: u64,
}

pub struct EmissionLoop {
    recorder: Recorder,
    subject: ObjectReference,
    event: EventSettings,
    interval: Duration,
    mode: Mode,
    count: Option<u64>,
}

impl EmissionLoop {
    pub fn new(recorder: Recorder, settings: &Settings) -> Self {
        Self {
            recorder,
            subject: ObjectReference::node(&settings.event.namespace, &settings.event.node_name),
            event: settings.event.clone(),
            interval: settings.emitter.interval,
            mode: settings.emitter.mode,
            count: settings.emitter.count,
        }
    }

    /// Run until `shutdown` becomes true (or its sender is dropped), or
    /// until `count` ticks have elapsed.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> LoopStats {
        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut stats = LoopStats::default();

        log::info!(
            "Emitting {} events for {}/{} every {:?} (mode: {})",
            self.event.event_type,
            self.subject.namespace,
            self.subject.name,
            self.interval,
            self.mode.as_str()
        );

        if *shutdown.borrow() {
            return stats;
        }

        loop {
            if let Some(limit) = self.count
                && stats.ticks >= limit
            {
                log::info!("Reached tick limit of {}", limit);
                break;
            }

            tokio::select! {
                _ = ticker.tick() => {
                    stats.ticks += 1;
                    if self.tick() {
                        stats.emitted += 1;
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        log::info!("Shutdown requested, stopping emission loop");
                        break;
                    }
                }
            }
        }

        log::info!("Emission loop stopped after {} ticks ({} events)", stats.ticks, stats.emitted);
        stats
    }

    fn tick(&self) -> bool {
        match self.mode {
            Mode::AllInOne => {
                record(&self.recorder, &self.subject, &self.event);
                true
            }
            Mode::Idle => {
                log::trace!("Idle tick");
                false
            }
        }
    }
}

/// Record one event built from `event`; an empty template sends the
/// message verbatim
pub fn record(recorder: &Recorder, subject: &ObjectReference, event: &EventSettings) {
    if event.message_fmt.is_empty() {
        recorder.event(subject, event.event_type, &event.reason, &event.message);
    } else {
        recorder.eventf(
            subject,
            event.event_type,
            &event.reason,
            &event.message_fmt,
            &[event.message.as_str()],
        );
    }
}

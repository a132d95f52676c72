//! Fan-out from recorders to the event destinations

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time;

use super::{LogSink, Recorder};
use crate::event::{Event, EventSource};
use crate::sink::EventSink;

/// Default queue depth per destination
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

/// Default time [`Broadcaster::shutdown`] spends draining the queues
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

struct Destination {
    name: String,
    tx: mpsc::Sender<Arc<Event>>,
}

/// Destination registrations shared with every recorder. Fixed at start.
pub(crate) struct Destinations {
    destinations: Vec<Destination>,
}

impl Destinations {
    /// Queue an event on every destination without waiting
    pub(crate) fn dispatch(&self, event: Event) {
        let event = Arc::new(event);
        for dest in &self.destinations {
            match dest.tx.try_send(Arc::clone(&event)) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    log::warn!("Queue for sink '{}' is full, dropping event {}", dest.name, event.metadata.name);
                }
                Err(TrySendError::Closed(_)) => {
                    log::warn!("Sink '{}' is shut down, dropping event {}", dest.name, event.metadata.name);
                }
            }
        }
    }
}

/// Owns the local log destination and one persistence sink, each drained
/// by its own background task, and hands out recorders bound to them.
pub struct Broadcaster {
    destinations: Arc<Destinations>,
    stop_tx: watch::Sender<bool>,
    workers: Vec<JoinHandle<()>>,
    drain_timeout: Duration,
}

impl Broadcaster {
    /// Wire stdout diagnostics and `sink`, and start delivering.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(sink: Arc<dyn EventSink>, queue_capacity: usize) -> Self {
        Self::with_log_sink(LogSink::stdout(), sink, queue_capacity)
    }

    /// Like [`Broadcaster::start`] with a caller-supplied diagnostic writer
    pub fn with_log_sink(log_sink: LogSink, sink: Arc<dyn EventSink>, queue_capacity: usize) -> Self {
        let (stop_tx, _) = watch::channel(false);
        let capacity = queue_capacity.max(1);

        let sinks: [Arc<dyn EventSink>; 2] = [Arc::new(log_sink), sink];
        let mut destinations = Vec::with_capacity(sinks.len());
        let mut workers = Vec::with_capacity(sinks.len());

        for sink in sinks {
            let (tx, rx) = mpsc::channel(capacity);
            destinations.push(Destination {
                name: sink.name().to_string(),
                tx,
            });
            workers.push(tokio::spawn(deliver(sink, rx, stop_tx.subscribe())));
        }

        log::info!(
            "Broadcaster started with sinks: {}",
            destinations
                .iter()
                .map(|d| d.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        Self {
            destinations: Arc::new(Destinations { destinations }),
            stop_tx,
            workers,
            drain_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    /// Bound how long [`Broadcaster::shutdown`] waits for queued events
    pub fn with_drain_timeout(mut self, drain_timeout: Duration) -> Self {
        self.drain_timeout = drain_timeout;
        self
    }

    /// A recorder stamping events with the given source
    pub fn new_recorder(&self, component: &str, host: &str) -> Recorder {
        Recorder::new(
            Arc::clone(&self.destinations),
            EventSource {
                component: component.to_string(),
                host: host.to_string(),
            },
        )
    }

    /// Stop accepting events, deliver what is already queued, and wait for
    /// the delivery tasks to finish.
    ///
    /// Delivery tasks still busy once the drain timeout expires are aborted
    /// and their queued events are lost. Returns the number aborted.
    pub async fn shutdown(self) -> usize {
        let _ = self.stop_tx.send(true);
        let deadline = time::Instant::now().checked_add(self.drain_timeout);
        let mut aborted = 0;

        for mut worker in self.workers {
            let finished = match deadline {
                Some(deadline) => time::timeout_at(deadline, &mut worker).await.ok(),
                None => Some((&mut worker).await),
            };
            match finished {
                Some(Ok(())) => {}
                Some(Err(e)) => log::error!("Sink delivery task failed: {}", e),
                None => {
                    worker.abort();
                    aborted += 1;
                }
            }
        }

        if aborted > 0 {
            log::warn!(
                "Abandoned {} sink(s) with undelivered events after {:?}",
                aborted,
                self.drain_timeout
            );
        } else {
            log::info!("Broadcaster shut down");
        }
        aborted
    }
}

async fn deliver(sink: Arc<dyn EventSink>, mut rx: mpsc::Receiver<Arc<Event>>, mut stop: watch::Receiver<bool>) {
    loop {
        tokio::select! {
            biased;
            received = rx.recv() => match received {
                Some(event) => write_one(&sink, event).await,
                None => break,
            },
            _ = stop.changed() => {
                rx.close();
                while let Some(event) = rx.recv().await {
                    write_one(&sink, event).await;
                }
                break;
            }
        }
    }
    log::debug!("Delivery to sink '{}' stopped", sink.name());
}

async fn write_one(sink: &Arc<dyn EventSink>, event: Arc<Event>) {
    let writer = Arc::clone(sink);
    let name = event.metadata.name.clone();

    match tokio::task::spawn_blocking(move || writer.write(&event)).await {
        Ok(Ok(())) => log::debug!("Sink '{}' accepted event {}", sink.name(), name),
        Ok(Err(e)) => log::warn!("Sink '{}' failed to write event {}: {:#}", sink.name(), name, e),
        Err(e) => log::error!("Sink '{}' panicked writing event {}: {}", sink.name(), name, e),
    }
}

//! Continuous event emission

use colored::*;
use eyre::{Context, Result};
use tokio::sync::watch;

use crate::cli::Overrides;
use crate::config::Config;
use crate::emitter::EmissionLoop;
use crate::recorder::Broadcaster;
use crate::sink;

/// Exit status when a second signal cuts the drain short
const FORCED_EXIT_CODE: i32 = 130;

pub struct RunOptions {
    pub interval_ms: Option<u64>,
    pub mode: Option<String>,
    pub count: Option<u64>,
    pub quiet: bool,
}

pub fn run(overrides: &Overrides, options: RunOptions, config: &Config) -> Result<()> {
    let mut config = config.clone();
    if let Some(interval_ms) = options.interval_ms {
        config.emitter.interval_ms = interval_ms;
    }
    if let Some(mode) = options.mode {
        config.emitter.mode = mode;
    }
    if options.count.is_some() {
        config.emitter.count = options.count;
    }

    let settings = super::resolve_settings(&config, overrides)?;
    let sink = sink::from_settings(&settings.server)?;

    if !options.quiet {
        eprintln!(
            "{} Recording events for {}/{} every {:?} via {} sink (Ctrl+C to stop)...",
            "●".green(),
            settings.event.namespace.cyan(),
            settings.event.node_name.cyan(),
            settings.emitter.interval,
            sink.name().bold()
        );
    }

    let rt = super::runtime()?;
    let stats = rt.block_on(async {
        let mut signals = StopSignals::install()?;

        let broadcaster = Broadcaster::start(sink, settings.emitter.queue_capacity)
            .with_drain_timeout(settings.emitter.shutdown_timeout);
        let recorder = broadcaster.new_recorder(&settings.event.source, &settings.event.node_name);
        log::info!(
            "Recording as component '{}' on host '{}'",
            recorder.source().component,
            recorder.source().host
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(async move {
            let signal = signals.recv().await;
            log::info!("Received {}, stopping", signal);
            let _ = shutdown_tx.send(true);

            let signal = signals.recv().await;
            log::warn!("Received second {}, exiting without draining", signal);
            std::process::exit(FORCED_EXIT_CODE);
        });

        let stats = EmissionLoop::new(recorder, &settings).run(shutdown_rx).await;
        broadcaster.shutdown().await;
        Ok::<_, eyre::Report>(stats)
    })?;
    // Sink writes abandoned by the drain must not hold the process open
    rt.shutdown_background();

    log::info!("Run finished: {} ticks, {} events", stats.ticks, stats.emitted);
    if !options.quiet {
        eprintln!("{} Stopped after {} events", "✓".green(), stats.emitted);
    }

    Ok(())
}

/// Ctrl-C and, on unix, SIGTERM
struct StopSignals {
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl StopSignals {
    fn install() -> Result<Self> {
        Ok(Self {
            #[cfg(unix)]
            terminate: tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .context("Failed to listen for SIGTERM")?,
        })
    }

    #[cfg(unix)]
    async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = interrupt() => "interrupt",
            _ = self.terminate.recv() => "terminate",
        }
    }

    #[cfg(not(unix))]
    async fn recv(&mut self) -> &'static str {
        interrupt().await;
        "interrupt"
    }
}

async fn interrupt() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::warn!("Failed to listen for interrupt: {}", e);
        std::future::pending::<()>().await;
    }
}

//! One-shot event emission

use colored::*;
use eyre::Result;

use crate::cli::Overrides;
use crate::config::Config;
use crate::emitter;
use crate::event::ObjectReference;
use crate::recorder::Broadcaster;
use crate::sink;

pub fn run(overrides: &Overrides, quiet: bool, config: &Config) -> Result<()> {
    let settings = super::resolve_settings(config, overrides)?;
    let sink = sink::from_settings(&settings.server)?;
    let sink_name = sink.name().to_string();
    let event = &settings.event;

    let rt = super::runtime()?;
    let aborted = rt.block_on(async {
        let broadcaster = Broadcaster::start(sink, settings.emitter.queue_capacity)
            .with_drain_timeout(settings.emitter.shutdown_timeout);
        let recorder = broadcaster.new_recorder(&event.source, &event.node_name);

        emitter::record(&recorder, &ObjectReference::node(&event.namespace, &event.node_name), event);

        // Drain both queues before exiting
        broadcaster.shutdown().await
    });
    rt.shutdown_background();

    if !quiet {
        if aborted > 0 {
            eprintln!(
                "{} {} sink still busy after {:?}, event abandoned",
                "!".yellow(),
                sink_name.bold(),
                settings.emitter.shutdown_timeout
            );
        } else {
            eprintln!("{} Event handed to {} sink", "✓".green(), sink_name.bold());
        }
    }

    Ok(())
}

use colored::*;
use eyre::Result;

use crate::cli::{ConfigAction, OutputFormat};
use crate::config::Config;

pub fn run(action: ConfigAction, config: &Config) -> Result<()> {
    match action {
        ConfigAction::Show { format } => show(OutputFormat::resolve(format), config),
        ConfigAction::Validate => validate(config),
    }
}

fn show(format: OutputFormat, config: &Config) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&redacted(config))?);
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(&redacted(config))?);
        }
        OutputFormat::Text => {
            println!("{}", "eventclient Configuration".bold());
            println!();

            println!("log_level: {}", config.log_level.as_filter());
            println!();

            println!("{}:", "server".cyan());
            println!("  sink: {:?}", config.server.sink);
            println!("  endpoint: {}", config.server.endpoint.as_deref().unwrap_or("-"));
            println!("  token: {}", if config.server.token.is_some() { "<set>" } else { "-" });
            if let Some(path) = &config.server.token_file {
                println!("  token_file: {}", path.display());
            }
            if let Some(path) = &config.server.ca_file {
                println!("  ca_file: {}", path.display());
            }
            if config.server.insecure_skip_tls_verify {
                println!("  insecure_skip_tls_verify: {}", "true".yellow());
            }
            println!("  timeout_ms: {}", config.server.timeout_ms);
            println!("  max_attempts: {}", config.server.max_attempts);
            println!("  file_dir: {}", config.server.file_dir.display());
            println!();

            println!("{}:", "event".cyan());
            println!("  namespace: {}", config.event.namespace);
            println!("  node_name: {}", config.event.node_name);
            println!("  source: {}", config.event.source);
            println!("  event_type: {}", config.event.event_type);
            println!("  reason: {}", config.event.reason);
            println!("  message_fmt: {}", config.event.message_fmt);
            println!("  message: {}", config.event.message);
            println!();

            println!("{}:", "emitter".cyan());
            println!("  interval_ms: {}", config.emitter.interval_ms);
            println!("  mode: {}", config.emitter.mode);
            match config.emitter.count {
                Some(count) => println!("  count: {}", count),
                None => println!("  count: unlimited"),
            }
            println!("  queue_capacity: {}", config.emitter.queue_capacity);
            println!("  shutdown_timeout_ms: {}", config.emitter.shutdown_timeout_ms);
        }
    }

    Ok(())
}

fn validate(config: &Config) -> Result<()> {
    match config.validate() {
        Ok(settings) => {
            println!(
                "{} Configuration is valid ({} {} events for {}/{})",
                "✓".green(),
                settings.event.event_type,
                settings.event.reason,
                settings.event.namespace,
                settings.event.node_name
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("{} {:#}", "✗".red(), e);
            std::process::exit(1);
        }
    }
}

fn redacted(config: &Config) -> Config {
    let mut config = config.clone();
    if config.server.token.is_some() {
        config.server.token = Some("<redacted>".to_string());
    }
    config
}

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::io::IsTerminal;
use std::path::PathBuf;

use crate::config::Config;

/// Output format for commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

impl OutputFormat {
    /// Resolve the effective output format.
    /// If user specified a format, use it.
    /// Otherwise: TTY → Text, non-TTY (pipe) → Json
    pub fn resolve(user_choice: Option<OutputFormat>) -> OutputFormat {
        match user_choice {
            Some(fmt) => fmt,
            None => {
                if std::io::stdout().is_terminal() {
                    OutputFormat::Text
                } else {
                    OutputFormat::Json
                }
            }
        }
    }
}

#[derive(Parser)]
#[command(
    name = "eventclient",
    about = "Record node status events to a cluster event store",
    version = env!("GIT_DESCRIBE"),
    after_help = "Logs are written to: ~/.local/share/eventclient/logs/eventclient.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to eventclient.yaml config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, help = "Suppress non-error output")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Record events on a fixed interval until interrupted
    Run {
        #[command(flatten)]
        overrides: Overrides,

        /// Milliseconds between events
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Tick behavior (allinone, idle)
        #[arg(long)]
        mode: Option<String>,

        /// Stop after this many ticks
        #[arg(long)]
        count: Option<u64>,
    },

    /// Record a single event and exit
    Emit {
        #[command(flatten)]
        overrides: Overrides,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

/// Per-invocation overrides for event and sink settings
#[derive(Args, Debug, Clone, Default)]
pub struct Overrides {
    /// Namespace of the subject node
    #[arg(long)]
    pub namespace: Option<String>,

    /// Name of the subject node
    #[arg(long)]
    pub node_name: Option<String>,

    /// Reporting component name
    #[arg(long)]
    pub source: Option<String>,

    /// Event type (Normal, Warning)
    #[arg(long)]
    pub event_type: Option<String>,

    /// Short reason token
    #[arg(long)]
    pub reason: Option<String>,

    /// Message template, e.g. "[this is an event: %v]"
    #[arg(long)]
    pub message_fmt: Option<String>,

    /// Value substituted into the message template
    #[arg(long)]
    pub message: Option<String>,

    /// Persistence sink (http, file, none)
    #[arg(long)]
    pub sink: Option<String>,

    /// Event store base URL
    #[arg(long)]
    pub endpoint: Option<String>,
}

impl Overrides {
    /// Apply every provided override onto `config`
    pub fn apply(&self, config: &mut Config) -> eyre::Result<()> {
        let event = &mut config.event;
        let fields = [
            (&self.namespace, &mut event.namespace),
            (&self.node_name, &mut event.node_name),
            (&self.source, &mut event.source),
            (&self.event_type, &mut event.event_type),
            (&self.reason, &mut event.reason),
            (&self.message_fmt, &mut event.message_fmt),
            (&self.message, &mut event.message),
        ];
        for (value, target) in fields {
            if let Some(value) = value {
                *target = value.clone();
            }
        }

        if let Some(sink) = &self.sink {
            config.server.sink = sink.parse()?;
        }
        if let Some(endpoint) = &self.endpoint {
            config.server.endpoint = Some(endpoint.clone());
        }

        Ok(())
    }
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show {
        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },

    /// Check the configuration without emitting anything
    Validate,
}

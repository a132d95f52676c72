use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::event::EventType;
use crate::recorder::{DEFAULT_QUEUE_CAPACITY, DEFAULT_SHUTDOWN_TIMEOUT};

/// Main eventclient configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub log_level: LogLevel,
    pub server: ServerConfig,
    pub event: EventConfig,
    pub emitter: EmitterConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Off,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }
}

/// Where recorded events are persisted
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// POST to the cluster events API
    Http,
    /// Append JSONL files under `file_dir`
    File,
    /// Discard (diagnostic output only)
    None,
}

impl FromStr for SinkKind {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "http" => Ok(SinkKind::Http),
            "file" => Ok(SinkKind::File),
            "none" => Ok(SinkKind::None),
            other => eyre::bail!("Invalid sink '{}': expected http, file or none", other),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub sink: SinkKind,
    /// Base URL of the event store API
    pub endpoint: Option<String>,
    /// Bearer token
    pub token: Option<String>,
    /// File holding the bearer token, read when `token` is unset
    pub token_file: Option<PathBuf>,
    /// PEM bundle of CAs trusted for an https endpoint, replacing the bundled roots
    pub ca_file: Option<PathBuf>,
    /// Accept any server certificate (test clusters only)
    pub insecure_skip_tls_verify: bool,
    pub timeout_ms: u64,
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
    /// Output directory for the file sink
    pub file_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EventConfig {
    pub namespace: String,
    pub node_name: String,
    pub source: String,
    pub event_type: String,
    pub reason: String,
    pub message_fmt: String,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EmitterConfig {
    pub interval_ms: u64,
    pub mode: String,
    /// Stop after this many ticks (unlimited when unset)
    pub count: Option<u64>,
    pub queue_capacity: usize,
    /// How long shutdown waits for queued events before abandoning them
    pub shutdown_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            sink: SinkKind::Http,
            endpoint: Some("https://127.0.0.1:6443".to_string()),
            token: None,
            token_file: None,
            ca_file: None,
            insecure_skip_tls_verify: false,
            timeout_ms: 5000,
            max_attempts: 3,
            retry_delay_ms: 1000,
            file_dir: Config::data_dir().join("events"),
        }
    }
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            namespace: "default".to_string(),
            node_name: "testNode".to_string(),
            source: "EventClient".to_string(),
            event_type: EventType::Normal.to_string(),
            reason: "Test".to_string(),
            message_fmt: "[this is an event: %v]".to_string(),
            message: "helloworld".to_string(),
        }
    }
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            mode: Mode::AllInOne.as_str().to_string(),
            count: None,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            shutdown_timeout_ms: DEFAULT_SHUTDOWN_TIMEOUT.as_millis() as u64,
        }
    }
}

/// What the emission loop does on each tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Record one event per tick
    AllInOne,
    /// Keep ticking without recording
    Idle,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::AllInOne => "allinone",
            Mode::Idle => "idle",
        }
    }
}

impl FromStr for Mode {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "allinone" => Ok(Mode::AllInOne),
            "idle" => Ok(Mode::Idle),
            other => eyre::bail!("Invalid mode '{}': expected allinone or idle", other),
        }
    }
}

/// Checked configuration handed to the recording pipeline
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub event: EventSettings,
    pub emitter: EmitterSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub sink: SinkKind,
    pub endpoint: String,
    pub token: Option<String>,
    /// Contents of `ca_file`
    pub ca_pem: Option<Vec<u8>>,
    pub insecure_skip_tls_verify: bool,
    pub timeout: Duration,
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub file_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct EventSettings {
    pub namespace: String,
    pub node_name: String,
    pub source: String,
    pub event_type: EventType,
    pub reason: String,
    pub message_fmt: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct EmitterSettings {
    pub interval: Duration,
    pub mode: Mode,
    pub count: Option<u64>,
    pub queue_capacity: usize,
    pub shutdown_timeout: Duration,
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        if let Ok(env_path) = std::env::var("EVENTCLIENT_CONFIG") {
            let path = PathBuf::from(env_path);
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from EVENTCLIENT_CONFIG: {}", e);
                    }
                }
            }
        }

        let path = Self::config_dir().join("eventclient.yaml");
        if path.exists() {
            match Self::load_from_file(&path) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", path.display(), e);
                }
            }
        }

        // Try ./eventclient.yaml (for development)
        let local_config = PathBuf::from("eventclient.yaml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load local config: {}", e);
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Check every field and resolve credentials.
    ///
    /// Nothing is emitted unless this succeeds.
    pub fn validate(&self) -> Result<Settings> {
        let event_type: EventType = self.event.event_type.parse()?;
        let mode: Mode = self.emitter.mode.parse()?;

        require_non_empty("event.namespace", &self.event.namespace)?;
        require_non_empty("event.node_name", &self.event.node_name)?;
        require_non_empty("event.source", &self.event.source)?;
        require_non_empty("event.reason", &self.event.reason)?;
        if self.event.reason.chars().any(char::is_whitespace) {
            eyre::bail!("event.reason must be a single token, got '{}'", self.event.reason);
        }

        if self.emitter.interval_ms == 0 {
            eyre::bail!("emitter.interval_ms must be greater than zero");
        }
        if self.emitter.count == Some(0) {
            eyre::bail!("emitter.count must be greater than zero when set");
        }
        if self.emitter.queue_capacity == 0 {
            eyre::bail!("emitter.queue_capacity must be greater than zero");
        }

        let endpoint = self.server.endpoint.clone().unwrap_or_default();
        if self.server.sink == SinkKind::Http {
            require_non_empty("server.endpoint", &endpoint)?;
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                eyre::bail!("server.endpoint must be an http(s) URL, got '{}'", endpoint);
            }
        }

        Ok(Settings {
            server: ServerSettings {
                sink: self.server.sink,
                endpoint: endpoint.trim_end_matches('/').to_string(),
                token: self.resolve_token()?,
                ca_pem: self.read_ca_file()?,
                insecure_skip_tls_verify: self.server.insecure_skip_tls_verify,
                timeout: Duration::from_millis(self.server.timeout_ms),
                max_attempts: self.server.max_attempts.max(1),
                retry_delay: Duration::from_millis(self.server.retry_delay_ms),
                file_dir: Self::expand_path(&self.server.file_dir),
            },
            event: EventSettings {
                namespace: self.event.namespace.clone(),
                node_name: self.event.node_name.clone(),
                source: self.event.source.clone(),
                event_type,
                reason: self.event.reason.clone(),
                message_fmt: self.event.message_fmt.clone(),
                message: self.event.message.clone(),
            },
            emitter: EmitterSettings {
                interval: Duration::from_millis(self.emitter.interval_ms),
                mode,
                count: self.emitter.count,
                queue_capacity: self.emitter.queue_capacity,
                shutdown_timeout: Duration::from_millis(self.emitter.shutdown_timeout_ms),
            },
        })
    }

    fn resolve_token(&self) -> Result<Option<String>> {
        if let Some(token) = &self.server.token {
            return Ok(Some(token.trim().to_string()));
        }

        match &self.server.token_file {
            Some(path) => {
                let path = Self::expand_path(path);
                let token = fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read token file {}", path.display()))?;
                Ok(Some(token.trim().to_string()))
            }
            None => Ok(None),
        }
    }

    fn read_ca_file(&self) -> Result<Option<Vec<u8>>> {
        let Some(path) = &self.server.ca_file else {
            return Ok(None);
        };
        let path = Self::expand_path(path);
        let pem = fs::read(&path).with_context(|| format!("Failed to read CA file {}", path.display()))?;
        Ok(Some(pem))
    }

    /// Directory holding eventclient.yaml
    pub fn config_dir() -> PathBuf {
        std::env::var("EVENTCLIENT_DIR").map(PathBuf::from).unwrap_or_else(|_| {
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("eventclient")
        })
    }

    /// Directory for logs and locally persisted events
    pub fn data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("eventclient")
    }

    /// Expand a path that may contain ~ or env vars
    pub fn expand_path(path: &Path) -> PathBuf {
        let path_str = path.to_string_lossy();
        let expanded = shellexpand::full(&path_str).unwrap_or_else(|_| path_str.clone());
        PathBuf::from(expanded.as_ref())
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        eyre::bail!("{} must not be empty", field);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_validates() {
        let settings = Config::default().validate().expect("defaults should be valid");
        assert_eq!(settings.event.event_type, EventType::Normal);
        assert_eq!(settings.event.node_name, "testNode");
        assert_eq!(settings.emitter.mode, Mode::AllInOne);
        assert_eq!(settings.emitter.interval, Duration::from_secs(1));
        assert_eq!(settings.emitter.count, None);
    }

    #[test]
    fn test_invalid_event_type_rejected() {
        let mut config = Config::default();
        config.event.event_type = "Critical".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Critical"));
    }

    #[test]
    fn test_invalid_mode_rejected() {
        let mut config = Config::default();
        config.emitter.mode = "burst".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("allinone".parse::<Mode>().unwrap(), Mode::AllInOne);
        assert_eq!("AllInOne".parse::<Mode>().unwrap(), Mode::AllInOne);
        assert_eq!("idle".parse::<Mode>().unwrap(), Mode::Idle);
    }

    #[test]
    fn test_missing_identity_rejected() {
        let mut config = Config::default();
        config.event.node_name = "  ".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("event.node_name"));

        let mut config = Config::default();
        config.event.namespace = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reason_must_be_token() {
        let mut config = Config::default();
        config.event.reason = "two words".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut config = Config::default();
        config.emitter.interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_count_rejected() {
        let mut config = Config::default();
        config.emitter.count = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_http_sink_requires_endpoint() {
        let mut config = Config::default();
        config.server.endpoint = None;
        assert!(config.validate().is_err());

        config.server.sink = SinkKind::None;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_endpoint_must_be_url() {
        let mut config = Config::default();
        config.server.endpoint = Some("127.0.0.1:6443".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_endpoint_trailing_slash_trimmed() {
        let mut config = Config::default();
        config.server.endpoint = Some("http://localhost:8080/".to_string());
        let settings = config.validate().unwrap();
        assert_eq!(settings.server.endpoint, "http://localhost:8080");
    }

    #[test]
    fn test_token_from_file() {
        let dir = tempdir().unwrap();
        let token_path = dir.path().join("token");
        fs::write(&token_path, "secret-token\n").unwrap();

        let mut config = Config::default();
        config.server.token_file = Some(token_path);
        let settings = config.validate().unwrap();
        assert_eq!(settings.server.token.as_deref(), Some("secret-token"));
    }

    #[test]
    fn test_inline_token_wins_over_file() {
        let mut config = Config::default();
        config.server.token = Some("inline".to_string());
        config.server.token_file = Some(PathBuf::from("/nonexistent/token"));
        let settings = config.validate().unwrap();
        assert_eq!(settings.server.token.as_deref(), Some("inline"));
    }

    #[test]
    fn test_missing_token_file_rejected() {
        let mut config = Config::default();
        config.server.token_file = Some(PathBuf::from("/nonexistent/eventclient/token"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_ca_file_read_into_settings() {
        let dir = tempdir().unwrap();
        let ca_path = dir.path().join("ca.crt");
        fs::write(&ca_path, "-----BEGIN CERTIFICATE-----\nMIIB\n-----END CERTIFICATE-----\n").unwrap();

        let mut config = Config::default();
        config.server.ca_file = Some(ca_path);
        let settings = config.validate().unwrap();
        let pem = settings.server.ca_pem.expect("CA bundle should be loaded");
        assert!(String::from_utf8_lossy(&pem).starts_with("-----BEGIN CERTIFICATE-----"));
        assert!(!settings.server.insecure_skip_tls_verify);
    }

    #[test]
    fn test_missing_ca_file_rejected() {
        let mut config = Config::default();
        config.server.ca_file = Some(PathBuf::from("/nonexistent/eventclient/ca.crt"));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("CA file"));
    }

    #[test]
    fn test_shutdown_timeout_default() {
        let settings = Config::default().validate().unwrap();
        assert_eq!(settings.emitter.shutdown_timeout, DEFAULT_SHUTDOWN_TIMEOUT);

        let mut config = Config::default();
        config.emitter.shutdown_timeout_ms = 0;
        assert_eq!(config.validate().unwrap().emitter.shutdown_timeout, Duration::ZERO);
    }

    #[test]
    fn test_max_attempts_floor() {
        let mut config = Config::default();
        config.server.max_attempts = 0;
        assert_eq!(config.validate().unwrap().server.max_attempts, 1);
    }

    #[test]
    fn test_sink_kind_parse() {
        assert_eq!("HTTP".parse::<SinkKind>().unwrap(), SinkKind::Http);
        assert_eq!("file".parse::<SinkKind>().unwrap(), SinkKind::File);
        assert_eq!("none".parse::<SinkKind>().unwrap(), SinkKind::None);
        assert!("kafka".parse::<SinkKind>().is_err());
    }

    #[test]
    fn test_load_from_file_partial() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("eventclient.yaml");
        fs::write(
            &path,
            "log_level: debug\nserver:\n  sink: none\nevent:\n  node_name: worker-7\n  event_type: Warning\nemitter:\n  interval_ms: 250\n",
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.server.sink, SinkKind::None);
        assert_eq!(config.event.node_name, "worker-7");
        // Unset fields keep their defaults
        assert_eq!(config.event.reason, "Test");

        let settings = config.validate().unwrap();
        assert_eq!(settings.event.event_type, EventType::Warning);
        assert_eq!(settings.emitter.interval, Duration::from_millis(250));
    }

    #[test]
    fn test_load_explicit_missing_file_fails() {
        let path = PathBuf::from("/nonexistent/eventclient.yaml");
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn test_expand_path_no_expansion() {
        let path = PathBuf::from("/var/lib/events");
        assert_eq!(Config::expand_path(&path), PathBuf::from("/var/lib/events"));
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let expanded = Config::expand_path(&PathBuf::from("~/events"));
        assert!(!expanded.to_string_lossy().contains('~'));
        assert!(expanded.to_string_lossy().contains("events"));
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = Config::default();
        let yaml_str = serde_yaml::to_string(&config).expect("Failed to serialize");
        let parsed: Config = serde_yaml::from_str(&yaml_str).expect("Failed to deserialize");
        assert_eq!(parsed.event.message_fmt, config.event.message_fmt);
        assert_eq!(parsed.server.sink, config.server.sink);
    }
}

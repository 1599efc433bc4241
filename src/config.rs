//! Server and client configuration.
//!
//! Settings are layered: defaults, then an optional TOML file, then
//! environment variables (`SERVER_IP`, `SERVER_PORT`, `SERVER_URL`), then
//! command-line flags applied by the binary.

use derive_getters::Getters;
use derive_more::{Display, Error};
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Server listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Setters, Serialize, Deserialize)]
#[setters(prefix = "with_")]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind.
    host: String,
    /// Port to bind.
    port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Terminal client settings.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Setters, Serialize, Deserialize)]
#[setters(prefix = "with_")]
#[serde(default)]
pub struct ClientConfig {
    /// Websocket endpoint of the game server.
    server_url: String,
    /// Delay between reconnect attempts.
    reconnect_backoff_ms: u64,
    /// Upper bound on a single connection attempt.
    connect_timeout_ms: u64,
    /// Log destination; the terminal is owned by the UI.
    log_file: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "ws://127.0.0.1:8080/ws".to_string(),
            reconnect_backoff_ms: 1000,
            connect_timeout_ms: 5000,
            log_file: PathBuf::from("noughts_client.log"),
        }
    }
}

impl ClientConfig {
    /// Reconnect backoff as a duration.
    pub fn reconnect_backoff(&self) -> Duration {
        Duration::from_millis(self.reconnect_backoff_ms)
    }

    /// Connect timeout as a duration.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// All settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Getters, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Server section.
    server: ServerConfig,
    /// Client section.
    client: ClientConfig,
}

impl Settings {
    /// Loads settings from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        let settings: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;

        info!("Config loaded successfully");
        Ok(settings)
    }

    /// Loads `path` if it exists, else defaults; then applies the environment.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let settings = if path.as_ref().exists() {
            Self::from_file(path)?
        } else {
            info!("Config file not found, using defaults");
            Self::default()
        };
        settings.with_env(|key| std::env::var(key).ok())
    }

    /// Applies `SERVER_IP`, `SERVER_PORT` and `SERVER_URL` from `lookup`.
    ///
    /// When only the server address is overridden the client URL follows it.
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let ip = lookup("SERVER_IP");
        let port = lookup("SERVER_PORT")
            .map(|p| {
                p.parse::<u16>()
                    .map_err(|e| ConfigError::new(format!("Invalid SERVER_PORT {:?}: {}", p, e)))
            })
            .transpose()?;

        if let Some(ip) = &ip {
            self.server.host = ip.clone();
        }
        if let Some(port) = port {
            self.server.port = port;
        }
        match lookup("SERVER_URL") {
            Some(url) => self.client.server_url = url,
            None if ip.is_some() || port.is_some() => {
                self.client.server_url =
                    format!("ws://{}:{}/ws", self.server.host, self.server.port);
            }
            None => {}
        }
        Ok(self)
    }

    /// Replaces the server section.
    pub fn set_server(&mut self, server: ServerConfig) {
        self.server = server;
    }

    /// Replaces the client section.
    pub fn set_client(&mut self, client: ClientConfig) {
        self.client = client;
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}

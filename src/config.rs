//! Configuration management for pastesalvo using the prefer crate.

use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analysis::Amplification;
use crate::sources::{SourcePool, DEFAULT_SOURCES};

/// Attempts per request index before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Per-attempt fetch timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Character-frequency inserts in flight per successful call.
pub const DEFAULT_WRITE_CONCURRENCY: usize = 16;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("source pool is empty")]
    EmptySourcePool,
    #[error("invalid source URL {0}")]
    InvalidSource(String),
    #[error("unknown store backend '{0}' (expected 'sqlite' or 'memory')")]
    UnknownBackend(String),
}

/// Where records are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackend {
    #[default]
    Sqlite,
    /// In-process only; lost on exit.
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base data directory.
    pub data_dir: PathBuf,
    /// Database filename.
    pub database_filename: String,
    pub store_backend: StoreBackend,
    /// User agent for HTTP requests.
    pub user_agent: String,
    /// Per-attempt timeout in seconds.
    pub request_timeout: u64,
    pub max_attempts: u32,
    /// Concurrent character-frequency writes per call.
    pub write_concurrency: usize,
    /// Fixed minute-of-hour for amplification (None = wall clock).
    pub amplify_minute: Option<u32>,
    pub sources: Vec<String>,
    pub host: String,
    pub port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
            .join("pastesalvo");

        Self {
            data_dir,
            database_filename: "pastesalvo.db".to_string(),
            store_backend: StoreBackend::Sqlite,
            user_agent: format!("pastesalvo/{}", env!("CARGO_PKG_VERSION")),
            request_timeout: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            write_concurrency: DEFAULT_WRITE_CONCURRENCY,
            amplify_minute: None,
            sources: DEFAULT_SOURCES.iter().map(|s| s.to_string()).collect(),
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

impl Settings {
    /// Get the full path to the database.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_filename)
    }

    /// Ensure all directories exist.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.data_dir)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn amplification(&self) -> Amplification {
        match self.amplify_minute {
            Some(minute) => Amplification::Fixed(minute),
            None => Amplification::WallClock,
        }
    }

    pub fn source_pool(&self) -> Result<SourcePool, ConfigError> {
        SourcePool::new(self.sources.iter().cloned())
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Target directory for data.
    #[serde(default)]
    pub target: Option<String>,
    /// Database filename.
    #[serde(default)]
    pub database: Option<String>,
    /// "sqlite" (default) or "memory".
    #[serde(default)]
    pub store_backend: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Request timeout in seconds.
    #[serde(default)]
    pub request_timeout: Option<u64>,
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default)]
    pub write_concurrency: Option<usize>,
    /// Pin the amplification minute (0-59) instead of reading the clock.
    #[serde(default)]
    pub amplify_minute: Option<u32>,
    #[serde(default)]
    pub sources: Option<Vec<String>>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
}

impl Config {
    /// Load configuration using prefer crate.
    /// Automatically discovers pastesalvo config files in standard locations.
    pub async fn load() -> Self {
        match prefer::load("pastesalvo").await {
            Ok(pref_config) => Config {
                target: pref_config.get("target").ok(),
                database: pref_config.get("database").ok(),
                store_backend: pref_config.get("store_backend").ok(),
                user_agent: pref_config.get("user_agent").ok(),
                request_timeout: pref_config.get("request_timeout").ok(),
                max_attempts: pref_config.get("max_attempts").ok(),
                write_concurrency: pref_config.get("write_concurrency").ok(),
                amplify_minute: pref_config.get("amplify_minute").ok(),
                sources: pref_config.get("sources").ok(),
                host: pref_config.get("host").ok(),
                port: pref_config.get("port").ok(),
            },
            Err(_) => {
                // No config file found, use defaults
                Self::default()
            }
        }
    }

    /// Apply configuration to settings.
    pub fn apply_to_settings(&self, settings: &mut Settings) -> Result<(), ConfigError> {
        if let Some(ref target) = self.target {
            let path = shellexpand::tilde(target);
            settings.data_dir = PathBuf::from(path.as_ref());
        }
        if let Some(ref database) = self.database {
            settings.database_filename = database.clone();
        }
        if let Some(ref backend) = self.store_backend {
            settings.store_backend = backend.parse()?;
        }
        if let Some(ref user_agent) = self.user_agent {
            settings.user_agent = user_agent.clone();
        }
        if let Some(timeout) = self.request_timeout {
            settings.request_timeout = timeout;
        }
        if let Some(max_attempts) = self.max_attempts {
            settings.max_attempts = max_attempts.max(1);
        }
        if let Some(concurrency) = self.write_concurrency {
            settings.write_concurrency = concurrency.max(1);
        }
        if let Some(minute) = self.amplify_minute {
            settings.amplify_minute = Some(minute.min(59));
        }
        if let Some(ref sources) = self.sources {
            // Validate before accepting so a bad file fails at startup
            SourcePool::new(sources.iter().cloned())?;
            settings.sources = sources.clone();
        }
        if let Some(ref host) = self.host {
            settings.host = host.clone();
        }
        if let Some(port) = self.port {
            settings.port = port;
        }
        Ok(())
    }
}

/// Load settings from configuration (async version).
pub async fn load_settings() -> Result<Settings, ConfigError> {
    let config = Config::load().await;
    let mut settings = Settings::default();
    config.apply_to_settings(&mut settings)?;
    Ok(settings)
}

//! Configuration loading and management
//!
//! Handles parsing of `taskboard.toml` configuration files and the
//! environment overrides applied on top of them.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Default config file name, looked up inside the data directory
pub const CONFIG_FILE: &str = "taskboard.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP listener configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Persisted file layout
    #[serde(default)]
    pub storage: StorageConfig,

    /// Remote bug tracker configuration
    #[serde(default)]
    pub tracker: TrackerConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8084
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Persisted file layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding both documents
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Task collection document
    #[serde(default = "default_tasks_file")]
    pub tasks_file: String,

    /// History ledger document
    #[serde(default = "default_history_file")]
    pub history_file: String,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_tasks_file() -> String {
    "tasks.json".to_string()
}

fn default_history_file() -> String {
    "task_history.json".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            tasks_file: default_tasks_file(),
            history_file: default_history_file(),
        }
    }
}

/// Remote bug tracker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Fetch counters at start-up and on a schedule
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Base URL of the tracker API, e.g. `https://tracker.example.com/api.php/v1`
    #[serde(default)]
    pub host: String,

    #[serde(default)]
    pub account: String,

    #[serde(default)]
    pub password: String,

    /// Product whose bugs are counted
    #[serde(default = "default_product_id")]
    pub product_id: u64,

    /// Page size requested from the tracker; large enough to fetch everything at once
    #[serde(default = "default_page_limit")]
    pub page_limit: u64,

    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    /// Timeout applied to every tracker request
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Extra attempts per scheduled refresh
    #[serde(default)]
    pub retries: u32,
}

fn default_true() -> bool {
    true
}

fn default_product_id() -> u64 {
    1
}

fn default_page_limit() -> u64 {
    100_000
}

fn default_refresh_interval_secs() -> u64 {
    3600
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            host: String::new(),
            account: String::new(),
            password: String::new(),
            product_id: default_product_id(),
            page_limit: default_page_limit(),
            refresh_interval_secs: default_refresh_interval_secs(),
            timeout_secs: default_timeout_secs(),
            retries: 0,
        }
    }
}

impl Config {
    /// Load configuration from a `taskboard.toml` file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve the effective configuration.
    ///
    /// An explicit path must exist. Otherwise `taskboard.toml` inside
    /// `data_dir` is used when present, and defaults when not. Environment
    /// overrides are applied last.
    pub fn resolve(explicit: Option<&Path>, data_dir: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load(path)?,
            None => {
                let dir = data_dir
                    .map(Path::to_path_buf)
                    .unwrap_or_else(default_data_dir);
                let candidate = dir.join(CONFIG_FILE);
                if candidate.exists() {
                    Self::load(&candidate)?
                } else {
                    Self::default()
                }
            }
        };
        if let Some(dir) = data_dir {
            config.storage.data_dir = dir.to_path_buf();
        }
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through a lookup function
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        if let Some(host) = non_empty("TRACKER_HOST") {
            self.tracker.host = host;
        }
        if let Some(account) = non_empty("TRACKER_ACCOUNT") {
            self.tracker.account = account;
        }
        if let Some(password) = non_empty("TRACKER_PASSWORD") {
            self.tracker.password = password;
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(Error::InvalidConfig("server.port must be > 0".to_string()));
        }
        self.storage.validate()?;
        self.tracker.validate()?;
        Ok(())
    }
}

impl StorageConfig {
    pub fn tasks_path(&self) -> PathBuf {
        self.data_dir.join(&self.tasks_file)
    }

    pub fn history_path(&self) -> PathBuf {
        self.data_dir.join(&self.history_file)
    }

    fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("storage.tasks_file", &self.tasks_file),
            ("storage.history_file", &self.history_file),
        ] {
            if value.trim().is_empty() {
                return Err(Error::InvalidConfig(format!("{field} cannot be empty")));
            }
        }
        if self.tasks_file == self.history_file {
            return Err(Error::InvalidConfig(
                "storage.tasks_file and storage.history_file must differ".to_string(),
            ));
        }
        Ok(())
    }
}

impl TrackerConfig {
    fn validate(&self) -> Result<()> {
        if self.refresh_interval_secs == 0 {
            return Err(Error::InvalidConfig(
                "tracker.refresh_interval_secs must be > 0".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(Error::InvalidConfig(
                "tracker.timeout_secs must be > 0".to_string(),
            ));
        }
        if self.page_limit == 0 {
            return Err(Error::InvalidConfig(
                "tracker.page_limit must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Check that the tracker can actually be contacted.
    ///
    /// Offline commands never talk to the tracker, so credentials are only
    /// demanded by `serve` and `bugs`.
    pub fn ensure_usable(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "tracker.host is required when the tracker is enabled".to_string(),
            ));
        }
        if self.account.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "tracker.account is required when the tracker is enabled".to_string(),
            ));
        }
        Ok(())
    }
}

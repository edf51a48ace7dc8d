//! Configuration management.
//!
//! Settings live in `~/.rmsync/config.json`. Each value resolves with the
//! priority: CLI flag > environment variable > config file > default.
//!
//! The ledger database is separate, at `~/.rmsync/data/ledger.db` unless
//! overridden with `--db` or `RMSYNC_DB`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::device::{
    ControlChannel, DataChannel, DeviceConnector, LocalConnector, SshConnector, SshTarget,
    UsbWebTransport, DEFAULT_REMOTE_ROOT, DEFAULT_WEB_URL,
};
use crate::error::{Error, Result};
use crate::sync::{atomic_write, EngineSettings};

/// Address of the tablet over its USB network interface.
pub const DEFAULT_HOST: &str = "10.11.99.1";
pub const DEFAULT_USER: &str = "root";
pub const DEFAULT_LANGUAGE: &str = "en_US";

/// Keys accepted by `config set`, in display order.
pub const KEYS: &[&str] = &[
    "host",
    "user",
    "ssh-key",
    "ssh-port",
    "remote-root",
    "local-root",
    "web-url",
    "backup-dir",
    "sync-dir",
    "connect-timeout",
    "language",
];

/// Persisted settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub user: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssh_key: Option<PathBuf>,
    pub ssh_port: u16,
    /// Document store directory on the device.
    pub remote_root: String,
    /// Serve the control channel from this local copy of the document store
    /// instead of connecting over SSH.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_root: Option<PathBuf>,
    pub web_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_dir: Option<PathBuf>,
    pub connect_timeout_secs: u64,
    pub language: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            user: DEFAULT_USER.to_string(),
            ssh_key: None,
            ssh_port: 22,
            remote_root: DEFAULT_REMOTE_ROOT.to_string(),
            local_root: None,
            web_url: DEFAULT_WEB_URL.to_string(),
            backup_dir: None,
            sync_dir: None,
            connect_timeout_secs: 5,
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }
}

/// What a `config set` changed that callers must react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigChange {
    /// Existing backup records no longer describe the new directory.
    pub backup_dir_changed: bool,
}

impl Config {
    /// Apply `RMSYNC_*` environment overrides.
    #[must_use]
    pub fn with_env(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`; empty values are ignored.
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(host) = get("RMSYNC_HOST") {
            self.host = host;
        }
        if let Some(dir) = get("RMSYNC_BACKUP_DIR") {
            self.backup_dir = Some(PathBuf::from(dir));
        }
        if let Some(dir) = get("RMSYNC_SYNC_DIR") {
            self.sync_dir = Some(PathBuf::from(dir));
        }
        if let Some(url) = get("RMSYNC_WEB_URL") {
            self.web_url = url;
        }
        if let Some(dir) = get("RMSYNC_LOCAL_ROOT") {
            self.local_root = Some(PathBuf::from(dir));
        }
        self
    }

    /// Set one value by its `config set` key.
    ///
    /// An empty value clears optional settings.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for unknown keys or unparsable values.
    pub fn set(&mut self, key: &str, value: &str) -> Result<ConfigChange> {
        let value = value.trim();
        let optional_path = || (!value.is_empty()).then(|| PathBuf::from(value));
        let mut change = ConfigChange {
            backup_dir_changed: false,
        };

        match key {
            "host" => self.host = non_empty(key, value)?,
            "user" => self.user = non_empty(key, value)?,
            "ssh-key" => self.ssh_key = optional_path(),
            "ssh-port" => self.ssh_port = parse_number(key, value)?,
            "remote-root" => self.remote_root = non_empty(key, value)?,
            "local-root" => self.local_root = optional_path(),
            "web-url" => self.web_url = non_empty(key, value)?,
            "backup-dir" => {
                let dir = optional_path();
                change.backup_dir_changed = dir != self.backup_dir;
                self.backup_dir = dir;
            }
            "sync-dir" => self.sync_dir = optional_path(),
            "connect-timeout" => self.connect_timeout_secs = parse_number(key, value)?,
            "language" => self.language = non_empty(key, value)?,
            _ => {
                return Err(Error::InvalidArgument(format!(
                    "unknown config key '{key}' (expected one of: {})",
                    KEYS.join(", ")
                )));
            }
        }
        Ok(change)
    }

    /// Every setting as `(key, value)` for display; unset values are empty.
    #[must_use]
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        let path = |p: &Option<PathBuf>| {
            p.as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default()
        };
        vec![
            ("host", self.host.clone()),
            ("user", self.user.clone()),
            ("ssh-key", path(&self.ssh_key)),
            ("ssh-port", self.ssh_port.to_string()),
            ("remote-root", self.remote_root.clone()),
            ("local-root", path(&self.local_root)),
            ("web-url", self.web_url.clone()),
            ("backup-dir", path(&self.backup_dir)),
            ("sync-dir", path(&self.sync_dir)),
            ("connect-timeout", self.connect_timeout_secs.to_string()),
            ("language", self.language.clone()),
        ]
    }

    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    #[must_use]
    pub fn ssh_target(&self) -> SshTarget {
        SshTarget {
            host: self.host.clone(),
            user: self.user.clone(),
            port: self.ssh_port,
            identity: self.ssh_key.clone(),
            connect_timeout: self.connect_timeout(),
        }
    }

    /// Control channel for the configured backend.
    #[must_use]
    pub fn control_channel(&self) -> ControlChannel<DeviceConnector> {
        match &self.local_root {
            Some(root) => ControlChannel::new(
                DeviceConnector::Local(LocalConnector::new(root)),
                root.to_string_lossy(),
            ),
            None => ControlChannel::new(
                DeviceConnector::Ssh(SshConnector::new(self.ssh_target())),
                self.remote_root.as_str(),
            ),
        }
    }

    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn data_channel(&self) -> Result<DataChannel<UsbWebTransport>> {
        Ok(DataChannel::new(UsbWebTransport::new(
            &self.web_url,
            self.connect_timeout(),
        )?))
    }

    #[must_use]
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            backup_dir: self.backup_dir.clone(),
            sync_dir: self.sync_dir.clone(),
        }
    }
}

fn non_empty(key: &str, value: &str) -> Result<String> {
    if value.is_empty() {
        return Err(Error::InvalidArgument(format!("{key} cannot be empty")));
    }
    Ok(value.to_string())
}

fn parse_number<N: std::str::FromStr>(key: &str, value: &str) -> Result<N> {
    value
        .parse()
        .map_err(|_| Error::InvalidArgument(format!("{key} must be a number, got '{value}'")))
}

/// Get the global rmsync directory (`~/.rmsync`).
#[must_use]
pub fn rmsync_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".rmsync"))
}

/// Config file location; `RMSYNC_CONFIG` overrides the default.
///
/// # Errors
///
/// Returns a config error if the home directory cannot be determined.
pub fn config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("RMSYNC_CONFIG") {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }
    rmsync_dir()
        .map(|dir| dir.join("config.json"))
        .ok_or_else(|| Error::Config("Could not determine home directory".into()))
}

/// Load the configuration file; a missing file yields defaults.
///
/// # Errors
///
/// Returns a config error if the file exists but cannot be read or parsed.
pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read config file: {e}")))?;

    serde_json::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse config file: {e}")))
}

/// # Errors
///
/// Returns a config error if serialization or the write fails.
pub fn save_config_to(path: &Path, config: &Config) -> Result<()> {
    let content = serde_json::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Failed to serialize config: {e}")))?;

    atomic_write(path, content.as_bytes())
        .map_err(|e| Error::Config(format!("Failed to write config file: {e}")))
}

/// Load the config file and apply environment overrides.
///
/// # Errors
///
/// See [`load_config_from`].
pub fn load_config() -> Result<Config> {
    Ok(load_config_from(&config_path()?)?.with_env())
}

/// # Errors
///
/// See [`save_config_to`].
pub fn save_config(config: &Config) -> Result<()> {
    save_config_to(&config_path()?, config)
}

/// Resolve the ledger database path.
///
/// Priority:
/// 1. `explicit_path` from `--db`
/// 2. `RMSYNC_DB` environment variable
/// 3. `~/.rmsync/data/ledger.db`
#[must_use]
pub fn resolve_db_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return Some(path.to_path_buf());
    }

    if let Ok(db_path) = std::env::var("RMSYNC_DB") {
        if !db_path.trim().is_empty() {
            return Some(PathBuf::from(db_path));
        }
    }

    rmsync_dir().map(|dir| dir.join("data").join("ledger.db"))
}

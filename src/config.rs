// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration file handling.
//!
//! Settings live in `~/.ariadeck/config.json`. A missing file means defaults,
//! and every field has a default so a partial file loads too.
//!
//! ```json
//! {
//!   "rpc": { "host": "localhost", "port": 6800, "secret": "..." },
//!   "download": { "split": 8 }
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::rpc::{ConnectionDescriptor, Scheme, TaskOptions};

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 6800;
pub const DEFAULT_PATH: &str = "/jsonrpc";
pub const DEFAULT_PROTOCOL: &str = "http";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_REFRESH_SECS: u64 = 5;

const CONFIG_DIR: &str = ".ariadeck";
const CONFIG_FILE: &str = "config.json";

/// Keys accepted by [`AppConfig::set`].
pub const SETTABLE_KEYS: &[&str] = &[
    "rpc.host",
    "rpc.port",
    "rpc.path",
    "rpc.protocol",
    "rpc.secret",
    "rpc.timeout",
    "rpc.retries",
    "download.dir",
    "download.split",
    "download.max-connection-per-server",
    "display.refresh-interval",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub rpc: RpcConfig,
    #[serde(default)]
    pub download: DownloadConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

/// Where the engine listens and how to talk to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_rpc_path")]
    pub path: String,
    /// `http`, `https`, `ws` or `wss`
    #[serde(default = "default_protocol")]
    pub protocol: String,
    #[serde(default)]
    pub secret: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub retries: u32,
}

/// Defaults applied to new downloads unless the command overrides them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DownloadConfig {
    #[serde(default)]
    pub default_directory: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_connection_per_server: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_refresh_secs")]
    pub refresh_interval_secs: u64,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_rpc_path() -> String {
    DEFAULT_PATH.to_string()
}

fn default_protocol() -> String {
    DEFAULT_PROTOCOL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_refresh_secs() -> u64 {
    DEFAULT_REFRESH_SECS
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            path: default_rpc_path(),
            protocol: default_protocol(),
            secret: String::new(),
            timeout_secs: default_timeout_secs(),
            retries: 0,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_secs(),
        }
    }
}

impl RpcConfig {
    /// Validate the settings and build a connection descriptor from them.
    pub fn descriptor(&self) -> Result<ConnectionDescriptor> {
        let host = self.host.trim();
        if host.is_empty() {
            bail!("rpc.host must not be empty");
        }
        if self.port == 0 {
            bail!("rpc.port must be between 1 and 65535");
        }
        if !self.path.starts_with('/') {
            bail!("rpc.path must start with '/' (got '{}')", self.path);
        }
        if self.timeout_secs == 0 {
            bail!("rpc.timeout must be at least 1 second");
        }
        let scheme: Scheme = self
            .protocol
            .parse()
            .map_err(|e: String| anyhow::anyhow!("rpc.protocol: {}", e))?;

        Ok(ConnectionDescriptor::new(
            host,
            self.port,
            self.path.as_str(),
            scheme,
            self.secret.as_str(),
            Duration::from_secs(self.timeout_secs),
        )
        .with_retries(self.retries))
    }
}

impl DownloadConfig {
    /// Fill in configured defaults that `options` does not already set.
    pub fn apply_defaults(&self, options: &mut TaskOptions) {
        if !self.default_directory.is_empty() {
            options.insert_default("dir", self.default_directory.as_str());
        }
        if let Some(split) = self.split {
            options.insert_default("split", split.to_string());
        }
        if let Some(max) = self.max_connection_per_server {
            options.insert_default("max-connection-per-server", max.to_string());
        }
    }
}

impl DisplayConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }
}

impl AppConfig {
    /// Load from `path`, falling back to defaults when the file is missing.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Write as pretty JSON, creating the parent directory if needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Update one setting by its dotted key (see [`SETTABLE_KEYS`]).
    ///
    /// The value is checked before anything changes; on error the config is
    /// left as it was.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            "rpc.host" => self.rpc.host = value.to_string(),
            "rpc.port" => self.rpc.port = parse_number(key, value)?,
            "rpc.path" => self.rpc.path = value.to_string(),
            "rpc.protocol" => {
                let scheme: Scheme = value
                    .parse()
                    .map_err(|e: String| anyhow::anyhow!("{}: {}", key, e))?;
                self.rpc.protocol = scheme.as_str().to_string();
            }
            "rpc.secret" => self.rpc.secret = value.to_string(),
            "rpc.timeout" => self.rpc.timeout_secs = parse_number(key, value)?,
            "rpc.retries" => self.rpc.retries = parse_number(key, value)?,
            "download.dir" => self.download.default_directory = value.to_string(),
            "download.split" => self.download.split = parse_optional(key, value)?,
            "download.max-connection-per-server" => {
                self.download.max_connection_per_server = parse_optional(key, value)?
            }
            "display.refresh-interval" => {
                self.display.refresh_interval_secs = parse_number(key, value)?
            }
            _ => bail!(
                "Unknown key '{}'. Valid keys: {}",
                key,
                SETTABLE_KEYS.join(", ")
            ),
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| anyhow::anyhow!("{} expects a non-negative number, got '{}'", key, value))
}

/// Empty text clears the setting.
fn parse_optional<T: std::str::FromStr>(key: &str, value: &str) -> Result<Option<T>> {
    if value.is_empty() {
        return Ok(None);
    }
    parse_number(key, value).map(Some)
}

/// `~/.ariadeck/config.json`
pub fn default_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not find home directory")?;
    Ok(home.join(CONFIG_DIR).join(CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::OptionValue;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.rpc.host, "localhost");
        assert_eq!(config.rpc.port, 6800);
        assert_eq!(config.rpc.path, "/jsonrpc");
        assert_eq!(config.rpc.protocol, "http");
        assert_eq!(config.rpc.secret, "");
        assert_eq!(config.rpc.timeout_secs, 30);
        assert_eq!(config.rpc.retries, 0);
        assert_eq!(config.download.split, None);
        assert_eq!(config.display.refresh_interval_secs, 5);
    }

    #[test]
    fn test_missing_file_loads_defaults() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig::load(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"rpc": {"port": 6801, "secret": "s3cret"}}"#).unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.rpc.port, 6801);
        assert_eq!(config.rpc.secret, "s3cret");
        assert_eq!(config.rpc.host, "localhost");
        assert_eq!(config.rpc.path, "/jsonrpc");
        assert_eq!(config.display.refresh_interval_secs, 5);
    }

    #[test]
    fn test_default_path_under_home() {
        if let Some(home) = dirs::home_dir() {
            let path = default_path().unwrap();
            assert_eq!(path, home.join(".ariadeck").join("config.json"));
        }
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(AppConfig::load(&path).is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = AppConfig::default();
        config.rpc.host = "nas.local".to_string();
        config.download.split = Some(8);
        config.save(&path).unwrap();

        assert_eq!(AppConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_descriptor_from_defaults() {
        let descriptor = RpcConfig::default().descriptor().unwrap();
        assert_eq!(descriptor.endpoint(), "http://localhost:6800/jsonrpc");
        assert_eq!(descriptor.timeout(), Duration::from_secs(30));
        assert_eq!(descriptor.retries(), 0);
    }

    #[test]
    fn test_descriptor_validation() {
        let base = RpcConfig::default();

        let mut config = base.clone();
        config.host = "  ".to_string();
        assert!(config.descriptor().is_err());

        let mut config = base.clone();
        config.port = 0;
        assert!(config.descriptor().is_err());

        let mut config = base.clone();
        config.path = "jsonrpc".to_string();
        assert!(config.descriptor().is_err());

        let mut config = base.clone();
        config.protocol = "ftp".to_string();
        assert!(config.descriptor().is_err());

        let mut config = base;
        config.timeout_secs = 0;
        assert!(config.descriptor().is_err());
    }

    #[test]
    fn test_descriptor_secure_protocol() {
        let config = RpcConfig {
            protocol: "WSS".to_string(),
            retries: 2,
            ..RpcConfig::default()
        };
        let descriptor = config.descriptor().unwrap();
        assert_eq!(descriptor.scheme(), Scheme::Wss);
        assert_eq!(descriptor.endpoint(), "https://localhost:6800/jsonrpc");
        assert_eq!(descriptor.retries(), 2);
    }

    #[test]
    fn test_set_keys() {
        let mut config = AppConfig::default();
        config.set("rpc.port", "16800").unwrap();
        config.set("rpc.protocol", "HTTPS").unwrap();
        config.set("download.split", "4").unwrap();
        config.set("display.refresh-interval", "2").unwrap();

        assert_eq!(config.rpc.port, 16800);
        assert_eq!(config.rpc.protocol, "https");
        assert_eq!(config.download.split, Some(4));
        assert_eq!(config.display.refresh_interval_secs, 2);

        config.set("download.split", "").unwrap();
        assert_eq!(config.download.split, None);
    }

    #[test]
    fn test_set_rejects_bad_input() {
        let mut config = AppConfig::default();
        assert!(config.set("rpc.port", "99999").is_err());
        assert!(config.set("rpc.protocol", "gopher").is_err());
        assert!(config.set("no.such.key", "1").is_err());
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_download_defaults_do_not_override() {
        let download = DownloadConfig {
            default_directory: "/downloads".to_string(),
            split: Some(8),
            max_connection_per_server: Some(4),
        };
        let mut options = TaskOptions::new().with("split", "2");
        download.apply_defaults(&mut options);

        assert_eq!(options.get("split"), Some(&OptionValue::from("2")));
        assert_eq!(options.get("dir"), Some(&OptionValue::from("/downloads")));
        assert_eq!(
            options.get("max-connection-per-server"),
            Some(&OptionValue::from("4"))
        );
    }
}

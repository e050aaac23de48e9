//! Node configuration loading and management.

use custos_core::Mode;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Full configuration for a Custos node.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CustosConfig {
    /// HTTP server and operating mode.
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Revocation status list settings.
    #[serde(default)]
    pub status: StatusConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// `issuer` or `verifier`.
    #[serde(default = "default_mode")]
    pub mode: Mode,
    /// Public base URL of this node. Status list locators live under it.
    #[serde(default = "default_host_url")]
    pub host_url: String,
    /// Domain new profile DIDs are created under.
    #[serde(default = "default_domain")]
    pub domain: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Rocksdb,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_backend")]
    pub backend: StorageBackend,
    /// RocksDB directory.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Base58 X25519 secret used to encrypt stored credentials. Generated
    /// on first start.
    #[serde(default = "default_key_path")]
    pub key_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusConfig {
    /// Credentials per status list page.
    #[serde(default = "default_list_size")]
    pub list_size: usize,
    /// Timeout for fetching remote status lists.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json).
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_listen_addr() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8070
}
fn default_mode() -> Mode {
    Mode::Issuer
}
fn default_host_url() -> String {
    "http://localhost:8070".into()
}
fn default_domain() -> String {
    "localhost".into()
}
fn default_request_timeout() -> u64 {
    30
}
fn default_backend() -> StorageBackend {
    StorageBackend::Rocksdb
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}
fn default_key_path() -> PathBuf {
    PathBuf::from("./data/storage.key")
}
fn default_list_size() -> usize {
    custos_credentials::DEFAULT_LIST_SIZE
}
fn default_fetch_timeout() -> u64 {
    10
}
fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "text".into()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            port: default_port(),
            mode: default_mode(),
            host_url: default_host_url(),
            domain: default_domain(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            data_dir: default_data_dir(),
            key_path: default_key_path(),
        }
    }
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            list_size: default_list_size(),
            fetch_timeout_secs: default_fetch_timeout(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl CustosConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let config: CustosConfig = toml::from_str(&contents)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save the current config to a TOML file.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn listen_socket(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.server.listen_addr, self.server.port).parse()?)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }
}

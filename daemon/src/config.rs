//! Service configuration with TOML file support.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use circles_utils::LogFormat;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Configuration for the Circles service.
///
/// Loaded from a TOML file via [`ServiceConfig::from_toml_file`]; every
/// field has a default, so an empty file is valid. CLI flags and
/// environment variables are applied on top by the daemon.
#[derive(Clone, Debug, Deserialize)]
pub struct ServiceConfig {
    /// Address the HTTP server binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,

    /// Directory holding the LMDB environment.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// LMDB map size in MiB.
    #[serde(default = "default_map_size_mb")]
    pub map_size_mb: usize,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Whether to expose Prometheus metrics at `/metrics`.
    #[serde(default)]
    pub enable_metrics: bool,

    /// Answer CORS preflights for any origin.
    #[serde(default = "default_true")]
    pub cors_allow_any: bool,

    /// HS256 secret for bearer tokens. Usually supplied through the
    /// environment rather than the file.
    #[serde(default)]
    pub jwt_secret: Option<String>,

    #[serde(default)]
    pub membership: MembershipConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct MembershipConfig {
    /// Backfill follows from group membership when follow status is read.
    #[serde(default = "default_true")]
    pub repair_on_read: bool,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 5000))
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./circles_data")
}

fn default_map_size_mb() -> usize {
    64
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

// ── Impl ───────────────────────────────────────────────────────────────

impl ServiceConfig {
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// LMDB map size in bytes.
    pub fn map_size_bytes(&self) -> usize {
        self.map_size_mb.saturating_mul(1024 * 1024)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            data_dir: default_data_dir(),
            map_size_mb: default_map_size_mb(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            enable_metrics: false,
            cors_allow_any: default_true(),
            jwt_secret: None,
            membership: MembershipConfig::default(),
        }
    }
}

impl Default for MembershipConfig {
    fn default() -> Self {
        Self {
            repair_on_read: default_true(),
        }
    }
}

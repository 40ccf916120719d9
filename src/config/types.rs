// Configuration types module
// Defines all configuration-related data structures

use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

/// The server only ever binds to loopback
pub const LOOPBACK: Ipv4Addr = Ipv4Addr::LOCALHOST;

/// Main configuration structure
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Listener and response options
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Connection timeout in milliseconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// Reported at startup, not applied to responses
    #[serde(default = "default_gzip")]
    pub gzip: bool,
    /// Charset appended to every Content-Type
    #[serde(default = "default_charset")]
    pub charset: String,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default = "default_access_log")]
    pub access_log: bool,
    /// `combined`, `common`, `json` or a `$variable` template
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    #[serde(default)]
    pub access_log_file: Option<String>,
    #[serde(default)]
    pub error_log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_port() -> u16 {
    2080
}

#[allow(clippy::missing_const_for_fn)]
fn default_timeout() -> u64 {
    30_000
}

#[allow(clippy::missing_const_for_fn)]
fn default_gzip() -> bool {
    true
}

fn default_charset() -> String {
    "utf-8".to_string()
}

fn default_level() -> String {
    "info".to_string()
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log() -> bool {
    true
}

fn default_access_log_format() -> String {
    "combined".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            timeout: default_timeout(),
            gzip: default_gzip(),
            charset: default_charset(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            access_log: default_access_log(),
            access_log_format: default_access_log_format(),
            access_log_file: None,
            error_log_file: None,
        }
    }
}

impl ServerConfig {
    /// Loopback address for the configured port
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::from((LOOPBACK, self.port))
    }

    pub fn timeout_duration(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }
}

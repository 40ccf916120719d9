// Configuration module entry point
// Layered configuration: optional file, environment, built-in defaults

mod types;

use std::net::SocketAddr;

// Re-export public types
pub use types::{Config, LoggingConfig, ServerConfig, LOOPBACK};

/// Default config file base name (`route99.toml`, `route99.json`, ...)
pub const DEFAULT_CONFIG_PATH: &str = "route99";

/// Environment variable prefix, nested keys separated by `__`
/// (e.g. `ROUTE99_SERVER__PORT=9000`)
pub const ENV_PREFIX: &str = "ROUTE99";

impl Config {
    /// Load configuration from the default file, environment and defaults
    pub fn load() -> crate::Result<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from specified file path (extension optional)
    pub fn load_from(config_path: &str) -> crate::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_default("server.port", 2080)?
            .set_default("server.timeout", 30_000)?
            .set_default("server.gzip", true)?
            .set_default("server.charset", "utf-8")?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "combined")?
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Address the server binds to (always loopback)
    pub fn socket_addr(&self) -> SocketAddr {
        self.server.socket_addr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.server.port, 2080);
        assert_eq!(cfg.server.timeout, 30_000);
        assert!(cfg.server.gzip);
        assert_eq!(cfg.server.charset, "utf-8");
        assert_eq!(cfg.logging.access_log_format, "combined");
        assert_eq!(cfg.server.timeout_duration(), Duration::from_secs(30));
    }

    #[test]
    fn test_socket_addr_is_loopback() {
        let mut cfg = Config::default();
        cfg.server.port = 9991;
        assert_eq!(cfg.socket_addr().to_string(), "127.0.0.1:9991");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let cfg = Config::load_from("definitely-not-a-route99-config").unwrap();
        assert_eq!(cfg.server, ServerConfig::default());
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn test_load_from_toml_file() {
        let path = std::env::temp_dir().join(format!("route99-test-{}.toml", std::process::id()));
        std::fs::write(
            &path,
            "[server]\nport = 9991\ncharset = \"iso-8859-1\"\n\n[logging]\naccess_log = false\n",
        )
        .unwrap();

        let cfg = Config::load_from(path.to_str().unwrap()).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(cfg.server.port, 9991);
        assert_eq!(cfg.server.charset, "iso-8859-1");
        assert_eq!(cfg.server.timeout, 30_000);
        assert!(!cfg.logging.access_log);
        assert!(cfg.logging.access_log_file.is_none());
    }

    #[test]
    fn test_invalid_value_is_config_error() {
        let path = std::env::temp_dir().join(format!("route99-bad-{}.toml", std::process::id()));
        std::fs::write(&path, "[server]\nport = \"not-a-port\"\n").unwrap();

        let result = Config::load_from(path.to_str().unwrap());
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(result, Err(crate::Error::Config(_))));
    }
}

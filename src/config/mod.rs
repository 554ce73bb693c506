// Configuration module entry point
// Loads layered configuration and holds the shared runtime state

mod state;
mod types;

use std::net::SocketAddr;

pub use state::AppState;
pub use types::{
    Config, DocsConfig, HttpConfig, LogLevel, LoggingConfig, PerformanceConfig, ServerConfig,
};

use crate::error::StartupError;

/// Config file used when none is given on the command line
pub const DEFAULT_CONFIG_PATH: &str = "config";

impl Config {
    /// Load configuration from specified file path (without extension)
    ///
    /// The file is optional. Environment variables prefixed with `REQBIND`
    /// override it, nested keys separated by `__` (`REQBIND_SERVER__PORT`).
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("REQBIND")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8000)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "combined")?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .set_default("http.server_name", "reqbind/0.1")?
            .set_default("http.max_body_size", 1_048_576)?
            .set_default("docs.enabled", true)?
            .set_default("docs.title", "reqbind")?
            .set_default("docs.version", "0.1.0")?
            .set_default("docs.openapi_path", "/openapi.json")?
            .set_default("docs.docs_path", "/docs")?
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, StartupError> {
        let addr = format!("{}:{}", self.server.host, self.server.port);
        addr.parse()
            .map_err(|source| StartupError::Address { addr, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_default_impl() {
        let loaded = Config::load_from("does/not/exist/reqbind-test").unwrap();
        assert_eq!(loaded, Config::default());
    }

    #[test]
    fn test_socket_addr() {
        let config = Config::default();
        assert_eq!(config.get_socket_addr().unwrap().port(), 8000);

        let mut bad = Config::default();
        bad.server.host = "not a host".to_string();
        assert!(matches!(
            bad.get_socket_addr(),
            Err(StartupError::Address { .. })
        ));
    }
}

// Configuration module entry point
// Loads layered configuration (file, environment, defaults) and runtime state

mod state;
mod types;

use std::net::SocketAddr;
use std::time::Duration;

pub use state::AppState;
pub use types::{
    Config, DispatchConfig, HttpConfig, LoggingConfig, PerformanceConfig, ServerConfig,
};

/// Config file looked up when no path is given
pub const DEFAULT_CONFIG_PATH: &str = "config";

impl Config {
    /// Load configuration from the default `config.toml` (optional)
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from specified file path (extension optional)
    ///
    /// Environment variables prefixed with `WMAP_` override the file, using
    /// `__` between sections, e.g. `WMAP_DISPATCH__PREFIX=/wmap/app`.
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("WMAP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("dispatch.prefix", "/wmap/pure-php/public")?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "combined")?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .set_default("http.default_content_type", "text/html; charset=UTF-8")?
            .set_default("http.server_name", "wmap-hello")?
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }

    /// Upper bound on the lifetime of a single connection
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(std::cmp::max(
            self.performance.read_timeout,
            self.performance.write_timeout,
        ))
    }
}

// Application state module
// Holds the read-only configuration and route table shared by all connections

use crate::dispatch::RouteTable;
use crate::logger::LogFormat;

use super::types::Config;

/// Application state
pub struct AppState {
    pub config: Config,
    pub routes: RouteTable,
    /// Parsed once from `logging.access_log_format`
    pub access_log_format: LogFormat,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let access_log_format = LogFormat::parse(&config.logging.access_log_format);
        Self {
            config,
            routes: RouteTable::builtin(),
            access_log_format,
        }
    }

    /// Deployment prefix stripped from every request path
    pub fn prefix(&self) -> &str {
        &self.config.dispatch.prefix
    }

    pub const fn access_log(&self) -> bool {
        self.config.logging.access_log
    }
}

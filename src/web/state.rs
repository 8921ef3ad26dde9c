use crate::config::AppConfig;
use crate::gateway::Gateway;

/// Shared application state for the web server
pub struct AppState {
    pub config: AppConfig,
    pub gateway: Gateway,
    pub startup_time: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(config: AppConfig, gateway: Gateway) -> Self {
        Self {
            config,
            gateway,
            startup_time: chrono::Utc::now(),
        }
    }

    // Data source used when a request does not name one
    pub fn default_data_source(&self) -> &str {
        &self.config.default_data_source
    }
}

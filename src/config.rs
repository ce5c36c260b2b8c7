use std::env;
use std::net::SocketAddr;

use log::info;

use crate::error::ConfigError;

const DEFAULT_SOURCE: &str = "sensors.json";
const DEFAULT_ADDRESS: &str = "127.0.0.1:6969";

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Locator of the readings document: a path, `file://` or `http(s)://` URL
    pub source: String,
    pub address: SocketAddr,
}

impl AppConfig {
    pub fn new() -> Result<Self, ConfigError> {
        // Load environment variables
        dotenv::dotenv().ok();

        let config = Self::from_values(
            env::var("SENSORS_SOURCE").ok(),
            env::var("DASHBOARD_ADDRESS").ok(),
        )?;

        info!("Sensors source: {}", config.source);
        info!("Dashboard address: {}", config.address);

        Ok(config)
    }

    fn from_values(source: Option<String>, address: Option<String>) -> Result<Self, ConfigError> {
        let source = source
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_SOURCE.to_string());

        let address = address
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| DEFAULT_ADDRESS.to_string());
        let address = address
            .parse()
            .map_err(|source| ConfigError::InvalidAddress {
                value: address.clone(),
                source,
            })?;

        Ok(AppConfig { source, address })
    }
}

/// Error types for loading, validating and updating sensor readings
use strum::VariantNames;
use thiserror::Error;

use crate::models::SensorType;

/// Raised when a reading is constructed with a type outside the allowed set.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid sensor type '{value}', allowed values: {allowed}", allowed = SensorType::VARIANTS.join(", "))]
pub struct InvalidTypeError {
    pub value: String,
}

/// Raised when an update targets an id that is not in the registry.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("sensor id {id} not found")]
pub struct NotFoundError {
    pub id: i64,
}

/// Failure while loading readings from their backing resource.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("unusable sensors locator: {0}")]
    Locator(String),

    #[error("sensors request failed with status {status} ({reason})")]
    Status { status: u16, reason: String },

    #[error("sensors request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("could not read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("malformed sensors document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid sensor record: {0}")]
    InvalidRecord(#[from] InvalidTypeError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("DASHBOARD_ADDRESS '{value}' is not a socket address: {source}")]
    InvalidAddress {
        value: String,
        source: std::net::AddrParseError,
    },
}

/// Failure of a request sent from the host surface to the application context.
#[derive(Debug, Error)]
pub enum HandleError {
    #[error("application context has shut down")]
    Closed,

    #[error(transparent)]
    NotFound(#[from] NotFoundError),
}

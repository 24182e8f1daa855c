//! Dashboard error types

use thiserror::Error;

/// Message shown when the service could not be reached at all
pub const CONNECT_FAILURE_MESSAGE: &str =
    "Could not connect to the grid service. Please check your API keys.";

/// Whether a service message reports a geographic restriction
pub fn is_geo_restriction_message(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("geographic restriction") || message.contains("restricted in your location")
}

/// Errors that can occur while talking to the grid service or driving the views
#[derive(Error, Debug, Clone)]
pub enum DashboardError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("Missing field in response: {0}")]
    MissingField(&'static str),

    #[error("Invalid form input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Server error: {0}")]
    Server(String),
}

impl DashboardError {
    /// Build a status error, falling back to `Error {status}` when the body had no message
    pub fn status(status: u16, message: Option<String>) -> Self {
        let message = message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| format!("Error {}", status));
        DashboardError::Status { status, message }
    }

    /// HTTP status code, if the error came from a non-OK response
    pub fn status_code(&self) -> Option<u16> {
        match self {
            DashboardError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the service refused the request because of the caller's location
    pub fn is_geo_restricted(&self) -> bool {
        if self.status_code() == Some(451) {
            return true;
        }
        is_geo_restriction_message(&self.to_string())
    }

    /// Text surfaced to the user in an inline error slot
    pub fn user_message(&self) -> String {
        match self {
            DashboardError::Status { message, .. } => message.clone(),
            DashboardError::Transport(_) => CONNECT_FAILURE_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for DashboardError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            DashboardError::Decode(err.to_string())
        } else {
            DashboardError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for DashboardError {
    fn from(err: serde_json::Error) -> Self {
        DashboardError::Decode(err.to_string())
    }
}

impl From<config::ConfigError> for DashboardError {
    fn from(err: config::ConfigError) -> Self {
        DashboardError::Config(err.to_string())
    }
}

impl From<std::io::Error> for DashboardError {
    fn from(err: std::io::Error) -> Self {
        DashboardError::Server(err.to_string())
    }
}

/// Result type for dashboard operations
pub type DashboardResult<T> = std::result::Result<T, DashboardError>;

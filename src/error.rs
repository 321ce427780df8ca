//! Error types and handling for the `WeatherWear` engine

use std::time::Duration;

use thiserror::Error;

/// Main error type for weather acquisition
///
/// Only configuration errors reach the user, at startup. The service recovers
/// every other variant into fallback data after logging it.
#[derive(Error, Debug)]
pub enum WeatherError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Transport failures talking to the weather provider
    #[error("Network error: {message}")]
    Network { message: String },

    /// A provider call exceeded its time budget
    #[error("{operation} timed out after {}s", after.as_secs())]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// Non-2xx response from the provider
    #[error("API error {status}: {message}")]
    Status { status: u16, message: String },

    /// Provider payload could not be decoded
    #[error("Parse error: {message}")]
    Parse { message: String },

    /// Device location could not be obtained
    #[error("Location error: {message}")]
    Location { message: String },

    /// The caller asked for offline operation
    #[error("Offline mode: {operation} skipped")]
    Offline { operation: &'static str },
}

impl WeatherError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn timeout(operation: &'static str, after: Duration) -> Self {
        Self::Timeout { operation, after }
    }

    pub fn status<S: Into<String>>(status: u16, message: S) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    /// Create a new parse error
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    pub fn location<S: Into<String>>(message: S) -> Self {
        Self::Location {
            message: message.into(),
        }
    }

    pub fn offline(operation: &'static str) -> Self {
        Self::Offline { operation }
    }

    /// Whether another attempt could plausibly succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            WeatherError::Network { .. } | WeatherError::Timeout { .. } => true,
            WeatherError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            WeatherError::Config { .. } => {
                "Configuration error. Please check your config file and API key.".to_string()
            }
            WeatherError::Network { .. } | WeatherError::Timeout { .. } => {
                "Unable to reach the weather service. Showing estimated conditions.".to_string()
            }
            WeatherError::Status { status, .. } if *status == 401 => {
                "The weather service rejected the API key.".to_string()
            }
            WeatherError::Status { .. } | WeatherError::Parse { .. } => {
                "The weather service returned unusable data. Showing estimated conditions."
                    .to_string()
            }
            WeatherError::Location { .. } => {
                "Your location is unavailable. Using your last known location.".to_string()
            }
            WeatherError::Offline { .. } => {
                "Offline mode. Showing estimated conditions.".to_string()
            }
        }
    }
}

//! Error handling for the battery telemetry service.

use crate::logs::LogClass;

/// A specialized `Result` type for telemetry service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;

/// The main error type for the telemetry service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Inbound payload could not be decoded into a reading
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// Sustained unsafe temperatures inside the incident window
    #[error("{0}")]
    TemperatureIncident(String),

    /// Network operation failed
    #[error("Network error: {0}")]
    Network(String),

    /// Web server error
    #[error("Web server error: {0}")]
    WebServer(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ServiceError {
    /// Create a new malformed payload error
    pub fn malformed_payload(msg: impl Into<String>) -> Self {
        Self::MalformedPayload(msg.into())
    }

    /// Create a new temperature incident
    pub fn temperature_incident(msg: impl Into<String>) -> Self {
        Self::TemperatureIncident(msg.into())
    }

    /// Create a new network error
    pub fn network_error(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create a new web server error
    pub fn web_server_error(msg: impl Into<String>) -> Self {
        Self::WebServer(msg.into())
    }

    /// Create a new configuration error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// The log this error is recorded in.
    ///
    /// Incidents are a domain condition and go to the incidents log; every
    /// other failure is an error record.
    pub fn log_class(&self) -> LogClass {
        match self {
            Self::TemperatureIncident(_) => LogClass::Incidents,
            Self::Io(_)
            | Self::MalformedPayload(_)
            | Self::Network(_)
            | Self::WebServer(_)
            | Self::Config(_) => LogClass::Errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_class_dispatch() {
        assert_eq!(
            ServiceError::temperature_incident("too hot").log_class(),
            LogClass::Incidents
        );
        assert_eq!(
            ServiceError::malformed_payload("bad json").log_class(),
            LogClass::Errors
        );
        assert_eq!(
            ServiceError::network_error("reset").log_class(),
            LogClass::Errors
        );
    }

    #[test]
    fn test_incident_display_is_bare_body() {
        let err = ServiceError::temperature_incident("Temperatures Exceeded 4 Times in 5000ms:");
        assert_eq!(err.to_string(), "Temperatures Exceeded 4 Times in 5000ms:");
    }
}

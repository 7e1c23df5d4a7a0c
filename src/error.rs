//! Error types for TX20 frame decoding and wind aggregation

use thiserror::Error;

/// Result type for TX20 operations
pub type Result<T> = std::result::Result<T, WindError>;

/// Errors raised while capturing, decoding or aggregating wind samples
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WindError {
    /// A frame failed one of its consistency checks
    #[error("Invalid frame: {0}")]
    FrameInvalid(String),

    /// A capture was requested while another one was in flight
    #[error("Capture busy: {0}")]
    CaptureBusy(String),

    /// Flush requested on a window holding no samples
    #[error("Empty window: {0}")]
    EmptyWindow(String),

    /// Direction code outside the 16 compass buckets
    #[error("Invalid direction: {0}")]
    InvalidDirection(String),

    /// Speed value wider than the 12-bit speed field
    #[error("Invalid speed: {0}")]
    InvalidSpeed(String),

    /// Station configuration rejected by validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Station configuration could not be parsed
    #[error("Configuration parse error: {0}")]
    ConfigParse(String),
}

impl WindError {
    /// Create a new FrameInvalid error
    pub fn frame_invalid(msg: impl Into<String>) -> Self {
        WindError::FrameInvalid(msg.into())
    }

    /// Create a new CaptureBusy error
    pub fn capture_busy(msg: impl Into<String>) -> Self {
        WindError::CaptureBusy(msg.into())
    }

    /// Create a new EmptyWindow error
    pub fn empty_window(msg: impl Into<String>) -> Self {
        WindError::EmptyWindow(msg.into())
    }

    /// Create a new InvalidDirection error
    pub fn invalid_direction(msg: impl Into<String>) -> Self {
        WindError::InvalidDirection(msg.into())
    }

    /// Create a new InvalidSpeed error
    pub fn invalid_speed(msg: impl Into<String>) -> Self {
        WindError::InvalidSpeed(msg.into())
    }

    /// Create a new InvalidConfig error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        WindError::InvalidConfig(msg.into())
    }

    /// Create a new ConfigParse error
    pub fn config_parse(msg: impl Into<String>) -> Self {
        WindError::ConfigParse(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WindError::frame_invalid("checksum mismatch");
        assert!(err.to_string().contains("Invalid frame"));
        assert!(err.to_string().contains("checksum mismatch"));
    }

    #[test]
    fn test_error_equality() {
        assert_eq!(
            WindError::empty_window("flush"),
            WindError::EmptyWindow("flush".to_string())
        );
    }
}

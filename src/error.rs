//! # Error Types
//!
//! Custom error types for padcar using `thiserror`.

use thiserror::Error;

/// Main error type for padcar
#[derive(Debug, Error)]
pub enum PadcarError {
    /// No game controller was found at start-up
    #[error("no game controller available")]
    NoControllerAvailable,

    /// Input device errors (open, read, enumerate)
    #[error("Controller error: {0}")]
    Controller(String),

    /// Actuator board command failures
    #[error("Actuator error: {0}")]
    Actuator(String),

    /// The power-off command could not be run or reported failure
    #[error("Power-off failed: {0}")]
    PowerOff(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for padcar
pub type Result<T> = std::result::Result<T, PadcarError>;

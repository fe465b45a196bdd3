//! # Error Types
//!
//! Custom error types for Walk Capture using `thiserror`.

use thiserror::Error;

/// Main error type for Walk Capture
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Host platform has no known serial device naming convention
    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// Port discovery found no openable serial device
    #[error("No serial ports found")]
    NoPortsFound,

    /// Port selection failed (bad index, closed input)
    #[error("Port selection failed: {0}")]
    Selection(String),

    /// Serial port open/read errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// Configuration parse errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Configuration value out of range
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// CSV session write errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Walk Capture
pub type Result<T> = std::result::Result<T, CaptureError>;

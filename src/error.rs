//! # Error Types
//!
//! Custom error types for ISS Bridge using `thiserror`.

use thiserror::Error;

/// Main error type for ISS Bridge
#[derive(Debug, Error)]
pub enum IssBridgeError {
    /// Frame handed to the decoder has the wrong size
    #[error("Frame length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// ISS protocol errors
    #[error("ISS protocol error: {0}")]
    Protocol(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Report serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// None of the candidate serial devices could be opened
    #[error("No serial device found (tried: {0})")]
    SerialPortNotFound(String),

    /// Malformed line in a frame capture file
    #[error("Capture line {line}: {reason}")]
    Capture { line: usize, reason: String },
}

/// Result type alias for ISS Bridge
pub type Result<T> = std::result::Result<T, IssBridgeError>;

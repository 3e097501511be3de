//! # Error Types
//!
//! Custom error types for Pad Bridge using `thiserror`.

use thiserror::Error;

/// Main error type for Pad Bridge
#[derive(Debug, Error)]
pub enum PadBridgeError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Controller input errors
    #[error("Controller error: {0}")]
    Controller(String),

    /// Connection errors
    #[error("Transport error: {0}")]
    Transport(String),

    /// Operator input rejected by the script console
    #[error("{0}")]
    Validation(String),

    /// No saved script under the requested title
    #[error("No script named '{0}'")]
    ScriptNotFound(String),
}

/// Result type alias for Pad Bridge
pub type Result<T> = std::result::Result<T, PadBridgeError>;

//! Error types for the synchronization layer
//!
//! This module defines all error types used throughout the crate.
//!
//! Decoding problems are deliberately absent: parsers never fail, they
//! report dropped records through [`crate::parse::Parsed::skipped`].

use std::time::Duration;
use thiserror::Error;

/// Result type alias for ledgersync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the synchronization layer
#[derive(Error, Debug)]
pub enum Error {
    /// The transport deadline elapsed before a response arrived
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Network, DNS or connection failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// A command response did not carry its success marker.
    ///
    /// Displays as the server's literal text so it can be shown unchanged.
    #[error("{0}")]
    RemoteRejected(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Session store-related errors
    #[error("Session store error: {0}")]
    SessionStore(String),

    /// Invalid input or an operation not allowed in the current state
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Local I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a remote rejection carrying the server's text
    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::RemoteRejected(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a session store error
    pub fn session_store(msg: impl Into<String>) -> Self {
        Self::SessionStore(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// True for failures that happened before any response text was received
    pub fn is_transport_failure(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Transport(_))
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

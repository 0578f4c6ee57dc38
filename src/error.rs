//! Error types for Prodigy

use thiserror::Error;

/// Result type for Prodigy operations
pub type Result<T> = std::result::Result<T, ProdigyError>;

/// Comprehensive error types for Prodigy operations
#[derive(Error, Debug)]
pub enum ProdigyError {
    /// I/O related errors (binding, socket setup)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An exchange did not receive its response in time
    #[error("Operation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// `respond` called on a request that was already responded to
    #[error("Request has already been responded to")]
    AlreadyResponded,

    /// Payload bytes could not be decoded as the requested type
    #[error("Payload decode error: {message}")]
    PayloadDecode { message: String },

    /// A payload value could not be encoded
    #[error("Payload encode error: {message}")]
    PayloadEncode { message: String },

    /// The transport rejected or failed an operation
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// A runner operation was attempted in the wrong lifecycle state
    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    /// Malformed packet or wire-level violation
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Internal errors that shouldn't normally occur
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl ProdigyError {
    /// Create a timeout error
    pub fn timeout(timeout_ms: u64) -> Self {
        ProdigyError::Timeout { timeout_ms }
    }

    /// Create a payload decode error
    pub fn payload_decode(message: impl Into<String>) -> Self {
        ProdigyError::PayloadDecode {
            message: message.into(),
        }
    }

    /// Create a payload encode error
    pub fn payload_encode(message: impl Into<String>) -> Self {
        ProdigyError::PayloadEncode {
            message: message.into(),
        }
    }

    /// Create a transport error
    pub fn transport(message: impl Into<String>) -> Self {
        ProdigyError::Transport {
            message: message.into(),
        }
    }

    /// Create an invalid-state error
    pub fn invalid_state(message: impl Into<String>) -> Self {
        ProdigyError::InvalidState {
            message: message.into(),
        }
    }

    /// Create a protocol error
    pub fn protocol(message: impl Into<String>) -> Self {
        ProdigyError::Protocol {
            message: message.into(),
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        ProdigyError::Config {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        ProdigyError::Internal {
            message: message.into(),
        }
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, ProdigyError::Timeout { .. })
    }

    /// Check if this error indicates the endpoint is closed or unusable
    pub fn is_closed(&self) -> bool {
        match self {
            ProdigyError::Transport { .. } => true,
            ProdigyError::Io(e) => {
                matches!(
                    e.kind(),
                    std::io::ErrorKind::BrokenPipe
                        | std::io::ErrorKind::NotConnected
                        | std::io::ErrorKind::ConnectionAborted
                        | std::io::ErrorKind::ConnectionReset
                )
            }
            _ => false,
        }
    }

    /// Check if this is a recoverable error (the endpoint remains usable)
    pub fn is_recoverable(&self) -> bool {
        match self {
            ProdigyError::Timeout { .. } => true,
            ProdigyError::PayloadDecode { .. } => true,
            ProdigyError::Protocol { .. } => true,
            ProdigyError::AlreadyResponded => true,
            ProdigyError::Io(e) => {
                matches!(
                    e.kind(),
                    std::io::ErrorKind::WouldBlock
                        | std::io::ErrorKind::TimedOut
                        | std::io::ErrorKind::Interrupted
                )
            }
            _ => false,
        }
    }
}

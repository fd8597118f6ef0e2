//! Unified error system for permaudit
//!
//! A single error type shared by the engine, the REST client and the export
//! orchestrator. The variants double as the failure taxonomy of an export run:
//! [`AuditError::is_fatal`] separates run-aborting failures from per-resource
//! ones, and [`AuditError::is_not_found`] marks the "zero rules" condition of
//! default-permission sources.

use serde::{Deserialize, Serialize};

/// Unified error type for all permaudit operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum AuditError {
    /// Invalid input, configuration or policy table
    #[error("Invalid: {message}")]
    Invalid {
        /// Error message describing the invalid input
        message: String,
    },

    /// Resource or endpoint not found / unsupported by the remote service
    #[error("Not found: {message}")]
    NotFound {
        /// Error message describing what was not found
        message: String,
    },

    /// Authentication rejected by the remote service
    #[error("Authentication error: {message}")]
    Auth {
        /// Error message describing the rejected credentials
        message: String,
    },

    /// The signed-in user may not read this resource
    #[error("Forbidden: {message}")]
    Forbidden {
        /// Error message naming the refused resource
        message: String,
    },

    /// Connection-level failure talking to the remote service
    #[error("Transport error: {message}")]
    Transport {
        /// Error message describing the transport failure
        message: String,
    },

    /// A fetch did not complete in time
    #[error("Timed out: {message}")]
    Timeout {
        /// Error message naming the operation that timed out
        message: String,
    },

    /// The remote service answered with an unexpected status
    #[error("Remote error ({status}): {message}")]
    Remote {
        /// HTTP status code
        status: u16,
        /// Error message or response summary
        message: String,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message describing the serialization failure
        message: String,
    },

    /// Local file system error
    #[error("I/O error: {message}")]
    Io {
        /// Error message describing the I/O failure
        message: String,
    },

    /// Internal system error
    #[error("Internal error: {message}")]
    Internal {
        /// Error message describing the internal error
        message: String,
    },
}

impl AuditError {
    /// Create an invalid input error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create an authentication error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Create a forbidden error
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Create a transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    /// Create a remote status error
    pub fn remote(status: u16, message: impl Into<String>) -> Self {
        Self::Remote {
            status,
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create an I/O error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether the remote side reported the resource as missing or unsupported
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether this failure must abort the whole export run.
    ///
    /// Authentication and transport failures mean no further request can
    /// succeed; everything else is scoped to the resource being fetched.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Auth { .. } | Self::Transport { .. })
    }
}

/// Standard Result type for permaudit operations
pub type Result<T> = std::result::Result<T, AuditError>;

impl From<std::io::Error> for AuditError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::not_found(err.to_string()),
            _ => Self::io(err.to_string()),
        }
    }
}

impl From<csv::Error> for AuditError {
    fn from(err: csv::Error) -> Self {
        if err.is_io_error() {
            Self::io(err.to_string())
        } else {
            Self::serialization(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AuditError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

//! Unified error types for tcc.
//!
//! This module provides a clean error type that wraps the errors of the
//! internal crates and presents a consistent interface to users.

use tcc_core::ActionError;
use thiserror::Error;

/// All tcc errors.
///
/// Only hard failures are errors. The protocol's soft cases (no active
/// transaction, record already resolved) come back as a
/// [`Resolution`](crate::Resolution) instead.
#[derive(Debug, Error)]
pub enum Error {
    /// No registered handler, or no action compatible with the arguments
    #[error("no action '{action}' on handler '{handler}' compatible with the given arguments")]
    HandlerActionNotFound {
        /// Handler name
        handler: String,
        /// Action name
        action: String,
    },

    /// A participant action failed
    #[error("action '{action}' on handler '{handler}' failed: {source}")]
    ActionFailed {
        /// Handler name
        handler: String,
        /// Action name
        action: String,
        /// Error returned by the action
        #[source]
        source: ActionError,
    },

    /// Participant arguments could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Record or queue store failure, including a damaged log
    #[error("storage error: {0}")]
    Storage(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error("config error: {0}")]
    Config(String),

    /// Internal error (bug or invariant violation)
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for tcc operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error came from a participant's own action.
    pub fn is_action_failure(&self) -> bool {
        matches!(self, Error::ActionFailed { .. })
    }

    /// Check if this is a dispatch lookup failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::HandlerActionNotFound { .. })
    }

    /// Check if this is a serious/unrecoverable error.
    pub fn is_serious(&self) -> bool {
        matches!(self, Error::Internal(_))
    }
}

// Convert from internal core errors
impl From<tcc_core::Error> for Error {
    fn from(e: tcc_core::Error) -> Self {
        use tcc_core::Error as CoreError;
        match e {
            CoreError::HandlerActionNotFound { handler, action } => {
                Error::HandlerActionNotFound { handler, action }
            }
            CoreError::ActionFailed {
                handler,
                action,
                source,
            } => Error::ActionFailed {
                handler,
                action,
                source,
            },
            CoreError::Serialization(msg) => Error::Serialization(msg),
            CoreError::Storage(msg) => Error::Storage(msg),
            CoreError::Corruption(msg) => Error::Storage(format!("corruption: {}", msg)),
            CoreError::Io(io_err) => Error::Io(io_err),
            CoreError::InvalidStateTransition { from, to } => {
                Error::Internal(format!("invalid state transition: {} -> {}", from, to))
            }
            CoreError::InvalidTransactionId(msg) => {
                Error::Internal(format!("invalid transaction id: {}", msg))
            }
        }
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

//! Error types for the coordinator layers
//!
//! Only hard failures are errors. The soft conditions of the protocol (no
//! active context, missing record, record not in `TRYING`) are reported by the
//! coordinator as outcomes and logged; they never surface as [`Error`].

use crate::types::TransactionStatus;
use std::fmt;
use thiserror::Error;

/// Boxed error source carried by [`ActionError`]
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Coordinator errors
#[derive(Debug, Error)]
pub enum Error {
    /// No registered handler, or no action compatible with the arguments
    #[error("no action '{action}' on handler '{handler}' compatible with the given arguments")]
    HandlerActionNotFound {
        /// Handler name the participant was registered under
        handler: String,
        /// Requested action name
        action: String,
    },

    /// A confirm or cancel action returned an error
    #[error("action '{action}' on handler '{handler}' failed: {source}")]
    ActionFailed {
        /// Handler name
        handler: String,
        /// Action name
        action: String,
        /// Underlying participant error
        #[source]
        source: ActionError,
    },

    /// Participant encoding or decoding failed
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Record or queue store failure
    #[error("storage error: {0}")]
    Storage(String),

    /// Durable log is damaged
    #[error("corruption: {0}")]
    Corruption(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Status change outside `TRYING → CONFIRMING | CANCELING`
    #[error("invalid state transition: {from} -> {to}")]
    InvalidStateTransition {
        /// Current status
        from: TransactionStatus,
        /// Requested status
        to: TransactionStatus,
    },

    /// String is not a valid transaction id
    #[error("invalid transaction id: {0}")]
    InvalidTransactionId(String),
}

/// Result type for coordinator operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error came from a participant action
    pub fn is_action_failure(&self) -> bool {
        matches!(self, Error::ActionFailed { .. })
    }

    /// Check if this error is a dispatch lookup failure
    pub fn is_handler_not_found(&self) -> bool {
        matches!(self, Error::HandlerActionNotFound { .. })
    }
}

impl From<rmp_serde::encode::Error> for Error {
    fn from(e: rmp_serde::encode::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for Error {
    fn from(e: rmp_serde::decode::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// Error returned by a participant's try, confirm or cancel action
///
/// Business code builds one from a message or wraps its own error type.
pub struct ActionError {
    message: String,
    source: Option<BoxError>,
}

impl ActionError {
    /// Create an error from a message
    pub fn new(message: impl Into<String>) -> Self {
        ActionError {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap an underlying error, using its display text as the message
    pub fn from_error<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        ActionError {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// The error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Debug for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionError")
            .field("message", &self.message)
            .field("source", &self.source)
            .finish()
    }
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ActionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl From<String> for ActionError {
    fn from(message: String) -> Self {
        ActionError::new(message)
    }
}

impl From<&str> for ActionError {
    fn from(message: &str) -> Self {
        ActionError::new(message)
    }
}

//! Participant descriptors
//!
//! A [`Participant`] is what a successful Try action leaves behind: the name
//! of the handler that owns it, the names of its confirm and cancel actions,
//! and the exact arguments the Try action ran with. Participants are appended
//! to the transaction's queue and never modified afterwards.
//!
//! ## Encoding
//!
//! Participants cross the queue store boundary as MessagePack bytes. Because
//! every argument is a tagged [`Value`], decoding reconstructs each argument
//! with its original kind; no out-of-band type metadata is required.

use crate::error::Result;
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// One unit of work registered into a transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    handler: String,
    confirm_action: String,
    cancel_action: String,
    args: Vec<Value>,
}

impl Participant {
    /// Create a participant descriptor
    pub fn new(
        handler: impl Into<String>,
        confirm_action: impl Into<String>,
        cancel_action: impl Into<String>,
        args: Vec<Value>,
    ) -> Self {
        Participant {
            handler: handler.into(),
            confirm_action: confirm_action.into(),
            cancel_action: cancel_action.into(),
            args,
        }
    }

    /// Logical name of the handler owning the actions
    pub fn handler(&self) -> &str {
        &self.handler
    }

    /// Name of the action invoked on commit
    pub fn confirm_action(&self) -> &str {
        &self.confirm_action
    }

    /// Name of the action invoked on rollback
    pub fn cancel_action(&self) -> &str {
        &self.cancel_action
    }

    /// Arguments recorded from the Try action, in positional order
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Encode to MessagePack bytes
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec(self)?)
    }

    /// Decode from MessagePack bytes produced by [`Participant::encode`]
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

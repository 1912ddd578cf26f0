//! Core types for the TCC coordinator
//!
//! This crate defines the data model shared by every layer:
//! - [`TransactionId`], [`TransactionStatus`], [`TransactionRecord`]: the durable transaction marker
//! - [`Participant`]: one registered unit of work and its confirm/cancel action names
//! - [`Value`]: tagged, type-preserving argument values
//! - [`Error`] / [`ActionError`]: hard failures of the coordinator and of participant actions

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod participant;
pub mod types;
pub mod value;

pub use error::{ActionError, BoxError, Error, Result};
pub use participant::Participant;
pub use types::{
    participant_queue_key, TransactionId, TransactionRecord, TransactionStatus,
    PARTICIPANT_QUEUE_PREFIX, PARTICIPANT_QUEUE_SUFFIX,
};
pub use value::{Value, ValueKind};

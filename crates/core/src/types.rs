//! Core types for the transaction coordinator
//!
//! This module defines the fundamental types used throughout the system:
//! - [`TransactionId`]: Unique identifier for a TCC transaction
//! - [`TransactionStatus`]: Persisted lifecycle state
//! - [`TransactionRecord`]: The durable status marker for one transaction

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Suffix appended to a transaction id to derive its participant queue key
pub const PARTICIPANT_QUEUE_SUFFIX: &str = ":participants";

/// Prefix of every participant queue key
pub const PARTICIPANT_QUEUE_PREFIX: &str = "tcc:tx:";

/// Unique identifier for a transaction
///
/// Generated at `begin` time and used as the primary key of both the
/// record store and (through [`participant_queue_key`]) the queue store.
///
/// # Examples
///
/// ```
/// use tcc_core::TransactionId;
///
/// let id1 = TransactionId::new();
/// let id2 = TransactionId::new();
/// assert_ne!(id1, id2);
///
/// let parsed: TransactionId = id1.to_string().parse().unwrap();
/// assert_eq!(id1, parsed);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransactionId(Uuid);

impl TransactionId {
    /// Create a new random TransactionId using UUID v4
    pub fn new() -> Self {
        TransactionId(Uuid::new_v4())
    }

    /// Create TransactionId from raw bytes
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        TransactionId(Uuid::from_bytes(bytes))
    }

    /// Get raw bytes representation
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TransactionId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(TransactionId)
            .map_err(|e| Error::InvalidTransactionId(format!("{}: {}", s, e)))
    }
}

/// Derive the participant queue key for a transaction
///
/// The key is `tcc:tx:<id>:participants`.
pub fn participant_queue_key(id: &TransactionId) -> String {
    format!("{}{}{}", PARTICIPANT_QUEUE_PREFIX, id, PARTICIPANT_QUEUE_SUFFIX)
}

/// Persisted lifecycle state of a transaction
///
/// Terminal states are not stored: a transaction that finished confirming or
/// canceling has its record deleted.
///
/// ```text
/// TRYING ──commit──▶ CONFIRMING ──(all confirmed)──▶ (removed)
///    │
///    └──rollback──▶ CANCELING ──(sweep finished)──▶ (removed)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionStatus {
    /// Try actions are running and registering participants
    Trying,
    /// Commit started; confirm actions are being dispatched
    Confirming,
    /// Rollback started; cancel actions are being dispatched
    Canceling,
}

impl TransactionStatus {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Trying => "TRYING",
            TransactionStatus::Confirming => "CONFIRMING",
            TransactionStatus::Canceling => "CANCELING",
        }
    }

    /// Check if the transaction can still be committed or rolled back
    pub fn is_trying(&self) -> bool {
        matches!(self, TransactionStatus::Trying)
    }

    /// Check whether `next` is a valid successor of this state
    ///
    /// Only `TRYING → CONFIRMING` and `TRYING → CANCELING` are valid.
    pub fn can_transition_to(&self, next: TransactionStatus) -> bool {
        matches!(
            (self, next),
            (TransactionStatus::Trying, TransactionStatus::Confirming)
                | (TransactionStatus::Trying, TransactionStatus::Canceling)
        )
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Durable status marker for one transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Transaction id (primary key)
    pub id: TransactionId,
    /// Current status
    pub status: TransactionStatus,
    /// When `begin` created the record
    pub created_at: DateTime<Utc>,
}

impl TransactionRecord {
    /// Create a fresh record in `TRYING`, stamped with the current time
    pub fn trying(id: TransactionId) -> Self {
        TransactionRecord {
            id,
            status: TransactionStatus::Trying,
            created_at: Utc::now(),
        }
    }

    /// Move the record to `next`
    ///
    /// Fails with [`Error::InvalidStateTransition`] for anything other than a
    /// move out of `TRYING`; the record is left untouched in that case.
    pub fn transition(&mut self, next: TransactionStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(Error::InvalidStateTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// Age of the record relative to `now`
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.created_at
    }
}

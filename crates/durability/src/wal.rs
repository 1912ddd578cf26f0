//! WAL (Write-Ahead Log) entry types
//!
//! Every mutation of the record store or the participant queue store is
//! appended to the log before it becomes visible in memory:
//! - SaveRecord: Insert or overwrite a transaction record
//! - DeleteRecord: Remove a transaction record
//! - PushParticipant: Append an encoded participant to a queue
//! - DeleteQueue: Remove a whole participant queue
//!
//! Replaying the entries in order rebuilds the exact state of both stores.

use serde::{Deserialize, Serialize};
use tcc_core::{TransactionId, TransactionRecord};

/// WAL entry types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum WalEntry {
    /// Insert or overwrite a transaction record
    SaveRecord(TransactionRecord),

    /// Remove a transaction record
    DeleteRecord {
        /// Transaction whose record is removed
        id: TransactionId,
    },

    /// Append a participant to a queue
    ///
    /// The participant is kept in its encoded form so replay never has to
    /// re-encode arguments.
    PushParticipant {
        /// Queue key
        key: String,
        /// Participant bytes as produced by `Participant::encode`
        participant: Vec<u8>,
    },

    /// Remove a whole queue
    DeleteQueue {
        /// Queue key
        key: String,
    },
}

impl WalEntry {
    /// Get the transaction id for record entries
    pub fn txn_id(&self) -> Option<TransactionId> {
        match self {
            WalEntry::SaveRecord(record) => Some(record.id),
            WalEntry::DeleteRecord { id } => Some(*id),
            _ => None,
        }
    }

    /// Get the queue key for queue entries
    pub fn queue_key(&self) -> Option<&str> {
        match self {
            WalEntry::PushParticipant { key, .. } | WalEntry::DeleteQueue { key } => Some(key),
            _ => None,
        }
    }

    /// Check if entry removes state
    pub fn is_delete(&self) -> bool {
        matches!(
            self,
            WalEntry::DeleteRecord { .. } | WalEntry::DeleteQueue { .. }
        )
    }
}

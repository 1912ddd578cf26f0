//! Store contracts
//!
//! Both stores are keyed by strings derived from the transaction id and are
//! written by a single coordinator per key. Implementations must tolerate
//! concurrent access across distinct keys; concurrent writers to the same key
//! are not a supported pattern.

use tcc_core::{Participant, Result, TransactionId, TransactionRecord};

/// Durable mapping from transaction id to its status record
///
/// Writes must be immediately visible to subsequent reads on the same store.
pub trait RecordStore: Send + Sync {
    /// Insert or overwrite the record under `record.id`
    fn save(&self, record: &TransactionRecord) -> Result<()>;

    /// Look up a record
    fn find_by_id(&self, id: &TransactionId) -> Result<Option<TransactionRecord>>;

    /// Remove a record; removing an absent id is not an error
    fn delete_by_id(&self, id: &TransactionId) -> Result<()>;

    /// All records currently stored, oldest first
    ///
    /// Every stored record belongs to an unresolved transaction, so this is
    /// how an operator finds transactions stranded in a non-terminal state.
    fn list(&self) -> Result<Vec<TransactionRecord>>;
}

/// Ordered, append-only participant lists
///
/// `read_all` returns participants in exactly the order they were pushed,
/// with every argument decoded to its original kind.
pub trait QueueStore: Send + Sync {
    /// Append a participant to the end of the list under `key`
    fn push_back(&self, key: &str, participant: &Participant) -> Result<()>;

    /// Read the whole list under `key`; an absent key yields an empty list
    fn read_all(&self, key: &str) -> Result<Vec<Participant>>;

    /// Remove the list under `key`; removing an absent key is not an error
    fn delete_key(&self, key: &str) -> Result<()>;
}

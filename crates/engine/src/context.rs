//! Transaction context
//!
//! Carries the active transaction id through one logical call chain. The
//! caller owns the value and passes it down by reference; there is no
//! thread-local or global state. One context holds at most one transaction
//! at a time.

use tcc_core::TransactionId;

/// The transaction (if any) the current call chain belongs to
#[derive(Debug, Default, PartialEq, Eq)]
pub struct TransactionContext {
    current: Option<TransactionId>,
}

impl TransactionContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `id` the active transaction
    pub fn set(&mut self, id: TransactionId) {
        self.current = Some(id);
    }

    /// Get the active transaction id
    pub fn get(&self) -> Option<&TransactionId> {
        self.current.as_ref()
    }

    /// Drop the active transaction id
    pub fn clear(&mut self) {
        self.current = None;
    }

    /// Check if a transaction is active
    pub fn is_active(&self) -> bool {
        self.current.is_some()
    }
}

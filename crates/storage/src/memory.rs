//! In-memory stores
//!
//! DashMap-sharded implementations of [`RecordStore`] and [`QueueStore`].
//! Different transactions land on different shards and never contend.
//!
//! # Design
//!
//! - Records are kept as plain values keyed by [`TransactionId`]
//! - Queues keep each participant *encoded*, so reads go through the same
//!   decode path an external store would and argument kinds are checked
//!   on every round trip
//!
//! Nothing survives process exit. Use the durable store for that.

use crate::traits::{QueueStore, RecordStore};
use dashmap::DashMap;
use tcc_core::{Participant, Result, TransactionId, TransactionRecord};

/// In-memory [`RecordStore`]
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: DashMap<TransactionId, TransactionRecord>,
}

impl InMemoryRecordStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the store holds no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl RecordStore for InMemoryRecordStore {
    fn save(&self, record: &TransactionRecord) -> Result<()> {
        self.records.insert(record.id, record.clone());
        Ok(())
    }

    fn find_by_id(&self, id: &TransactionId) -> Result<Option<TransactionRecord>> {
        Ok(self.records.get(id).map(|entry| entry.value().clone()))
    }

    fn delete_by_id(&self, id: &TransactionId) -> Result<()> {
        self.records.remove(id);
        Ok(())
    }

    fn list(&self) -> Result<Vec<TransactionRecord>> {
        let mut records: Vec<_> = self
            .records
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(records)
    }
}

/// In-memory [`QueueStore`]
#[derive(Debug, Default)]
pub struct InMemoryQueueStore {
    queues: DashMap<String, Vec<Vec<u8>>>,
}

impl InMemoryQueueStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of participants queued under `key`
    pub fn queue_len(&self, key: &str) -> usize {
        self.queues.get(key).map(|q| q.len()).unwrap_or(0)
    }

    /// Check if a queue exists under `key`
    pub fn contains_key(&self, key: &str) -> bool {
        self.queues.contains_key(key)
    }

    /// Number of live queues
    pub fn queue_count(&self) -> usize {
        self.queues.len()
    }
}

impl QueueStore for InMemoryQueueStore {
    fn push_back(&self, key: &str, participant: &Participant) -> Result<()> {
        let encoded = participant.encode()?;
        self.queues
            .entry(key.to_string())
            .or_default()
            .push(encoded);
        Ok(())
    }

    fn read_all(&self, key: &str) -> Result<Vec<Participant>> {
        // Copy the bytes out first so no shard lock is held while decoding
        let encoded = match self.queues.get(key) {
            Some(queue) => queue.value().clone(),
            None => return Ok(Vec::new()),
        };
        encoded.iter().map(|bytes| Participant::decode(bytes)).collect()
    }

    fn delete_key(&self, key: &str) -> Result<()> {
        self.queues.remove(key);
        Ok(())
    }
}

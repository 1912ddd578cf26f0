//! Storage layer for the TCC coordinator
//!
//! This crate defines the two store contracts the coordinator depends on and
//! ships in-memory implementations of both:
//! - [`RecordStore`]: transaction id → [`TransactionRecord`](tcc_core::TransactionRecord)
//! - [`QueueStore`]: derived key → ordered, append-only participant list
//! - [`InMemoryRecordStore`] / [`InMemoryQueueStore`]: DashMap-sharded stores
//!
//! Durable, restart-surviving implementations live in `tcc-durability`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod memory;
pub mod traits;

pub use memory::{InMemoryQueueStore, InMemoryRecordStore};
pub use traits::{QueueStore, RecordStore};

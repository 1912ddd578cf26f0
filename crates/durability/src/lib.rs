//! Durability layer for tcc
//!
//! This crate makes transaction records and participant queues survive a
//! restart:
//! - WalEntry types: SaveRecord, DeleteRecord, PushParticipant, DeleteQueue
//! - Entry encoding/decoding with CRC32 checksums
//! - Durability modes: None, Buffered (default), Strict
//! - FileStore: log-backed record and queue store with replay on open,
//!   torn-tail truncation, and compaction

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod encoding;
pub mod mode;
pub mod store;
pub mod wal;

pub use encoding::{decode_entry, encode_entry, DecodeError};
pub use mode::DurabilityMode;
pub use store::{FileStore, RecoveryStats, LOG_FILENAME};
pub use wal::WalEntry;

//! # tcc
//!
//! Try-Confirm-Cancel transaction coordinator.
//!
//! tcc gives an all-or-nothing outcome to a business operation that spans
//! several independently committing participants. Each participant first
//! reserves (Try), then is told to finalize (Confirm) or release (Cancel).
//!
//! ## Quick Start
//!
//! ```ignore
//! use tcc::prelude::*;
//!
//! let tcc = Tcc::open("./tcc-data")?;
//! tcc.register_service(wallet.clone());
//!
//! tcc.global_transaction(|ctx| {
//!     wallet.try_deduct(&tcc, ctx, "alice", amount)?;
//!     wallet.try_credit(&tcc, ctx, "bob", amount)?;
//!     Ok::<_, tcc::Error>(())
//! })?;
//! ```
//!
//! ## Guarantees
//!
//! - Commit confirms participants in registration order and stops at the
//!   first failure, leaving the transaction recorded as CONFIRMING
//! - Rollback cancels in reverse order, skips failures, and always cleans up
//! - Participant arguments keep their exact kind through storage
//!
//! Transactions stranded by a crash are never finalized automatically. Use
//! [`Tcc::pending_transactions`] to find them.

#![warn(missing_docs)]

mod config;
mod error;
mod tcc;

pub mod prelude;

// Re-export main entry points
pub use crate::tcc::{Tcc, TccBuilder};
pub use config::TccConfig;
pub use error::{Error, Result};

// Re-export building blocks
pub use tcc_core::{
    participant_queue_key, ActionError, Participant, TransactionId, TransactionRecord,
    TransactionStatus, Value, ValueKind,
};
pub use tcc_durability::{DurabilityMode, FileStore, RecoveryStats};
pub use tcc_engine::{
    resolve_action, Action, ActionRegistry, Args, BoundAction, CoordinatorMetrics, Handler,
    HandlerBuilder, ParamType, Resolution, TccAction, TccService, TransactionContext,
    TransactionCoordinator,
};
pub use tcc_storage::{InMemoryQueueStore, InMemoryRecordStore, QueueStore, RecordStore};

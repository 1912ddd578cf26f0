//! Convenient imports for tcc.
//!
//! ```ignore
//! use tcc::prelude::*;
//!
//! let tcc = Tcc::ephemeral();
//! ```

// Main entry point
pub use crate::tcc::{Tcc, TccBuilder};
pub use crate::config::TccConfig;

// Error handling
pub use crate::error::{Error, Result};
pub use tcc_core::ActionError;

// Participant declaration
pub use tcc_engine::{Args, Handler, ParamType, TccAction, TccService};

// Transaction flow
pub use tcc_engine::{Resolution, TransactionContext};

// Core types
pub use tcc_core::{Participant, TransactionId, TransactionStatus, Value};

pub use tcc_durability::DurabilityMode;

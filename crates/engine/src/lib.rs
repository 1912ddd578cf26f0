//! Coordinator engine for tcc
//!
//! This crate drives the Try-Confirm-Cancel protocol:
//! - TransactionContext: the active transaction id, threaded explicitly
//! - ActionRegistry: handler name → actions, with argument-kind matching
//! - TransactionCoordinator: begin / register / commit / rollback
//! - TccAction + try_action: register a participant after a successful try
//! - CoordinatorMetrics: lifecycle counters

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod action;
pub mod context;
pub mod coordinator;
pub mod metrics;
pub mod registry;

pub use action::TccAction;
pub use context::TransactionContext;
pub use coordinator::{Resolution, TransactionCoordinator};
pub use metrics::CoordinatorMetrics;
pub use registry::{
    resolve_action, Action, ActionFn, ActionRegistry, Args, BoundAction, Handler, HandlerBuilder,
    ParamType, TccService,
};

//! Transaction coordinator
//!
//! Drives one transaction from `begin` to resolution:
//!
//! ```text
//!            begin
//!              │
//!              ▼
//!   TRYING ──commit──▶ CONFIRMING ──(all confirms ok)──▶ (removed)
//!     │                    │
//!     │                    └──(confirm fails)──▶ stays CONFIRMING, error returned
//!     │
//!     └──rollback──▶ CANCELING ──(sweep finished)──▶ (removed)
//! ```
//!
//! ## Commit Sequence
//!
//! ```text
//! 1. Read the context; none → NoContext
//! 2. Load the record; absent → RecordNotFound, not TRYING → AlreadyProcessed
//! 3. Persist CONFIRMING
//! 4. Confirm each participant in registration order; first failure aborts
//! 5. Delete record and queue
//! ```
//!
//! Rollback follows the same guards, persists CANCELING, cancels in reverse
//! registration order, and keeps going past failures so the record and queue
//! are always deleted at the end of the sweep.
//!
//! The context is cleared on every exit from `commit` and `rollback`,
//! including early returns, errors, and unwinding out of an action.
//!
//! Nothing here retries or recovers a transaction stranded in CONFIRMING or
//! CANCELING. [`TransactionCoordinator::pending_transactions`] lists them for
//! an operator.

use crate::context::TransactionContext;
use crate::metrics::{CoordinatorMetrics, Counters};
use crate::registry::ActionRegistry;
use std::sync::Arc;
use tcc_core::{
    participant_queue_key, Participant, Result, TransactionId, TransactionRecord,
    TransactionStatus,
};
use tcc_storage::{QueueStore, RecordStore};
use tracing::{error, info, warn};

/// How a `commit` or `rollback` call ended, when it did not fail
///
/// Only the first two variants mean the call did work. The rest are the
/// protocol's no-op cases and have already been logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Every participant confirmed; record and queue deleted
    Committed {
        /// Participants confirmed
        participants: usize,
    },

    /// Cancel sweep finished; record and queue deleted
    RolledBack {
        /// Participants swept
        participants: usize,
        /// Cancels that failed and were skipped
        failures: usize,
    },

    /// No transaction active on the context
    NoContext,

    /// The context named a transaction with no record
    RecordNotFound(TransactionId),

    /// The record is no longer in TRYING
    AlreadyProcessed {
        /// Transaction id
        id: TransactionId,
        /// Status found
        status: TransactionStatus,
    },
}

impl Resolution {
    /// Check if the call committed the transaction
    pub fn is_committed(&self) -> bool {
        matches!(self, Resolution::Committed { .. })
    }

    /// Check if the call rolled the transaction back
    pub fn is_rolled_back(&self) -> bool {
        matches!(self, Resolution::RolledBack { .. })
    }

    /// Check if the call did nothing
    pub fn is_noop(&self) -> bool {
        !self.is_committed() && !self.is_rolled_back()
    }
}

/// Clears the context when dropped
struct ContextGuard<'a> {
    ctx: &'a mut TransactionContext,
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        self.ctx.clear();
    }
}

/// Try-Confirm-Cancel coordinator
///
/// Owns no transaction state itself: records and queues live in the stores,
/// the active id lives in the caller's [`TransactionContext`]. One
/// coordinator can serve any number of call chains concurrently as long as
/// each has its own context.
pub struct TransactionCoordinator {
    records: Arc<dyn RecordStore>,
    queue: Arc<dyn QueueStore>,
    registry: Arc<ActionRegistry>,
    counters: Counters,
}

impl TransactionCoordinator {
    /// Create a coordinator over the given stores and registry
    pub fn new(
        records: Arc<dyn RecordStore>,
        queue: Arc<dyn QueueStore>,
        registry: Arc<ActionRegistry>,
    ) -> Self {
        TransactionCoordinator {
            records,
            queue,
            registry,
            counters: Counters::default(),
        }
    }

    /// Registry used to dispatch confirm and cancel actions
    pub fn registry(&self) -> &Arc<ActionRegistry> {
        &self.registry
    }

    /// Start a transaction on `ctx`
    ///
    /// Persists a TRYING record, then sets the context. A context that already
    /// holds a transaction keeps it: nesting is not supported, so the call
    /// logs a warning and returns the existing id.
    pub fn begin(&self, ctx: &mut TransactionContext) -> Result<TransactionId> {
        if let Some(id) = ctx.get() {
            warn!(txn_id = %id, "Transaction already active on this context, not starting another");
            return Ok(*id);
        }

        let id = TransactionId::new();
        self.records.save(&TransactionRecord::trying(id))?;
        ctx.set(id);
        self.counters.record_begin();

        info!(txn_id = %id, "Transaction started");
        Ok(id)
    }

    /// Append a participant to the active transaction's queue
    ///
    /// With no active transaction this is a logged no-op, so participant
    /// actions also work outside a transaction.
    pub fn register_participant(
        &self,
        ctx: &TransactionContext,
        participant: Participant,
    ) -> Result<()> {
        let id = match ctx.get() {
            Some(id) => id,
            None => {
                warn!(
                    handler = %participant.handler(),
                    "No active transaction, participant not registered"
                );
                return Ok(());
            }
        };

        self.queue
            .push_back(&participant_queue_key(id), &participant)?;

        info!(
            txn_id = %id,
            handler = %participant.handler(),
            confirm = %participant.confirm_action(),
            cancel = %participant.cancel_action(),
            "Participant registered"
        );
        Ok(())
    }

    /// Confirm every participant of the active transaction
    ///
    /// A failing confirm (or a participant whose action cannot be resolved)
    /// stops the dispatch and is returned; the record stays in CONFIRMING
    /// and the queue is kept.
    pub fn commit(&self, ctx: &mut TransactionContext) -> Result<Resolution> {
        let id = ctx.get().copied();
        let _guard = ContextGuard { ctx };

        let mut record = match self.load_trying(id, "commit")? {
            Ok(record) => record,
            Err(resolution) => return Ok(resolution),
        };
        let id = record.id;

        record.transition(TransactionStatus::Confirming)?;
        self.records.save(&record)?;

        let key = participant_queue_key(&id);
        let participants = self.load_participants(&id, &key)?;

        for (index, participant) in participants.iter().enumerate() {
            if let Err(e) = self.dispatch(participant, participant.confirm_action()) {
                self.counters.record_confirm_failure();
                error!(
                    txn_id = %id,
                    index = index,
                    handler = %participant.handler(),
                    action = %participant.confirm_action(),
                    error = %e,
                    "Confirm failed, transaction left in CONFIRMING"
                );
                return Err(e);
            }
        }

        self.records.delete_by_id(&id)?;
        self.queue.delete_key(&key)?;
        self.counters.record_commit();

        info!(txn_id = %id, participants = participants.len(), "Transaction committed");
        Ok(Resolution::Committed {
            participants: participants.len(),
        })
    }

    /// Cancel every participant of the active transaction, newest first
    ///
    /// A failing cancel is logged and skipped. Once the sweep finishes the
    /// record and queue are deleted whatever the individual outcomes were.
    pub fn rollback(&self, ctx: &mut TransactionContext) -> Result<Resolution> {
        let id = ctx.get().copied();
        let _guard = ContextGuard { ctx };

        let mut record = match self.load_trying(id, "rollback")? {
            Ok(record) => record,
            Err(resolution) => return Ok(resolution),
        };
        let id = record.id;

        record.transition(TransactionStatus::Canceling)?;
        self.records.save(&record)?;

        let key = participant_queue_key(&id);
        let participants = self.load_participants(&id, &key)?;

        let mut failures = 0usize;
        for (index, participant) in participants.iter().enumerate().rev() {
            if let Err(e) = self.dispatch(participant, participant.cancel_action()) {
                failures += 1;
                error!(
                    txn_id = %id,
                    index = index,
                    handler = %participant.handler(),
                    action = %participant.cancel_action(),
                    error = %e,
                    "Cancel failed, continuing with remaining participants"
                );
            }
        }

        self.records.delete_by_id(&id)?;
        self.queue.delete_key(&key)?;
        self.counters.record_rollback(failures as u64);

        if failures > 0 {
            warn!(
                txn_id = %id,
                participants = participants.len(),
                failures = failures,
                "Transaction rolled back with failed cancels"
            );
        } else {
            info!(txn_id = %id, participants = participants.len(), "Transaction rolled back");
        }
        Ok(Resolution::RolledBack {
            participants: participants.len(),
            failures,
        })
    }

    /// Records of every unresolved transaction, oldest first
    ///
    /// Includes transactions still running. A record that stays in
    /// CONFIRMING or CANCELING will not be touched again by the coordinator.
    pub fn pending_transactions(&self) -> Result<Vec<TransactionRecord>> {
        self.records.list()
    }

    /// Participants queued for a transaction, in registration order
    pub fn participants(&self, id: &TransactionId) -> Result<Vec<Participant>> {
        self.queue.read_all(&participant_queue_key(id))
    }

    /// Snapshot of lifecycle counters
    pub fn metrics(&self) -> CoordinatorMetrics {
        self.counters.snapshot()
    }

    /// Shared guards of commit and rollback
    ///
    /// The inner `Err` carries the no-op outcome to return.
    fn load_trying(
        &self,
        id: Option<TransactionId>,
        operation: &str,
    ) -> Result<std::result::Result<TransactionRecord, Resolution>> {
        let id = match id {
            Some(id) => id,
            None => {
                warn!(operation = operation, "No active transaction, nothing to do");
                return Ok(Err(Resolution::NoContext));
            }
        };

        let record = match self.records.find_by_id(&id)? {
            Some(record) => record,
            None => {
                error!(txn_id = %id, operation = operation, "Transaction record not found");
                return Ok(Err(Resolution::RecordNotFound(id)));
            }
        };

        if !record.status.is_trying() {
            warn!(
                txn_id = %id,
                operation = operation,
                status = %record.status,
                "Transaction already processed or in flight"
            );
            return Ok(Err(Resolution::AlreadyProcessed {
                id,
                status: record.status,
            }));
        }

        Ok(Ok(record))
    }

    fn load_participants(&self, id: &TransactionId, key: &str) -> Result<Vec<Participant>> {
        let participants = self.queue.read_all(key)?;
        if participants.is_empty() {
            warn!(txn_id = %id, "Transaction has no participants");
        }
        Ok(participants)
    }

    fn dispatch(&self, participant: &Participant, action: &str) -> Result<()> {
        self.registry
            .resolve(participant.handler(), action, participant.args())?
            .invoke(participant.args())
    }
}

impl std::fmt::Debug for TransactionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionCoordinator")
            .field("handlers", &self.registry.handler_names())
            .field("metrics", &self.metrics())
            .finish()
    }
}

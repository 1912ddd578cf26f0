//! Try-phase wrapper
//!
//! A business try method declares its confirm and cancel counterparts as a
//! [`TccAction`] next to it, then runs its body through
//! [`TransactionCoordinator::try_action`]. The participant is registered only
//! after the body succeeds, with the exact arguments the try ran with.
//!
//! ```ignore
//! const DEDUCT: TccAction = TccAction::new("walletService", "confirmDeduct", "cancelDeduct");
//!
//! fn try_deduct(&self, ctx: &TransactionContext, user: &str, amount: Decimal) -> Result<(), Error> {
//!     self.coordinator.try_action(ctx, &DEDUCT, vec![user.into(), amount.into()], || {
//!         self.freeze(user, amount)
//!     })
//! }
//! ```

use crate::context::TransactionContext;
use crate::coordinator::TransactionCoordinator;
use tcc_core::{Participant, Value};

/// Static participant metadata of a try method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TccAction {
    /// Handler the confirm and cancel actions are registered under
    pub handler: &'static str,
    /// Action run on commit
    pub confirm: &'static str,
    /// Action run on rollback
    pub cancel: &'static str,
}

impl TccAction {
    /// Declare a try method's counterparts
    pub const fn new(handler: &'static str, confirm: &'static str, cancel: &'static str) -> Self {
        TccAction {
            handler,
            confirm,
            cancel,
        }
    }

    /// Participant descriptor for one invocation
    pub fn participant(&self, args: Vec<Value>) -> Participant {
        Participant::new(self.handler, self.confirm, self.cancel, args)
    }
}

impl TransactionCoordinator {
    /// Run a try body and register its participant if it succeeds
    ///
    /// An error from `body` is returned as is and nothing is registered.
    /// With no active transaction the body still runs and registration is a
    /// logged no-op. A registration failure is converted into `E`.
    pub fn try_action<T, E, F>(
        &self,
        ctx: &TransactionContext,
        action: &TccAction,
        args: Vec<Value>,
        body: F,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<tcc_core::Error>,
    {
        let output = body()?;
        self.register_participant(ctx, action.participant(args))?;
        Ok(output)
    }
}

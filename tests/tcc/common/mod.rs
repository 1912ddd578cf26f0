//! Shared fixtures for integration tests
//!
//! - `Recorder`: handlers that log every confirm/cancel call, optionally failing
//! - `WalletService`: debit/credit over balance + frozen balance
//! - `TestDir`: a temp directory for durable coordinators

#![allow(dead_code)]

pub use parking_lot::Mutex;
pub use rust_decimal::Decimal;
pub use std::sync::Arc;
pub use tcc::prelude::*;
pub use tcc::{participant_queue_key, TransactionRecord};

use std::collections::HashMap;
use std::path::Path;
use tempfile::TempDir;

/// Install a log subscriber once; output only shows for failing tests
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("tcc=debug,tcc_engine=debug,tcc_durability=debug")
        .try_init();
}

// ============================================================================
// Recorder
// ============================================================================

/// Builds handlers whose actions log `handler.action(arg)`
#[derive(Clone, Default)]
pub struct Recorder {
    log: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handler `name` with `confirm` and `cancel`, each taking one string
    ///
    /// Actions listed in `failing` log the call and then return an error.
    pub fn handler(&self, name: &str, failing: &[&str]) -> Handler {
        let mut builder = Handler::builder(name);
        for action in ["confirm", "cancel"] {
            let log = Arc::clone(&self.log);
            let label = format!("{}.{}", name, action);
            let fails = failing.contains(&action);
            builder = builder.action(action, &[ParamType::String], move |args| {
                log.lock().push(format!("{}({})", label, args.str(0)?));
                if fails {
                    Err(ActionError::new(format!("{} refused", label)))
                } else {
                    Ok(())
                }
            });
        }
        builder.build()
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.lock().clone()
    }
}

/// Participant for a `Recorder` handler
pub fn participant(handler: &str, arg: &str) -> Participant {
    Participant::new(handler, "confirm", "cancel", vec![Value::from(arg)])
}

// ============================================================================
// Wallet
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Wallet {
    pub balance: Decimal,
    pub frozen: Decimal,
}

/// Errors a payment can fail with
#[derive(Debug)]
pub enum PaymentError {
    InsufficientBalance,
    UnknownAccount(String),
    Tcc(tcc::Error),
}

impl From<tcc::Error> for PaymentError {
    fn from(e: tcc::Error) -> Self {
        PaymentError::Tcc(e)
    }
}

/// Debit/credit participant over balance + frozen balance
///
/// Try moves money into `frozen`; confirm settles it; cancel releases it.
pub struct WalletService {
    wallets: Mutex<HashMap<String, Wallet>>,
}

impl WalletService {
    pub const DEDUCT: TccAction = TccAction::new("walletService", "confirmDeduct", "cancelDeduct");
    pub const CREDIT: TccAction = TccAction::new("walletService", "confirmCredit", "cancelCredit");

    pub fn new() -> Arc<Self> {
        Arc::new(WalletService {
            wallets: Mutex::new(HashMap::new()),
        })
    }

    pub fn open_account(&self, owner: &str, balance: Decimal) {
        self.wallets.lock().insert(
            owner.to_string(),
            Wallet {
                balance,
                frozen: Decimal::ZERO,
            },
        );
    }

    pub fn wallet(&self, owner: &str) -> Option<Wallet> {
        self.wallets.lock().get(owner).copied()
    }

    pub fn try_deduct(
        &self,
        tcc: &Tcc,
        ctx: &TransactionContext,
        owner: &str,
        amount: Decimal,
    ) -> std::result::Result<(), PaymentError> {
        tcc.try_action(ctx, &Self::DEDUCT, vec![owner.into(), amount.into()], || {
            let mut wallets = self.wallets.lock();
            let wallet = wallets
                .get_mut(owner)
                .ok_or_else(|| PaymentError::UnknownAccount(owner.to_string()))?;
            if wallet.balance < amount {
                return Err(PaymentError::InsufficientBalance);
            }
            wallet.balance -= amount;
            wallet.frozen += amount;
            Ok(())
        })
    }

    pub fn try_credit(
        &self,
        tcc: &Tcc,
        ctx: &TransactionContext,
        owner: &str,
        amount: Decimal,
    ) -> std::result::Result<(), PaymentError> {
        tcc.try_action(ctx, &Self::CREDIT, vec![owner.into(), amount.into()], || {
            let mut wallets = self.wallets.lock();
            let wallet = wallets
                .get_mut(owner)
                .ok_or_else(|| PaymentError::UnknownAccount(owner.to_string()))?;
            wallet.frozen += amount;
            Ok(())
        })
    }

    /// Move `amount` from `payer` to `payee` as one global transaction
    pub fn process_payment(
        &self,
        tcc: &Tcc,
        payer: &str,
        payee: &str,
        amount: Decimal,
    ) -> std::result::Result<(), PaymentError> {
        tcc.global_transaction(|ctx| {
            self.try_deduct(tcc, ctx, payer, amount)?;
            self.try_credit(tcc, ctx, payee, amount)?;
            Ok(())
        })
    }

    fn with_wallet(
        &self,
        owner: &str,
        f: impl FnOnce(&mut Wallet) -> std::result::Result<(), ActionError>,
    ) -> std::result::Result<(), ActionError> {
        let mut wallets = self.wallets.lock();
        let wallet = wallets
            .get_mut(owner)
            .ok_or_else(|| ActionError::new(format!("no wallet for {}", owner)))?;
        f(wallet)
    }

    fn confirm_deduct(&self, owner: &str, amount: Decimal) -> std::result::Result<(), ActionError> {
        self.with_wallet(owner, |w| {
            if w.frozen < amount {
                return Err(ActionError::new("No frozen balance to confirm"));
            }
            w.frozen -= amount;
            Ok(())
        })
    }

    fn cancel_deduct(&self, owner: &str, amount: Decimal) -> std::result::Result<(), ActionError> {
        self.with_wallet(owner, |w| {
            if w.frozen < amount {
                return Err(ActionError::new("No frozen balance to cancel"));
            }
            w.frozen -= amount;
            w.balance += amount;
            Ok(())
        })
    }

    fn confirm_credit(&self, owner: &str, amount: Decimal) -> std::result::Result<(), ActionError> {
        self.with_wallet(owner, |w| {
            w.frozen -= amount;
            w.balance += amount;
            Ok(())
        })
    }

    fn cancel_credit(&self, owner: &str, amount: Decimal) -> std::result::Result<(), ActionError> {
        self.with_wallet(owner, |w| {
            w.frozen -= amount;
            Ok(())
        })
    }
}

impl TccService for WalletService {
    fn handler_name(&self) -> &str {
        "walletService"
    }

    fn handler(self: Arc<Self>) -> Handler {
        let params = [ParamType::String, ParamType::Number];
        let (a, b, c, d) = (
            Arc::clone(&self),
            Arc::clone(&self),
            Arc::clone(&self),
            Arc::clone(&self),
        );
        Handler::builder("walletService")
            .action("confirmDeduct", &params, move |args| {
                a.confirm_deduct(args.str(0)?, args.decimal(1)?)
            })
            .action("cancelDeduct", &params, move |args| {
                b.cancel_deduct(args.str(0)?, args.decimal(1)?)
            })
            .action("confirmCredit", &params, move |args| {
                c.confirm_credit(args.str(0)?, args.decimal(1)?)
            })
            .action("cancelCredit", &params, move |args| {
                d.cancel_credit(args.str(0)?, args.decimal(1)?)
            })
            .build()
    }
}

// ============================================================================
// Durable coordinators
// ============================================================================

/// Temp directory for a durable coordinator
pub struct TestDir {
    dir: TempDir,
}

impl TestDir {
    pub fn new() -> Self {
        TestDir {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Open a strict coordinator here with `handlers` registered
    pub fn open(&self, handlers: Vec<Handler>) -> Tcc {
        let mut builder = Tcc::builder().path(self.path()).strict();
        for handler in handlers {
            builder = builder.handler(handler);
        }
        builder.open().unwrap()
    }
}

/// Run `f` against an ephemeral, a buffered and a strict coordinator and
/// check every mode produces the same result
pub fn test_across_modes<T, F>(test_name: &str, f: F)
where
    T: PartialEq + std::fmt::Debug,
    F: Fn(&Tcc) -> T,
{
    let ephemeral = f(&Tcc::ephemeral());

    let buffered_dir = TestDir::new();
    let buffered = f(&Tcc::builder()
        .path(buffered_dir.path())
        .buffered()
        .open()
        .unwrap());

    let strict_dir = TestDir::new();
    let strict = f(&Tcc::builder()
        .path(strict_dir.path())
        .strict()
        .open()
        .unwrap());

    assert_eq!(ephemeral, buffered, "{}: ephemeral vs buffered", test_name);
    assert_eq!(ephemeral, strict, "{}: ephemeral vs strict", test_name);
}

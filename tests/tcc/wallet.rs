//! Wallet Payment Tests
//!
//! Debit one account and credit another as one global transaction, with the
//! try step freezing funds and confirm/cancel settling or releasing them.

use crate::common::*;

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn setup() -> (Tcc, Arc<WalletService>) {
    init_tracing();
    let wallet = WalletService::new();
    wallet.open_account("alice", dec("100.00"));
    wallet.open_account("bob", dec("5.00"));
    let tcc = Tcc::builder().service(Arc::clone(&wallet)).open().unwrap();
    (tcc, wallet)
}

fn settled(balance: &str) -> Wallet {
    Wallet {
        balance: dec(balance),
        frozen: Decimal::ZERO,
    }
}

#[test]
fn payment_moves_funds() {
    let (tcc, wallet) = setup();

    wallet
        .process_payment(&tcc, "alice", "bob", dec("30.50"))
        .unwrap();

    assert_eq!(wallet.wallet("alice"), Some(settled("69.50")));
    assert_eq!(wallet.wallet("bob"), Some(settled("35.50")));
    assert_eq!(tcc.metrics().committed, 1);
    assert!(tcc.pending_transactions().unwrap().is_empty());
}

#[test]
fn insufficient_balance_changes_nothing() {
    let (tcc, wallet) = setup();

    let err = wallet
        .process_payment(&tcc, "alice", "bob", dec("250"))
        .unwrap_err();

    assert!(matches!(err, PaymentError::InsufficientBalance));
    assert_eq!(wallet.wallet("alice"), Some(settled("100.00")));
    assert_eq!(wallet.wallet("bob"), Some(settled("5.00")));
    assert_eq!(tcc.metrics().rolled_back, 1);
}

#[test]
fn failed_credit_try_releases_deduction() {
    let (tcc, wallet) = setup();

    let err = wallet
        .process_payment(&tcc, "alice", "carol", dec("40"))
        .unwrap_err();

    assert!(matches!(err, PaymentError::UnknownAccount(ref who) if who == "carol"));
    assert_eq!(wallet.wallet("alice"), Some(settled("100.00")));
    assert!(tcc.pending_transactions().unwrap().is_empty());
}

#[test]
fn confirm_failure_leaves_transaction_confirming() {
    let (tcc, wallet) = setup();
    let mut ctx = TransactionContext::new();
    let id = tcc.begin(&mut ctx).unwrap();
    wallet.try_deduct(&tcc, &ctx, "alice", dec("20")).unwrap();
    wallet.try_credit(&tcc, &ctx, "bob", dec("20")).unwrap();

    // Frozen funds disappear before commit
    wallet.open_account("alice", dec("80"));

    let err = tcc.commit(&mut ctx).unwrap_err();

    assert!(err.is_action_failure());
    assert!(err.to_string().contains("No frozen balance to confirm"));
    // Credit was never confirmed
    assert_eq!(
        wallet.wallet("bob"),
        Some(Wallet {
            balance: dec("5.00"),
            frozen: dec("20"),
        })
    );
    let pending = tcc.pending_transactions().unwrap();
    assert_eq!(pending[0].id, id);
    assert_eq!(pending[0].status, TransactionStatus::Confirming);
    assert_eq!(tcc.participants(&id).unwrap().len(), 2);
}

#[test]
fn try_outside_transaction_still_runs() {
    let (tcc, wallet) = setup();
    let ctx = TransactionContext::new();

    wallet.try_deduct(&tcc, &ctx, "alice", dec("10")).unwrap();

    assert_eq!(
        wallet.wallet("alice"),
        Some(Wallet {
            balance: dec("90.00"),
            frozen: dec("10"),
        })
    );
    assert!(tcc.pending_transactions().unwrap().is_empty());
}

#[test]
fn queued_arguments_keep_decimal_scale() {
    let (tcc, wallet) = setup();
    let mut ctx = TransactionContext::new();
    let id = tcc.begin(&mut ctx).unwrap();
    wallet.try_deduct(&tcc, &ctx, "alice", dec("12.50")).unwrap();

    let queued = tcc.participants(&id).unwrap();

    assert_eq!(queued[0].handler(), "walletService");
    assert_eq!(queued[0].confirm_action(), "confirmDeduct");
    assert_eq!(queued[0].args()[0], Value::from("alice"));
    let amount = queued[0].args()[1].as_decimal().unwrap();
    assert_eq!(amount.to_string(), "12.50");
    assert_eq!(amount.scale(), 2);

    tcc.rollback(&mut ctx).unwrap();
}

//! Durability Tests
//!
//! Unresolved transactions and their participants survive a restart; modes
//! differ only in persistence, never in outcome.

use crate::common::*;

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

// ============================================================================
// Restart survival
// ============================================================================

#[test]
fn in_flight_transaction_survives_restart() {
    init_tracing();
    let dir = TestDir::new();
    let wallet = WalletService::new();
    wallet.open_account("alice", dec("100.00"));
    wallet.open_account("bob", dec("0"));

    let id = {
        let tcc = dir.open(vec![]);
        tcc.register_service(Arc::clone(&wallet));
        let mut ctx = TransactionContext::new();
        let id = tcc.begin(&mut ctx).unwrap();
        wallet.try_deduct(&tcc, &ctx, "alice", dec("30.50")).unwrap();
        wallet.try_credit(&tcc, &ctx, "bob", dec("30.50")).unwrap();
        // Process dies before commit or rollback
        id
    };

    let tcc = dir.open(vec![]);
    tcc.register_service(Arc::clone(&wallet));

    let pending = tcc.pending_transactions().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, id);
    assert_eq!(pending[0].status, TransactionStatus::Trying);

    let queued = tcc.participants(&id).unwrap();
    assert_eq!(queued.len(), 2);
    assert_eq!(queued[1].confirm_action(), "confirmCredit");
    assert_eq!(queued[1].args()[1], Value::Decimal(dec("30.50")));

    // Operator resolves it explicitly
    let mut ctx = TransactionContext::new();
    ctx.set(id);
    let outcome = tcc.rollback(&mut ctx).unwrap();

    assert_eq!(
        outcome,
        Resolution::RolledBack {
            participants: 2,
            failures: 0
        }
    );
    assert_eq!(
        wallet.wallet("alice"),
        Some(Wallet {
            balance: dec("100.00"),
            frozen: Decimal::ZERO,
        })
    );
    assert!(tcc.pending_transactions().unwrap().is_empty());
}

#[test]
fn confirming_state_survives_restart() {
    init_tracing();
    let dir = TestDir::new();
    let recorder = Recorder::new();

    let id = {
        let tcc = dir.open(vec![recorder.handler("A", &["confirm"])]);
        let mut ctx = TransactionContext::new();
        let id = tcc.begin(&mut ctx).unwrap();
        tcc.register_participant(&ctx, participant("A", "x")).unwrap();
        assert!(tcc.commit(&mut ctx).is_err());
        id
    };

    let tcc = dir.open(vec![recorder.handler("A", &[])]);
    let pending = tcc.pending_transactions().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].status, TransactionStatus::Confirming);
    assert_eq!(tcc.participants(&id).unwrap(), vec![participant("A", "x")]);

    // Not retried: a second commit is a no-op
    let mut ctx = TransactionContext::new();
    ctx.set(id);
    assert_eq!(
        tcc.commit(&mut ctx).unwrap(),
        Resolution::AlreadyProcessed {
            id,
            status: TransactionStatus::Confirming
        }
    );
    assert_eq!(recorder.calls(), vec!["A.confirm(x)"]);
}

#[test]
fn resolved_transactions_leave_nothing_behind() {
    init_tracing();
    let dir = TestDir::new();
    let recorder = Recorder::new();

    {
        let tcc = dir.open(vec![recorder.handler("A", &[])]);
        for i in 0..5 {
            let out: tcc::Result<()> = tcc.global_transaction(|ctx| {
                tcc.register_participant(ctx, participant("A", &i.to_string()))?;
                Ok(())
            });
            out.unwrap();
        }
    }

    let tcc = dir.open(vec![]);
    assert!(tcc.pending_transactions().unwrap().is_empty());
    let stats = tcc.recovery_stats().unwrap();
    assert!(stats.entries_replayed > 0);
    assert_eq!(stats.records_recovered, 0);
    assert_eq!(stats.queues_recovered, 0);
}

#[test]
fn compact_on_open_drops_resolved_history() {
    init_tracing();
    let dir = TestDir::new();
    let recorder = Recorder::new();

    let stuck = {
        let tcc = dir.open(vec![recorder.handler("A", &[])]);
        for _ in 0..3 {
            let out: tcc::Result<()> = tcc.global_transaction(|ctx| {
                tcc.register_participant(ctx, participant("A", "done"))?;
                Ok(())
            });
            out.unwrap();
        }
        let mut ctx = TransactionContext::new();
        let id = tcc.begin(&mut ctx).unwrap();
        tcc.register_participant(&ctx, participant("A", "open")).unwrap();
        id
    };

    {
        let tcc = Tcc::builder()
            .path(dir.path())
            .strict()
            .compact_on_open(true)
            .open()
            .unwrap();
        assert_eq!(tcc.pending_transactions().unwrap().len(), 1);
    }

    // Compacted log holds one record and one participant
    let tcc = dir.open(vec![]);
    assert_eq!(tcc.recovery_stats().unwrap().entries_replayed, 2);
    assert_eq!(tcc.participants(&stuck).unwrap(), vec![participant("A", "open")]);
}

#[test]
fn config_file_opens_durable_coordinator() {
    let dir = TestDir::new();
    let config_path = dir.path().join("tcc.toml");
    let data_dir = dir.path().join("data");
    std::fs::write(
        &config_path,
        format!(
            "data_dir = {:?}\ndurability = \"strict\"\n",
            data_dir.display().to_string()
        ),
    )
    .unwrap();

    let config = TccConfig::load(&config_path).unwrap();
    let tcc = Tcc::builder().config(config).open().unwrap();

    assert_eq!(tcc.durability_mode(), DurabilityMode::Strict);
    assert_eq!(tcc.path(), Some(data_dir.as_path()));
    assert!(data_dir.join("tcc.log").exists());
}

#[test]
fn no_durability_writes_no_files() {
    let dir = TestDir::new();
    let tcc = Tcc::builder()
        .path(dir.path())
        .no_durability()
        .open()
        .unwrap();

    let mut ctx = TransactionContext::new();
    tcc.begin(&mut ctx).unwrap();

    assert!(tcc.is_ephemeral());
    assert!(!dir.path().join("tcc.log").exists());
}

// ============================================================================
// Mode equivalence
// ============================================================================

#[test]
fn commit_outcome_same_across_modes() {
    test_across_modes("commit", |tcc| {
        let recorder = Recorder::new();
        tcc.register_handler(recorder.handler("A", &[]));
        tcc.register_handler(recorder.handler("B", &[]));

        let mut ctx = TransactionContext::new();
        tcc.begin(&mut ctx).unwrap();
        tcc.register_participant(&ctx, participant("A", "x")).unwrap();
        tcc.register_participant(&ctx, participant("B", "y")).unwrap();
        let outcome = tcc.commit(&mut ctx).unwrap();

        (outcome, recorder.calls(), tcc.pending_transactions().unwrap().len())
    });
}

#[test]
fn rollback_outcome_same_across_modes() {
    test_across_modes("rollback", |tcc| {
        let recorder = Recorder::new();
        tcc.register_handler(recorder.handler("A", &[]));
        tcc.register_handler(recorder.handler("B", &["cancel"]));

        let mut ctx = TransactionContext::new();
        tcc.begin(&mut ctx).unwrap();
        tcc.register_participant(&ctx, participant("A", "x")).unwrap();
        tcc.register_participant(&ctx, participant("B", "y")).unwrap();
        let outcome = tcc.rollback(&mut ctx).unwrap();

        (outcome, recorder.calls(), tcc.pending_transactions().unwrap().len())
    });
}

//! Commit Tests
//!
//! Confirm dispatch order, fatal abort on the first failing confirm, and the
//! idempotence guards.

use crate::common::*;

fn setup(failing_a: &[&str]) -> (Tcc, Recorder) {
    init_tracing();
    let recorder = Recorder::new();
    let tcc = Tcc::ephemeral();
    tcc.register_handler(recorder.handler("A", failing_a));
    tcc.register_handler(recorder.handler("B", &[]));
    (tcc, recorder)
}

// ============================================================================
// Ordering
// ============================================================================

#[test]
fn commit_confirms_in_registration_order_then_cleans_up() {
    let (tcc, recorder) = setup(&[]);
    let mut ctx = TransactionContext::new();
    let id = tcc.begin(&mut ctx).unwrap();
    tcc.register_participant(&ctx, participant("A", "x")).unwrap();
    tcc.register_participant(&ctx, participant("B", "y")).unwrap();

    let outcome = tcc.commit(&mut ctx).unwrap();

    assert_eq!(outcome, Resolution::Committed { participants: 2 });
    assert_eq!(recorder.calls(), vec!["A.confirm(x)", "B.confirm(y)"]);
    assert!(tcc.pending_transactions().unwrap().is_empty());
    assert!(!ctx.is_active());

    // Nothing left for this id
    ctx.set(id);
    assert_eq!(tcc.commit(&mut ctx).unwrap(), Resolution::RecordNotFound(id));
}

#[test]
fn global_transaction_commits_on_success() {
    let (tcc, recorder) = setup(&[]);

    let out: tcc::Result<&str> = tcc.global_transaction(|ctx| {
        tcc.register_participant(ctx, participant("A", "1"))?;
        tcc.register_participant(ctx, participant("B", "2"))?;
        Ok("paid")
    });

    assert_eq!(out.unwrap(), "paid");
    assert_eq!(recorder.calls(), vec!["A.confirm(1)", "B.confirm(2)"]);
    assert_eq!(tcc.metrics().committed, 1);
}

// ============================================================================
// Failure
// ============================================================================

#[test]
fn failing_confirm_stops_dispatch_and_keeps_state() {
    let (tcc, recorder) = setup(&["confirm"]);
    let mut ctx = TransactionContext::new();
    let id = tcc.begin(&mut ctx).unwrap();
    tcc.register_participant(&ctx, participant("A", "x")).unwrap();
    tcc.register_participant(&ctx, participant("B", "y")).unwrap();

    let err = tcc.commit(&mut ctx).unwrap_err();

    assert!(err.is_action_failure());
    assert!(err.to_string().contains("A.confirm refused"));
    assert_eq!(recorder.calls(), vec!["A.confirm(x)"]);
    assert!(!ctx.is_active());

    let pending = tcc.pending_transactions().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, id);
    assert_eq!(pending[0].status, TransactionStatus::Confirming);

    let queued = tcc.participants(&id).unwrap();
    assert_eq!(queued, vec![participant("A", "x"), participant("B", "y")]);
}

#[test]
fn global_transaction_surfaces_confirm_failure() {
    let (tcc, recorder) = setup(&["confirm"]);

    let out: tcc::Result<()> = tcc.global_transaction(|ctx| {
        tcc.register_participant(ctx, participant("A", "x"))?;
        tcc.register_participant(ctx, participant("B", "y"))?;
        Ok(())
    });

    let err = out.unwrap_err();
    assert!(err.is_action_failure());
    // No compensating cancel after a failed commit
    assert_eq!(recorder.calls(), vec!["A.confirm(x)"]);
    assert_eq!(tcc.metrics().confirm_failures, 1);
    assert_eq!(tcc.pending_transactions().unwrap().len(), 1);
}

#[test]
fn unregistered_handler_fails_at_dispatch_not_registration() {
    let (tcc, recorder) = setup(&[]);
    let mut ctx = TransactionContext::new();
    tcc.begin(&mut ctx).unwrap();

    tcc.register_participant(&ctx, participant("A", "x")).unwrap();
    tcc.register_participant(&ctx, participant("nobody", "y")).unwrap();

    let err = tcc.commit(&mut ctx).unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(recorder.calls(), vec!["A.confirm(x)"]);
}

#[test]
fn incompatible_arguments_fail_resolution() {
    let (tcc, _recorder) = setup(&[]);
    let mut ctx = TransactionContext::new();
    tcc.begin(&mut ctx).unwrap();
    tcc.register_participant(
        &ctx,
        Participant::new("A", "confirm", "cancel", vec![Value::Int(1)]),
    )
    .unwrap();

    let err = tcc.commit(&mut ctx).unwrap_err();
    assert!(matches!(err, tcc::Error::HandlerActionNotFound { ref action, .. } if action == "confirm"));
}

// ============================================================================
// Guards
// ============================================================================

#[test]
fn register_without_context_mutates_nothing() {
    let (tcc, _recorder) = setup(&[]);
    let ctx = TransactionContext::new();

    tcc.register_participant(&ctx, participant("A", "x")).unwrap();

    assert!(tcc.pending_transactions().unwrap().is_empty());
    assert_eq!(tcc.metrics().begun, 0);
}

#[test]
fn commit_twice_is_noop() {
    let (tcc, recorder) = setup(&[]);
    let mut ctx = TransactionContext::new();
    tcc.begin(&mut ctx).unwrap();
    tcc.register_participant(&ctx, participant("A", "x")).unwrap();

    assert!(tcc.commit(&mut ctx).unwrap().is_committed());
    assert_eq!(tcc.commit(&mut ctx).unwrap(), Resolution::NoContext);
    assert_eq!(recorder.calls().len(), 1);
}

#[test]
fn concurrent_transactions_are_independent() {
    let (tcc, recorder) = setup(&[]);
    let tcc = Arc::new(tcc);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let tcc = Arc::clone(&tcc);
            std::thread::spawn(move || {
                let out: tcc::Result<()> = tcc.global_transaction(|ctx| {
                    tcc.register_participant(ctx, participant("A", &format!("{}a", i)))?;
                    tcc.register_participant(ctx, participant("B", &format!("{}b", i)))?;
                    Ok(())
                });
                out.unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let calls = recorder.calls();
    assert_eq!(calls.len(), 16);
    for i in 0..8 {
        let a = calls.iter().position(|c| *c == format!("A.confirm({}a)", i)).unwrap();
        let b = calls.iter().position(|c| *c == format!("B.confirm({}b)", i)).unwrap();
        assert!(a < b);
    }
    assert_eq!(tcc.metrics().committed, 8);
    assert!(tcc.pending_transactions().unwrap().is_empty());
}

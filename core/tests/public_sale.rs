mod common;

use common::*;
use vestige_core::{CommitmentState, CreatorFlow, ProtocolError, SetupOutcome};
use vestige_program::{BoundCheck, GraduationPolicy, ProgramPolicy, VestigeError, client};
use vestige_transaction::Layer;

fn program_error(err: &ProtocolError) -> &VestigeError {
    err.program_error()
        .unwrap_or_else(|| panic!("expected a program error, got {err}"))
}

#[tokio::test(start_paused = true)]
async fn test_public_sale_end_to_end() {
    let h = Harness::new().await;

    let a = h.participant("alice").await;
    assert_eq!(a.detect_state().await.unwrap(), CommitmentState::Uninitialized);
    assert_eq!(a.commit(SOL).await.unwrap(), CommitmentState::PubliclyRecorded);

    h.cluster.advance_clock(3_600).await;
    let b = h.participant("bob").await;
    b.commit(2 * SOL).await.unwrap();

    let mut rest = Vec::new();
    for label in ["carol", "dave", "erin"] {
        let flow = h.participant(label).await;
        flow.commit(5 * SOL / 2).await.unwrap();
        rest.push(flow);
    }

    let launch = h.creator.launch_state().await.unwrap();
    assert_eq!(launch.total_committed, 0, "launch totals move only at graduation");
    let pool = h.creator.pool_state().await.unwrap();
    assert_eq!(pool.total_committed, 21 * SOL / 2);
    assert_eq!(pool.total_participants, 5);
    assert_eq!(h.vault().await, 21 * SOL / 2);
    assert_eq!(h.wallet(&a).await, WALLET - SOL);

    h.creator.graduate().await.unwrap();
    let err = h.creator.graduate().await.unwrap_err();
    assert_eq!(program_error(&err), &VestigeError::AlreadyGraduated);

    let launch = h.creator.launch_state().await.unwrap();
    assert!(launch.is_graduated);
    assert_eq!(launch.total_committed, 21 * SOL / 2);

    let mut claimed = 0u64;
    let mut allocations = Vec::new();
    for flow in [&a, &b].into_iter().chain(rest.iter()) {
        assert_eq!(flow.settle().await.unwrap(), CommitmentState::Claimed);
        let allocation = flow.allocation().await.unwrap().unwrap();
        assert_eq!(
            h.cluster.token_balance(&h.mint, &flow.user()).await,
            allocation.tokens_allocated
        );
        claimed += allocation.tokens_allocated;
        allocations.push(allocation);
    }

    assert!(allocations[0].weight_bps >= allocations[1].weight_bps);
    assert_eq!(allocations[0].weight_bps, 15_000);
    assert!(claimed <= SUPPLY);
    assert_eq!(
        h.cluster.token_balance(&h.mint, &h.launch()).await,
        SUPPLY - claimed
    );

    let creator = h.creator_session.identity();
    let before = h.cluster.lamports(&creator).await;
    assert_eq!(h.creator.withdraw_funds().await.unwrap(), 21 * SOL / 2);
    assert_eq!(h.cluster.lamports(&creator).await - before, 21 * SOL / 2);
    assert_eq!(h.vault().await, 0);
    assert_eq!(h.creator.withdraw_funds().await.unwrap(), 0);
    assert_eq!(h.cluster.lamports(&creator).await - before, 21 * SOL / 2);
}

#[tokio::test(start_paused = true)]
async fn test_commitment_bounds() {
    let h = Harness::new().await;
    let a = h.participant("alice").await;

    let err = a.commit(SOL / 20).await.unwrap_err();
    assert!(matches!(
        program_error(&err),
        VestigeError::BelowMinCommitment { amount, min } if *amount == SOL / 20 && *min == SOL / 10
    ));

    let err = a.commit(5 * SOL + 1).await.unwrap_err();
    assert!(matches!(
        program_error(&err),
        VestigeError::AboveMaxCommitment { .. }
    ));

    // Exactly at both bounds is fine; the running total then caps top-ups.
    a.commit(SOL / 10).await.unwrap();
    a.commit(4 * SOL + 9 * SOL / 10).await.unwrap();
    let err = a.commit(SOL / 10).await.unwrap_err();
    assert!(matches!(
        program_error(&err),
        VestigeError::AboveMaxCommitment { total, .. } if *total == 5 * SOL + SOL / 10
    ));

    let pool = h.creator.pool_state().await.unwrap();
    assert_eq!(pool.total_committed, 5 * SOL);
    assert_eq!(pool.total_participants, 1);
}

#[tokio::test(start_paused = true)]
async fn test_incremental_bounds_allow_top_ups() {
    let h = Harness::with_policy(ProgramPolicy {
        bound_check: BoundCheck::Incremental,
        ..ProgramPolicy::default()
    })
    .await;
    let a = h.participant("alice").await;

    a.commit(4 * SOL).await.unwrap();
    a.commit(4 * SOL).await.unwrap();
    assert_eq!(h.creator.pool_state().await.unwrap().total_committed, 8 * SOL);
}

#[tokio::test(start_paused = true)]
async fn test_sale_window() {
    let h = Harness::new().await;
    let a = h.participant("alice").await;

    h.cluster.set_unix_timestamp(START - 1).await;
    let err = a.commit(SOL).await.unwrap_err();
    assert_eq!(program_error(&err), &VestigeError::SaleNotStarted);

    h.cluster.set_unix_timestamp(END).await;
    let err = a.commit(SOL).await.unwrap_err();
    assert_eq!(program_error(&err), &VestigeError::SaleWindowClosed);

    // Rejected commits leave nothing behind.
    assert_eq!(h.wallet(&a).await, WALLET);
    assert_eq!(a.detect_state().await.unwrap(), CommitmentState::AccountsInitialized);
}

#[tokio::test(start_paused = true)]
async fn test_setup_and_allocation_idempotence() {
    let h = Harness::new().await;
    assert_eq!(
        h.creator.create_launch(&terms()).await.unwrap(),
        SetupOutcome::AlreadyExists
    );

    let a = h.participant("alice").await;
    assert_eq!(a.initialize().await.unwrap(), SetupOutcome::Created);
    assert_eq!(a.initialize().await.unwrap(), SetupOutcome::AlreadyExists);

    a.commit(5 * SOL).await.unwrap();
    let err = a.calculate_allocation().await.unwrap_err();
    assert_eq!(program_error(&err), &VestigeError::NotGraduated);

    h.cluster.set_unix_timestamp(END).await;
    h.creator.graduate().await.unwrap();

    let first = a.calculate_allocation().await.unwrap();
    let err = a.calculate_allocation().await.unwrap_err();
    assert_eq!(program_error(&err), &VestigeError::AllocationAlreadyCalculated);
    assert_eq!(a.allocation().await.unwrap(), Some(first));

    // Sole participant receives the whole supply.
    assert_eq!(first.tokens_allocated, SUPPLY);

    a.claim().await.unwrap();
    let err = a.claim().await.unwrap_err();
    assert_eq!(program_error(&err), &VestigeError::AlreadyClaimed);
    assert_eq!(h.cluster.token_balance(&h.mint, &a.user()).await, SUPPLY);
}

#[tokio::test(start_paused = true)]
async fn test_early_graduation_on_target() {
    let h = Harness::new().await;

    let a = h.participant("alice").await;
    let b = h.participant("bob").await;
    a.commit(5 * SOL).await.unwrap();

    let err = h.creator.graduate().await.unwrap_err();
    assert_eq!(program_error(&err), &VestigeError::GraduationConditionsNotMet);

    b.commit(5 * SOL).await.unwrap();
    h.creator.graduate_auto().await.unwrap();
    assert!(h.creator.launch_state().await.unwrap().is_graduated);

    let c = h.participant("carol").await;
    let err = c.commit(SOL).await.unwrap_err();
    assert_eq!(program_error(&err), &VestigeError::AlreadyGraduated);
}

#[tokio::test(start_paused = true)]
async fn test_expiry_only_graduation() {
    let h = Harness::with_policy(ProgramPolicy {
        graduation: GraduationPolicy::ExpiryOnly,
        ..ProgramPolicy::default()
    })
    .await;

    for label in ["alice", "bob", "carol"] {
        h.participant(label).await.commit(4 * SOL).await.unwrap();
    }

    let err = h.creator.graduate().await.unwrap_err();
    assert_eq!(program_error(&err), &VestigeError::GraduationConditionsNotMet);

    h.cluster.set_unix_timestamp(END).await;
    h.creator.graduate().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_only_creator_graduates_or_withdraws() {
    let h = Harness::new().await;
    let mallory = h.session("mallory");
    h.cluster.airdrop(&mallory.identity(), SOL).await;

    // Same mint, different creator: a different launch that does not exist.
    let impostor = CreatorFlow::new(mallory.clone(), h.mint, h.cluster.validator());
    assert_ne!(impostor.launch(), h.launch());
    assert!(matches!(
        impostor.launch_state().await.unwrap_err(),
        ProtocolError::AccountMissing(_)
    ));

    h.cluster.set_unix_timestamp(END).await;
    for ix in [
        client::graduate(&mallory.identity(), &h.launch()),
        client::withdraw_funds(&mallory.identity(), &h.launch()),
    ] {
        let err = mallory.send(Layer::Base, vec![ix]).await.unwrap_err();
        assert_eq!(program_error(&err), &VestigeError::Unauthorized);
    }
    assert!(!h.creator.launch_state().await.unwrap().is_graduated);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_commits_sum_up() {
    let h = Harness::new().await;

    let mut handles = Vec::new();
    for i in 0..6u64 {
        let flow = std::sync::Arc::new(h.participant(&format!("user-{i}")).await);
        handles.push(tokio::spawn(async move {
            flow.commit(SOL + i * SOL / 10).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let expected: u64 = (0..6u64).map(|i| SOL + i * SOL / 10).sum();
    let pool = h.creator.pool_state().await.unwrap();
    assert_eq!(pool.total_committed, expected);
    assert_eq!(pool.total_participants, 6);
    assert_eq!(h.vault().await, expected);
}

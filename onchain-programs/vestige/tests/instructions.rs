mod common;

use common::{END, SOL, START, TestFixture};
use vestige_account::{
    AccountType, CommitmentPool, EphemeralHolding, Launch, UserCommitment, Vault, seeds,
};
use vestige_keypair::TransactionSigner;
use vestige_program::{Effect, VestigeError, client};
use vestige_transaction::Layer;

#[test]
fn test_initialize_launch_success() {
    let mut fixture = TestFixture::new();
    fixture.initialize_launch().expect("initialize launch");

    let launch: Launch = fixture.load(&fixture.launch);
    assert_eq!(launch.creator, fixture.creator.pubkey());
    assert_eq!(launch.token_supply, 1_000_000_000);
    assert!(!launch.is_delegated);
    assert!(!launch.is_graduated);

    let pool: CommitmentPool = fixture.load(&fixture.pool());
    assert_eq!(pool.launch, fixture.launch);
    let vault: Vault = fixture.load(&fixture.vault());
    assert_eq!(vault.launch, fixture.launch);

    assert!(fixture.effects.contains(&Effect::TokenTransfer {
        mint: fixture.mint,
        from: fixture.creator.pubkey(),
        to: fixture.launch,
        amount: 1_000_000_000,
    }));
}

#[test]
fn test_initialize_launch_rejects_inverted_window() {
    let mut fixture = TestFixture::new();
    let mut params = fixture.launch_params();
    params.start_time = END;
    params.end_time = START;
    let ix = client::initialize_launch(&fixture.creator.pubkey(), &params).unwrap();

    assert_eq!(
        fixture.send(ix),
        Err(VestigeError::InvalidTimeRange { start: END, end: START })
    );
    assert!(!fixture.accounts.contains_key(&fixture.launch));
}

#[test]
fn test_initialize_launch_twice_fails() {
    let mut fixture = TestFixture::new();
    fixture.initialize_launch().unwrap();
    let before = fixture.accounts.get(&fixture.launch).cloned();

    assert_eq!(
        fixture.initialize_launch(),
        Err(VestigeError::AccountAlreadyInitialized)
    );
    assert_eq!(fixture.accounts.get(&fixture.launch).cloned(), before);
}

#[test]
fn test_init_user_commitment_is_idempotent() {
    let mut fixture = TestFixture::new();
    fixture.initialize_launch().unwrap();
    let alice = fixture.user("alice", 10 * SOL);

    fixture.init_participant(&alice).unwrap();
    fixture.commit(&alice, SOL).unwrap();

    let again = client::init_user_commitment(&alice.pubkey(), &fixture.launch);
    assert_eq!(fixture.send(again), Err(VestigeError::AccountAlreadyInitialized));

    let (commitment, _) = seeds::derive_commitment_pda(&fixture.launch, &alice.pubkey());
    let record: UserCommitment = fixture.load(&commitment);
    assert_eq!(record.amount, SOL);
    let pool: CommitmentPool = fixture.load(&fixture.pool());
    assert_eq!(pool.total_committed, SOL);
}

#[test]
fn test_public_commit_moves_funds_to_vault() {
    let mut fixture = TestFixture::new();
    fixture.initialize_launch().unwrap();
    let alice = fixture.user("alice", 10 * SOL);
    fixture.init_participant(&alice).unwrap();

    fixture.commit(&alice, 2 * SOL).unwrap();

    assert_eq!(fixture.lamports(&fixture.vault()), 2 * SOL);
    assert_eq!(fixture.lamports(&alice.pubkey()), 8 * SOL);
    assert!(fixture.logs.iter().any(|l| l.starts_with("VG_COMMIT:")));
}

#[test]
fn test_commit_before_start_rejected() {
    let mut fixture = TestFixture::new();
    fixture.initialize_launch().unwrap();
    let alice = fixture.user("alice", 10 * SOL);
    fixture.init_participant(&alice).unwrap();

    fixture.now = START - 1;
    assert_eq!(fixture.commit(&alice, SOL), Err(VestigeError::SaleNotStarted));
    fixture.now = END;
    assert_eq!(fixture.commit(&alice, SOL), Err(VestigeError::SaleWindowClosed));
    assert_eq!(fixture.lamports(&fixture.vault()), 0);
}

#[test]
fn test_graduate_twice_rejected() {
    let mut fixture = TestFixture::new();
    fixture.initialize_launch().unwrap();
    fixture.now = END;

    fixture.graduate().unwrap();
    assert_eq!(fixture.graduate(), Err(VestigeError::AlreadyGraduated));
}

#[test]
fn test_graduate_requires_creator() {
    let mut fixture = TestFixture::new();
    fixture.initialize_launch().unwrap();
    fixture.now = END;
    let mallory = fixture.user("mallory", SOL);

    let ix = client::graduate(&mallory.pubkey(), &fixture.launch);
    assert_eq!(fixture.send(ix), Err(VestigeError::Unauthorized));
}

#[test]
fn test_allocation_then_claim() {
    let mut fixture = TestFixture::new();
    fixture.initialize_launch().unwrap();
    let alice = fixture.user("alice", 10 * SOL);
    fixture.init_participant(&alice).unwrap();
    fixture.commit(&alice, SOL).unwrap();

    let calc = client::calculate_allocation(&alice.pubkey(), &fixture.launch, &alice.pubkey());
    assert_eq!(fixture.send(calc.clone()), Err(VestigeError::NotGraduated));

    fixture.now = END;
    fixture.graduate().unwrap();
    fixture.send(calc.clone()).unwrap();

    let (commitment, _) = seeds::derive_commitment_pda(&fixture.launch, &alice.pubkey());
    let record: UserCommitment = fixture.load(&commitment);
    assert_eq!(record.weight_bps, 15_000);
    assert_eq!(record.tokens_allocated, 1_000_000_000);

    assert_eq!(fixture.send(calc), Err(VestigeError::AllocationAlreadyCalculated));
    assert_eq!(fixture.load::<UserCommitment>(&commitment), record);

    let claim = client::claim_tokens(&alice.pubkey(), &fixture.launch);
    fixture.send(claim.clone()).unwrap();
    assert_eq!(fixture.send(claim), Err(VestigeError::AlreadyClaimed));
    assert!(fixture.effects.contains(&Effect::TokenTransfer {
        mint: fixture.mint,
        from: fixture.launch,
        to: alice.pubkey(),
        amount: 1_000_000_000,
    }));
}

#[test]
fn test_withdraw_funds_is_creator_only() {
    let mut fixture = TestFixture::new();
    fixture.initialize_launch().unwrap();
    let alice = fixture.user("alice", 10 * SOL);
    fixture.init_participant(&alice).unwrap();
    fixture.commit(&alice, 3 * SOL).unwrap();
    fixture.now = END;
    fixture.graduate().unwrap();

    let steal = client::withdraw_funds(&alice.pubkey(), &fixture.launch);
    assert_eq!(fixture.send(steal), Err(VestigeError::Unauthorized));

    let before = fixture.lamports(&fixture.creator.pubkey());
    let ix = client::withdraw_funds(&fixture.creator.pubkey(), &fixture.launch);
    fixture.send(ix).unwrap();
    assert_eq!(fixture.lamports(&fixture.creator.pubkey()), before + 3 * SOL);
    assert_eq!(fixture.lamports(&fixture.vault()), 0);
}

#[test]
fn test_permission_is_created_once() {
    let mut fixture = TestFixture::new();
    fixture.initialize_launch().unwrap();
    let creator = fixture.creator.pubkey();

    let ix = client::create_permission(&creator, &fixture.launch, AccountType::CommitmentPool, vec![])
        .unwrap();
    fixture.send(ix.clone()).unwrap();
    assert_eq!(fixture.send(ix), Err(VestigeError::PermissionAlreadyExists));
}

#[test]
fn test_participant_cannot_delegate_before_pool() {
    let mut fixture = TestFixture::new();
    fixture.initialize_launch().unwrap();
    let alice = fixture.user("alice", 10 * SOL);
    fixture.init_participant(&alice).unwrap();
    let validator = vestige_pubkey::Pubkey::from_label("validator");

    let perm = client::create_permission(
        &alice.pubkey(),
        &fixture.launch,
        AccountType::UserCommitment,
        vec![],
    )
    .unwrap();
    fixture.send(perm).unwrap();

    let ix = client::delegate(
        &alice.pubkey(),
        &fixture.launch,
        AccountType::UserCommitment,
        &validator,
    )
    .unwrap();
    assert_eq!(fixture.send(ix), Err(VestigeError::NotDelegated));
}

#[test]
fn test_delegated_pool_closes_public_path() {
    let mut fixture = TestFixture::new();
    fixture.initialize_launch().unwrap();
    let creator = fixture.creator.pubkey();
    let validator = vestige_pubkey::Pubkey::from_label("validator");
    let alice = fixture.user("alice", 10 * SOL);
    fixture.init_participant(&alice).unwrap();

    let perm = client::create_permission(&creator, &fixture.launch, AccountType::CommitmentPool, vec![])
        .unwrap();
    fixture.send(perm).unwrap();

    let delegate =
        client::delegate(&creator, &fixture.launch, AccountType::CommitmentPool, &validator).unwrap();
    assert_eq!(fixture.send(delegate.clone()), Ok(()));
    assert!(fixture.load::<Launch>(&fixture.launch).is_delegated);

    assert_eq!(fixture.commit(&alice, SOL), Err(VestigeError::PoolDelegated));
    assert_eq!(fixture.send(delegate), Err(VestigeError::AlreadyDelegated));

    fixture.now = END;
    assert_eq!(fixture.graduate(), Err(VestigeError::PoolDelegated));
}

#[test]
fn test_delegate_without_permission_fails() {
    let mut fixture = TestFixture::new();
    fixture.initialize_launch().unwrap();
    let creator = fixture.creator.pubkey();
    let validator = vestige_pubkey::Pubkey::from_label("validator");

    let ix = client::delegate(&creator, &fixture.launch, AccountType::CommitmentPool, &validator)
        .unwrap();
    assert_eq!(fixture.send(ix), Err(VestigeError::MissingPermission));
}

#[test]
fn test_vault_never_delegatable() {
    let mut fixture = TestFixture::new();
    fixture.initialize_launch().unwrap();
    let creator = fixture.creator.pubkey();
    let validator = vestige_pubkey::Pubkey::from_label("validator");

    let mut ix = client::delegate(&creator, &fixture.launch, AccountType::CommitmentPool, &validator)
        .unwrap();
    ix.accounts[2].pubkey = fixture.vault();
    assert_eq!(fixture.send(ix), Err(VestigeError::VaultNotDelegatable));
}

#[test]
fn test_fund_credits_tracked_balance() {
    let mut fixture = TestFixture::new();
    fixture.initialize_launch().unwrap();
    let alice = fixture.user("alice", 10 * SOL);
    fixture.init_participant(&alice).unwrap();

    let ix = client::fund_ephemeral(&alice.pubkey(), &fixture.launch, 2 * SOL).unwrap();
    fixture.send(ix).unwrap();

    let (holding_pda, _) = seeds::derive_ephemeral_pda(&fixture.launch, &alice.pubkey());
    let holding: EphemeralHolding = fixture.load(&holding_pda);
    assert_eq!(holding.balance, 2 * SOL);
    assert_eq!(holding.committed, 0);
    assert_eq!(fixture.lamports(&holding_pda), 2 * SOL);
}

#[test]
fn test_execution_instructions_rejected_on_base() {
    let mut fixture = TestFixture::new();
    fixture.initialize_launch().unwrap();
    let alice = fixture.user("alice", 10 * SOL);

    let ix = client::private_commit(&alice.pubkey(), &fixture.launch, SOL).unwrap();
    assert_eq!(fixture.send(ix), Err(VestigeError::WrongLayer));

    fixture.layer = Layer::Execution;
    let ix = client::commit(&alice.pubkey(), &fixture.launch, SOL).unwrap();
    assert_eq!(fixture.send(ix), Err(VestigeError::WrongLayer));
}

#[test]
fn test_sweep_before_graduation_rejected() {
    let mut fixture = TestFixture::new();
    fixture.initialize_launch().unwrap();
    let alice = fixture.user("alice", 10 * SOL);
    fixture.init_participant(&alice).unwrap();

    let ix = client::sweep_to_vault(&alice.pubkey(), &fixture.launch, &alice.pubkey());
    assert_eq!(fixture.send(ix), Err(VestigeError::NotGraduated));
}

#[test]
fn test_sweep_refunds_uncommitted_balance() {
    let mut fixture = TestFixture::new();
    fixture.initialize_launch().unwrap();
    let alice = fixture.user("alice", 10 * SOL);
    fixture.init_participant(&alice).unwrap();
    let fund = client::fund_ephemeral(&alice.pubkey(), &fixture.launch, 2 * SOL).unwrap();
    fixture.send(fund).unwrap();

    fixture.now = END;
    fixture.graduate().unwrap();

    let sweep = client::sweep_to_vault(&alice.pubkey(), &fixture.launch, &alice.pubkey());
    fixture.send(sweep).unwrap();

    let (holding_pda, _) = seeds::derive_ephemeral_pda(&fixture.launch, &alice.pubkey());
    assert_eq!(fixture.lamports(&holding_pda), 0);
    assert_eq!(fixture.lamports(&alice.pubkey()), 10 * SOL);
    assert_eq!(fixture.lamports(&fixture.vault()), 0);
}

#[test]
fn test_undelegate_user_commitment_tolerates_records_left_on_base() {
    let mut fixture = TestFixture::new();
    fixture.initialize_launch().unwrap();
    let alice = fixture.user("alice", 10 * SOL);
    fixture.init_participant(&alice).unwrap();
    fixture.now = END;
    fixture.graduate().unwrap();

    let (commitment_pda, _) = seeds::derive_commitment_pda(&fixture.launch, &alice.pubkey());
    let (holding_pda, _) = seeds::derive_ephemeral_pda(&fixture.launch, &alice.pubkey());
    let ix = client::undelegate_user_commitment(&alice.pubkey(), &fixture.launch);
    assert!(ix.accounts.iter().all(|meta| !meta.is_writable));

    fixture.layer = Layer::Execution;
    fixture.send(ix).unwrap();

    assert!(fixture.effects.contains(&Effect::UndelegateIfHeld {
        account: commitment_pda
    }));
    assert!(fixture.effects.contains(&Effect::UndelegateIfHeld {
        account: holding_pda
    }));
    assert!(!fixture
        .effects
        .iter()
        .any(|effect| matches!(effect, Effect::Undelegate { .. })));
}

#[test]
fn test_undelegate_user_commitment_waits_for_graduation() {
    let mut fixture = TestFixture::new();
    fixture.initialize_launch().unwrap();
    let alice = fixture.user("alice", 10 * SOL);
    fixture.init_participant(&alice).unwrap();

    fixture.layer = Layer::Execution;
    let ix = client::undelegate_user_commitment(&alice.pubkey(), &fixture.launch);
    assert_eq!(fixture.send(ix), Err(VestigeError::NotGraduated));
}

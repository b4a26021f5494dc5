use vestige_account::{CommitmentPool, Launch, UserCommitment, seeds};
use vestige_transaction::Layer;

use crate::{
    allocation,
    error::{Result, VestigeError},
    helpers::{AccountInfo, InvokeContext, check_key, check_signer, load_launch, transfer_lamports},
    instruction::AmountParams,
    msg,
    policy::{BoundCheck, ProgramPolicy},
};

/// Result of booking one commit against a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitOutcome {
    pub first_commit: bool,
    pub weighted: u128,
}

/// Check `amount` against the launch's bounds and sale window, given what
/// the participant already committed. Returns the participant's new total.
///
/// Pure, so clients can run it before moving funds for a commit.
pub fn validate_commit(
    policy: &ProgramPolicy,
    launch: &Launch,
    prior_amount: u64,
    amount: u64,
    now: i64,
) -> Result<u64> {
    if launch.is_graduated {
        return Err(VestigeError::AlreadyGraduated);
    }

    if amount < launch.min_commitment {
        return Err(VestigeError::BelowMinCommitment {
            amount,
            min: launch.min_commitment,
        });
    }
    let new_amount = prior_amount
        .checked_add(amount)
        .ok_or(VestigeError::ArithmeticOverflow)?;
    let capped = match policy.bound_check {
        BoundCheck::RunningTotal => new_amount,
        BoundCheck::Incremental => amount,
    };
    if capped > launch.max_commitment {
        return Err(VestigeError::AboveMaxCommitment {
            total: capped,
            max: launch.max_commitment,
        });
    }

    if now < launch.start_time {
        return Err(VestigeError::SaleNotStarted);
    }
    if now >= launch.end_time {
        return Err(VestigeError::SaleWindowClosed);
    }
    Ok(new_amount)
}

/// Validate and book `amount` for one participant.
///
/// Shared by the public and private paths. Either every field is updated
/// or, on error, nothing is.
pub fn record_commitment(
    policy: &ProgramPolicy,
    launch: &Launch,
    pool: &mut CommitmentPool,
    commitment: &mut UserCommitment,
    amount: u64,
    now: i64,
) -> Result<CommitOutcome> {
    if pool.is_finalized {
        return Err(VestigeError::AlreadyGraduated);
    }
    let new_amount = validate_commit(policy, launch, commitment.amount, amount, now)?;

    let first_commit = !commitment.has_committed();
    let commit_time = if first_commit { now } else { commitment.commit_time };
    let weight = allocation::weight_bps(launch.start_time, launch.end_time, commit_time);
    let weighted = allocation::weighted_amount(amount, weight);

    let total_committed = pool
        .total_committed
        .checked_add(amount)
        .ok_or(VestigeError::ArithmeticOverflow)?;
    let total_weighted = pool
        .total_weighted
        .checked_add(weighted)
        .ok_or(VestigeError::ArithmeticOverflow)?;

    pool.total_committed = total_committed;
    pool.total_weighted = total_weighted;
    if first_commit {
        pool.total_participants += 1;
        commitment.commit_time = now;
    }
    commitment.amount = new_amount;

    Ok(CommitOutcome {
        first_commit,
        weighted,
    })
}

/// Public path. Accounts:
/// `[user (signer, w), launch, pool (w), user_commitment (w), vault (w)]`.
pub fn process_commit(
    ctx: &mut InvokeContext,
    accounts: &mut [AccountInfo],
    data: &[u8],
) -> Result<()> {
    ctx.require_layer(Layer::Base)?;

    let [user, launch_account, pool_account, commitment_account, vault_account] = accounts else {
        return Err(VestigeError::NotEnoughAccountKeys);
    };

    let params = AmountParams::decode(data)?;
    check_signer(user)?;

    let launch = load_launch(launch_account)?;
    if launch.is_delegated {
        return Err(VestigeError::PoolDelegated);
    }

    check_key(pool_account, &seeds::derive_pool_pda(&launch_account.key).0)?;
    check_key(vault_account, &seeds::derive_vault_pda(&launch_account.key).0)?;
    check_key(
        commitment_account,
        &seeds::derive_commitment_pda(&launch_account.key, &user.key).0,
    )?;

    let mut pool: CommitmentPool = pool_account.load()?;
    let mut commitment: UserCommitment = commitment_account.load()?;

    let outcome = record_commitment(
        &ctx.policy,
        &launch,
        &mut pool,
        &mut commitment,
        params.amount,
        ctx.unix_timestamp,
    )?;

    transfer_lamports(user, vault_account, params.amount)?;
    pool_account.store(&pool)?;
    commitment_account.store(&commitment)?;

    msg!(
        ctx,
        "VG_COMMIT:{}:{}:{}",
        user.key,
        params.amount,
        if outcome.first_commit { "new" } else { "topup" }
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::GraduationPolicy;
    use vestige_pubkey::Pubkey;

    fn launch() -> Launch {
        Launch {
            creator: Pubkey::from_label("creator"),
            token_mint: Pubkey::from_label("mint"),
            token_supply: 1_000,
            start_time: 1_000,
            end_time: 2_000,
            graduation_target: 500,
            min_commitment: 10,
            max_commitment: 100,
            total_committed: 0,
            total_participants: 0,
            total_weighted: 0,
            is_delegated: false,
            is_graduated: false,
            graduated_at: 0,
            bump: 255,
        }
    }

    fn pool() -> CommitmentPool {
        CommitmentPool {
            launch: Pubkey::from_label("launch"),
            total_committed: 0,
            total_participants: 0,
            total_weighted: 0,
            is_finalized: false,
            bump: 254,
        }
    }

    fn commitment(user: &str) -> UserCommitment {
        UserCommitment::new(Pubkey::from_label("launch"), Pubkey::from_label(user), 253)
    }

    const RUNNING: ProgramPolicy = ProgramPolicy {
        bound_check: BoundCheck::RunningTotal,
        graduation: GraduationPolicy::TargetOrExpiry,
    };

    #[test]
    fn test_bounds_are_inclusive() {
        let l = launch();
        let mut p = pool();

        let mut at_min = commitment("a");
        assert!(record_commitment(&RUNNING, &l, &mut p, &mut at_min, 10, 1_000).is_ok());

        let mut below = commitment("b");
        assert_eq!(
            record_commitment(&RUNNING, &l, &mut p, &mut below, 9, 1_000),
            Err(VestigeError::BelowMinCommitment { amount: 9, min: 10 })
        );

        let mut at_max = commitment("c");
        assert!(record_commitment(&RUNNING, &l, &mut p, &mut at_max, 100, 1_000).is_ok());

        let mut above = commitment("d");
        assert_eq!(
            record_commitment(&RUNNING, &l, &mut p, &mut above, 101, 1_000),
            Err(VestigeError::AboveMaxCommitment { total: 101, max: 100 })
        );
        assert_eq!(p.total_committed, 110);
        assert_eq!(p.total_participants, 2);
    }

    #[test]
    fn test_running_total_caps_top_ups() {
        let l = launch();
        let mut p = pool();
        let mut c = commitment("a");

        record_commitment(&RUNNING, &l, &mut p, &mut c, 60, 1_100).unwrap();
        assert_eq!(
            record_commitment(&RUNNING, &l, &mut p, &mut c, 50, 1_200),
            Err(VestigeError::AboveMaxCommitment { total: 110, max: 100 })
        );

        let incremental = ProgramPolicy {
            bound_check: BoundCheck::Incremental,
            ..RUNNING
        };
        record_commitment(&incremental, &l, &mut p, &mut c, 50, 1_200).unwrap();
        assert_eq!(c.amount, 110);
    }

    #[test]
    fn test_top_up_does_not_add_participant() {
        let l = launch();
        let mut p = pool();
        let mut c = commitment("a");

        let first = record_commitment(&RUNNING, &l, &mut p, &mut c, 20, 1_100).unwrap();
        let second = record_commitment(&RUNNING, &l, &mut p, &mut c, 30, 1_900).unwrap();

        assert!(first.first_commit);
        assert!(!second.first_commit);
        assert_eq!(p.total_participants, 1);
        assert_eq!(c.amount, 50);
        assert_eq!(c.commit_time, 1_100);
        // Top-up keeps the weight of the first commit.
        let w = allocation::weight_bps(1_000, 2_000, 1_100);
        assert_eq!(p.total_weighted, 50 * w as u128);
    }

    #[test]
    fn test_window_edges() {
        let l = launch();
        let mut p = pool();
        let mut c = commitment("a");

        assert_eq!(
            record_commitment(&RUNNING, &l, &mut p, &mut c, 20, 999),
            Err(VestigeError::SaleNotStarted)
        );
        assert_eq!(
            record_commitment(&RUNNING, &l, &mut p, &mut c, 20, 2_000),
            Err(VestigeError::SaleWindowClosed)
        );
        assert!(record_commitment(&RUNNING, &l, &mut p, &mut c, 20, 1_999).is_ok());
    }

    #[test]
    fn test_failed_commit_leaves_no_trace() {
        let l = launch();
        let mut p = pool();
        let mut c = commitment("a");
        record_commitment(&RUNNING, &l, &mut p, &mut c, 90, 1_100).unwrap();

        let (p_before, c_before) = (p.clone(), c.clone());
        assert!(record_commitment(&RUNNING, &l, &mut p, &mut c, 20, 1_200).is_err());
        assert_eq!(p, p_before);
        assert_eq!(c, c_before);
    }

    #[test]
    fn test_finalized_pool_rejects_commits() {
        let l = launch();
        let mut p = pool();
        p.is_finalized = true;
        let mut c = commitment("a");
        assert_eq!(
            record_commitment(&RUNNING, &l, &mut p, &mut c, 20, 1_100),
            Err(VestigeError::AlreadyGraduated)
        );
    }

    #[test]
    fn test_validate_commit_matches_booking() {
        let l = launch();
        assert_eq!(validate_commit(&RUNNING, &l, 0, 10, 1_000), Ok(10));
        assert_eq!(validate_commit(&RUNNING, &l, 90, 10, 1_500), Ok(100));
        assert_eq!(
            validate_commit(&RUNNING, &l, 90, 11, 1_500),
            Err(VestigeError::AboveMaxCommitment { total: 101, max: 100 })
        );
        assert_eq!(
            validate_commit(&RUNNING, &l, 0, 9, 1_500),
            Err(VestigeError::BelowMinCommitment { amount: 9, min: 10 })
        );
        assert_eq!(
            validate_commit(&RUNNING, &l, 0, 20, 2_000),
            Err(VestigeError::SaleWindowClosed)
        );

        let incremental = ProgramPolicy {
            bound_check: BoundCheck::Incremental,
            ..RUNNING
        };
        assert_eq!(validate_commit(&incremental, &l, 90, 50, 1_500), Ok(140));

        let mut graduated = launch();
        graduated.is_graduated = true;
        assert_eq!(
            validate_commit(&RUNNING, &graduated, 0, 20, 1_500),
            Err(VestigeError::AlreadyGraduated)
        );
    }
}

//! Execution-layer instructions.
//!
//! Everything written here is delegated, so none of it is visible on the
//! base ledger until the accounts are undelegated.

use vestige_account::{CommitmentPool, EphemeralHolding, UserCommitment, seeds};
use vestige_transaction::Layer;

use crate::{
    error::{Result, VestigeError},
    helpers::{AccountInfo, Effect, InvokeContext, check_creator, check_key, check_signer, load_launch},
    instruction::{AmountParams, commit::record_commitment},
    msg,
};

/// Accounts:
/// `[user (signer), launch, pool (w), user_commitment (w), ephemeral_holding (w)]`.
///
/// Debits the holding's tracked balance and books the commit in one step.
/// No lamports move; the sweep does that after graduation.
pub fn process_private_commit(
    ctx: &mut InvokeContext,
    accounts: &mut [AccountInfo],
    data: &[u8],
) -> Result<()> {
    ctx.require_layer(Layer::Execution)?;

    let [user, launch_account, pool_account, commitment_account, holding_account] = accounts
    else {
        return Err(VestigeError::NotEnoughAccountKeys);
    };

    let params = AmountParams::decode(data)?;
    check_signer(user)?;

    let launch = load_launch(launch_account)?;
    if !launch.is_delegated {
        return Err(VestigeError::NotDelegated);
    }

    check_key(pool_account, &seeds::derive_pool_pda(&launch_account.key).0)?;
    check_key(
        commitment_account,
        &seeds::derive_commitment_pda(&launch_account.key, &user.key).0,
    )?;
    check_key(
        holding_account,
        &seeds::derive_ephemeral_pda(&launch_account.key, &user.key).0,
    )?;

    let mut pool: CommitmentPool = pool_account.load()?;
    let mut commitment: UserCommitment = commitment_account.load()?;
    let mut holding: EphemeralHolding = holding_account.load()?;

    if holding.balance < params.amount {
        return Err(VestigeError::InsufficientHoldingBalance);
    }

    record_commitment(
        &ctx.policy,
        &launch,
        &mut pool,
        &mut commitment,
        params.amount,
        ctx.unix_timestamp,
    )?;

    holding.balance -= params.amount;
    holding.committed += params.amount;

    pool_account.store(&pool)?;
    commitment_account.store(&commitment)?;
    holding_account.store(&holding)?;

    msg!(ctx, "VG_PRIVATE_COMMIT:{}", user.key);
    Ok(())
}

/// Accounts: `[creator (signer), launch, pool (w)]`.
///
/// Freezes the pool and sends it back to the base ledger in the same
/// transaction. The base ledger only sees the totals once the return lands
/// and `FinalizeGraduation` copies them into the launch.
pub fn process_graduate_and_undelegate(
    ctx: &mut InvokeContext,
    accounts: &mut [AccountInfo],
) -> Result<()> {
    ctx.require_layer(Layer::Execution)?;

    let [creator, launch_account, pool_account] = accounts else {
        return Err(VestigeError::NotEnoughAccountKeys);
    };

    let launch = load_launch(launch_account)?;
    check_creator(&launch, creator)?;
    if !launch.is_delegated {
        return Err(VestigeError::NotDelegated);
    }
    if launch.is_graduated {
        return Err(VestigeError::AlreadyGraduated);
    }

    check_key(pool_account, &seeds::derive_pool_pda(&launch_account.key).0)?;
    let mut pool: CommitmentPool = pool_account.load()?;
    if pool.is_finalized {
        return Err(VestigeError::AlreadyGraduated);
    }

    if !ctx.policy.graduation.allows(
        ctx.unix_timestamp,
        launch.end_time,
        pool.total_committed,
        launch.graduation_target,
    ) {
        return Err(VestigeError::GraduationConditionsNotMet);
    }

    pool.is_finalized = true;
    pool_account.store(&pool)?;

    ctx.emit(Effect::Undelegate {
        account: pool_account.key,
    });

    msg!(
        ctx,
        "VG_GRADUATE_PRIVATE:{}:{}:{}",
        launch_account.key,
        pool.total_committed,
        pool.total_participants
    );
    Ok(())
}

/// Accounts:
/// `[user (signer), launch, pool, user_commitment, ephemeral_holding]`.
///
/// Returns the participant's records to the base ledger once the pool is
/// frozen. A record whose delegation never went through stays where it
/// is, so a half-delegated participant can still get home.
pub fn process_undelegate_user_commitment(
    ctx: &mut InvokeContext,
    accounts: &mut [AccountInfo],
) -> Result<()> {
    ctx.require_layer(Layer::Execution)?;

    let [user, launch_account, pool_account, commitment_account, holding_account] = accounts
    else {
        return Err(VestigeError::NotEnoughAccountKeys);
    };

    check_signer(user)?;
    let launch = load_launch(launch_account)?;

    check_key(pool_account, &seeds::derive_pool_pda(&launch_account.key).0)?;
    check_key(
        commitment_account,
        &seeds::derive_commitment_pda(&launch_account.key, &user.key).0,
    )?;
    check_key(
        holding_account,
        &seeds::derive_ephemeral_pda(&launch_account.key, &user.key).0,
    )?;

    if !launch.is_graduated {
        let pool: CommitmentPool = pool_account.load()?;
        if !pool.is_finalized {
            return Err(VestigeError::NotGraduated);
        }
    }

    // Either record may never have left the base ledger, so ownership is
    // read from whichever copy this layer sees.
    let commitment: UserCommitment = commitment_account.load_unchecked()?;
    let holding: EphemeralHolding = holding_account.load_unchecked()?;
    if commitment.user != user.key || holding.user != user.key {
        return Err(VestigeError::Unauthorized);
    }

    ctx.emit(Effect::UndelegateIfHeld {
        account: commitment_account.key,
    });
    ctx.emit(Effect::UndelegateIfHeld {
        account: holding_account.key,
    });

    msg!(ctx, "VG_UNDELEGATE:{}", user.key);
    Ok(())
}

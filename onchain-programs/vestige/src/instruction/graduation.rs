use vestige_account::{CommitmentPool, Launch, seeds};
use vestige_transaction::Layer;

use crate::{
    error::{Result, VestigeError},
    helpers::{AccountInfo, InvokeContext, check_creator, check_key, load_launch},
    msg,
};

fn settle(launch: &mut Launch, pool: &CommitmentPool, now: i64) {
    launch.total_committed = pool.total_committed;
    launch.total_participants = pool.total_participants;
    launch.total_weighted = pool.total_weighted;
    launch.is_graduated = true;
    launch.graduated_at = now;
}

/// Public graduation. Accounts: `[creator (signer), launch (w), pool (w)]`.
pub fn process_graduate(ctx: &mut InvokeContext, accounts: &mut [AccountInfo]) -> Result<()> {
    ctx.require_layer(Layer::Base)?;

    let [creator, launch_account, pool_account] = accounts else {
        return Err(VestigeError::NotEnoughAccountKeys);
    };

    let mut launch = load_launch(launch_account)?;
    check_creator(&launch, creator)?;
    if launch.is_graduated {
        return Err(VestigeError::AlreadyGraduated);
    }
    if launch.is_delegated {
        return Err(VestigeError::PoolDelegated);
    }

    check_key(pool_account, &seeds::derive_pool_pda(&launch_account.key).0)?;
    let mut pool: CommitmentPool = pool_account.load()?;

    if !ctx.policy.graduation.allows(
        ctx.unix_timestamp,
        launch.end_time,
        pool.total_committed,
        launch.graduation_target,
    ) {
        return Err(VestigeError::GraduationConditionsNotMet);
    }

    pool.is_finalized = true;
    settle(&mut launch, &pool, ctx.unix_timestamp);

    pool_account.store(&pool)?;
    launch_account.store(&launch)?;

    msg!(
        ctx,
        "VG_GRADUATE:{}:{}:{}",
        launch_account.key,
        launch.total_committed,
        launch.total_participants
    );
    Ok(())
}

/// Second half of private graduation.
/// Accounts: `[creator (signer), launch (w), pool]`.
///
/// Fails with `AccountNotYetSynced` while the pool is still on its way
/// back from the execution layer.
pub fn process_finalize_graduation(
    ctx: &mut InvokeContext,
    accounts: &mut [AccountInfo],
) -> Result<()> {
    ctx.require_layer(Layer::Base)?;

    let [creator, launch_account, pool_account] = accounts else {
        return Err(VestigeError::NotEnoughAccountKeys);
    };

    let mut launch = load_launch(launch_account)?;
    check_creator(&launch, creator)?;
    if launch.is_graduated {
        return Err(VestigeError::AlreadyGraduated);
    }
    if !launch.is_delegated {
        return Err(VestigeError::NotDelegated);
    }

    check_key(pool_account, &seeds::derive_pool_pda(&launch_account.key).0)?;
    if pool_account.is_delegated() {
        return Err(VestigeError::AccountNotYetSynced(pool_account.key));
    }
    let pool: CommitmentPool = pool_account.load()?;
    if !pool.is_finalized {
        return Err(VestigeError::GraduationNotFinalized);
    }

    settle(&mut launch, &pool, ctx.unix_timestamp);
    launch_account.store(&launch)?;

    msg!(
        ctx,
        "VG_GRADUATE:{}:{}:{}",
        launch_account.key,
        launch.total_committed,
        launch.total_participants
    );
    Ok(())
}

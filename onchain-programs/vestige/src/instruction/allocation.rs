use vestige_account::{UserCommitment, seeds};
use vestige_transaction::Layer;

use crate::{
    allocation,
    error::{Result, VestigeError},
    helpers::{AccountInfo, Effect, InvokeContext, check_key, check_signer, load_launch},
    msg,
};

/// Accounts: `[payer (signer), launch, user_commitment (w)]`.
///
/// Write-once: weight and tokens are fixed by the first successful call.
pub fn process_calculate_allocation(
    ctx: &mut InvokeContext,
    accounts: &mut [AccountInfo],
) -> Result<()> {
    ctx.require_layer(Layer::Base)?;

    let [payer, launch_account, commitment_account] = accounts else {
        return Err(VestigeError::NotEnoughAccountKeys);
    };

    check_signer(payer)?;
    let launch = load_launch(launch_account)?;
    if !launch.is_graduated {
        return Err(VestigeError::NotGraduated);
    }

    let mut commitment: UserCommitment = commitment_account.load()?;
    check_key(
        commitment_account,
        &seeds::derive_commitment_pda(&launch_account.key, &commitment.user).0,
    )?;
    if commitment.allocation_calculated() {
        return Err(VestigeError::AllocationAlreadyCalculated);
    }
    if !commitment.has_committed() {
        return Err(VestigeError::NothingCommitted);
    }

    let weight = allocation::weight_bps(launch.start_time, launch.end_time, commitment.commit_time);
    let weighted = allocation::weighted_amount(commitment.amount, weight);
    let tokens = allocation::tokens_for(launch.token_supply, weighted, launch.total_weighted)?;

    commitment.weight_bps = weight;
    commitment.tokens_allocated = tokens;
    commitment_account.store(&commitment)?;

    msg!(ctx, "VG_ALLOCATION:{}:{}:{}", commitment.user, weight, tokens);
    Ok(())
}

/// Accounts: `[user (signer), launch, user_commitment (w)]`.
pub fn process_claim_tokens(ctx: &mut InvokeContext, accounts: &mut [AccountInfo]) -> Result<()> {
    ctx.require_layer(Layer::Base)?;

    let [user, launch_account, commitment_account] = accounts else {
        return Err(VestigeError::NotEnoughAccountKeys);
    };

    check_signer(user)?;
    let launch = load_launch(launch_account)?;
    check_key(
        commitment_account,
        &seeds::derive_commitment_pda(&launch_account.key, &user.key).0,
    )?;

    let mut commitment: UserCommitment = commitment_account.load()?;
    if !commitment.allocation_calculated() {
        return Err(VestigeError::AllocationNotCalculated);
    }
    if commitment.has_claimed {
        return Err(VestigeError::AlreadyClaimed);
    }

    commitment.has_claimed = true;
    commitment_account.store(&commitment)?;

    if commitment.tokens_allocated > 0 {
        ctx.emit(Effect::TokenTransfer {
            mint: launch.token_mint,
            from: launch_account.key,
            to: user.key,
            amount: commitment.tokens_allocated,
        });
    }

    msg!(ctx, "VG_CLAIM:{}:{}", user.key, commitment.tokens_allocated);
    Ok(())
}

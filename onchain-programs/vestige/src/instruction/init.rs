use vestige_account::{EphemeralHolding, UserCommitment, seeds};
use vestige_transaction::Layer;

use crate::{
    error::{Result, VestigeError},
    helpers::{AccountInfo, InvokeContext, check_key, check_signer, load_launch},
    msg,
};

/// Accounts: `[user (signer), launch, user_commitment (w)]`.
///
/// A second call fails with `AccountAlreadyInitialized` and changes nothing.
pub fn process_init_user_commitment(
    ctx: &mut InvokeContext,
    accounts: &mut [AccountInfo],
) -> Result<()> {
    ctx.require_layer(Layer::Base)?;

    let [user, launch_account, commitment_account] = accounts else {
        return Err(VestigeError::NotEnoughAccountKeys);
    };

    check_signer(user)?;
    load_launch(launch_account)?;

    let (expected, bump) = seeds::derive_commitment_pda(&launch_account.key, &user.key);
    check_key(commitment_account, &expected)?;

    commitment_account.init(&UserCommitment::new(launch_account.key, user.key, bump))?;

    msg!(ctx, "VG_INIT_COMMITMENT:{}:{}", launch_account.key, user.key);
    Ok(())
}

/// Accounts: `[user (signer), launch, ephemeral_holding (w)]`.
pub fn process_init_ephemeral_holding(
    ctx: &mut InvokeContext,
    accounts: &mut [AccountInfo],
) -> Result<()> {
    ctx.require_layer(Layer::Base)?;

    let [user, launch_account, holding_account] = accounts else {
        return Err(VestigeError::NotEnoughAccountKeys);
    };

    check_signer(user)?;
    load_launch(launch_account)?;

    let (expected, bump) = seeds::derive_ephemeral_pda(&launch_account.key, &user.key);
    check_key(holding_account, &expected)?;

    holding_account.init(&EphemeralHolding::new(launch_account.key, user.key, bump))?;

    msg!(ctx, "VG_INIT_HOLDING:{}:{}", launch_account.key, user.key);
    Ok(())
}

use vestige_account::{Vault, seeds};
use vestige_transaction::Layer;

use crate::{
    error::{Result, VestigeError},
    helpers::{AccountInfo, InvokeContext, check_creator, check_key, load_launch, transfer_lamports},
    msg,
};

/// Accounts: `[creator (signer, w), launch, vault (w)]`.
///
/// Pays out whatever the Vault currently holds. Sweeps that land later
/// can be withdrawn with another call.
pub fn process_withdraw_funds(ctx: &mut InvokeContext, accounts: &mut [AccountInfo]) -> Result<()> {
    ctx.require_layer(Layer::Base)?;

    let [creator, launch_account, vault_account] = accounts else {
        return Err(VestigeError::NotEnoughAccountKeys);
    };

    let launch = load_launch(launch_account)?;
    check_creator(&launch, creator)?;
    if !launch.is_graduated {
        return Err(VestigeError::NotGraduated);
    }

    check_key(vault_account, &seeds::derive_vault_pda(&launch_account.key).0)?;
    let _vault: Vault = vault_account.load()?;

    let amount = vault_account.lamports();
    if amount > 0 {
        transfer_lamports(vault_account, creator, amount)?;
    }

    msg!(ctx, "VG_WITHDRAW:{}:{}", launch_account.key, amount);
    Ok(())
}

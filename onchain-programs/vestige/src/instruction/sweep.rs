use vestige_account::{EphemeralHolding, seeds};
use vestige_transaction::Layer;

use crate::{
    error::{Result, VestigeError},
    helpers::{AccountInfo, InvokeContext, check_key, check_signer, load_launch, transfer_lamports},
    msg,
};

/// Accounts:
/// `[payer (signer), launch, user (w), ephemeral_holding (w), vault (w)]`.
///
/// The only step that moves privately committed funds into the Vault.
/// Whatever was funded but never committed goes back to the participant,
/// so the holding ends empty. Anyone may pay for the sweep.
pub fn process_sweep_to_vault(ctx: &mut InvokeContext, accounts: &mut [AccountInfo]) -> Result<()> {
    ctx.require_layer(Layer::Base)?;

    let [payer, launch_account, user, holding_account, vault_account] = accounts else {
        return Err(VestigeError::NotEnoughAccountKeys);
    };

    check_signer(payer)?;
    let launch = load_launch(launch_account)?;
    if !launch.is_graduated {
        return Err(VestigeError::NotGraduated);
    }

    check_key(
        holding_account,
        &seeds::derive_ephemeral_pda(&launch_account.key, &user.key).0,
    )?;
    check_key(vault_account, &seeds::derive_vault_pda(&launch_account.key).0)?;

    let mut holding: EphemeralHolding = holding_account.load()?;
    if holding.user != user.key {
        return Err(VestigeError::Unauthorized);
    }
    if holding_account.lamports() < holding.tracked_total() {
        log::error!(
            "holding {} holds {} lamports but tracks {}",
            holding_account.key,
            holding_account.lamports(),
            holding.tracked_total()
        );
        return Err(VestigeError::InvalidAccountData);
    }

    let (swept, refunded) = (holding.committed, holding.balance);
    if swept == 0 && refunded == 0 {
        msg!(ctx, "VG_SWEEP:{}:0:0", user.key);
        return Ok(());
    }

    transfer_lamports(holding_account, vault_account, swept)?;
    transfer_lamports(holding_account, user, refunded)?;

    holding.committed = 0;
    holding.balance = 0;
    holding_account.store(&holding)?;

    msg!(ctx, "VG_SWEEP:{}:{}:{}", user.key, swept, refunded);
    Ok(())
}

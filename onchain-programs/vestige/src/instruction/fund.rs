use vestige_account::{EphemeralHolding, seeds};
use vestige_transaction::Layer;

use crate::{
    error::{Result, VestigeError},
    helpers::{
        AccountInfo, InvokeContext, check_amount, check_key, check_signer, load_launch,
        transfer_lamports,
    },
    instruction::AmountParams,
    msg,
};

/// Accounts: `[user (signer, w), launch, ephemeral_holding (w)]`.
///
/// Moves lamports from the wallet into the holding and credits its tracked
/// balance. The holding must still be owned by the program, so funding
/// always precedes delegation.
pub fn process_fund_ephemeral(
    ctx: &mut InvokeContext,
    accounts: &mut [AccountInfo],
    data: &[u8],
) -> Result<()> {
    ctx.require_layer(Layer::Base)?;

    let [user, launch_account, holding_account] = accounts else {
        return Err(VestigeError::NotEnoughAccountKeys);
    };

    let params = AmountParams::decode(data)?;
    check_signer(user)?;
    check_amount(params.amount)?;

    let launch = load_launch(launch_account)?;
    if launch.is_graduated {
        return Err(VestigeError::AlreadyGraduated);
    }

    let (expected, _) = seeds::derive_ephemeral_pda(&launch_account.key, &user.key);
    check_key(holding_account, &expected)?;

    let mut holding: EphemeralHolding = holding_account.load()?;
    if holding.user != user.key {
        return Err(VestigeError::Unauthorized);
    }

    transfer_lamports(user, holding_account, params.amount)?;
    holding.balance = holding
        .balance
        .checked_add(params.amount)
        .ok_or(VestigeError::ArithmeticOverflow)?;
    holding_account.store(&holding)?;

    msg!(ctx, "VG_FUND:{}:{}", holding_account.key, params.amount);
    Ok(())
}

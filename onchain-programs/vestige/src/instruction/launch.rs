use vestige_account::{CommitmentPool, Launch, Vault, seeds};
use vestige_transaction::Layer;

use crate::{
    error::{Result, VestigeError},
    helpers::{AccountInfo, Effect, InvokeContext, check_amount, check_key, check_signer},
    instruction::InitializeLaunchParams,
    msg,
};

/// Creates the Launch, its CommitmentPool and its Vault, and escrows the
/// token supply from the creator into the launch.
pub fn process_initialize_launch(
    ctx: &mut InvokeContext,
    accounts: &mut [AccountInfo],
    data: &[u8],
) -> Result<()> {
    ctx.require_layer(Layer::Base)?;

    let [creator, launch_account, pool_account, vault_account] = accounts else {
        return Err(VestigeError::NotEnoughAccountKeys);
    };

    let params = InitializeLaunchParams::decode(data)?;

    check_signer(creator)?;

    if params.start_time >= params.end_time {
        return Err(VestigeError::InvalidTimeRange {
            start: params.start_time,
            end: params.end_time,
        });
    }
    if params.min_commitment == 0 || params.min_commitment > params.max_commitment {
        return Err(VestigeError::InvalidCommitmentBounds {
            min: params.min_commitment,
            max: params.max_commitment,
        });
    }
    check_amount(params.token_supply)?;
    check_amount(params.graduation_target)?;

    let (launch_pda, launch_bump) = seeds::derive_launch_pda(&creator.key, &params.token_mint);
    check_key(launch_account, &launch_pda)?;
    let (pool_pda, pool_bump) = seeds::derive_pool_pda(&launch_pda);
    check_key(pool_account, &pool_pda)?;
    let (vault_pda, vault_bump) = seeds::derive_vault_pda(&launch_pda);
    check_key(vault_account, &vault_pda)?;

    launch_account.init(&Launch {
        creator: creator.key,
        token_mint: params.token_mint,
        token_supply: params.token_supply,
        start_time: params.start_time,
        end_time: params.end_time,
        graduation_target: params.graduation_target,
        min_commitment: params.min_commitment,
        max_commitment: params.max_commitment,
        total_committed: 0,
        total_participants: 0,
        total_weighted: 0,
        is_delegated: false,
        is_graduated: false,
        graduated_at: 0,
        bump: launch_bump,
    })?;

    pool_account.init(&CommitmentPool {
        launch: launch_pda,
        total_committed: 0,
        total_participants: 0,
        total_weighted: 0,
        is_finalized: false,
        bump: pool_bump,
    })?;

    vault_account.init(&Vault {
        launch: launch_pda,
        bump: vault_bump,
    })?;

    ctx.emit(Effect::TokenTransfer {
        mint: params.token_mint,
        from: creator.key,
        to: launch_pda,
        amount: params.token_supply,
    });

    msg!(
        ctx,
        "VG_LAUNCH:{}:{}:{}:{}",
        launch_pda,
        params.token_supply,
        params.start_time,
        params.end_time
    );

    Ok(())
}

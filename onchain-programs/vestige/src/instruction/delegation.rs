use vestige_account::{AccountType, DelegationRecord, Launch, Permission, seeds};
use vestige_pubkey::Pubkey;
use vestige_transaction::Layer;

use crate::{
    ID,
    error::{Result, VestigeError},
    helpers::{AccountInfo, Effect, InvokeContext, check_key, check_signer, load_launch},
    instruction::{CreatePermissionParams, DelegateParams},
    msg,
};

/// Address `payer` may delegate for `account_type` in this launch.
fn expected_target(
    launch_key: &Pubkey,
    launch: &Launch,
    payer: &Pubkey,
    account_type: AccountType,
) -> Result<Pubkey> {
    match account_type {
        AccountType::CommitmentPool => {
            if &launch.creator != payer {
                return Err(VestigeError::Unauthorized);
            }
            Ok(seeds::derive_pool_pda(launch_key).0)
        }
        AccountType::UserCommitment => Ok(seeds::derive_commitment_pda(launch_key, payer).0),
        AccountType::EphemeralHolding => Ok(seeds::derive_ephemeral_pda(launch_key, payer).0),
    }
}

fn check_target(
    launch_account: &AccountInfo,
    launch: &Launch,
    payer: &AccountInfo,
    target: &AccountInfo,
    account_type: u8,
) -> Result<AccountType> {
    if target.key == seeds::derive_vault_pda(&launch_account.key).0 {
        return Err(VestigeError::VaultNotDelegatable);
    }
    let account_type =
        AccountType::try_from(account_type).map_err(|_| VestigeError::InvalidInstructionData)?;
    let expected = expected_target(&launch_account.key, launch, &payer.key, account_type)?;
    check_key(target, &expected)?;
    Ok(account_type)
}

/// Accounts: `[payer (signer, w), launch, target, permission (w)]`.
///
/// Records who may read `target` once it lives on the execution layer.
pub fn process_create_permission(
    ctx: &mut InvokeContext,
    accounts: &mut [AccountInfo],
    data: &[u8],
) -> Result<()> {
    ctx.require_layer(Layer::Base)?;

    let [payer, launch_account, target, permission_account] = accounts else {
        return Err(VestigeError::NotEnoughAccountKeys);
    };

    let params = CreatePermissionParams::decode(data)?;
    check_signer(payer)?;

    let launch = load_launch(launch_account)?;
    let account_type = check_target(launch_account, &launch, payer, target, params.account_type)?;

    let (expected, bump) = seeds::derive_permission_pda(&target.key);
    check_key(permission_account, &expected)?;
    if !permission_account.data_is_empty() {
        return Err(VestigeError::PermissionAlreadyExists);
    }

    permission_account.init(&Permission {
        account: target.key,
        authority: payer.key,
        members: params.members,
        bump,
    })?;

    msg!(ctx, "VG_PERMISSION:{}:{}", account_type, target.key);
    Ok(())
}

/// Accounts:
/// `[payer (signer), launch (w), target (w), permission, delegation_record]`.
///
/// Delegating the pool switches the launch into private mode. Participant
/// records can only follow once the pool went first.
pub fn process_delegate(
    ctx: &mut InvokeContext,
    accounts: &mut [AccountInfo],
    data: &[u8],
) -> Result<()> {
    ctx.require_layer(Layer::Base)?;

    let [payer, launch_account, target, permission_account, record_account] = accounts else {
        return Err(VestigeError::NotEnoughAccountKeys);
    };

    let params = DelegateParams::decode(data)?;
    check_signer(payer)?;

    let mut launch = load_launch(launch_account)?;
    let account_type = check_target(launch_account, &launch, payer, target, params.account_type)?;

    check_key(record_account, &seeds::derive_delegation_record_pda(&target.key).0)?;
    if !record_account.data_is_empty() {
        let record: DelegationRecord = record_account.load_unchecked()?;
        if record.in_transition() {
            return Err(VestigeError::DelegationConflict);
        }
        return Err(VestigeError::AlreadyDelegated);
    }
    if target.is_delegated() {
        return Err(VestigeError::AlreadyDelegated);
    }
    if target.data_is_empty() {
        return Err(VestigeError::UninitializedAccount);
    }

    check_key(permission_account, &seeds::derive_permission_pda(&target.key).0)?;
    if permission_account.data_is_empty() {
        return Err(VestigeError::MissingPermission);
    }

    if launch.is_graduated {
        return Err(VestigeError::AlreadyGraduated);
    }

    match account_type {
        AccountType::CommitmentPool => {
            if !launch.is_delegated {
                launch.is_delegated = true;
                launch_account.store(&launch)?;
            }
        }
        AccountType::UserCommitment | AccountType::EphemeralHolding => {
            if !launch.is_delegated {
                return Err(VestigeError::NotDelegated);
            }
        }
    }

    ctx.emit(Effect::Delegate {
        account: target.key,
        owner_program: ID,
        validator: params.validator,
    });

    msg!(ctx, "VG_DELEGATE:{}:{}", account_type, target.key);
    Ok(())
}

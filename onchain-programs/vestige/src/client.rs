//! Instruction builders for off-chain callers.
//!
//! Account order matches the `let [..] = accounts` patterns in the
//! processors.

use vestige_account::{AccountType, seeds};
use vestige_pubkey::Pubkey;
use vestige_transaction::{AccountMeta, Instruction};

use crate::{
    ID,
    error::Result,
    instruction::{
        AmountParams, CreatePermissionParams, DelegateParams, InitializeLaunchParams, VestigeIx,
    },
};

fn build(tag: VestigeIx, params: Vec<u8>, accounts: Vec<AccountMeta>) -> Instruction {
    let mut data = vec![tag as u8];
    data.extend_from_slice(&params);
    Instruction {
        program_id: ID,
        accounts,
        data,
    }
}

/// Address of the record `owner` may delegate for `account_type`.
pub fn delegatable_address(launch: &Pubkey, owner: &Pubkey, account_type: AccountType) -> Pubkey {
    match account_type {
        AccountType::CommitmentPool => seeds::derive_pool_pda(launch).0,
        AccountType::UserCommitment => seeds::derive_commitment_pda(launch, owner).0,
        AccountType::EphemeralHolding => seeds::derive_ephemeral_pda(launch, owner).0,
    }
}

// ============================================================================
// Base ledger
// ============================================================================

pub fn initialize_launch(creator: &Pubkey, params: &InitializeLaunchParams) -> Result<Instruction> {
    let (launch, _) = seeds::derive_launch_pda(creator, &params.token_mint);
    Ok(build(
        VestigeIx::InitializeLaunch,
        params.encode()?,
        vec![
            AccountMeta::new(*creator, true),
            AccountMeta::new(launch, false),
            AccountMeta::new(seeds::derive_pool_pda(&launch).0, false),
            AccountMeta::new(seeds::derive_vault_pda(&launch).0, false),
        ],
    ))
}

pub fn init_user_commitment(user: &Pubkey, launch: &Pubkey) -> Instruction {
    build(
        VestigeIx::InitUserCommitment,
        Vec::new(),
        vec![
            AccountMeta::new_readonly(*user, true),
            AccountMeta::new_readonly(*launch, false),
            AccountMeta::new(seeds::derive_commitment_pda(launch, user).0, false),
        ],
    )
}

pub fn init_ephemeral_holding(user: &Pubkey, launch: &Pubkey) -> Instruction {
    build(
        VestigeIx::InitEphemeralHolding,
        Vec::new(),
        vec![
            AccountMeta::new_readonly(*user, true),
            AccountMeta::new_readonly(*launch, false),
            AccountMeta::new(seeds::derive_ephemeral_pda(launch, user).0, false),
        ],
    )
}

pub fn fund_ephemeral(user: &Pubkey, launch: &Pubkey, amount: u64) -> Result<Instruction> {
    Ok(build(
        VestigeIx::FundEphemeral,
        AmountParams { amount }.encode()?,
        vec![
            AccountMeta::new(*user, true),
            AccountMeta::new_readonly(*launch, false),
            AccountMeta::new(seeds::derive_ephemeral_pda(launch, user).0, false),
        ],
    ))
}

pub fn commit(user: &Pubkey, launch: &Pubkey, amount: u64) -> Result<Instruction> {
    Ok(build(
        VestigeIx::Commit,
        AmountParams { amount }.encode()?,
        vec![
            AccountMeta::new(*user, true),
            AccountMeta::new_readonly(*launch, false),
            AccountMeta::new(seeds::derive_pool_pda(launch).0, false),
            AccountMeta::new(seeds::derive_commitment_pda(launch, user).0, false),
            AccountMeta::new(seeds::derive_vault_pda(launch).0, false),
        ],
    ))
}

pub fn graduate(creator: &Pubkey, launch: &Pubkey) -> Instruction {
    build(
        VestigeIx::Graduate,
        Vec::new(),
        vec![
            AccountMeta::new_readonly(*creator, true),
            AccountMeta::new(*launch, false),
            AccountMeta::new(seeds::derive_pool_pda(launch).0, false),
        ],
    )
}

pub fn finalize_graduation(creator: &Pubkey, launch: &Pubkey) -> Instruction {
    build(
        VestigeIx::FinalizeGraduation,
        Vec::new(),
        vec![
            AccountMeta::new_readonly(*creator, true),
            AccountMeta::new(*launch, false),
            AccountMeta::new_readonly(seeds::derive_pool_pda(launch).0, false),
        ],
    )
}

pub fn sweep_to_vault(payer: &Pubkey, launch: &Pubkey, user: &Pubkey) -> Instruction {
    build(
        VestigeIx::SweepToVault,
        Vec::new(),
        vec![
            AccountMeta::new_readonly(*payer, true),
            AccountMeta::new_readonly(*launch, false),
            AccountMeta::new(*user, false),
            AccountMeta::new(seeds::derive_ephemeral_pda(launch, user).0, false),
            AccountMeta::new(seeds::derive_vault_pda(launch).0, false),
        ],
    )
}

pub fn calculate_allocation(payer: &Pubkey, launch: &Pubkey, user: &Pubkey) -> Instruction {
    build(
        VestigeIx::CalculateAllocation,
        Vec::new(),
        vec![
            AccountMeta::new_readonly(*payer, true),
            AccountMeta::new_readonly(*launch, false),
            AccountMeta::new(seeds::derive_commitment_pda(launch, user).0, false),
        ],
    )
}

pub fn claim_tokens(user: &Pubkey, launch: &Pubkey) -> Instruction {
    build(
        VestigeIx::ClaimTokens,
        Vec::new(),
        vec![
            AccountMeta::new_readonly(*user, true),
            AccountMeta::new_readonly(*launch, false),
            AccountMeta::new(seeds::derive_commitment_pda(launch, user).0, false),
        ],
    )
}

pub fn withdraw_funds(creator: &Pubkey, launch: &Pubkey) -> Instruction {
    build(
        VestigeIx::WithdrawFunds,
        Vec::new(),
        vec![
            AccountMeta::new(*creator, true),
            AccountMeta::new_readonly(*launch, false),
            AccountMeta::new(seeds::derive_vault_pda(launch).0, false),
        ],
    )
}

pub fn create_permission(
    payer: &Pubkey,
    launch: &Pubkey,
    account_type: AccountType,
    members: Vec<Pubkey>,
) -> Result<Instruction> {
    let target = delegatable_address(launch, payer, account_type);
    Ok(build(
        VestigeIx::CreatePermission,
        CreatePermissionParams {
            account_type: account_type as u8,
            members,
        }
        .encode()?,
        vec![
            AccountMeta::new(*payer, true),
            AccountMeta::new_readonly(*launch, false),
            AccountMeta::new_readonly(target, false),
            AccountMeta::new(seeds::derive_permission_pda(&target).0, false),
        ],
    ))
}

pub fn delegate(
    payer: &Pubkey,
    launch: &Pubkey,
    account_type: AccountType,
    validator: &Pubkey,
) -> Result<Instruction> {
    let target = delegatable_address(launch, payer, account_type);
    Ok(build(
        VestigeIx::Delegate,
        DelegateParams {
            account_type: account_type as u8,
            validator: *validator,
        }
        .encode()?,
        vec![
            AccountMeta::new_readonly(*payer, true),
            AccountMeta::new(*launch, false),
            AccountMeta::new(target, false),
            AccountMeta::new_readonly(seeds::derive_permission_pda(&target).0, false),
            AccountMeta::new_readonly(seeds::derive_delegation_record_pda(&target).0, false),
        ],
    ))
}

// ============================================================================
// Execution layer
// ============================================================================

pub fn private_commit(user: &Pubkey, launch: &Pubkey, amount: u64) -> Result<Instruction> {
    Ok(build(
        VestigeIx::PrivateCommit,
        AmountParams { amount }.encode()?,
        vec![
            AccountMeta::new_readonly(*user, true),
            AccountMeta::new_readonly(*launch, false),
            AccountMeta::new(seeds::derive_pool_pda(launch).0, false),
            AccountMeta::new(seeds::derive_commitment_pda(launch, user).0, false),
            AccountMeta::new(seeds::derive_ephemeral_pda(launch, user).0, false),
        ],
    ))
}

pub fn graduate_and_undelegate(creator: &Pubkey, launch: &Pubkey) -> Instruction {
    build(
        VestigeIx::GraduateAndUndelegate,
        Vec::new(),
        vec![
            AccountMeta::new_readonly(*creator, true),
            AccountMeta::new_readonly(*launch, false),
            AccountMeta::new(seeds::derive_pool_pda(launch).0, false),
        ],
    )
}

pub fn undelegate_user_commitment(user: &Pubkey, launch: &Pubkey) -> Instruction {
    build(
        VestigeIx::UndelegateUserCommitment,
        Vec::new(),
        vec![
            AccountMeta::new_readonly(*user, true),
            AccountMeta::new_readonly(*launch, false),
            AccountMeta::new_readonly(seeds::derive_pool_pda(launch).0, false),
            // Not written; the layer only hands back the ones it holds.
            AccountMeta::new_readonly(seeds::derive_commitment_pda(launch, user).0, false),
            AccountMeta::new_readonly(seeds::derive_ephemeral_pda(launch, user).0, false),
        ],
    )
}

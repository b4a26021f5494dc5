use vestige_pubkey::Pubkey;

use crate::{
    ID,
    error::{Result, VestigeError},
    helpers::{AccountInfo, InvokeContext},
    instruction::{self, VestigeIx},
};

/// Dispatch one instruction. The host commits `accounts` and the effects
/// recorded in `ctx` only when this returns `Ok`.
pub fn process_instruction(
    ctx: &mut InvokeContext,
    program_id: &Pubkey,
    accounts: &mut [AccountInfo],
    instruction_data: &[u8],
) -> Result<()> {
    if program_id != &ID {
        return Err(VestigeError::IncorrectProgramId);
    }

    let (discriminator, data) = instruction_data
        .split_first()
        .ok_or(VestigeError::InvalidInstructionData)?;

    match VestigeIx::try_from(discriminator)? {
        VestigeIx::InitializeLaunch => instruction::launch::process_initialize_launch(ctx, accounts, data),
        VestigeIx::InitUserCommitment => instruction::init::process_init_user_commitment(ctx, accounts),
        VestigeIx::InitEphemeralHolding => instruction::init::process_init_ephemeral_holding(ctx, accounts),
        VestigeIx::FundEphemeral => instruction::fund::process_fund_ephemeral(ctx, accounts, data),
        VestigeIx::Commit => instruction::commit::process_commit(ctx, accounts, data),
        VestigeIx::Graduate => instruction::graduation::process_graduate(ctx, accounts),
        VestigeIx::FinalizeGraduation => instruction::graduation::process_finalize_graduation(ctx, accounts),
        VestigeIx::SweepToVault => instruction::sweep::process_sweep_to_vault(ctx, accounts),
        VestigeIx::CalculateAllocation => instruction::allocation::process_calculate_allocation(ctx, accounts),
        VestigeIx::ClaimTokens => instruction::allocation::process_claim_tokens(ctx, accounts),
        VestigeIx::WithdrawFunds => instruction::withdraw::process_withdraw_funds(ctx, accounts),
        VestigeIx::CreatePermission => instruction::delegation::process_create_permission(ctx, accounts, data),
        VestigeIx::Delegate => instruction::delegation::process_delegate(ctx, accounts, data),
        VestigeIx::PrivateCommit => instruction::private::process_private_commit(ctx, accounts, data),
        VestigeIx::GraduateAndUndelegate => instruction::private::process_graduate_and_undelegate(ctx, accounts),
        VestigeIx::UndelegateUserCommitment => instruction::private::process_undelegate_user_commitment(ctx, accounts),
    }
}

//! Deterministic addresses for every record.

use vestige_pubkey::Pubkey;

use crate::{DELEGATION_PROGRAM_ID, VESTIGE_PROGRAM_ID};

pub const LAUNCH_SEED: &[u8] = b"launch";
pub const POOL_SEED: &[u8] = b"commitment_pool";
pub const COMMITMENT_SEED: &[u8] = b"commitment";
pub const EPHEMERAL_SEED: &[u8] = b"ephemeral";
pub const VAULT_SEED: &[u8] = b"vault";
pub const PERMISSION_SEED: &[u8] = b"permission";
pub const DELEGATION_SEED: &[u8] = b"delegation";

#[inline(always)]
pub fn derive_launch_pda(creator: &Pubkey, token_mint: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[LAUNCH_SEED, creator.as_ref(), token_mint.as_ref()],
        &VESTIGE_PROGRAM_ID,
    )
}

#[inline(always)]
pub fn derive_pool_pda(launch: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[POOL_SEED, launch.as_ref()], &VESTIGE_PROGRAM_ID)
}

#[inline(always)]
pub fn derive_commitment_pda(launch: &Pubkey, user: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[COMMITMENT_SEED, launch.as_ref(), user.as_ref()],
        &VESTIGE_PROGRAM_ID,
    )
}

#[inline(always)]
pub fn derive_ephemeral_pda(launch: &Pubkey, user: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[EPHEMERAL_SEED, launch.as_ref(), user.as_ref()],
        &VESTIGE_PROGRAM_ID,
    )
}

#[inline(always)]
pub fn derive_vault_pda(launch: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[VAULT_SEED, launch.as_ref()], &VESTIGE_PROGRAM_ID)
}

#[inline(always)]
pub fn derive_permission_pda(account: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[PERMISSION_SEED, account.as_ref()], &VESTIGE_PROGRAM_ID)
}

/// Lives under the delegation program, not ours.
#[inline(always)]
pub fn derive_delegation_record_pda(account: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[DELEGATION_SEED, account.as_ref()], &DELEGATION_PROGRAM_ID)
}

/// Every address one participant touches in a launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParticipantAddresses {
    pub launch: Pubkey,
    pub pool: Pubkey,
    pub vault: Pubkey,
    pub user: Pubkey,
    pub commitment: Pubkey,
    pub ephemeral: Pubkey,
}

impl ParticipantAddresses {
    pub fn derive(launch: Pubkey, user: Pubkey) -> Self {
        Self {
            launch,
            pool: derive_pool_pda(&launch).0,
            vault: derive_vault_pda(&launch).0,
            user,
            commitment: derive_commitment_pda(&launch, &user).0,
            ephemeral: derive_ephemeral_pda(&launch, &user).0,
        }
    }
}

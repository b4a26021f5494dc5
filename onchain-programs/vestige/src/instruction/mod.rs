use vestige_pubkey::Pubkey;
use wincode::{SchemaRead, SchemaWrite};

use crate::error::VestigeError;

pub mod allocation;
pub mod commit;
pub mod delegation;
pub mod fund;
pub mod graduation;
pub mod init;
pub mod launch;
pub mod private;
pub mod sweep;
pub mod withdraw;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VestigeIx {
    // base ledger
    InitializeLaunch = 0,
    InitUserCommitment = 1,
    InitEphemeralHolding = 2,
    FundEphemeral = 3,
    Commit = 4,
    Graduate = 5,
    FinalizeGraduation = 6,
    SweepToVault = 7,
    CalculateAllocation = 8,
    ClaimTokens = 9,
    WithdrawFunds = 10,
    CreatePermission = 11,
    Delegate = 12,
    // execution layer
    PrivateCommit = 13,
    GraduateAndUndelegate = 14,
    UndelegateUserCommitment = 15,
}

impl TryFrom<&u8> for VestigeIx {
    type Error = VestigeError;

    fn try_from(value: &u8) -> Result<Self, Self::Error> {
        match *value {
            0 => Ok(VestigeIx::InitializeLaunch),
            1 => Ok(VestigeIx::InitUserCommitment),
            2 => Ok(VestigeIx::InitEphemeralHolding),
            3 => Ok(VestigeIx::FundEphemeral),
            4 => Ok(VestigeIx::Commit),
            5 => Ok(VestigeIx::Graduate),
            6 => Ok(VestigeIx::FinalizeGraduation),
            7 => Ok(VestigeIx::SweepToVault),
            8 => Ok(VestigeIx::CalculateAllocation),
            9 => Ok(VestigeIx::ClaimTokens),
            10 => Ok(VestigeIx::WithdrawFunds),
            11 => Ok(VestigeIx::CreatePermission),
            12 => Ok(VestigeIx::Delegate),
            13 => Ok(VestigeIx::PrivateCommit),
            14 => Ok(VestigeIx::GraduateAndUndelegate),
            15 => Ok(VestigeIx::UndelegateUserCommitment),
            _ => Err(VestigeError::InvalidInstructionData),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, SchemaRead, SchemaWrite)]
pub struct InitializeLaunchParams {
    pub token_mint: Pubkey,
    pub token_supply: u64,
    pub start_time: i64,
    pub end_time: i64,
    pub graduation_target: u64,
    pub min_commitment: u64,
    pub max_commitment: u64,
}

/// Shared by `FundEphemeral`, `Commit` and `PrivateCommit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, SchemaRead, SchemaWrite)]
pub struct AmountParams {
    pub amount: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, SchemaRead, SchemaWrite)]
pub struct CreatePermissionParams {
    /// `AccountType` tag.
    pub account_type: u8,
    pub members: Vec<Pubkey>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, SchemaRead, SchemaWrite)]
pub struct DelegateParams {
    /// `AccountType` tag.
    pub account_type: u8,
    /// Operator of the execution layer that receives write authority.
    pub validator: Pubkey,
}

macro_rules! impl_ix_params {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $ty {
                pub fn encode(&self) -> Result<Vec<u8>, VestigeError> {
                    wincode::serialize(self).map_err(|_| VestigeError::InvalidInstructionData)
                }

                pub fn decode(bytes: &[u8]) -> Result<Self, VestigeError> {
                    wincode::deserialize::<$ty>(bytes)
                        .map_err(|_| VestigeError::InvalidInstructionData)
                }
            }
        )*
    };
}

impl_ix_params!(
    InitializeLaunchParams,
    AmountParams,
    CreatePermissionParams,
    DelegateParams,
);

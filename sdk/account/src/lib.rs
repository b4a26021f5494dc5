//! Account model shared by the program, the ledger host and clients.
//!
//! ```text
//!   Launch ─┬─ CommitmentPool        (delegatable, contended)
//!           ├─ Vault                 (never delegated)
//!           └─ per participant:
//!                ├─ UserCommitment   (delegatable)
//!                └─ EphemeralHolding (delegatable)
//! ```
//!
//! Every record lives in `Account::data` as an 8-byte discriminator
//! followed by the wincode body.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use vestige_pubkey::Pubkey;

pub mod ids;
pub mod seeds;
pub mod state;

pub use ids::*;
pub use state::*;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("Account data too short for a {0} record")]
    TooShort(&'static str),

    #[error("Discriminator mismatch: expected {0}")]
    WrongDiscriminator(&'static str),

    #[error("Failed to decode {record}: {reason}")]
    Decode { record: &'static str, reason: String },

    #[error("Failed to encode {record}: {reason}")]
    Encode { record: &'static str, reason: String },

    #[error("Unknown account type tag: {0}")]
    UnknownAccountType(u8),
}

/// The state of an address on a ledger layer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub lamports: u64,
    pub owner: Pubkey,
    #[serde(with = "hex::serde")]
    pub data: Vec<u8>,
}

impl Account {
    /// A plain wallet: lamports only, owned by the system program.
    pub fn new_wallet(lamports: u64) -> Self {
        Self {
            lamports,
            owner: SYSTEM_PROGRAM_ID,
            data: Vec::new(),
        }
    }

    pub fn new_owned(owner: Pubkey, data: Vec<u8>) -> Self {
        Self {
            lamports: 0,
            owner,
            data,
        }
    }

    pub fn is_owned_by(&self, program: &Pubkey) -> bool {
        &self.owner == program
    }

    pub fn has_data(&self) -> bool {
        !self.data.is_empty()
    }
}

/// The per-participant and pool records that can be handed to the
/// execution layer. The Vault is deliberately absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum AccountType {
    CommitmentPool = 0,
    UserCommitment = 1,
    EphemeralHolding = 2,
}

impl TryFrom<u8> for AccountType {
    type Error = RecordError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(AccountType::CommitmentPool),
            1 => Ok(AccountType::UserCommitment),
            2 => Ok(AccountType::EphemeralHolding),
            other => Err(RecordError::UnknownAccountType(other)),
        }
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AccountType::CommitmentPool => "commitment_pool",
            AccountType::UserCommitment => "user_commitment",
            AccountType::EphemeralHolding => "ephemeral_holding",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_type_tags() {
        for ty in [
            AccountType::CommitmentPool,
            AccountType::UserCommitment,
            AccountType::EphemeralHolding,
        ] {
            assert_eq!(AccountType::try_from(ty as u8), Ok(ty));
        }
        assert_eq!(
            AccountType::try_from(3),
            Err(RecordError::UnknownAccountType(3))
        );
    }

    #[test]
    fn test_wallet_is_system_owned() {
        let wallet = Account::new_wallet(42);
        assert!(wallet.is_owned_by(&SYSTEM_PROGRAM_ID));
        assert!(!wallet.has_data());
    }
}

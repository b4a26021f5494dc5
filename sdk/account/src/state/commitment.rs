use serde::{Deserialize, Serialize};
use vestige_pubkey::Pubkey;
use wincode::{SchemaRead, SchemaWrite};

use super::impl_account_record;

#[derive(Debug, Clone, PartialEq, Eq, SchemaRead, SchemaWrite, Serialize, Deserialize)]
pub struct UserCommitment {
    pub launch: Pubkey,
    pub user: Pubkey,
    pub amount: u64,
    /// Time of the first commit; zero until then.
    pub commit_time: i64,
    /// Write-once. Zero means not yet calculated.
    pub weight_bps: u64,
    pub tokens_allocated: u64,
    pub has_claimed: bool,
    pub bump: u8,
}

impl_account_record!(UserCommitment, "UserCommitment", *b"vg:commt");

impl UserCommitment {
    pub fn new(launch: Pubkey, user: Pubkey, bump: u8) -> Self {
        Self {
            launch,
            user,
            amount: 0,
            commit_time: 0,
            weight_bps: 0,
            tokens_allocated: 0,
            has_claimed: false,
            bump,
        }
    }

    pub fn has_committed(&self) -> bool {
        self.amount > 0
    }

    pub fn allocation_calculated(&self) -> bool {
        self.weight_bps != 0
    }
}

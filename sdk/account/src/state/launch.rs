use serde::{Deserialize, Serialize};
use vestige_pubkey::Pubkey;
use wincode::{SchemaRead, SchemaWrite};

use super::impl_account_record;

/// One token sale. Totals are only written by settlement.
#[derive(Debug, Clone, PartialEq, Eq, SchemaRead, SchemaWrite, Serialize, Deserialize)]
pub struct Launch {
    pub creator: Pubkey,
    pub token_mint: Pubkey,
    pub token_supply: u64,
    pub start_time: i64,
    pub end_time: i64,
    pub graduation_target: u64,
    pub min_commitment: u64,
    pub max_commitment: u64,
    pub total_committed: u64,
    pub total_participants: u64,
    /// Σ amount × weight_bps, copied from the pool at graduation.
    pub total_weighted: u128,
    pub is_delegated: bool,
    pub is_graduated: bool,
    /// Zero until graduated.
    pub graduated_at: i64,
    pub bump: u8,
}

impl_account_record!(Launch, "Launch", *b"vg:launc");

impl Launch {
    pub fn sale_open(&self, now: i64) -> bool {
        now >= self.start_time && now < self.end_time
    }

    pub fn sale_ended(&self, now: i64) -> bool {
        now >= self.end_time
    }
}

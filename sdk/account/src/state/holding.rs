use serde::{Deserialize, Serialize};
use vestige_pubkey::Pubkey;
use wincode::{SchemaRead, SchemaWrite};

use super::impl_account_record;

/// Staging account for private commitments.
///
/// The account's lamports are what it physically holds; `balance` and
/// `committed` are bookkeeping. A private commit moves value from
/// `balance` to `committed` without moving lamports, so
/// `lamports == balance + committed` until the sweep.
#[derive(Debug, Clone, PartialEq, Eq, SchemaRead, SchemaWrite, Serialize, Deserialize)]
pub struct EphemeralHolding {
    pub launch: Pubkey,
    pub user: Pubkey,
    pub balance: u64,
    pub committed: u64,
    pub bump: u8,
}

impl_account_record!(EphemeralHolding, "EphemeralHolding", *b"vg:ephem");

impl EphemeralHolding {
    pub fn new(launch: Pubkey, user: Pubkey, bump: u8) -> Self {
        Self {
            launch,
            user,
            balance: 0,
            committed: 0,
            bump,
        }
    }

    pub fn tracked_total(&self) -> u64 {
        self.balance.saturating_add(self.committed)
    }
}

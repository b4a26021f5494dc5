use serde::{Deserialize, Serialize};
use vestige_pubkey::Pubkey;
use wincode::{SchemaRead, SchemaWrite};

use super::impl_account_record;

/// Running aggregate of a sale while it is open.
#[derive(Debug, Clone, PartialEq, Eq, SchemaRead, SchemaWrite, Serialize, Deserialize)]
pub struct CommitmentPool {
    pub launch: Pubkey,
    pub total_committed: u64,
    pub total_participants: u64,
    pub total_weighted: u128,
    pub is_finalized: bool,
    pub bump: u8,
}

impl_account_record!(CommitmentPool, "CommitmentPool", *b"vg:pool_");

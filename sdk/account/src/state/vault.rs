use serde::{Deserialize, Serialize};
use vestige_pubkey::Pubkey;
use wincode::{SchemaRead, SchemaWrite};

use super::impl_account_record;

/// Escrow for a sale. Lamports are the funds; never delegated.
#[derive(Debug, Clone, PartialEq, Eq, SchemaRead, SchemaWrite, Serialize, Deserialize)]
pub struct Vault {
    pub launch: Pubkey,
    pub bump: u8,
}

impl_account_record!(Vault, "Vault", *b"vg:vault");

use serde::{Deserialize, Serialize};
use vestige_pubkey::Pubkey;
use wincode::{SchemaRead, SchemaWrite};

use super::impl_account_record;

/// Who may read a delegated account on the execution layer.
#[derive(Debug, Clone, PartialEq, Eq, SchemaRead, SchemaWrite, Serialize, Deserialize)]
pub struct Permission {
    pub account: Pubkey,
    /// Identity that created the permission; always allowed.
    pub authority: Pubkey,
    pub members: Vec<Pubkey>,
    pub bump: u8,
}

impl_account_record!(Permission, "Permission", *b"vg:permi");

impl Permission {
    pub fn allows(&self, identity: &Pubkey) -> bool {
        &self.authority == identity || self.members.contains(identity)
    }
}

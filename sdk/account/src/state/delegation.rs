use serde::{Deserialize, Serialize};
use vestige_pubkey::Pubkey;
use wincode::{SchemaRead, SchemaWrite};

use super::impl_account_record;

pub const DELEGATION_STATE_DELEGATING: u8 = 1;
pub const DELEGATION_STATE_DELEGATED: u8 = 2;
pub const DELEGATION_STATE_UNDELEGATING: u8 = 3;

/// Kept by the delegation program while an account is away from the base ledger.
#[derive(Debug, Clone, PartialEq, Eq, SchemaRead, SchemaWrite, Serialize, Deserialize)]
pub struct DelegationRecord {
    pub account: Pubkey,
    /// Program that owned the account before delegation; it gets it back.
    pub owner_program: Pubkey,
    pub validator: Pubkey,
    pub state: u8,
    pub requested_at: i64,
}

impl_account_record!(DelegationRecord, "DelegationRecord", *b"vg:deleg");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DelegationState {
    Delegating,
    Delegated,
    Undelegating,
}

impl DelegationRecord {
    pub fn delegation_state(&self) -> Option<DelegationState> {
        match self.state {
            DELEGATION_STATE_DELEGATING => Some(DelegationState::Delegating),
            DELEGATION_STATE_DELEGATED => Some(DelegationState::Delegated),
            DELEGATION_STATE_UNDELEGATING => Some(DelegationState::Undelegating),
            _ => None,
        }
    }

    pub fn in_transition(&self) -> bool {
        matches!(
            self.delegation_state(),
            Some(DelegationState::Delegating | DelegationState::Undelegating)
        )
    }
}

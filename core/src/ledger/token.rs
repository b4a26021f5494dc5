//! Mint-scoped token balances.
//!
//! Stands in for the token program: the Vestige program never touches
//! token accounts directly, it asks the host for a transfer through
//! [`vestige_program::Effect::TokenTransfer`].

use std::collections::HashMap;

use vestige_program::VestigeError;
use vestige_pubkey::Pubkey;

use super::{LedgerError, Result};

/// One requested movement of tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenTransfer {
    pub mint: Pubkey,
    pub from: Pubkey,
    pub to: Pubkey,
    pub amount: u64,
}

#[derive(Debug, Default, Clone)]
pub struct TokenBank {
    /// (mint, holder) -> balance
    balances: HashMap<(Pubkey, Pubkey), u64>,
}

impl TokenBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance(&self, mint: &Pubkey, holder: &Pubkey) -> u64 {
        self.balances.get(&(*mint, *holder)).copied().unwrap_or(0)
    }

    pub fn mint_to(&mut self, mint: &Pubkey, holder: &Pubkey, amount: u64) -> Result<()> {
        let entry = self.balances.entry((*mint, *holder)).or_insert(0);
        *entry = entry
            .checked_add(amount)
            .ok_or(LedgerError::Program(VestigeError::ArithmeticOverflow))?;
        Ok(())
    }

    /// Total supply of `mint` across all holders.
    pub fn supply(&self, mint: &Pubkey) -> u128 {
        self.balances
            .iter()
            .filter(|((m, _), _)| m == mint)
            .map(|(_, amount)| *amount as u128)
            .sum()
    }

    /// Apply every transfer or none of them.
    pub fn apply_all(&mut self, transfers: &[TokenTransfer]) -> Result<()> {
        if transfers.is_empty() {
            return Ok(());
        }
        let mut scratch = self.clone();
        for t in transfers {
            scratch.transfer(t)?;
        }
        *self = scratch;
        Ok(())
    }

    fn transfer(&mut self, t: &TokenTransfer) -> Result<()> {
        let available = self.balance(&t.mint, &t.from);
        if available < t.amount {
            return Err(LedgerError::InsufficientTokens {
                needed: t.amount,
                available,
            });
        }
        self.balances.insert((t.mint, t.from), available - t.amount);
        self.mint_to(&t.mint, &t.to, t.amount)
    }
}

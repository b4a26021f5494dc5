//! What an instruction sees while it runs.
//!
//! The hosting layer loads every account named by the instruction into an
//! [`AccountInfo`], hands them to the program together with an
//! [`InvokeContext`], and commits the mutated accounts plus the recorded
//! [`Effect`]s only if the instruction returns `Ok`.

use vestige_account::{Account, AccountRecord, DELEGATION_PROGRAM_ID, SYSTEM_PROGRAM_ID};
use vestige_pubkey::Pubkey;
use vestige_transaction::Layer;

use crate::{
    ID,
    error::{Result, VestigeError},
    policy::ProgramPolicy,
};

/// Side effects the program asks the host to carry out after the
/// instruction's account writes are committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Hand `account` to the execution layer run by `validator`.
    Delegate {
        account: Pubkey,
        owner_program: Pubkey,
        validator: Pubkey,
    },
    /// Return `account` to the base ledger.
    Undelegate { account: Pubkey },
    /// Return `account` if the execution layer holds it; skip it if it
    /// never left the base ledger. At least one such account per
    /// instruction must move.
    UndelegateIfHeld { account: Pubkey },
    /// Move `amount` of `mint` tokens held by `from` to `to`.
    TokenTransfer {
        mint: Pubkey,
        from: Pubkey,
        to: Pubkey,
        amount: u64,
    },
}

pub struct InvokeContext {
    pub layer: Layer,
    pub unix_timestamp: i64,
    pub policy: ProgramPolicy,
    logs: Vec<String>,
    effects: Vec<Effect>,
}

impl InvokeContext {
    pub fn new(layer: Layer, unix_timestamp: i64, policy: ProgramPolicy) -> Self {
        Self {
            layer,
            unix_timestamp,
            policy,
            logs: Vec::new(),
            effects: Vec::new(),
        }
    }

    pub fn log(&mut self, line: String) {
        log::debug!("program log [{}]: {}", self.layer, line);
        self.logs.push(line);
    }

    pub fn emit(&mut self, effect: Effect) {
        self.effects.push(effect);
    }

    pub fn require_layer(&self, layer: Layer) -> Result<()> {
        if self.layer != layer {
            return Err(VestigeError::WrongLayer);
        }
        Ok(())
    }

    pub fn logs(&self) -> &[String] {
        &self.logs
    }

    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    pub fn into_parts(self) -> (Vec<String>, Vec<Effect>) {
        (self.logs, self.effects)
    }
}

/// Program log with a tag prefix, e.g. `msg!(ctx, "VG_COMMIT:{}:{}", user, amount)`.
#[macro_export]
macro_rules! msg {
    ($ctx:expr, $($arg:tt)*) => {
        $ctx.log(format!($($arg)*))
    };
}

/// One account as handed to an instruction.
#[derive(Debug, Clone)]
pub struct AccountInfo {
    pub key: Pubkey,
    pub is_signer: bool,
    pub is_writable: bool,
    pub account: Account,
}

impl AccountInfo {
    pub fn new(key: Pubkey, is_signer: bool, is_writable: bool, account: Account) -> Self {
        Self {
            key,
            is_signer,
            is_writable,
            account,
        }
    }

    pub fn lamports(&self) -> u64 {
        self.account.lamports
    }

    pub fn owner(&self) -> &Pubkey {
        &self.account.owner
    }

    pub fn data_is_empty(&self) -> bool {
        self.account.data.is_empty()
    }

    /// Owned by the delegation program, i.e. currently away on the execution layer.
    pub fn is_delegated(&self) -> bool {
        self.account.owner == DELEGATION_PROGRAM_ID
    }

    /// Decode a record this program owns.
    pub fn load<T: AccountRecord>(&self) -> Result<T> {
        if self.is_delegated() {
            return Err(VestigeError::AccountDelegated(self.key));
        }
        if self.data_is_empty() {
            return Err(VestigeError::UninitializedAccount);
        }
        if self.account.owner != ID {
            return Err(VestigeError::InvalidAccountData);
        }
        T::from_account_data(&self.account.data).map_err(|e| {
            log::warn!("failed to decode {}: {e}", self.key);
            VestigeError::InvalidAccountData
        })
    }

    /// Decode a record this program owns or one owned by the delegation
    /// program (delegation records, stale base copies of delegated accounts).
    pub fn load_unchecked<T: AccountRecord>(&self) -> Result<T> {
        if self.data_is_empty() {
            return Err(VestigeError::UninitializedAccount);
        }
        if self.account.owner != ID && !self.is_delegated() {
            return Err(VestigeError::InvalidAccountData);
        }
        T::from_account_data(&self.account.data).map_err(|_| VestigeError::InvalidAccountData)
    }

    pub fn store<T: AccountRecord>(&mut self, record: &T) -> Result<()> {
        if !self.is_writable {
            return Err(VestigeError::ReadonlyAccount(self.key));
        }
        if self.account.owner != ID {
            return Err(VestigeError::InvalidAccountData);
        }
        self.account.data = record
            .to_account_data()
            .map_err(|_| VestigeError::InvalidAccountData)?;
        Ok(())
    }

    /// Claim an empty system account for this program and write `record`.
    pub fn init<T: AccountRecord>(&mut self, record: &T) -> Result<()> {
        if !self.data_is_empty() || self.is_delegated() {
            return Err(VestigeError::AccountAlreadyInitialized);
        }
        if self.account.owner != SYSTEM_PROGRAM_ID && self.account.owner != ID {
            return Err(VestigeError::InvalidAccountData);
        }
        self.account.owner = ID;
        self.store(record)
    }
}

/// Move lamports between two accounts in the same instruction.
pub fn transfer_lamports(from: &mut AccountInfo, to: &mut AccountInfo, amount: u64) -> Result<()> {
    if !from.is_writable {
        return Err(VestigeError::ReadonlyAccount(from.key));
    }
    if !to.is_writable {
        return Err(VestigeError::ReadonlyAccount(to.key));
    }
    if from.account.lamports < amount {
        return Err(VestigeError::InsufficientFunds {
            needed: amount,
            available: from.account.lamports,
        });
    }
    from.account.lamports -= amount;
    to.account.lamports = to
        .account
        .lamports
        .checked_add(amount)
        .ok_or(VestigeError::ArithmeticOverflow)?;
    Ok(())
}

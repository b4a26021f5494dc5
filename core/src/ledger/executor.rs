//! Transaction execution against one layer.
//!
//! Every instruction runs against a staged overlay: reads see the writes of
//! earlier instructions in the same transaction, and nothing reaches the
//! ledger until the whole transaction succeeded.

use std::collections::HashMap;

use vestige_account::{Account, DELEGATION_PROGRAM_ID, SYSTEM_PROGRAM_ID};
use vestige_program::{AccountInfo, Effect, InvokeContext, VestigeError, process_instruction};
use vestige_pubkey::Pubkey;
use vestige_transaction::{Instruction, Layer, Transaction};

use super::{
    LedgerError, Result,
    cluster::{ClusterConfig, LedgerState},
    delegation::{self, Propagation},
    token::TokenTransfer,
};

/// Writes and side effects of a transaction that has not been committed yet.
#[derive(Debug, Default)]
pub(crate) struct Staged {
    pub base: HashMap<Pubkey, Account>,
    pub execution: HashMap<Pubkey, Account>,
    /// Accounts leaving the execution layer.
    pub evicted: Vec<Pubkey>,
    pub propagations: Vec<Propagation>,
    pub token_transfers: Vec<TokenTransfer>,
    pub logs: Vec<String>,
}

impl Staged {
    pub fn held_on_execution(&self, state: &LedgerState, key: &Pubkey) -> bool {
        !self.evicted.contains(key)
            && (self.execution.contains_key(key) || state.execution.contains_key(key))
    }

    /// Account as seen from `layer`. Execution-layer reads of accounts the
    /// layer does not hold fall through to the base ledger.
    pub fn view(&self, state: &LedgerState, layer: Layer, key: &Pubkey) -> Option<Account> {
        if layer == Layer::Execution && self.held_on_execution(state, key) {
            return self
                .execution
                .get(key)
                .or_else(|| state.execution.get(key))
                .cloned();
        }
        self.base.get(key).or_else(|| state.base.get(key)).cloned()
    }

    fn write(&mut self, layer: Layer, key: Pubkey, account: Account) {
        match layer {
            Layer::Base => self.base.insert(key, account),
            Layer::Execution => self.execution.insert(key, account),
        };
    }
}

pub(crate) fn execute(
    state: &LedgerState,
    config: &ClusterConfig,
    layer: Layer,
    tx: &Transaction,
) -> Result<Staged> {
    let signers = tx.verified_signers()?;
    for required in tx.message.required_signers() {
        if !signers.contains(&required) {
            return Err(LedgerError::MissingSignature(required));
        }
    }

    let unix_timestamp = state.clock.unix_timestamp();
    let mut staged = Staged::default();
    for ix in &tx.message.instructions {
        execute_instruction(state, config, layer, unix_timestamp, &signers, ix, &mut staged)?;
    }
    Ok(staged)
}

fn execute_instruction(
    state: &LedgerState,
    config: &ClusterConfig,
    layer: Layer,
    unix_timestamp: i64,
    signers: &[Pubkey],
    ix: &Instruction,
    staged: &mut Staged,
) -> Result<()> {
    if ix.program_id != vestige_program::ID {
        return Err(LedgerError::UnknownProgram(ix.program_id));
    }

    if layer == Layer::Execution {
        // Writable accounts must already live on the execution layer.
        for meta in ix.accounts.iter().filter(|m| m.is_writable) {
            if !staged.held_on_execution(state, &meta.pubkey) {
                return Err(VestigeError::AccountNotYetSynced(meta.pubkey).into());
            }
        }
    }

    let mut infos: Vec<AccountInfo> = ix
        .accounts
        .iter()
        .map(|meta| {
            let account = staged
                .view(state, layer, &meta.pubkey)
                .unwrap_or_default();
            AccountInfo::new(
                meta.pubkey,
                meta.is_signer && signers.contains(&meta.pubkey),
                meta.is_writable,
                account,
            )
        })
        .collect();
    let before: Vec<Account> = infos.iter().map(|info| info.account.clone()).collect();

    let mut ctx = InvokeContext::new(layer, unix_timestamp, config.policy);
    process_instruction(&mut ctx, &ix.program_id, &mut infos, &ix.data)?;

    check_writes(layer, &before, &infos)?;

    for (info, pre) in infos.into_iter().zip(before) {
        if info.is_writable && info.account != pre {
            staged.write(layer, info.key, info.account);
        }
    }

    let (logs, effects) = ctx.into_parts();
    staged.logs.extend(logs);

    let mut conditional = 0usize;
    let mut returned = 0usize;
    for effect in effects {
        match effect {
            Effect::Delegate {
                account,
                owner_program,
                validator,
            } => {
                if layer != Layer::Base {
                    return Err(VestigeError::WrongLayer.into());
                }
                delegation::stage_delegate(
                    state,
                    staged,
                    &account,
                    &owner_program,
                    &validator,
                    &config.validator,
                    config.propagation_delay,
                    unix_timestamp,
                )?;
            }
            Effect::Undelegate { account } => {
                if layer != Layer::Execution {
                    return Err(VestigeError::WrongLayer.into());
                }
                delegation::stage_undelegate(state, staged, &account, config.propagation_delay)?;
            }
            Effect::UndelegateIfHeld { account } => {
                if layer != Layer::Execution {
                    return Err(VestigeError::WrongLayer.into());
                }
                conditional += 1;
                if delegation::stage_undelegate_if_held(
                    state,
                    staged,
                    &account,
                    config.propagation_delay,
                )? {
                    returned += 1;
                }
            }
            Effect::TokenTransfer {
                mint,
                from,
                to,
                amount,
            } => staged.token_transfers.push(TokenTransfer {
                mint,
                from,
                to,
                amount,
            }),
        }
    }
    if conditional > 0 && returned == 0 {
        return Err(VestigeError::NotDelegated.into());
    }
    Ok(())
}

/// Ownership and conservation rules the layer enforces on top of the program.
fn check_writes(layer: Layer, before: &[Account], after: &[AccountInfo]) -> Result<()> {
    let mut total_before: u128 = 0;
    let mut total_after: u128 = 0;

    for (pre, info) in before.iter().zip(after) {
        let post = &info.account;
        total_before += pre.lamports as u128;
        total_after += post.lamports as u128;

        if pre == post {
            continue;
        }
        if !info.is_writable {
            return Err(LedgerError::UnauthorizedModification(info.key));
        }
        if layer == Layer::Base && pre.owner == DELEGATION_PROGRAM_ID {
            return Err(VestigeError::AccountDelegated(info.key).into());
        }
        if layer == Layer::Execution && pre.lamports != post.lamports {
            return Err(LedgerError::LamportsFrozen(info.key));
        }

        let program_owned = pre.owner == vestige_program::ID;
        let fresh_system = pre.owner == SYSTEM_PROGRAM_ID && pre.data.is_empty();

        if post.lamports < pre.lamports && !(program_owned || (fresh_system && info.is_signer)) {
            return Err(LedgerError::UnauthorizedDebit(info.key));
        }
        if (pre.data != post.data || pre.owner != post.owner) && !(program_owned || fresh_system) {
            return Err(LedgerError::UnauthorizedModification(info.key));
        }
    }

    if total_before != total_after {
        return Err(LedgerError::LamportsNotConserved {
            before: total_before,
            after: total_after,
        });
    }
    Ok(())
}

//! Layer side of delegation.
//!
//! ```text
//!  Delegate effect (base tx)              Undelegate effect (execution tx)
//!          │                                        │
//!          ▼                                        ▼
//!  base owner := delegation program       removed from execution layer
//!  record     := Delegating               record := Undelegating
//!          │  propagation delay                     │  propagation delay
//!          ▼                                        ▼
//!  copy lands on execution layer          data written back to base,
//!  record     := Delegated                owner restored, record deleted
//! ```
//!
//! While a record is in transition neither layer accepts writes to the
//! account: the base copy is owned by the delegation program and the
//! execution layer does not hold it.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};
use vestige_account::{
    Account, AccountRecord, DELEGATION_PROGRAM_ID, DELEGATION_STATE_DELEGATED,
    DELEGATION_STATE_DELEGATING, DELEGATION_STATE_UNDELEGATING, DelegationRecord, seeds,
};
use vestige_program::VestigeError;
use vestige_pubkey::Pubkey;
use vestige_transaction::Layer;

use super::{LedgerError, Result, cluster::LedgerState, executor::Staged};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ToExecution,
    ToBase,
}

/// An account on its way between the layers.
#[derive(Debug, Clone)]
pub struct Propagation {
    pub account: Pubkey,
    pub direction: Direction,
    pub ready_at: Instant,
    /// Execution-layer copy travelling back to the base ledger.
    pub payload: Option<Account>,
}

fn record_account(record: &DelegationRecord) -> Result<Account> {
    let data = record
        .to_account_data()
        .map_err(|_| LedgerError::Program(VestigeError::InvalidAccountData))?;
    Ok(Account::new_owned(DELEGATION_PROGRAM_ID, data))
}

fn load_record(account: Option<Account>) -> Option<DelegationRecord> {
    account.and_then(|acc| DelegationRecord::from_account_data(&acc.data).ok())
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn stage_delegate(
    state: &LedgerState,
    staged: &mut Staged,
    account: &Pubkey,
    owner_program: &Pubkey,
    validator: &Pubkey,
    expected_validator: &Pubkey,
    delay: Duration,
    unix_timestamp: i64,
) -> Result<()> {
    if validator != expected_validator {
        return Err(LedgerError::InvalidValidator(*validator));
    }

    let mut base_copy = staged
        .view(state, Layer::Base, account)
        .ok_or(VestigeError::UninitializedAccount)?;
    if base_copy.owner == DELEGATION_PROGRAM_ID {
        return Err(VestigeError::AlreadyDelegated.into());
    }
    base_copy.owner = DELEGATION_PROGRAM_ID;
    staged.base.insert(*account, base_copy);

    let record = DelegationRecord {
        account: *account,
        owner_program: *owner_program,
        validator: *validator,
        state: DELEGATION_STATE_DELEGATING,
        requested_at: unix_timestamp,
    };
    let (record_address, _) = seeds::derive_delegation_record_pda(account);
    staged.base.insert(record_address, record_account(&record)?);

    staged.propagations.push(Propagation {
        account: *account,
        direction: Direction::ToExecution,
        ready_at: Instant::now() + delay,
        payload: None,
    });
    debug!(account = %account, "delegation staged");
    Ok(())
}

pub(crate) fn stage_undelegate(
    state: &LedgerState,
    staged: &mut Staged,
    account: &Pubkey,
    delay: Duration,
) -> Result<()> {
    if !staged.held_on_execution(state, account) {
        return Err(VestigeError::AccountNotYetSynced(*account).into());
    }
    let payload = staged
        .view(state, Layer::Execution, account)
        .ok_or(VestigeError::AccountNotYetSynced(*account))?;

    let (record_address, _) = seeds::derive_delegation_record_pda(account);
    let mut record = load_record(staged.view(state, Layer::Base, &record_address))
        .ok_or(VestigeError::NotDelegated)?;
    if record.state != DELEGATION_STATE_DELEGATED {
        return Err(VestigeError::DelegationConflict.into());
    }
    record.state = DELEGATION_STATE_UNDELEGATING;
    staged.base.insert(record_address, record_account(&record)?);

    staged.evicted.push(*account);
    staged.propagations.push(Propagation {
        account: *account,
        direction: Direction::ToBase,
        ready_at: Instant::now() + delay,
        payload: Some(payload),
    });
    debug!(account = %account, "undelegation staged");
    Ok(())
}

/// Stage the return of `account` if this layer holds it. Returns whether
/// it was staged; an account still travelling out is retryable, one that
/// never left (or is already on its way back) is skipped.
pub(crate) fn stage_undelegate_if_held(
    state: &LedgerState,
    staged: &mut Staged,
    account: &Pubkey,
    delay: Duration,
) -> Result<bool> {
    if staged.held_on_execution(state, account) {
        stage_undelegate(state, staged, account, delay)?;
        return Ok(true);
    }

    let (record_address, _) = seeds::derive_delegation_record_pda(account);
    match load_record(staged.view(state, Layer::Base, &record_address)) {
        Some(record)
            if record.state == DELEGATION_STATE_DELEGATING
                || record.state == DELEGATION_STATE_DELEGATED =>
        {
            Err(VestigeError::AccountNotYetSynced(*account).into())
        }
        _ => {
            debug!(account = %account, "not held by execution layer, left in place");
            Ok(false)
        }
    }
}

/// Land every propagation whose delay has elapsed. Returns how many landed.
pub(crate) fn settle_due(state: &mut LedgerState) -> usize {
    if state.propagation_paused || state.in_flight.is_empty() {
        return 0;
    }
    let now = Instant::now();
    let (due, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut state.in_flight)
        .into_iter()
        .partition(|p| p.ready_at <= now);
    state.in_flight = waiting;

    let landed = due.len();
    for propagation in due {
        land(state, propagation);
    }
    landed
}

fn land(state: &mut LedgerState, propagation: Propagation) {
    let account = propagation.account;
    let (record_address, _) = seeds::derive_delegation_record_pda(&account);
    let Some(mut record) = load_record(state.base.get(&record_address).cloned()) else {
        warn!(account = %account, "propagation without delegation record dropped");
        return;
    };

    match propagation.direction {
        Direction::ToExecution => {
            let Some(base_copy) = state.base.get(&account) else {
                warn!(account = %account, "delegated account vanished from base ledger");
                return;
            };
            let mut execution_copy = base_copy.clone();
            execution_copy.owner = record.owner_program;
            state.execution.insert(account, execution_copy);

            record.state = DELEGATION_STATE_DELEGATED;
            match record_account(&record) {
                Ok(acc) => {
                    state.base.insert(record_address, acc);
                }
                Err(e) => warn!(account = %account, error = %e, "failed to update delegation record"),
            }
            debug!(account = %account, "account landed on execution layer");
        }
        Direction::ToBase => {
            let Some(payload) = propagation.payload else {
                warn!(account = %account, "undelegation without payload dropped");
                return;
            };
            let base_copy = state.base.entry(account).or_default();
            base_copy.data = payload.data;
            base_copy.owner = record.owner_program;
            state.base.remove(&record_address);
            debug!(account = %account, "account landed on base ledger");
        }
    }
}

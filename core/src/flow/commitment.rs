//! A participant's path through one launch.
//!
//! ```text
//!                     ┌──────────────────────┐
//!                     │    Uninitialized     │
//!                     └──────────┬───────────┘
//!                                ▼
//!                     ┌──────────────────────┐   commit (public)   ┌──────────────────┐
//!                     │ AccountsInitialized  │────────────────────▶│ PubliclyRecorded │
//!                     └──────────┬───────────┘                     └────────┬─────────┘
//!                      fund      ▼                                          │
//!                     ┌──────────────────────┐                              │
//!                     │        Funded        │                              │
//!                     └──────────┬───────────┘                              │
//!                      delegate  ▼                                          │
//!                     ┌──────────────────────┐                              │
//!                     │      Delegated       │                              │
//!                     └──────────┬───────────┘                              │
//!            private commit      ▼                                          │
//!                     ┌──────────────────────┐                              │
//!                     │  PrivatelyRecorded   │                              │
//!                     └──────────┬───────────┘                              │
//!   (graduation) undelegate      ▼                                          │
//!                     ┌──────────────────────┐                              │
//!                     │     Undelegated      │                              │
//!                     └──────────┬───────────┘                              │
//!                      sweep     ▼                                          │
//!                     ┌──────────────────────┐                              │
//!                     │        Swept         │                              │
//!                     └──────────┬───────────┘                              │
//!                                ▼                                          │
//!                     ┌──────────────────────┐◀─────────────────────────────┘
//!                     │ AllocationCalculated │
//!                     └──────────┬───────────┘
//!                      claim     ▼
//!                     ┌──────────────────────┐
//!                     │       Claimed        │
//!                     └──────────────────────┘
//! ```
//!
//! Every step is safe to re-issue, and [`CommitmentFlow::detect_state`]
//! rebuilds the position from the ledgers, so an abandoned flow can be
//! resumed from wherever it stopped.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};
use vestige_account::{
    Account, AccountRecord, AccountType, DELEGATION_PROGRAM_ID, EphemeralHolding, Launch,
    UserCommitment, seeds::ParticipantAddresses,
};
use vestige_program::{client, validate_commit};
use vestige_pubkey::Pubkey;
use vestige_transaction::Layer;

use super::SetupOutcome;
use crate::{
    delegation::{Authority, DelegationStatus, DelegationTracker, Pending},
    error::{ProtocolError, Result},
    ledger::TransactionReceipt,
    retry::retry_transient,
    session::Session,
};

/// Steps `settle` may take before giving up on making progress.
const MAX_SETTLE_STEPS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CommitmentState {
    Uninitialized,
    AccountsInitialized,
    Funded,
    Delegated,
    PrivatelyRecorded,
    Undelegated,
    Swept,
    PubliclyRecorded,
    AllocationCalculated,
    Claimed,
}

impl fmt::Display for CommitmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Outcome of the allocation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Allocation {
    pub weight_bps: u64,
    pub tokens_allocated: u64,
}

pub struct CommitmentFlow {
    session: Arc<Session>,
    launch: Pubkey,
    addresses: ParticipantAddresses,
    tracker: DelegationTracker,
}

fn decode<T: AccountRecord>(address: &Pubkey, account: &Account) -> Result<T> {
    T::from_account_data(&account.data).map_err(|source| ProtocolError::Decode {
        address: *address,
        source,
    })
}

impl CommitmentFlow {
    pub fn new(session: Arc<Session>, launch: Pubkey, validator: Pubkey) -> Self {
        let addresses = ParticipantAddresses::derive(launch, session.identity());
        let tracker = DelegationTracker::new(session.clone(), launch, validator);
        Self {
            session,
            launch,
            addresses,
            tracker,
        }
    }

    pub fn addresses(&self) -> &ParticipantAddresses {
        &self.addresses
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn tracker(&self) -> &DelegationTracker {
        &self.tracker
    }

    pub fn user(&self) -> Pubkey {
        self.addresses.user
    }

    // ========================================================================
    // State detection
    // ========================================================================

    /// Rebuild the participant's position from both ledgers.
    pub async fn detect_state(&self) -> Result<CommitmentState> {
        let a = &self.addresses;
        let commitment_account = self.session.fetch(Layer::Base, &a.commitment).await?;
        let holding_account = self.session.fetch(Layer::Base, &a.ephemeral).await?;

        let (Some(commitment_account), Some(holding_account)) = (commitment_account, holding_account)
        else {
            return Ok(CommitmentState::Uninitialized);
        };
        if !commitment_account.has_data() || !holding_account.has_data() {
            return Ok(CommitmentState::Uninitialized);
        }

        let commitment: UserCommitment = decode(&a.commitment, &commitment_account)?;
        let holding: EphemeralHolding = decode(&a.ephemeral, &holding_account)?;

        if commitment.has_claimed {
            return Ok(CommitmentState::Claimed);
        }
        if commitment.allocation_calculated() {
            return Ok(CommitmentState::AllocationCalculated);
        }

        let away = commitment_account.owner == DELEGATION_PROGRAM_ID
            || holding_account.owner == DELEGATION_PROGRAM_ID;
        if away {
            let statuses = [
                self.tracker.status(&a.commitment).await?,
                self.tracker.status(&a.ephemeral).await?,
            ];
            return self.detect_delegated(&statuses).await;
        }

        if holding.committed > 0 {
            return Ok(CommitmentState::Undelegated);
        }
        if commitment.has_committed() {
            let launch: Launch = self.session.require_record(Layer::Base, &self.launch).await?;
            return Ok(if launch.is_delegated && launch.is_graduated {
                CommitmentState::Swept
            } else {
                CommitmentState::PubliclyRecorded
            });
        }
        if holding.balance > 0 {
            return Ok(CommitmentState::Funded);
        }
        Ok(CommitmentState::AccountsInitialized)
    }

    async fn detect_delegated(&self, statuses: &[DelegationStatus]) -> Result<CommitmentState> {
        if statuses.iter().any(|s| s.pending == Pending::Undelegating) {
            return Ok(CommitmentState::Undelegated);
        }
        // Only one of the two records made it out. While the sale is open
        // delegation is re-run; once it closed the stray one is brought home.
        if statuses.iter().any(|s| *s == DelegationStatus::ON_BASE) {
            return Ok(if self.sale_closed().await? {
                CommitmentState::Delegated
            } else {
                CommitmentState::Funded
            });
        }
        if statuses
            .iter()
            .any(|s| s.owner == Authority::BaseLedger && s.pending == Pending::Delegating)
        {
            return Ok(CommitmentState::Delegated);
        }

        let live: Option<UserCommitment> = self
            .session
            .fetch_record(Layer::Execution, &self.addresses.commitment)
            .await?;
        Ok(match live {
            Some(commitment) if commitment.has_committed() => CommitmentState::PrivatelyRecorded,
            _ => CommitmentState::Delegated,
        })
    }

    /// The pool is frozen or on its way back, so no further commits land.
    async fn sale_closed(&self) -> Result<bool> {
        let launch: Launch = self.session.require_record(Layer::Base, &self.launch).await?;
        if launch.is_graduated {
            return Ok(true);
        }
        let status = self.tracker.status(&self.addresses.pool).await?;
        Ok(status.pending == Pending::Undelegating)
    }

    // ========================================================================
    // Steps
    // ========================================================================

    /// Create the UserCommitment and EphemeralHolding records.
    pub async fn initialize(&self) -> Result<SetupOutcome> {
        let user = self.user();
        let commitment = SetupOutcome::from_result(
            self.session
                .send(Layer::Base, vec![client::init_user_commitment(&user, &self.launch)])
                .await,
        )?;
        let holding = SetupOutcome::from_result(
            self.session
                .send(Layer::Base, vec![client::init_ephemeral_holding(&user, &self.launch)])
                .await,
        )?;

        let outcome = commitment.merge(holding);
        info!(user = %user, launch = %self.launch, outcome = ?outcome, "participant accounts ready");
        Ok(outcome)
    }

    /// Move `amount` from the wallet into the holding. Must precede delegation.
    pub async fn fund(&self, amount: u64) -> Result<TransactionReceipt> {
        let ix = client::fund_ephemeral(&self.user(), &self.launch, amount)?;
        let receipt = self.session.send(Layer::Base, vec![ix]).await?;
        debug!(user = %self.user(), amount, "holding funded");
        Ok(receipt)
    }

    /// Hand both participant records to the execution layer and wait for them.
    pub async fn delegate(&self) -> Result<SetupOutcome> {
        let commitment = self
            .tracker
            .request_delegate(AccountType::UserCommitment, Vec::new())
            .await?;
        let holding = self
            .tracker
            .request_delegate(AccountType::EphemeralHolding, Vec::new())
            .await?;

        let policy = *self.session.retry_policy();
        for address in [self.addresses.commitment, self.addresses.ephemeral] {
            self.tracker
                .verify_propagated(&address, Layer::Execution, &policy)
                .await?;
        }
        Ok(commitment.merge(holding))
    }

    /// Book `amount` out of the holding on the execution layer.
    pub async fn record_private(&self, amount: u64) -> Result<TransactionReceipt> {
        let ix = client::private_commit(&self.user(), &self.launch, amount)?;
        let receipt = retry_transient(
            self.session.retry_policy(),
            "private commit",
            |_| self.session.send(Layer::Execution, vec![ix.clone()]),
            |account| self.tracker.in_transition(account),
        )
        .await?;
        info!(user = %self.user(), amount, "commitment recorded privately");
        Ok(receipt)
    }

    /// Commit straight from the wallet into the Vault on the base ledger.
    pub async fn commit_public(&self, amount: u64) -> Result<TransactionReceipt> {
        let ix = client::commit(&self.user(), &self.launch, amount)?;
        let receipt = self.session.send(Layer::Base, vec![ix]).await?;
        info!(user = %self.user(), amount, "commitment recorded publicly");
        Ok(receipt)
    }

    /// Bring both records back to the base ledger and wait until they land.
    pub async fn undelegate(&self) -> Result<TransactionReceipt> {
        let receipt = self
            .tracker
            .request_undelegate(AccountType::UserCommitment)
            .await?;
        self.await_return().await?;
        Ok(receipt)
    }

    async fn await_return(&self) -> Result<()> {
        let policy = *self.session.retry_policy();
        for address in [self.addresses.commitment, self.addresses.ephemeral] {
            self.tracker
                .verify_propagated(&address, Layer::Base, &policy)
                .await?;
        }
        Ok(())
    }

    /// Committed funds to the Vault, the rest back to the wallet.
    pub async fn sweep(&self) -> Result<TransactionReceipt> {
        let ix = client::sweep_to_vault(&self.user(), &self.launch, &self.user());
        let receipt = self.session.send(Layer::Base, vec![ix]).await?;
        debug!(user = %self.user(), "holding swept");
        Ok(receipt)
    }

    pub async fn calculate_allocation(&self) -> Result<Allocation> {
        let ix = client::calculate_allocation(&self.user(), &self.launch, &self.user());
        self.session.send(Layer::Base, vec![ix]).await?;

        let commitment: UserCommitment = self
            .session
            .require_record(Layer::Base, &self.addresses.commitment)
            .await?;
        let allocation = Allocation {
            weight_bps: commitment.weight_bps,
            tokens_allocated: commitment.tokens_allocated,
        };
        info!(
            user = %self.user(),
            weight_bps = allocation.weight_bps,
            tokens = allocation.tokens_allocated,
            "allocation calculated"
        );
        Ok(allocation)
    }

    pub async fn claim(&self) -> Result<TransactionReceipt> {
        let ix = client::claim_tokens(&self.user(), &self.launch);
        self.session.send(Layer::Base, vec![ix]).await
    }

    /// Current allocation as recorded on the base ledger.
    pub async fn allocation(&self) -> Result<Option<Allocation>> {
        let commitment: Option<UserCommitment> = self
            .session
            .fetch_record(Layer::Base, &self.addresses.commitment)
            .await?;
        Ok(commitment
            .filter(|c| c.allocation_calculated())
            .map(|c| Allocation {
                weight_bps: c.weight_bps,
                tokens_allocated: c.tokens_allocated,
            }))
    }

    // ========================================================================
    // Resumable drivers
    // ========================================================================

    /// Commit `amount`, taking the private path when the launch runs in
    /// private mode and the public one otherwise. Resumes from whatever
    /// state the participant is in.
    pub async fn commit(&self, amount: u64) -> Result<CommitmentState> {
        let launch: Launch = self.session.require_record(Layer::Base, &self.launch).await?;
        let mut state = self.detect_state().await?;
        debug!(user = %self.user(), state = %state, private = launch.is_delegated, "commit requested");

        if state == CommitmentState::Uninitialized {
            self.initialize().await?;
            state = CommitmentState::AccountsInitialized;
        }

        if !launch.is_delegated {
            return match state {
                CommitmentState::AccountsInitialized
                | CommitmentState::Funded
                | CommitmentState::PubliclyRecorded => {
                    self.commit_public(amount).await?;
                    Ok(CommitmentState::PubliclyRecorded)
                }
                other => Err(ProtocolError::InvalidState {
                    operation: "commit publicly",
                    state: other.to_string(),
                }),
            };
        }

        if matches!(
            state,
            CommitmentState::AccountsInitialized | CommitmentState::Funded
        ) {
            // Nothing is funded or delegated for a commit the program would refuse.
            let prior: UserCommitment = self
                .session
                .require_record(Layer::Base, &self.addresses.commitment)
                .await?;
            let policy = self.session.program_policy().await?;
            let now = self.session.unix_timestamp().await?;
            validate_commit(&policy, &launch, prior.amount, amount, now)?;

            let holding: EphemeralHolding = self
                .session
                .require_record(Layer::Base, &self.addresses.ephemeral)
                .await?;
            if holding.balance < amount {
                self.fund(amount - holding.balance).await?;
            }
            self.delegate().await?;
            state = CommitmentState::Delegated;
        }

        match state {
            CommitmentState::Delegated | CommitmentState::PrivatelyRecorded => {
                self.record_private(amount).await?;
                Ok(CommitmentState::PrivatelyRecorded)
            }
            other => Err(ProtocolError::InvalidState {
                operation: "commit privately",
                state: other.to_string(),
            }),
        }
    }

    /// After graduation: bring records home, sweep, allocate and claim.
    /// Returns the state reached.
    pub async fn settle(&self) -> Result<CommitmentState> {
        let mut previous = None;
        for _ in 0..MAX_SETTLE_STEPS {
            let state = self.detect_state().await?;
            debug!(user = %self.user(), state = %state, "settling");
            if previous == Some(state) {
                warn!(user = %self.user(), state = %state, "settle step made no progress");
                return Err(ProtocolError::InvalidState {
                    operation: "settle",
                    state: state.to_string(),
                });
            }
            previous = Some(state);
            match state {
                CommitmentState::Delegated | CommitmentState::PrivatelyRecorded => {
                    self.undelegate().await?;
                }
                CommitmentState::Undelegated => {
                    self.await_return().await?;
                    self.sweep().await?;
                }
                CommitmentState::Funded => {
                    // Funded but never committed: the sweep refunds the holding.
                    self.sweep().await?;
                }
                CommitmentState::Swept | CommitmentState::PubliclyRecorded => {
                    self.calculate_allocation().await?;
                }
                CommitmentState::AllocationCalculated => {
                    self.claim().await?;
                }
                CommitmentState::Uninitialized
                | CommitmentState::AccountsInitialized
                | CommitmentState::Claimed => return Ok(state),
            }
        }
        self.detect_state().await
    }
}

//! Client-side view of where an account currently lives.
//!
//! ```text
//!              request_delegate                 lands after delay
//!  ┌────────────────────┐     ┌──────────────────────┐     ┌────────────────────┐
//!  │ BaseLedger / None  │────▶│ BaseLedger/Delegating│────▶│ Execution / None   │
//!  └────────────────────┘     └──────────────────────┘     └────────────────────┘
//!            ▲                                                        │
//!            │        ┌──────────────────────────┐  request_undelegate│
//!            └────────│ Execution / Undelegating │◀───────────────────┘
//!   lands after delay └──────────────────────────┘
//! ```
//!
//! The status is read from the delegation record on the base ledger and
//! confirmed against the execution layer, so in-flight transitions are
//! visible instead of being guessed from timeouts.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};
use vestige_account::{AccountType, DelegationRecord, DelegationState, seeds};
use vestige_program::{VestigeError, client};
use vestige_pubkey::Pubkey;
use vestige_transaction::Layer;

use crate::{
    error::{ProtocolError, Result},
    flow::SetupOutcome,
    ledger::TransactionReceipt,
    retry::{Probe, RetryPolicy, poll_until, retry_transient},
    session::Session,
};

/// Which layer holds write authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Authority {
    BaseLedger,
    ExecutionLayer,
}

/// A hand-off that was requested but has not landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Pending {
    None,
    Delegating,
    Undelegating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DelegationStatus {
    pub owner: Authority,
    pub pending: Pending,
}

impl DelegationStatus {
    pub const ON_BASE: Self = Self {
        owner: Authority::BaseLedger,
        pending: Pending::None,
    };

    pub const ON_EXECUTION: Self = Self {
        owner: Authority::ExecutionLayer,
        pending: Pending::None,
    };

    /// Settled with write authority on `layer`.
    pub fn is_settled_on(&self, layer: Layer) -> bool {
        match layer {
            Layer::Base => *self == Self::ON_BASE,
            Layer::Execution => *self == Self::ON_EXECUTION,
        }
    }

    pub fn in_transition(&self) -> bool {
        self.pending != Pending::None
    }
}

impl fmt::Display for DelegationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}/{:?}", self.owner, self.pending)
    }
}

/// Drives delegation of one identity's accounts within a launch.
pub struct DelegationTracker {
    session: Arc<Session>,
    launch: Pubkey,
    validator: Pubkey,
}

impl DelegationTracker {
    pub fn new(session: Arc<Session>, launch: Pubkey, validator: Pubkey) -> Self {
        Self {
            session,
            launch,
            validator,
        }
    }

    pub async fn status(&self, address: &Pubkey) -> Result<DelegationStatus> {
        let (record_address, _) = seeds::derive_delegation_record_pda(address);
        let record: Option<DelegationRecord> =
            self.session.fetch_record(Layer::Base, &record_address).await?;

        let status = match record.and_then(|r| r.delegation_state()) {
            None => DelegationStatus::ON_BASE,
            Some(DelegationState::Delegating) => DelegationStatus {
                owner: Authority::BaseLedger,
                pending: Pending::Delegating,
            },
            Some(DelegationState::Undelegating) => DelegationStatus {
                owner: Authority::ExecutionLayer,
                pending: Pending::Undelegating,
            },
            Some(DelegationState::Delegated) => {
                if self.held_on_execution(address).await? {
                    DelegationStatus::ON_EXECUTION
                } else {
                    DelegationStatus {
                        owner: Authority::BaseLedger,
                        pending: Pending::Delegating,
                    }
                }
            }
        };
        Ok(status)
    }

    /// A hand-off of `address` was requested and has not landed.
    pub async fn in_transition(&self, address: Pubkey) -> Result<bool> {
        Ok(self.status(&address).await?.in_transition())
    }

    /// The execution layer answers with its own copy, which is owned by the
    /// program again; a read-through copy is still owned by the delegation
    /// program.
    async fn held_on_execution(&self, address: &Pubkey) -> Result<bool> {
        let account = self.session.fetch(Layer::Execution, address).await?;
        Ok(account.is_some_and(|acc| acc.owner == vestige_program::ID))
    }

    /// Grant read access and hand the account to the execution layer.
    /// Re-issuing after a partial success is safe.
    pub async fn request_delegate(
        &self,
        account_type: AccountType,
        members: Vec<Pubkey>,
    ) -> Result<SetupOutcome> {
        let identity = self.session.identity();
        let target = client::delegatable_address(&self.launch, &identity, account_type);

        let permission = client::create_permission(&identity, &self.launch, account_type, members)?;
        let permission_outcome =
            SetupOutcome::from_result(self.session.send(Layer::Base, vec![permission]).await)?;
        debug!(account = %target, outcome = ?permission_outcome, "permission ready");

        let delegate = client::delegate(&identity, &self.launch, account_type, &self.validator)?;
        let outcome = match self.session.send(Layer::Base, vec![delegate]).await {
            Ok(_) => SetupOutcome::Created,
            Err(e) if e.is_benign() => SetupOutcome::AlreadyExists,
            Err(ProtocolError::Program(VestigeError::DelegationConflict)) => {
                // Our own earlier request may still be landing.
                let status = self.status(&target).await?;
                if status.pending != Pending::Delegating {
                    return Err(VestigeError::DelegationConflict.into());
                }
                SetupOutcome::AlreadyExists
            }
            Err(e) => return Err(e),
        };

        info!(account = %target, kind = %account_type, outcome = ?outcome, "delegation requested");
        Ok(outcome)
    }

    /// Send the account back to the base ledger. For the pool this is the
    /// private graduation; participant records travel together.
    pub async fn request_undelegate(&self, account_type: AccountType) -> Result<TransactionReceipt> {
        let identity = self.session.identity();
        let ix = match account_type {
            AccountType::CommitmentPool => client::graduate_and_undelegate(&identity, &self.launch),
            AccountType::UserCommitment | AccountType::EphemeralHolding => {
                client::undelegate_user_commitment(&identity, &self.launch)
            }
        };

        let receipt = retry_transient(
            self.session.retry_policy(),
            "undelegate",
            |_| self.session.send(Layer::Execution, vec![ix.clone()]),
            |account| self.in_transition(account),
        )
        .await?;
        info!(kind = %account_type, launch = %self.launch, "undelegation requested");
        Ok(receipt)
    }

    /// Wait until `address` is settled on `expected`.
    pub async fn verify_propagated(
        &self,
        address: &Pubkey,
        expected: Layer,
        policy: &RetryPolicy,
    ) -> Result<()> {
        let what = format!("{address} to {expected}");
        poll_until(policy, &what, |_| async move {
            let status = self.status(address).await?;
            if status.is_settled_on(expected) && self.owned_as_expected(address, expected).await? {
                Ok(Probe::Ready(()))
            } else {
                Ok(Probe::Pending {
                    in_flight: status.in_transition(),
                })
            }
        })
        .await
    }

    async fn owned_as_expected(&self, address: &Pubkey, expected: Layer) -> Result<bool> {
        match expected {
            Layer::Execution => Ok(true),
            Layer::Base => {
                let account = self.session.fetch(Layer::Base, address).await?;
                Ok(account.is_some_and(|acc| acc.owner == vestige_program::ID))
            }
        }
    }
}

//! Creator side of a launch: creation, private mode, graduation, payout.
//!
//! Private graduation is a two-step hand-off:
//!
//! ```text
//!   execution layer                          base ledger
//!   ───────────────                          ───────────
//!   GraduateAndUndelegate ── pool returns ──▶ FinalizeGraduation
//!     (freeze + send back)     (delay)          (copy totals into Launch)
//! ```
//!
//! Either step may be re-issued; the second keeps failing with
//! `AccountNotYetSynced` until the pool has landed.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use vestige_account::{AccountType, CommitmentPool, Launch, seeds};
use vestige_program::{VestigeError, client, instruction::InitializeLaunchParams};
use vestige_pubkey::Pubkey;
use vestige_transaction::Layer;

use super::SetupOutcome;
use crate::{
    delegation::{DelegationStatus, DelegationTracker, Pending},
    error::Result,
    ledger::TransactionReceipt,
    retry::retry_transient,
    session::Session,
};

/// Economic terms of a sale. The mint is fixed per [`CreatorFlow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchTerms {
    pub token_supply: u64,
    pub start_time: i64,
    pub end_time: i64,
    pub graduation_target: u64,
    pub min_commitment: u64,
    pub max_commitment: u64,
}

pub struct CreatorFlow {
    session: Arc<Session>,
    mint: Pubkey,
    launch: Pubkey,
    pool: Pubkey,
    tracker: DelegationTracker,
}

impl CreatorFlow {
    pub fn new(session: Arc<Session>, mint: Pubkey, validator: Pubkey) -> Self {
        let (launch, _) = seeds::derive_launch_pda(&session.identity(), &mint);
        let (pool, _) = seeds::derive_pool_pda(&launch);
        let tracker = DelegationTracker::new(session.clone(), launch, validator);
        Self {
            session,
            mint,
            launch,
            pool,
            tracker,
        }
    }

    pub fn launch(&self) -> Pubkey {
        self.launch
    }

    pub fn mint(&self) -> Pubkey {
        self.mint
    }

    /// Create the Launch, CommitmentPool and Vault and escrow the supply.
    pub async fn create_launch(&self, terms: &LaunchTerms) -> Result<SetupOutcome> {
        let params = InitializeLaunchParams {
            token_mint: self.mint,
            token_supply: terms.token_supply,
            start_time: terms.start_time,
            end_time: terms.end_time,
            graduation_target: terms.graduation_target,
            min_commitment: terms.min_commitment,
            max_commitment: terms.max_commitment,
        };
        let ix = client::initialize_launch(&self.session.identity(), &params)?;
        let outcome = SetupOutcome::from_result(self.session.send(Layer::Base, vec![ix]).await)?;

        info!(
            launch = %self.launch,
            supply = terms.token_supply,
            target = terms.graduation_target,
            outcome = ?outcome,
            "launch ready"
        );
        Ok(outcome)
    }

    pub async fn launch_state(&self) -> Result<Launch> {
        self.session.require_record(Layer::Base, &self.launch).await
    }

    /// The pool as the base ledger last saw it.
    pub async fn pool_state(&self) -> Result<CommitmentPool> {
        self.session.require_record(Layer::Base, &self.pool).await
    }

    /// The pool from whichever layer currently holds it.
    pub async fn live_pool(&self) -> Result<CommitmentPool> {
        let status = self.tracker.status(&self.pool).await?;
        let layer = if status == DelegationStatus::ON_EXECUTION {
            Layer::Execution
        } else {
            Layer::Base
        };
        self.session.require_record(layer, &self.pool).await
    }

    pub async fn pool_status(&self) -> Result<DelegationStatus> {
        self.tracker.status(&self.pool).await
    }

    /// Delegate the pool, switching the launch into private mode. `members`
    /// may read the pool while it lives on the execution layer.
    pub async fn enable_private_mode(&self, members: Vec<Pubkey>) -> Result<SetupOutcome> {
        let outcome = self
            .tracker
            .request_delegate(AccountType::CommitmentPool, members)
            .await?;
        self.tracker
            .verify_propagated(&self.pool, Layer::Execution, self.session.retry_policy())
            .await?;
        info!(launch = %self.launch, "private mode enabled");
        Ok(outcome)
    }

    /// Public graduation on the base ledger.
    pub async fn graduate(&self) -> Result<TransactionReceipt> {
        let ix = client::graduate(&self.session.identity(), &self.launch);
        let receipt = self.session.send(Layer::Base, vec![ix]).await?;
        info!(launch = %self.launch, "graduated");
        Ok(receipt)
    }

    /// Private graduation. Picks up where an earlier attempt stopped and
    /// reports `PropagationTimeout` when the pool does not come back within
    /// the retry budget.
    pub async fn graduate_private(&self) -> Result<TransactionReceipt> {
        let launch = self.launch_state().await?;
        if launch.is_graduated {
            return Err(VestigeError::AlreadyGraduated.into());
        }
        if !launch.is_delegated {
            return Err(VestigeError::NotDelegated.into());
        }

        let policy = self.session.retry_policy();
        let status = self.tracker.status(&self.pool).await?;
        let pool_sent = status.pending == Pending::Undelegating
            || (status == DelegationStatus::ON_BASE && self.pool_state().await?.is_finalized);

        if pool_sent {
            debug!(launch = %self.launch, status = %status, "pool already sent back");
        } else {
            let ix = client::graduate_and_undelegate(&self.session.identity(), &self.launch);
            retry_transient(
                policy,
                "graduate and undelegate",
                |_| self.session.send(Layer::Execution, vec![ix.clone()]),
                |account| self.tracker.in_transition(account),
            )
            .await?;
            info!(launch = %self.launch, "pool frozen and sent back");
        }

        let ix = client::finalize_graduation(&self.session.identity(), &self.launch);
        let receipt = retry_transient(
            policy,
            "finalize graduation",
            |_| self.session.send(Layer::Base, vec![ix.clone()]),
            |account| self.tracker.in_transition(account),
        )
        .await
        .inspect_err(|e| warn!(launch = %self.launch, error = %e, "finalize graduation failed"))?;

        info!(launch = %self.launch, "graduated privately");
        Ok(receipt)
    }

    /// Graduate on whichever path the launch is on.
    pub async fn graduate_auto(&self) -> Result<TransactionReceipt> {
        if self.launch_state().await?.is_delegated {
            self.graduate_private().await
        } else {
            self.graduate().await
        }
    }

    /// Pay out whatever the Vault holds. Returns the amount received,
    /// measured on the creator's base-ledger balance.
    pub async fn withdraw_funds(&self) -> Result<u64> {
        let creator = self.session.identity();
        let before = self.base_lamports(&creator).await?;

        let ix = client::withdraw_funds(&creator, &self.launch);
        self.session.send(Layer::Base, vec![ix]).await?;

        let amount = self.base_lamports(&creator).await?.saturating_sub(before);
        info!(launch = %self.launch, amount, "funds withdrawn");
        Ok(amount)
    }

    async fn base_lamports(&self, address: &Pubkey) -> Result<u64> {
        Ok(self
            .session
            .fetch(Layer::Base, address)
            .await?
            .map_or(0, |account| account.lamports))
    }
}

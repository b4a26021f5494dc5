//! Background sweeping of returned holdings into the Vault.
//!
//! ```text
//!   register(user) ──▶ participants ──tick──▶ run_once
//!                                               │
//!            ┌──────────────────────────────────┼─────────────────────┐
//!            ▼                                  ▼                     ▼
//!   holding still delegated          holding back on base        sweep failed
//!        (pending, kept)           SweepToVault, then dropped   (counted, kept)
//!                                                                     │
//!                                                       max_failures reached
//!                                                         (given up, dropped)
//! ```
//!
//! Sweeping is permissionless, so one payer session serves the whole
//! launch. Participants still have to undelegate their own records.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use vestige_account::{DELEGATION_PROGRAM_ID, EphemeralHolding, Launch, seeds};
use vestige_program::client;
use vestige_pubkey::Pubkey;
use vestige_transaction::Layer;

use crate::{error::Result, session::Session};

pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(2);
pub const DEFAULT_MAX_SWEEP_FAILURES: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweeperConfig {
    pub interval: Duration,
    /// Non-transient failures after which a participant is dropped.
    pub max_failures: u32,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_SWEEP_INTERVAL,
            max_failures: DEFAULT_MAX_SWEEP_FAILURES,
        }
    }
}

/// Outcome of one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub swept: usize,
    pub pending: usize,
    pub failed: usize,
    /// Failed participants that hit the failure cap this pass.
    pub dropped: usize,
}

impl SweepReport {
    pub fn is_idle(&self) -> bool {
        self.swept == 0 && self.pending == 0 && self.failed == 0 && self.dropped == 0
    }
}

pub struct Sweeper {
    payer: Arc<Session>,
    launch: Pubkey,
    config: SweeperConfig,
    /// Registered participants and their failed attempts so far.
    participants: DashMap<Pubkey, u32>,
}

enum Step {
    Done,
    Waiting,
}

impl Sweeper {
    pub fn new(payer: Arc<Session>, launch: Pubkey, config: SweeperConfig) -> Self {
        Self {
            payer,
            launch,
            config,
            participants: DashMap::new(),
        }
    }

    pub fn register(&self, user: Pubkey) {
        self.participants.entry(user).or_insert(0);
    }

    pub fn pending(&self) -> usize {
        self.participants.len()
    }

    /// Sweep every registered participant whose holding is back on the
    /// base ledger. Nothing happens before graduation.
    pub async fn run_once(&self) -> Result<SweepReport> {
        let mut report = SweepReport::default();
        let users: Vec<Pubkey> = self.participants.iter().map(|e| *e.key()).collect();
        if users.is_empty() {
            return Ok(report);
        }

        let launch: Launch = self.payer.require_record(Layer::Base, &self.launch).await?;
        if !launch.is_graduated {
            report.pending = users.len();
            return Ok(report);
        }

        for user in users {
            match self.sweep_one(&user).await {
                Ok(Step::Done) => {
                    self.participants.remove(&user);
                    report.swept += 1;
                }
                Ok(Step::Waiting) => report.pending += 1,
                Err(e) if e.is_retryable() => {
                    debug!(user = %user, error = %e, "sweep deferred");
                    report.pending += 1;
                }
                Err(e) => {
                    report.failed += 1;
                    let failures = self.record_failure(&user);
                    if failures >= self.config.max_failures {
                        self.participants.remove(&user);
                        report.dropped += 1;
                        error!(user = %user, failures, error = %e, "sweep failed permanently, giving up");
                    } else {
                        warn!(user = %user, failures, error = %e, "sweep failed");
                    }
                }
            }
        }

        if !report.is_idle() {
            info!(
                launch = %self.launch,
                swept = report.swept,
                pending = report.pending,
                failed = report.failed,
                dropped = report.dropped,
                "sweep pass"
            );
        }
        Ok(report)
    }

    fn record_failure(&self, user: &Pubkey) -> u32 {
        let mut count = self.participants.entry(*user).or_insert(0);
        *count += 1;
        *count
    }

    async fn sweep_one(&self, user: &Pubkey) -> Result<Step> {
        let (address, _) = seeds::derive_ephemeral_pda(&self.launch, user);
        let Some(account) = self.payer.fetch(Layer::Base, &address).await? else {
            return Ok(Step::Done);
        };
        if account.owner == DELEGATION_PROGRAM_ID {
            return Ok(Step::Waiting);
        }

        let holding: Option<EphemeralHolding> = self.payer.fetch_record(Layer::Base, &address).await?;
        if holding.is_some_and(|h| h.tracked_total() > 0) {
            let ix = client::sweep_to_vault(&self.payer.identity(), &self.launch, user);
            self.payer.send(Layer::Base, vec![ix]).await?;
        }
        Ok(Step::Done)
    }

    /// Run passes on the configured interval until `shutdown` fires.
    pub fn spawn(self: Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.config.interval);
            info!(launch = %self.launch, interval_ms = self.config.interval.as_millis() as u64, "sweeper started");

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        info!(launch = %self.launch, remaining = self.pending(), "sweeper stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        if let Err(e) = self.run_once().await {
                            error!(launch = %self.launch, error = %e, "sweep pass failed");
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_idle() {
        assert!(SweepReport::default().is_idle());
        assert!(
            !SweepReport {
                pending: 1,
                ..SweepReport::default()
            }
            .is_idle()
        );
        assert!(
            !SweepReport {
                dropped: 1,
                ..SweepReport::default()
            }
            .is_idle()
        );
    }
}

//! Bounded exponential backoff for cross-layer waits.
//!
//! ```text
//!   attempt 0 ── probe ──▶ Ready ─────────────────────────▶ Ok(value)
//!                  │
//!                  └─ Pending / transient error
//!                         │  sleep(base · 2^attempt, capped at max)
//!                         ▼
//!   attempt 1 ── probe ── ...
//!                         │
//!   attempt N-1 ──────────┴─▶ PropagationTimeout { maybe_in_flight }
//! ```
//!
//! A timeout is never turned into success: the caller gets an error that
//! says the cross-layer state is indeterminate.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use vestige_program::VestigeError;
use vestige_pubkey::Pubkey;

use crate::error::{ProtocolError, Result};

const DEFAULT_BASE_DELAY_MS: u64 = 200;
const DEFAULT_MAX_DELAY_MS: u64 = 5_000;
const DEFAULT_MAX_ATTEMPTS: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay after the first failed attempt.
    pub base_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Attempts before giving up, including the first one.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl RetryPolicy {
    /// Backoff after the `attempt`-th failure (zero-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Sum of every delay a fully exhausted run sleeps.
    pub fn total_budget(&self) -> Duration {
        (0..self.max_attempts.saturating_sub(1))
            .map(|attempt| self.delay_for(attempt))
            .sum()
    }
}

/// Result of one look at the expected state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe<T> {
    Ready(T),
    /// Not there yet. `in_flight` is set when a transition was observed
    /// on the way.
    Pending { in_flight: bool },
}

/// Probe until ready or the budget is spent. Retryable probe errors count
/// as pending; anything else is returned immediately.
pub async fn poll_until<T, F, Fut>(policy: &RetryPolicy, what: &str, mut probe: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Probe<T>>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut seen_in_flight = false;

    for attempt in 0..attempts {
        match probe(attempt).await {
            Ok(Probe::Ready(value)) => {
                if attempt > 0 {
                    debug!(what, attempt, "propagation observed");
                }
                return Ok(value);
            }
            Ok(Probe::Pending { in_flight }) => {
                seen_in_flight |= in_flight;
            }
            Err(e) if e.is_retryable() => {
                debug!(what, attempt, error = %e, "probe failed transiently");
            }
            Err(e) => return Err(e),
        }

        if attempt + 1 < attempts {
            let delay = policy.delay_for(attempt);
            debug!(what, attempt, delay_ms = delay.as_millis() as u64, "waiting for propagation");
            tokio::time::sleep(delay).await;
        }
    }

    warn!(what, attempts, maybe_in_flight = seen_in_flight, "propagation wait exhausted");
    Err(ProtocolError::PropagationTimeout {
        what: what.to_string(),
        attempts,
        maybe_in_flight: seen_in_flight,
    })
}

/// Run `op` again after a backoff while it fails with a retryable error.
///
/// Exhausting the budget on a consistency error yields
/// `PropagationTimeout`. When the error names the account that blocked
/// the instruction, `observe` reports whether that account is actually
/// mid-transition; an account that never left its layer is not in flight.
pub async fn retry_transient<T, F, Fut, O, OFut>(
    policy: &RetryPolicy,
    what: &str,
    mut op: F,
    mut observe: O,
) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
    O: FnMut(Pubkey) -> OFut,
    OFut: Future<Output = Result<bool>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt + 1 < attempts => {
                let delay = policy.delay_for(attempt);
                warn!(
                    what,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "transient failure, backing off"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(ProtocolError::Program(e))
                if matches!(
                    e,
                    VestigeError::AccountNotYetSynced(_)
                        | VestigeError::AccountDelegated(_)
                        | VestigeError::DelegationConflict
                ) =>
            {
                let maybe_in_flight = match blocking_account(&e) {
                    Some(account) => match observe(account).await {
                        Ok(in_flight) => in_flight,
                        Err(observe_err) => {
                            debug!(what, account = %account, error = %observe_err, "blocking account unreadable");
                            true
                        }
                    },
                    // Conflicts are only raised for records already mid-transition.
                    None => true,
                };
                warn!(what, attempts, maybe_in_flight, error = %e, "retry budget exhausted");
                return Err(ProtocolError::PropagationTimeout {
                    what: what.to_string(),
                    attempts,
                    maybe_in_flight,
                });
            }
            Err(e) => return Err(e),
        }
    }
}

fn blocking_account(e: &VestigeError) -> Option<Pubkey> {
    match e {
        VestigeError::AccountNotYetSynced(account) | VestigeError::AccountDelegated(account) => {
            Some(*account)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    async fn in_flight(_: Pubkey) -> Result<bool> {
        Ok(true)
    }

    fn policy() -> RetryPolicy {
        RetryPolicy {
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(1_000),
            max_attempts: 6,
        }
    }

    #[test]
    fn test_delay_doubles_then_caps() {
        let p = policy();
        assert_eq!(p.delay_for(0), Duration::from_millis(100));
        assert_eq!(p.delay_for(1), Duration::from_millis(200));
        assert_eq!(p.delay_for(3), Duration::from_millis(800));
        assert_eq!(p.delay_for(4), Duration::from_millis(1_000));
        assert_eq!(p.delay_for(40), Duration::from_millis(1_000));
        // 100 + 200 + 400 + 800 + 1000
        assert_eq!(p.total_budget(), Duration::from_millis(2_500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_until_ready_after_backoff() {
        let started = tokio::time::Instant::now();
        let value = poll_until(&policy(), "pool", |attempt| async move {
            if attempt < 3 {
                Ok(Probe::Pending { in_flight: true })
            } else {
                Ok(Probe::Ready(attempt))
            }
        })
        .await
        .unwrap();

        assert_eq!(value, 3);
        assert_eq!(started.elapsed(), Duration::from_millis(700));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_until_times_out() {
        let result: Result<()> = poll_until(&policy(), "holding", |attempt| async move {
            Ok(Probe::Pending { in_flight: attempt == 2 })
        })
        .await;

        match result {
            Err(ProtocolError::PropagationTimeout {
                what,
                attempts,
                maybe_in_flight,
            }) => {
                assert_eq!(what, "holding");
                assert_eq!(attempts, 6);
                assert!(maybe_in_flight);
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_until_nothing_in_flight() {
        let result: Result<()> =
            poll_until(&policy(), "commitment", |_| async { Ok(Probe::Pending { in_flight: false }) })
                .await;
        assert!(matches!(
            result,
            Err(ProtocolError::PropagationTimeout { maybe_in_flight: false, .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_until_fatal_error_stops() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result: Result<()> = poll_until(&policy(), "pool", move |_| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(ProtocolError::Program(VestigeError::NotDelegated))
            }
        })
        .await;

        assert!(matches!(result, Err(ProtocolError::Program(VestigeError::NotDelegated))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_transient_recovers() {
        let pool = Pubkey::from_label("pool");
        let value = retry_transient(
            &policy(),
            "finalize",
            |attempt| async move {
                if attempt < 2 {
                    Err(ProtocolError::Program(VestigeError::AccountNotYetSynced(pool)))
                } else {
                    Ok("done")
                }
            },
            in_flight,
        )
        .await
        .unwrap();
        assert_eq!(value, "done");
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_transient_exhausted_is_timeout() {
        let pool = Pubkey::from_label("pool");
        let result: Result<()> = retry_transient(
            &policy(),
            "finalize",
            |_| async move { Err(ProtocolError::Program(VestigeError::AccountNotYetSynced(pool))) },
            in_flight,
        )
        .await;
        assert!(matches!(
            result,
            Err(ProtocolError::PropagationTimeout { attempts: 6, maybe_in_flight: true, .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_transient_exhausted_on_settled_account() {
        let holding = Pubkey::from_label("holding");
        let observed = Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen = observed.clone();
        let result: Result<()> = retry_transient(
            &policy(),
            "undelegate",
            |_| async move { Err(ProtocolError::Program(VestigeError::AccountNotYetSynced(holding))) },
            move |account| {
                seen.lock().unwrap().push(account);
                async { Ok(false) }
            },
        )
        .await;

        assert!(matches!(
            result,
            Err(ProtocolError::PropagationTimeout { attempts: 6, maybe_in_flight: false, .. })
        ));
        assert_eq!(*observed.lock().unwrap(), vec![holding]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_transient_conflict_stays_in_flight() {
        let result: Result<()> = retry_transient(
            &policy(),
            "undelegate",
            |_| async { Err(ProtocolError::Program(VestigeError::DelegationConflict)) },
            |_| async { Ok(false) },
        )
        .await;
        assert!(matches!(
            result,
            Err(ProtocolError::PropagationTimeout { maybe_in_flight: true, .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_transient_validation_not_retried() {
        let result: Result<()> = retry_transient(
            &policy(),
            "commit",
            |attempt| async move {
                assert_eq!(attempt, 0);
                Err(ProtocolError::Program(VestigeError::SaleWindowClosed))
            },
            in_flight,
        )
        .await;
        assert!(matches!(result, Err(ProtocolError::Program(VestigeError::SaleWindowClosed))));
    }
}

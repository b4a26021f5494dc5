//! Runtime settings derived from [`VestigeConfig`].

use std::time::Duration;

use serde::Serialize;
use vestige_config::{BoundCheckToml, GraduationToml, PolicyToml, VestigeConfig};
use vestige_program::{BoundCheck, GraduationPolicy, ProgramPolicy};
use vestige_pubkey::Pubkey;

use crate::{
    ledger::{ClusterClock, ClusterConfig},
    retry::RetryPolicy,
    sweeper::SweeperConfig,
};

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub cluster: ClusterConfig,
    pub retry: RetryPolicy,
    pub sweeper: SweeperConfig,
}

/// Flat view for status output.
#[derive(Debug, Clone, Serialize)]
pub struct RuntimeSummary {
    pub validator: String,
    pub propagation_delay_ms: u64,
    pub retry_base_ms: u64,
    pub retry_max_ms: u64,
    pub retry_attempts: u32,
    pub policy: ProgramPolicy,
}

pub fn program_policy(policy: &PolicyToml) -> ProgramPolicy {
    ProgramPolicy {
        bound_check: match policy.bound_check {
            BoundCheckToml::RunningTotal => BoundCheck::RunningTotal,
            BoundCheckToml::Incremental => BoundCheck::Incremental,
        },
        graduation: match policy.graduation {
            GraduationToml::TargetOrExpiry => GraduationPolicy::TargetOrExpiry,
            GraduationToml::ExpiryOnly => GraduationPolicy::ExpiryOnly,
        },
    }
}

impl RuntimeConfig {
    pub fn from_config(config: &VestigeConfig) -> Self {
        let cluster = ClusterConfig {
            propagation_delay: Duration::from_millis(config.cluster.propagation_delay_ms),
            validator: Pubkey::from_label(&config.cluster.validator_seed),
            policy: program_policy(&config.policy),
            auth_token_ttl: Duration::from_secs(config.session.auth_token_ttl_secs),
            clock: ClusterClock::System,
        };
        let retry = RetryPolicy {
            base_delay: Duration::from_millis(config.retry.base_delay_ms),
            max_delay: Duration::from_millis(config.retry.max_delay_ms),
            max_attempts: config.retry.max_attempts.max(1),
        };
        let sweeper = SweeperConfig {
            interval: Duration::from_millis(config.sweeper.interval_ms.max(1)),
            max_failures: config.sweeper.max_failures.max(1),
        };
        Self {
            cluster,
            retry,
            sweeper,
        }
    }

    pub fn with_clock(mut self, clock: ClusterClock) -> Self {
        self.cluster.clock = clock;
        self
    }

    pub fn summary(&self) -> RuntimeSummary {
        RuntimeSummary {
            validator: self.cluster.validator.to_string(),
            propagation_delay_ms: self.cluster.propagation_delay.as_millis() as u64,
            retry_base_ms: self.retry.base_delay.as_millis() as u64,
            retry_max_ms: self.retry.max_delay.as_millis() as u64,
            retry_attempts: self.retry.max_attempts,
            policy: self.cluster.policy,
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::from_config(&VestigeConfig::default())
    }
}

//! Vestige Configuration
//!
//! Shared configuration crate for the protocol client and the CLI.
//!
//! Handles loading configuration from:
//! 1. VG_CONFIG env var (explicit path)
//! 2. ./config.toml (current directory)
//! 3. ~/.vestige/config.toml (user home)
//!
//! Environment variables take precedence over TOML config. The library
//! keeps no global instance; callers load once and pass the value down.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::{env, fs};

const CONFIG_FILE_NAME: &str = "config.toml";
const CONFIG_DIR_NAME: &str = ".vestige";

// ============================================================================
// Default Constants
// ============================================================================

const DEFAULT_PROPAGATION_DELAY_MS: u64 = 400;
const DEFAULT_VALIDATOR_SEED: &str = "vestige-validator";
const DEFAULT_RETRY_BASE_MS: u64 = 200;
const DEFAULT_RETRY_MAX_MS: u64 = 5_000;
const DEFAULT_MAX_ATTEMPTS: u32 = 8;
const DEFAULT_AUTH_TOKEN_TTL_SECS: u64 = 300;
const DEFAULT_SWEEP_INTERVAL_MS: u64 = 2_000;
const DEFAULT_SWEEP_MAX_FAILURES: u32 = 3;

// ============================================================================
// Config Structs
// ============================================================================

/// Root configuration structure (matches TOML layout)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VestigeConfig {
    #[serde(default)]
    pub cluster: ClusterToml,
    #[serde(default)]
    pub retry: RetryToml,
    #[serde(default)]
    pub policy: PolicyToml,
    #[serde(default)]
    pub session: SessionToml,
    #[serde(default)]
    pub sweeper: SweeperToml,
}

/// Local two-layer cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterToml {
    /// Time a delegation or undelegation takes to land on the other layer.
    #[serde(default = "default_propagation_delay")]
    pub propagation_delay_ms: u64,
    /// Label the execution-layer validator identity is derived from.
    #[serde(default = "default_validator_seed")]
    pub validator_seed: String,
}

impl Default for ClusterToml {
    fn default() -> Self {
        Self {
            propagation_delay_ms: DEFAULT_PROPAGATION_DELAY_MS,
            validator_seed: DEFAULT_VALIDATOR_SEED.into(),
        }
    }
}

fn default_propagation_delay() -> u64 {
    DEFAULT_PROPAGATION_DELAY_MS
}

fn default_validator_seed() -> String {
    DEFAULT_VALIDATOR_SEED.into()
}

/// Backoff for cross-layer waits and transient failures
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryToml {
    #[serde(default = "default_retry_base_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_retry_max_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for RetryToml {
    fn default() -> Self {
        Self {
            base_delay_ms: DEFAULT_RETRY_BASE_MS,
            max_delay_ms: DEFAULT_RETRY_MAX_MS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

fn default_retry_base_ms() -> u64 {
    DEFAULT_RETRY_BASE_MS
}
fn default_retry_max_ms() -> u64 {
    DEFAULT_RETRY_MAX_MS
}
fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

/// How commitment bounds are applied
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BoundCheckToml {
    /// Maximum applies to the participant's running total.
    #[default]
    RunningTotal,
    /// Both bounds apply to each commit on its own.
    Incremental,
}

/// When a launch may graduate
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GraduationToml {
    #[default]
    TargetOrExpiry,
    ExpiryOnly,
}

/// Program policy, fixed when the program is deployed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyToml {
    #[serde(default)]
    pub bound_check: BoundCheckToml,
    #[serde(default)]
    pub graduation: GraduationToml,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionToml {
    #[serde(default = "default_auth_token_ttl")]
    pub auth_token_ttl_secs: u64,
}

impl Default for SessionToml {
    fn default() -> Self {
        Self {
            auth_token_ttl_secs: DEFAULT_AUTH_TOKEN_TTL_SECS,
        }
    }
}

fn default_auth_token_ttl() -> u64 {
    DEFAULT_AUTH_TOKEN_TTL_SECS
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweeperToml {
    #[serde(default = "default_sweep_interval")]
    pub interval_ms: u64,
    #[serde(default = "default_sweep_max_failures")]
    pub max_failures: u32,
}

impl Default for SweeperToml {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_SWEEP_INTERVAL_MS,
            max_failures: DEFAULT_SWEEP_MAX_FAILURES,
        }
    }
}

fn default_sweep_interval() -> u64 {
    DEFAULT_SWEEP_INTERVAL_MS
}

fn default_sweep_max_failures() -> u32 {
    DEFAULT_SWEEP_MAX_FAILURES
}

// ============================================================================
// Environment Variable Helpers
// ============================================================================

/// Set field from the variable if present
fn env_string(lookup: &impl Fn(&str) -> Option<String>, key: &str, field: &mut String) {
    if let Some(v) = lookup(key) {
        *field = v;
    }
}

/// Set field from the variable if present and parseable
fn env_parse<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    field: &mut T,
) {
    if let Some(v) = lookup(key) {
        match v.parse() {
            Ok(parsed) => *field = parsed,
            Err(_) => log::warn!("Ignoring unparseable {}={}", key, v),
        }
    }
}

// ============================================================================
// Implementation
// ============================================================================

impl VestigeConfig {
    /// Load configuration from config file with env var overrides
    pub fn load() -> Result<Self> {
        let mut config = match Self::find_config_file() {
            Some(path) => {
                log::info!("Loading config from: {}", path.display());
                Self::parse_file(&path)?
            }
            None => {
                log::info!("No config file found, using defaults and environment variables");
                Self::default()
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific file path
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::parse_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn parse_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Find the config file path
    fn find_config_file() -> Option<PathBuf> {
        // 1. Check VG_CONFIG env var
        if let Ok(path) = env::var("VG_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
            log::warn!("VG_CONFIG points to missing file: {}", path.display());
        }

        // 2. Check ./config.toml (current directory)
        let local_path = PathBuf::from(CONFIG_FILE_NAME);
        if local_path.exists() {
            return Some(local_path);
        }

        // 3. Check ~/.vestige/config.toml
        Self::default_config_path().filter(|p| p.exists())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    /// Apply `VG_*` overrides resolved through `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // Cluster
        env_parse(&lookup, "VG_PROPAGATION_DELAY_MS", &mut self.cluster.propagation_delay_ms);
        env_string(&lookup, "VG_VALIDATOR_SEED", &mut self.cluster.validator_seed);

        // Retry
        env_parse(&lookup, "VG_RETRY_BASE_MS", &mut self.retry.base_delay_ms);
        env_parse(&lookup, "VG_RETRY_MAX_MS", &mut self.retry.max_delay_ms);
        env_parse(&lookup, "VG_RETRY_MAX_ATTEMPTS", &mut self.retry.max_attempts);

        // Policy
        if let Some(v) = lookup("VG_BOUND_CHECK") {
            self.policy.bound_check = match v.to_ascii_lowercase().as_str() {
                "incremental" => BoundCheckToml::Incremental,
                _ => BoundCheckToml::RunningTotal,
            };
        }
        if let Some(v) = lookup("VG_GRADUATION") {
            self.policy.graduation = match v.to_ascii_lowercase().as_str() {
                "expiry_only" | "expiry-only" => GraduationToml::ExpiryOnly,
                _ => GraduationToml::TargetOrExpiry,
            };
        }

        // Session
        env_parse(&lookup, "VG_AUTH_TOKEN_TTL_SECS", &mut self.session.auth_token_ttl_secs);

        // Sweeper
        env_parse(&lookup, "VG_SWEEP_INTERVAL_MS", &mut self.sweeper.interval_ms);
        env_parse(&lookup, "VG_SWEEP_MAX_FAILURES", &mut self.sweeper.max_failures);
    }

    /// Get the default config file path
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Generate a sample config file
    pub fn generate_sample() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

// ============================================================================
// Tests
// ============================================================================

//! In-process two-layer ledger.
//!
//! Hosts the Vestige program on a public base ledger and a delegated
//! execution layer, with the delegation program moving accounts between
//! them after a configurable propagation delay.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                           LocalCluster                            │
//! │                                                                   │
//! │  ┌──────────────┐   Delegate (after delay)    ┌────────────────┐  │
//! │  │ Base ledger  │ ──────────────────────────▶ │ Execution layer│  │
//! │  │              │                             │                │  │
//! │  │  wallets     │ ◀────────────────────────── │  delegated     │  │
//! │  │  records     │   Undelegate (after delay)  │  records only  │  │
//! │  │  vault       │                             │                │  │
//! │  └──────────────┘                             └────────────────┘  │
//! │         │                                            │            │
//! │         ▼                                            ▼            │
//! │  ┌─────────────────────────────────────────────────────────────┐  │
//! │  │ Executor: verify signatures ▸ invoke ▸ check ▸ commit       │  │
//! │  └─────────────────────────────────────────────────────────────┘  │
//! └───────────────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod cluster;
pub mod delegation;
pub mod executor;
pub mod token;

pub use auth::{AuthToken, Challenge};
pub use cluster::{ClusterClock, ClusterConfig, LocalCluster};
pub use token::TokenBank;

use thiserror::Error;
use vestige_program::VestigeError;
use vestige_pubkey::Pubkey;
use vestige_signature::Signature;
use vestige_transaction::{Layer, TransactionError};

#[derive(Debug, Error)]
pub enum LedgerError {
    /// The program rejected an instruction.
    #[error("Program error: {0}")]
    Program(#[from] VestigeError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] TransactionError),

    /// An account flagged as signer carries no valid signature.
    #[error("Missing signature for {0}")]
    MissingSignature(Pubkey),

    #[error("Unknown program {0}")]
    UnknownProgram(Pubkey),

    #[error("Lamports not conserved: {before} before, {after} after")]
    LamportsNotConserved { before: u128, after: u128 },

    /// Lamports left an account the program neither owns nor was signed for.
    #[error("Unauthorized debit of {0}")]
    UnauthorizedDebit(Pubkey),

    #[error("Unauthorized modification of {0}")]
    UnauthorizedModification(Pubkey),

    /// The execution layer only tracks balances; lamports stay on the base ledger.
    #[error("Execution layer cannot move lamports of {0}")]
    LamportsFrozen(Pubkey),

    #[error("Delegation names validator {0}, which does not run this execution layer")]
    InvalidValidator(Pubkey),

    #[error("Insufficient tokens: need {needed}, have {available}")]
    InsufficientTokens { needed: u64, available: u64 },

    /// Execution-layer request without an auth token.
    #[error("Execution layer requires an auth token")]
    AuthRequired,

    #[error("Auth token expired")]
    AuthExpired,

    #[error("Auth token not recognized")]
    AuthInvalid,

    #[error("No outstanding challenge for {0}")]
    UnknownChallenge(Pubkey),

    #[error("Challenge signature rejected for {0}")]
    BadChallengeSignature(Pubkey),

    /// The authenticated identity may not see or act on this account.
    #[error("Access denied to {0}")]
    AccessDenied(Pubkey),
}

pub type Result<T> = std::result::Result<T, LedgerError>;

/// What a committed transaction left behind.
#[derive(Debug, Clone)]
pub struct TransactionReceipt {
    pub signature: Signature,
    pub layer: Layer,
    pub slot: u64,
    /// Program log lines in instruction order.
    pub logs: Vec<String>,
}

impl TransactionReceipt {
    /// Log lines starting with `tag`, e.g. `"VG_COMMIT"`.
    pub fn logs_tagged<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.logs
            .iter()
            .map(String::as_str)
            .filter(move |line| line.starts_with(tag))
    }
}

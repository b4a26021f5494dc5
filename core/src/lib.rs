//! Client orchestration for Vestige launches.
//!
//! ```text
//!   CommitmentFlow / CreatorFlow            (flow)
//!        │            │
//!        │     DelegationTracker            (delegation)
//!        │            │
//!        └──── Session ──── RetryPolicy      (session, retry)
//!                 │
//!           dyn LedgerClient                 (client)
//!                 │
//!           LocalCluster                     (ledger)
//!        base ledger │ execution layer
//!                    └── vestige-program
//! ```
//!
//! Flows never hold ledger locks across awaits; every cross-layer wait is
//! a bounded backoff that ends in success or `PropagationTimeout`.

pub mod client;
pub mod config;
pub mod delegation;
pub mod error;
pub mod flow;
pub mod ledger;
pub mod retry;
pub mod session;
pub mod sweeper;

pub use client::LedgerClient;
pub use config::RuntimeConfig;
pub use delegation::{Authority, DelegationStatus, DelegationTracker, Pending};
pub use error::{ProtocolError, Result};
pub use flow::{Allocation, CommitmentFlow, CommitmentState, CreatorFlow, LaunchTerms, SetupOutcome};
pub use ledger::{ClusterClock, ClusterConfig, LocalCluster};
pub use retry::RetryPolicy;
pub use session::{Session, SessionRegistry};
pub use sweeper::{SweepReport, Sweeper, SweeperConfig};

//! Vestige commitment program.
//!
//! Runs on both ledger layers. Base-ledger instructions create and fund
//! accounts, hand them to the execution layer and settle the sale;
//! execution-layer instructions record private commitments and send the
//! pool back.
//!
//! ```text
//!   base:  InitializeLaunch ─ Init* ─ FundEphemeral ─ CreatePermission ─ Delegate
//!                                                                          │
//!   exec:                          PrivateCommit ◀─────────────────────────┘
//!                                  GraduateAndUndelegate / UndelegateUserCommitment
//!                                                                          │
//!   base:  FinalizeGraduation ─ SweepToVault ─ CalculateAllocation ─ ClaimTokens
//! ```

pub mod allocation;
pub mod client;
mod entrypoint;
pub mod error;
pub mod helpers;
pub mod instruction;
pub mod policy;

pub use entrypoint::process_instruction;
pub use error::{ErrorCategory, VestigeError};
pub use helpers::{AccountInfo, Effect, InvokeContext};
pub use instruction::commit::validate_commit;
pub use policy::{BoundCheck, GraduationPolicy, ProgramPolicy};

pub use vestige_account::VESTIGE_PROGRAM_ID as ID;

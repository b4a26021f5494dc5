//! Ledger access as seen by the protocol flows.
//!
//! [`crate::ledger::LocalCluster`] implements it in-process; a networked
//! client for a real base ledger and execution layer would implement the
//! same trait.

use async_trait::async_trait;
use vestige_account::Account;
use vestige_program::ProgramPolicy;
use vestige_pubkey::Pubkey;
use vestige_signature::Signature;
use vestige_transaction::{Layer, Transaction};

use crate::ledger::{AuthToken, Challenge, Result, TransactionReceipt};

#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Current state of `address` on `layer`. Execution-layer reads of
    /// accounts the layer does not hold fall through to the base ledger.
    async fn get_account(
        &self,
        layer: Layer,
        address: &Pubkey,
        auth: Option<&AuthToken>,
    ) -> Result<Option<Account>>;

    /// Execute `tx` atomically on `layer`.
    async fn send_transaction(
        &self,
        layer: Layer,
        tx: Transaction,
        auth: Option<&AuthToken>,
    ) -> Result<TransactionReceipt>;

    async fn unix_timestamp(&self) -> Result<i64>;

    /// Rules the deployed program enforces.
    async fn program_policy(&self) -> Result<ProgramPolicy>;

    async fn request_challenge(&self, identity: &Pubkey) -> Result<Challenge>;

    async fn login(&self, identity: &Pubkey, signature: &Signature) -> Result<AuthToken>;
}

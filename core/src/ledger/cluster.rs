use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};
use vestige_account::{Account, AccountRecord, Permission, seeds};
use vestige_program::{ProgramPolicy, VestigeError};
use vestige_pubkey::Pubkey;
use vestige_signature::Signature;
use vestige_transaction::{Layer, Transaction};

use super::{
    LedgerError, Result, TransactionReceipt,
    auth::{AuthManager, AuthToken, Challenge},
    delegation::{self, Propagation},
    executor::{self, Staged},
    token::TokenBank,
};
use crate::client::LedgerClient;

const DEFAULT_PROPAGATION_DELAY_MS: u64 = 400;
const DEFAULT_AUTH_TOKEN_TTL_SECS: u64 = 300;
const DEFAULT_VALIDATOR_LABEL: &str = "vestige-validator";

/// Source of the unix timestamp the program sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterClock {
    System,
    /// Fixed until moved explicitly; tests walk the sale window with it.
    Manual(i64),
}

impl ClusterClock {
    pub fn unix_timestamp(&self) -> i64 {
        match self {
            ClusterClock::System => SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs() as i64)
                .unwrap_or(0),
            ClusterClock::Manual(ts) => *ts,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClusterConfig {
    /// How long a delegation or undelegation takes to land.
    pub propagation_delay: Duration,
    /// Identity of the execution layer's validator.
    pub validator: Pubkey,
    /// Program policy fixed at deployment.
    pub policy: ProgramPolicy,
    pub auth_token_ttl: Duration,
    pub clock: ClusterClock,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            propagation_delay: Duration::from_millis(DEFAULT_PROPAGATION_DELAY_MS),
            validator: Pubkey::from_label(DEFAULT_VALIDATOR_LABEL),
            policy: ProgramPolicy::default(),
            auth_token_ttl: Duration::from_secs(DEFAULT_AUTH_TOKEN_TTL_SECS),
            clock: ClusterClock::System,
        }
    }
}

pub(crate) struct LedgerState {
    pub base: HashMap<Pubkey, Account>,
    pub execution: HashMap<Pubkey, Account>,
    pub in_flight: Vec<Propagation>,
    pub tokens: TokenBank,
    pub auth: AuthManager,
    pub clock: ClusterClock,
    pub propagation_paused: bool,
    pub slot: u64,
}

impl LedgerState {
    fn commit(&mut self, staged: Staged) -> Result<()> {
        // Token movements are the only part that can still fail.
        self.tokens.apply_all(&staged.token_transfers)?;
        self.base.extend(staged.base);
        self.execution.extend(staged.execution);
        for key in &staged.evicted {
            self.execution.remove(key);
        }
        self.in_flight.extend(staged.propagations);
        self.slot += 1;
        Ok(())
    }

    /// Execution-layer reads of a permission-protected account need a
    /// token whose identity the permission admits.
    fn check_read_access(&self, address: &Pubkey, auth: Option<&AuthToken>) -> Result<()> {
        let (permission_address, _) = seeds::derive_permission_pda(address);
        let Some(permission_account) = self.base.get(&permission_address) else {
            return Ok(());
        };
        let permission = Permission::from_account_data(&permission_account.data)
            .map_err(|_| LedgerError::Program(VestigeError::InvalidAccountData))?;
        let identity = self.auth.authenticate(auth)?;
        if !permission.allows(&identity) {
            return Err(LedgerError::AccessDenied(*address));
        }
        Ok(())
    }
}

/// Both layers plus the delegation program, behind one lock so that each
/// transaction is a single atomic read-modify-write.
#[derive(Clone)]
pub struct LocalCluster {
    config: Arc<ClusterConfig>,
    state: Arc<Mutex<LedgerState>>,
}

impl LocalCluster {
    pub fn new(config: ClusterConfig) -> Self {
        let secret = *blake3::hash(config.validator.as_ref()).as_bytes();
        let state = LedgerState {
            base: HashMap::new(),
            execution: HashMap::new(),
            in_flight: Vec::new(),
            tokens: TokenBank::new(),
            auth: AuthManager::new(secret, config.auth_token_ttl),
            clock: config.clock,
            propagation_paused: false,
            slot: 0,
        };
        info!(
            validator = %config.validator,
            propagation_delay_ms = config.propagation_delay.as_millis() as u64,
            "local cluster started"
        );
        Self {
            config: Arc::new(config),
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    pub fn validator(&self) -> Pubkey {
        self.config.validator
    }

    // ========================================================================
    // Operator helpers
    // ========================================================================

    pub async fn airdrop(&self, to: &Pubkey, lamports: u64) {
        let mut state = self.state.lock().await;
        let account = state
            .base
            .entry(*to)
            .or_insert_with(|| Account::new_wallet(0));
        account.lamports = account.lamports.saturating_add(lamports);
    }

    pub async fn mint_tokens(&self, mint: &Pubkey, to: &Pubkey, amount: u64) -> Result<()> {
        self.state.lock().await.tokens.mint_to(mint, to, amount)
    }

    pub async fn token_balance(&self, mint: &Pubkey, holder: &Pubkey) -> u64 {
        self.state.lock().await.tokens.balance(mint, holder)
    }

    pub async fn set_unix_timestamp(&self, unix_timestamp: i64) {
        self.state.lock().await.clock = ClusterClock::Manual(unix_timestamp);
    }

    /// Move a manual clock forward. A system clock is pinned first.
    pub async fn advance_clock(&self, secs: i64) {
        let mut state = self.state.lock().await;
        let now = state.clock.unix_timestamp();
        state.clock = ClusterClock::Manual(now + secs);
    }

    /// Hold every delegation and undelegation in flight until resumed.
    pub async fn pause_propagation(&self) {
        self.state.lock().await.propagation_paused = true;
    }

    pub async fn resume_propagation(&self) {
        self.state.lock().await.propagation_paused = false;
    }

    pub async fn in_flight(&self) -> usize {
        self.state.lock().await.in_flight.len()
    }

    pub async fn slot(&self) -> u64 {
        self.state.lock().await.slot
    }

    /// Base-ledger lamports of `address`, zero when absent.
    pub async fn lamports(&self, address: &Pubkey) -> u64 {
        let mut state = self.state.lock().await;
        delegation::settle_due(&mut state);
        state.base.get(address).map(|a| a.lamports).unwrap_or(0)
    }

    /// Whether the execution layer currently holds `address`.
    pub async fn is_on_execution(&self, address: &Pubkey) -> bool {
        let mut state = self.state.lock().await;
        delegation::settle_due(&mut state);
        state.execution.contains_key(address)
    }
}

#[async_trait]
impl LedgerClient for LocalCluster {
    async fn get_account(
        &self,
        layer: Layer,
        address: &Pubkey,
        auth: Option<&AuthToken>,
    ) -> Result<Option<Account>> {
        let mut state = self.state.lock().await;
        delegation::settle_due(&mut state);

        if layer == Layer::Execution {
            if let Some(account) = state.execution.get(address) {
                state.check_read_access(address, auth)?;
                return Ok(Some(account.clone()));
            }
        }
        Ok(state.base.get(address).cloned())
    }

    async fn send_transaction(
        &self,
        layer: Layer,
        tx: Transaction,
        auth: Option<&AuthToken>,
    ) -> Result<TransactionReceipt> {
        let mut state = self.state.lock().await;
        delegation::settle_due(&mut state);

        if layer == Layer::Execution {
            let identity = state.auth.authenticate(auth)?;
            if identity != tx.message.fee_payer {
                return Err(LedgerError::AccessDenied(tx.message.fee_payer));
            }
        }

        let staged = match executor::execute(&state, &self.config, layer, &tx) {
            Ok(staged) => staged,
            Err(e) => {
                debug!(layer = %layer, payer = %tx.message.fee_payer, error = %e, "transaction rejected");
                return Err(e);
            }
        };
        let logs = staged.logs.clone();
        state.commit(staged)?;

        Ok(TransactionReceipt {
            signature: tx.id(),
            layer,
            slot: state.slot,
            logs,
        })
    }

    async fn unix_timestamp(&self) -> Result<i64> {
        Ok(self.state.lock().await.clock.unix_timestamp())
    }

    async fn program_policy(&self) -> Result<ProgramPolicy> {
        Ok(self.config.policy)
    }

    async fn request_challenge(&self, identity: &Pubkey) -> Result<Challenge> {
        Ok(self.state.lock().await.auth.issue_challenge(identity))
    }

    async fn login(&self, identity: &Pubkey, signature: &Signature) -> Result<AuthToken> {
        self.state.lock().await.auth.login(identity, signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vestige_keypair::{Keypair, TransactionSigner};
    use vestige_program::{client, instruction::InitializeLaunchParams};
    use vestige_transaction::Message;

    const SOL: u64 = 1_000_000_000;
    const START: i64 = 1_700_000_000;

    fn cluster() -> LocalCluster {
        LocalCluster::new(ClusterConfig {
            clock: ClusterClock::Manual(START),
            ..ClusterConfig::default()
        })
    }

    fn signed(payer: &Keypair, ix: vestige_transaction::Instruction, nonce: u64) -> Transaction {
        let message = Message::new(payer.pubkey(), vec![ix], nonce);
        Transaction::new_signed(message, &[payer]).unwrap()
    }

    fn params(mint: Pubkey) -> InitializeLaunchParams {
        InitializeLaunchParams {
            token_mint: mint,
            token_supply: 1_000,
            start_time: START,
            end_time: START + 3_600,
            graduation_target: 10 * SOL,
            min_commitment: SOL / 10,
            max_commitment: 5 * SOL,
        }
    }

    #[tokio::test]
    async fn test_failed_transaction_leaves_no_trace() {
        let cluster = cluster();
        let creator = Keypair::from_label("creator");
        let mint = Pubkey::from_label("mint");
        cluster.airdrop(&creator.pubkey(), SOL).await;

        // No tokens minted: the escrow transfer fails after the accounts were written.
        let ix = client::initialize_launch(&creator.pubkey(), &params(mint)).unwrap();
        let result = cluster.send_transaction(Layer::Base, signed(&creator, ix, 1), None).await;
        assert!(matches!(result, Err(LedgerError::InsufficientTokens { .. })));

        let (launch, _) = seeds::derive_launch_pda(&creator.pubkey(), &mint);
        assert!(cluster.get_account(Layer::Base, &launch, None).await.unwrap().is_none());
        assert_eq!(cluster.slot().await, 0);
    }

    #[tokio::test]
    async fn test_launch_escrows_supply() {
        let cluster = cluster();
        let creator = Keypair::from_label("creator");
        let mint = Pubkey::from_label("mint");
        cluster.airdrop(&creator.pubkey(), SOL).await;
        cluster.mint_tokens(&mint, &creator.pubkey(), 1_000).await.unwrap();

        let ix = client::initialize_launch(&creator.pubkey(), &params(mint)).unwrap();
        let receipt = cluster
            .send_transaction(Layer::Base, signed(&creator, ix, 1), None)
            .await
            .unwrap();

        let (launch, _) = seeds::derive_launch_pda(&creator.pubkey(), &mint);
        assert_eq!(cluster.token_balance(&mint, &launch).await, 1_000);
        assert_eq!(cluster.token_balance(&mint, &creator.pubkey()).await, 0);
        assert_eq!(receipt.logs_tagged("VG_LAUNCH").count(), 1);
    }

    #[tokio::test]
    async fn test_unsigned_signer_rejected() {
        let cluster = cluster();
        let creator = Keypair::from_label("creator");
        let impostor = Keypair::from_label("impostor");
        let mint = Pubkey::from_label("mint");

        let ix = client::initialize_launch(&creator.pubkey(), &params(mint)).unwrap();
        let message = Message::new(impostor.pubkey(), vec![ix], 1);
        let tx = Transaction::new_signed(message, &[&impostor]).unwrap();

        let result = cluster.send_transaction(Layer::Base, tx, None).await;
        assert!(matches!(result, Err(LedgerError::MissingSignature(key)) if key == creator.pubkey()));
    }

    #[tokio::test]
    async fn test_execution_layer_requires_login() {
        let cluster = cluster();
        let user = Keypair::from_label("user");
        let launch = Pubkey::from_label("launch");

        let ix = client::private_commit(&user.pubkey(), &launch, SOL).unwrap();
        let result = cluster
            .send_transaction(Layer::Execution, signed(&user, ix, 1), None)
            .await;
        assert!(matches!(result, Err(LedgerError::AuthRequired)));
    }

    #[tokio::test]
    async fn test_execution_writes_need_synced_accounts() {
        let cluster = cluster();
        let user = Keypair::from_label("user");
        let launch = Pubkey::from_label("launch");

        let challenge = cluster.request_challenge(&user.pubkey()).await.unwrap();
        let token = cluster
            .login(&user.pubkey(), &user.sign_message(&challenge.message()))
            .await
            .unwrap();

        let ix = client::private_commit(&user.pubkey(), &launch, SOL).unwrap();
        let result = cluster
            .send_transaction(Layer::Execution, signed(&user, ix, 1), Some(&token))
            .await;
        assert!(matches!(
            result,
            Err(LedgerError::Program(VestigeError::AccountNotYetSynced(_)))
        ));
    }

    #[tokio::test]
    async fn test_manual_clock_moves_only_on_request() {
        let cluster = cluster();
        assert_eq!(cluster.unix_timestamp().await.unwrap(), START);
        cluster.advance_clock(90).await;
        assert_eq!(cluster.unix_timestamp().await.unwrap(), START + 90);
        cluster.set_unix_timestamp(START).await;
        assert_eq!(cluster.unix_timestamp().await.unwrap(), START);
    }
}

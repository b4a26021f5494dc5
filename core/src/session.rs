//! Per-identity client state.
//!
//! A [`Session`] bundles what every flow needs: the signer, the ledger
//! handle, the retry policy and the cached execution-layer auth token.
//! Servers acting for many users keep one session per identity in a
//! [`SessionRegistry`].

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::debug;
use vestige_account::{Account, AccountRecord};
use vestige_keypair::TransactionSigner;
use vestige_program::ProgramPolicy;
use vestige_pubkey::Pubkey;
use vestige_transaction::{Instruction, Layer, Message, Transaction};

use crate::{
    client::LedgerClient,
    error::{ProtocolError, Result},
    ledger::{AuthToken, LedgerError, TransactionReceipt},
    retry::RetryPolicy,
};

/// Tokens closer than this to expiry are renewed before use.
const AUTH_REFRESH_MARGIN: Duration = Duration::from_secs(5);

pub struct Session {
    signer: Arc<dyn TransactionSigner>,
    client: Arc<dyn LedgerClient>,
    retry: RetryPolicy,
    auth: Mutex<Option<AuthToken>>,
    nonce: AtomicU64,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("identity", &self.identity())
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(
        signer: Arc<dyn TransactionSigner>,
        client: Arc<dyn LedgerClient>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            signer,
            client,
            retry,
            auth: Mutex::new(None),
            nonce: AtomicU64::new(1),
        }
    }

    pub fn identity(&self) -> Pubkey {
        self.signer.pubkey()
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn client(&self) -> &Arc<dyn LedgerClient> {
        &self.client
    }

    /// Cached execution-layer token, logging in again when it is missing
    /// or about to expire.
    pub async fn auth_token(&self) -> Result<AuthToken> {
        let mut cached = self.auth.lock().await;
        if let Some(token) = cached.as_ref() {
            if !token.expires_within(AUTH_REFRESH_MARGIN) {
                return Ok(token.clone());
            }
        }

        let identity = self.identity();
        let challenge = self.client.request_challenge(&identity).await?;
        let signature = self.signer.sign_message(&challenge.message());
        let token = self.client.login(&identity, &signature).await?;
        debug!(identity = %identity, "logged in to execution layer");

        *cached = Some(token.clone());
        Ok(token)
    }

    pub async fn invalidate_auth(&self) {
        *self.auth.lock().await = None;
    }

    async fn auth_for(&self, layer: Layer) -> Result<Option<AuthToken>> {
        match layer {
            Layer::Base => Ok(None),
            Layer::Execution => Ok(Some(self.auth_token().await?)),
        }
    }

    /// Sign `instructions` as one transaction and submit it to `layer`.
    /// A token that expired in transit is renewed once.
    pub async fn send(
        &self,
        layer: Layer,
        instructions: Vec<Instruction>,
    ) -> Result<TransactionReceipt> {
        let mut renewed = false;
        loop {
            let auth = self.auth_for(layer).await?;
            let nonce = self.nonce.fetch_add(1, Ordering::Relaxed);
            let message = Message::new(self.identity(), instructions.clone(), nonce);
            let tx = Transaction::new_signed(message, &[self.signer.as_ref()])?;

            match self.client.send_transaction(layer, tx, auth.as_ref()).await {
                Err(LedgerError::AuthExpired) if !renewed => {
                    self.invalidate_auth().await;
                    renewed = true;
                }
                result => return result.map_err(ProtocolError::from),
            }
        }
    }

    pub async fn fetch(&self, layer: Layer, address: &Pubkey) -> Result<Option<Account>> {
        let auth = self.auth_for(layer).await?;
        Ok(self.client.get_account(layer, address, auth.as_ref()).await?)
    }

    /// Decode the record at `address`, `None` when the account is absent
    /// or empty.
    pub async fn fetch_record<T: AccountRecord>(
        &self,
        layer: Layer,
        address: &Pubkey,
    ) -> Result<Option<T>> {
        match self.fetch(layer, address).await? {
            Some(account) if account.has_data() => T::from_account_data(&account.data)
                .map(Some)
                .map_err(|source| ProtocolError::Decode {
                    address: *address,
                    source,
                }),
            _ => Ok(None),
        }
    }

    pub async fn require_record<T: AccountRecord>(
        &self,
        layer: Layer,
        address: &Pubkey,
    ) -> Result<T> {
        self.fetch_record(layer, address)
            .await?
            .ok_or(ProtocolError::AccountMissing(*address))
    }

    pub async fn unix_timestamp(&self) -> Result<i64> {
        Ok(self.client.unix_timestamp().await?)
    }

    pub async fn program_policy(&self) -> Result<ProgramPolicy> {
        Ok(self.client.program_policy().await?)
    }
}

/// Sessions keyed by identity.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<Pubkey, Arc<Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Register `session`, returning the one it replaced.
    pub fn insert(&self, session: Arc<Session>) -> Option<Arc<Session>> {
        self.sessions.insert(session.identity(), session)
    }

    pub fn get(&self, identity: &Pubkey) -> Option<Arc<Session>> {
        self.sessions.get(identity).map(|entry| entry.value().clone())
    }

    pub fn remove(&self, identity: &Pubkey) -> Option<Arc<Session>> {
        self.sessions.remove(identity).map(|(_, session)| session)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn identities(&self) -> Vec<Pubkey> {
        self.sessions.iter().map(|entry| *entry.key()).collect()
    }

    /// Remove sessions that do not satisfy the predicate
    pub fn retain<F>(&self, mut f: F)
    where
        F: FnMut(&Pubkey, &Session) -> bool,
    {
        // Collect first; removing while iterating would deadlock the shard.
        let to_remove: Vec<Pubkey> = self
            .sessions
            .iter()
            .filter_map(|entry| {
                let key = *entry.key();
                if !f(&key, entry.value().as_ref()) { Some(key) } else { None }
            })
            .collect();

        for key in to_remove {
            self.sessions.remove(&key);
        }
    }
}

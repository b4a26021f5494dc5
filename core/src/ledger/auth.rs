//! Challenge/response login for the execution layer.
//!
//! A client asks for a challenge, signs [`Challenge::message`] with its
//! identity key and trades the signature for a short-lived token. The
//! token gates every execution-layer transaction and every read of a
//! permission-protected account.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;
use vestige_keypair::verify_signature;
use vestige_pubkey::Pubkey;
use vestige_signature::Signature;

use super::{LedgerError, Result};

const LOGIN_DOMAIN: &[u8] = b"vestige-login:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub identity: Pubkey,
    pub nonce: [u8; 32],
}

impl Challenge {
    /// Bytes the identity must sign to log in.
    pub fn message(&self) -> Vec<u8> {
        let mut msg = Vec::with_capacity(LOGIN_DOMAIN.len() + 64);
        msg.extend_from_slice(LOGIN_DOMAIN);
        msg.extend_from_slice(self.identity.as_ref());
        msg.extend_from_slice(&self.nonce);
        msg
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthToken {
    pub token: String,
    pub identity: Pubkey,
    pub expires_at: Instant,
}

impl AuthToken {
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    /// True when the token lapses within `margin` from now.
    pub fn expires_within(&self, margin: Duration) -> bool {
        Instant::now() + margin >= self.expires_at
    }
}

#[derive(Debug)]
struct Grant {
    identity: Pubkey,
    expires_at: Instant,
}

#[derive(Debug)]
pub struct AuthManager {
    secret: [u8; 32],
    ttl: Duration,
    counter: u64,
    challenges: HashMap<Pubkey, Challenge>,
    grants: HashMap<String, Grant>,
}

impl AuthManager {
    pub fn new(secret: [u8; 32], ttl: Duration) -> Self {
        Self {
            secret,
            ttl,
            counter: 0,
            challenges: HashMap::new(),
            grants: HashMap::new(),
        }
    }

    /// Issue a fresh challenge, replacing any outstanding one for `identity`.
    pub fn issue_challenge(&mut self, identity: &Pubkey) -> Challenge {
        self.counter += 1;
        let mut hasher = blake3::Hasher::new_keyed(&self.secret);
        hasher.update(b"challenge");
        hasher.update(identity.as_ref());
        hasher.update(&self.counter.to_le_bytes());
        let challenge = Challenge {
            identity: *identity,
            nonce: *hasher.finalize().as_bytes(),
        };
        self.challenges.insert(*identity, challenge.clone());
        challenge
    }

    pub fn login(&mut self, identity: &Pubkey, signature: &Signature) -> Result<AuthToken> {
        let challenge = self
            .challenges
            .remove(identity)
            .ok_or(LedgerError::UnknownChallenge(*identity))?;
        if !verify_signature(identity, &challenge.message(), signature) {
            return Err(LedgerError::BadChallengeSignature(*identity));
        }

        let mut hasher = blake3::Hasher::new_keyed(&self.secret);
        hasher.update(b"token");
        hasher.update(&challenge.nonce);
        let token = hex::encode(hasher.finalize().as_bytes());
        let expires_at = Instant::now() + self.ttl;

        self.prune_expired();
        self.grants.insert(
            token.clone(),
            Grant {
                identity: *identity,
                expires_at,
            },
        );
        log::debug!("auth token issued for {identity}");

        Ok(AuthToken {
            token,
            identity: *identity,
            expires_at,
        })
    }

    /// Identity behind a presented token.
    pub fn authenticate(&self, token: Option<&AuthToken>) -> Result<Pubkey> {
        let token = token.ok_or(LedgerError::AuthRequired)?;
        let grant = self
            .grants
            .get(&token.token)
            .ok_or(LedgerError::AuthInvalid)?;
        if Instant::now() >= grant.expires_at {
            return Err(LedgerError::AuthExpired);
        }
        Ok(grant.identity)
    }

    fn prune_expired(&mut self) {
        let now = Instant::now();
        self.grants.retain(|_, grant| grant.expires_at > now);
    }
}

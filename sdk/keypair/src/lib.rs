use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use rand_core::{OsRng, TryRngCore};
use sha2::{Digest, Sha256};
use thiserror::Error;
use vestige_pubkey::Pubkey;
use vestige_signature::Signature;

#[derive(Debug, Error)]
pub enum KeypairError {
    #[error("OS randomness unavailable: {0}")]
    Entropy(String),

    #[error("Invalid keypair bytes: expected 64, got {0}")]
    InvalidLength(usize),

    #[error("Keypair secret does not match its public half")]
    Mismatch,

    #[error("Invalid keypair JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// The signing capability the protocol consumes from a wallet.
///
/// Anything that can produce an ed25519 signature for an identity can drive
/// a session: a local keypair, a hardware wallet bridge, a remote signer.
pub trait TransactionSigner: Send + Sync {
    fn pubkey(&self) -> Pubkey;
    fn sign_message(&self, message: &[u8]) -> Signature;
}

/// A user's wallet key. NEVER expose the signing key.
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generates a fresh random wallet.
    pub fn new_random() -> Result<Self, KeypairError> {
        let mut seed = [0u8; 32];
        OsRng
            .try_fill_bytes(&mut seed)
            .map_err(|e| KeypairError::Entropy(e.to_string()))?;
        Ok(Self::from_seed(&seed))
    }

    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Deterministic keypair derived from a label. Handy for simulations
    /// where identities must be reproducible across runs.
    pub fn from_label(label: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"vestige-keypair");
        hasher.update(label.as_bytes());
        Self::from_seed(&hasher.finalize().into())
    }

    /// 64 bytes: secret seed followed by the public key (solana-keygen layout).
    pub fn to_bytes(&self) -> [u8; 64] {
        self.signing_key.to_keypair_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeypairError> {
        let array: [u8; 64] = bytes
            .try_into()
            .map_err(|_| KeypairError::InvalidLength(bytes.len()))?;
        let signing_key =
            SigningKey::from_keypair_bytes(&array).map_err(|_| KeypairError::Mismatch)?;
        Ok(Self { signing_key })
    }

    /// JSON array format, compatible with keypair files written by `genkey`.
    pub fn to_json(&self) -> Result<String, KeypairError> {
        Ok(serde_json::to_string(&self.to_bytes().to_vec())?)
    }

    pub fn from_json(json: &str) -> Result<Self, KeypairError> {
        let bytes: Vec<u8> = serde_json::from_str(json)?;
        Self::from_bytes(&bytes)
    }
}

impl TransactionSigner for Keypair {
    fn pubkey(&self) -> Pubkey {
        Pubkey(self.signing_key.verifying_key().to_bytes())
    }

    fn sign_message(&self, message: &[u8]) -> Signature {
        Signature(self.signing_key.sign(message).to_bytes())
    }
}

impl std::fmt::Debug for Keypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keypair")
            .field("pubkey", &self.pubkey())
            .finish_non_exhaustive()
    }
}

/// Check an ed25519 signature against an identity.
pub fn verify_signature(pubkey: &Pubkey, message: &[u8], signature: &Signature) -> bool {
    let Ok(key) = VerifyingKey::from_bytes(pubkey.as_array()) else {
        return false;
    };
    let sig = ed25519_dalek::Signature::from_bytes(signature.as_bytes());
    key.verify(message, &sig).is_ok()
}

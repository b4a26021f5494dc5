use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use wincode::{SchemaRead, SchemaWrite};

/// Maximum number of seeds accepted by address derivation.
pub const MAX_SEEDS: usize = 16;
/// Maximum length of a single seed.
pub const MAX_SEED_LEN: usize = 32;

const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PubkeyError {
    #[error("Invalid base58 string: {0}")]
    InvalidBase58(String),

    #[error("Invalid key length: expected 32 bytes, got {0}")]
    InvalidLength(usize),
}

/// A 32-byte account address on either ledger layer.
#[derive(
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    SchemaRead,
    SchemaWrite,
    Serialize,
    Deserialize,
)]
pub struct Pubkey(pub [u8; 32]);

impl Pubkey {
    pub const LEN: usize = 32;

    pub const fn new_from_array(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0
    }

    pub fn as_array(&self) -> &[u8; 32] {
        &self.0
    }

    /// Deterministic address for a human label. Used for mints and fixtures.
    pub fn from_label(label: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"vestige-label");
        hasher.update(label.as_bytes());
        Self(hasher.finalize().into())
    }

    /// Whether the bytes decode to a point on the ed25519 curve.
    ///
    /// Program-derived addresses are required to be off-curve so no private
    /// key can ever sign for them.
    pub fn is_on_curve(&self) -> bool {
        ed25519_dalek::VerifyingKey::from_bytes(&self.0).is_ok()
    }

    /// Hash seeds + bump + program id into an off-curve address.
    ///
    /// Returns `None` when the result lands on the curve or the seeds are
    /// out of bounds.
    pub fn create_program_address(
        seeds: &[&[u8]],
        bump: u8,
        program_id: &Pubkey,
    ) -> Option<Pubkey> {
        if seeds.len() >= MAX_SEEDS {
            return None;
        }
        if seeds.iter().any(|s| s.len() > MAX_SEED_LEN) {
            return None;
        }

        let mut hasher = Sha256::new();
        for seed in seeds {
            hasher.update(seed);
        }
        hasher.update([bump]);
        hasher.update(program_id.0);
        hasher.update(PDA_MARKER);

        let candidate = Pubkey(hasher.finalize().into());
        if candidate.is_on_curve() {
            None
        } else {
            Some(candidate)
        }
    }

    /// Find the canonical (highest bump) program address for `seeds`.
    pub fn find_program_address(seeds: &[&[u8]], program_id: &Pubkey) -> (Pubkey, u8) {
        Self::try_find_program_address(seeds, program_id)
            .unwrap_or((Pubkey::default(), 0))
    }

    pub fn try_find_program_address(seeds: &[&[u8]], program_id: &Pubkey) -> Option<(Pubkey, u8)> {
        (1..=u8::MAX)
            .rev()
            .find_map(|bump| Self::create_program_address(seeds, bump, program_id).map(|k| (k, bump)))
    }
}

impl AsRef<[u8]> for Pubkey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for Pubkey {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pubkey({})", self)
    }
}

impl FromStr for Pubkey {
    type Err = PubkeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| PubkeyError::InvalidBase58(e.to_string()))?;
        let array: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| PubkeyError::InvalidLength(bytes.len()))?;
        Ok(Self(array))
    }
}

use serde::{Deserialize, Serialize};
use serde_big_array::BigArray;
use std::fmt;
use wincode::{SchemaRead, SchemaWrite};

/// An ed25519 signature over a transaction message or auth challenge.
#[derive(Clone, Copy, PartialEq, Eq, Hash, SchemaRead, SchemaWrite, Serialize, Deserialize)]
pub struct Signature(#[serde(with = "BigArray")] pub [u8; 64]);

impl Signature {
    pub const LEN: usize = 64;

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

impl Default for Signature {
    fn default() -> Self {
        Self([0u8; 64])
    }
}

impl AsRef<[u8]> for Signature {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", self)
    }
}

//! Typed records stored in program-owned account data.

use crate::RecordError;

pub mod commitment;
pub mod delegation;
pub mod holding;
pub mod launch;
pub mod permission;
pub mod pool;
pub mod vault;

pub use commitment::*;
pub use delegation::*;
pub use holding::*;
pub use launch::*;
pub use permission::*;
pub use pool::*;
pub use vault::*;

pub const DISCRIMINATOR_LEN: usize = 8;

/// A record with a stable on-ledger encoding.
pub trait AccountRecord: Sized {
    const NAME: &'static str;
    const DISCRIMINATOR: [u8; DISCRIMINATOR_LEN];

    fn encode_body(&self) -> Result<Vec<u8>, RecordError>;

    fn decode_body(body: &[u8]) -> Result<Self, RecordError>;

    fn to_account_data(&self) -> Result<Vec<u8>, RecordError> {
        let body = self.encode_body()?;
        let mut data = Vec::with_capacity(DISCRIMINATOR_LEN + body.len());
        data.extend_from_slice(&Self::DISCRIMINATOR);
        data.extend_from_slice(&body);
        Ok(data)
    }

    fn from_account_data(data: &[u8]) -> Result<Self, RecordError> {
        if data.len() < DISCRIMINATOR_LEN {
            return Err(RecordError::TooShort(Self::NAME));
        }
        let (tag, body) = data.split_at(DISCRIMINATOR_LEN);
        if tag != Self::DISCRIMINATOR {
            return Err(RecordError::WrongDiscriminator(Self::NAME));
        }
        Self::decode_body(body)
    }

    /// Whether `data` carries this record's discriminator.
    fn matches(data: &[u8]) -> bool {
        data.len() >= DISCRIMINATOR_LEN && data[..DISCRIMINATOR_LEN] == Self::DISCRIMINATOR
    }
}

macro_rules! impl_account_record {
    ($ty:ty, $name:literal, $disc:expr) => {
        impl $crate::state::AccountRecord for $ty {
            const NAME: &'static str = $name;
            const DISCRIMINATOR: [u8; $crate::state::DISCRIMINATOR_LEN] = $disc;

            fn encode_body(&self) -> Result<Vec<u8>, $crate::RecordError> {
                wincode::serialize(self).map_err(|e| $crate::RecordError::Encode {
                    record: $name,
                    reason: e.to_string(),
                })
            }

            fn decode_body(body: &[u8]) -> Result<Self, $crate::RecordError> {
                wincode::deserialize::<$ty>(body).map_err(|e| $crate::RecordError::Decode {
                    record: $name,
                    reason: e.to_string(),
                })
            }
        }
    };
}

pub(crate) use impl_account_record;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use wincode::{SchemaRead, SchemaWrite};

use vestige_keypair::{TransactionSigner, verify_signature};
use vestige_pubkey::Pubkey;
use vestige_signature::Signature;

#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("Message encoding failed: {0}")]
    Encode(String),

    #[error("Transaction carries no instructions")]
    Empty,
}

/// Which ledger a transaction or account read targets.
///
/// ```text
///   Base ──delegate──▶ Execution
///    ▲                     │
///    └─────undelegate──────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    /// Authoritative public ledger.
    Base,
    /// Low-latency execution environment that may hold delegated accounts.
    Execution,
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layer::Base => f.write_str("base"),
            Layer::Execution => f.write_str("execution"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, SchemaRead, SchemaWrite, Serialize, Deserialize)]
pub struct AccountMeta {
    pub pubkey: Pubkey,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl AccountMeta {
    pub fn new(pubkey: Pubkey, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: true,
        }
    }

    pub fn new_readonly(pubkey: Pubkey, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: false,
        }
    }
}

/// A single program call. `data` is a one-byte tag followed by the
/// wincode-encoded parameters.
#[derive(Debug, Clone, PartialEq, Eq, SchemaRead, SchemaWrite, Serialize, Deserialize)]
pub struct Instruction {
    pub program_id: Pubkey,
    pub accounts: Vec<AccountMeta>,
    pub data: Vec<u8>,
}

/// The payload every signer signs.
#[derive(Debug, Clone, PartialEq, Eq, SchemaRead, SchemaWrite, Serialize, Deserialize)]
pub struct Message {
    pub fee_payer: Pubkey,
    pub instructions: Vec<Instruction>,
    /// Distinguishes otherwise identical messages from the same payer.
    pub nonce: u64,
}

impl Message {
    pub fn new(fee_payer: Pubkey, instructions: Vec<Instruction>, nonce: u64) -> Self {
        Self {
            fee_payer,
            instructions,
            nonce,
        }
    }

    pub fn serialize(&self) -> Result<Vec<u8>, TransactionError> {
        wincode::serialize(self).map_err(|e| TransactionError::Encode(e.to_string()))
    }

    /// Every account flagged as signer across all instructions, fee payer first.
    pub fn required_signers(&self) -> Vec<Pubkey> {
        let mut signers = vec![self.fee_payer];
        for meta in self.instructions.iter().flat_map(|ix| ix.accounts.iter()) {
            if meta.is_signer && !signers.contains(&meta.pubkey) {
                signers.push(meta.pubkey);
            }
        }
        signers
    }
}

#[derive(Debug, Clone, PartialEq, Eq, SchemaRead, SchemaWrite, Serialize, Deserialize)]
pub struct SignerEntry {
    pub pubkey: Pubkey,
    pub signature: Signature,
}

/// A message with the signatures authorizing it.
#[derive(Debug, Clone, PartialEq, Eq, SchemaRead, SchemaWrite, Serialize, Deserialize)]
pub struct Transaction {
    pub message: Message,
    pub signatures: Vec<SignerEntry>,
}

impl Transaction {
    /// Sign `message` with every signer supplied.
    pub fn new_signed(
        message: Message,
        signers: &[&dyn TransactionSigner],
    ) -> Result<Self, TransactionError> {
        if message.instructions.is_empty() {
            return Err(TransactionError::Empty);
        }
        let bytes = message.serialize()?;
        let signatures = signers
            .iter()
            .map(|s| SignerEntry {
                pubkey: s.pubkey(),
                signature: s.sign_message(&bytes),
            })
            .collect();
        Ok(Self {
            message,
            signatures,
        })
    }

    /// Identities whose signatures verify over the message.
    pub fn verified_signers(&self) -> Result<Vec<Pubkey>, TransactionError> {
        let bytes = self.message.serialize()?;
        Ok(self
            .signatures
            .iter()
            .filter(|entry| verify_signature(&entry.pubkey, &bytes, &entry.signature))
            .map(|entry| entry.pubkey)
            .collect())
    }

    /// The first signature identifies the transaction in receipts and logs.
    pub fn id(&self) -> Signature {
        self.signatures
            .first()
            .map(|entry| entry.signature)
            .unwrap_or_default()
    }
}

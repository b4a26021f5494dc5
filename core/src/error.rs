use thiserror::Error;
use vestige_account::RecordError;
use vestige_program::{ErrorCategory, VestigeError};
use vestige_pubkey::Pubkey;
use vestige_transaction::TransactionError;

use crate::ledger::LedgerError;

/// Errors surfaced by the client-side protocol flows.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The program rejected an instruction.
    #[error("Program rejected the instruction: {0}")]
    Program(VestigeError),

    /// The ledger rejected the request before or after the program ran.
    #[error("Ledger error: {0}")]
    Ledger(LedgerError),

    /// A cross-layer hand-off was not observed within the retry budget.
    /// The hand-off may still land; nothing may be assumed about either
    /// layer until it has been re-verified.
    #[error(
        "Propagation of {what} not observed after {attempts} attempts \
         (transition in flight: {maybe_in_flight}); cross-layer state is \
         indeterminate and must be re-verified"
    )]
    PropagationTimeout {
        what: String,
        attempts: u32,
        maybe_in_flight: bool,
    },

    #[error("Account {0} does not exist")]
    AccountMissing(Pubkey),

    #[error("Failed to decode {address}: {source}")]
    Decode {
        address: Pubkey,
        #[source]
        source: RecordError,
    },

    #[error("Transaction build failed: {0}")]
    Transaction(#[from] TransactionError),

    /// The participant's records are in a state the operation cannot start from.
    #[error("Cannot {operation} from state {state}")]
    InvalidState {
        operation: &'static str,
        state: String,
    },
}

pub type Result<T> = std::result::Result<T, ProtocolError>;

impl From<LedgerError> for ProtocolError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::Program(program) => ProtocolError::Program(program),
            other => ProtocolError::Ledger(other),
        }
    }
}

impl From<VestigeError> for ProtocolError {
    fn from(e: VestigeError) -> Self {
        ProtocolError::Program(e)
    }
}

impl ProtocolError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ProtocolError::Program(e) => e.category(),
            ProtocolError::Ledger(
                LedgerError::AuthRequired
                | LedgerError::AuthExpired
                | LedgerError::AuthInvalid
                | LedgerError::AccessDenied(_)
                | LedgerError::MissingSignature(_),
            ) => ErrorCategory::Authority,
            ProtocolError::Ledger(_) => ErrorCategory::Ledger,
            ProtocolError::PropagationTimeout { .. } => ErrorCategory::Consistency,
            ProtocolError::AccountMissing(_) => ErrorCategory::State,
            ProtocolError::Decode { .. } => ErrorCategory::Ledger,
            ProtocolError::Transaction(_) => ErrorCategory::Validation,
            ProtocolError::InvalidState { .. } => ErrorCategory::State,
        }
    }

    /// Worth another attempt after a backoff.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProtocolError::Program(e) => matches!(
                e,
                VestigeError::AccountNotYetSynced(_)
                    | VestigeError::AccountDelegated(_)
                    | VestigeError::DelegationConflict
            ),
            ProtocolError::Ledger(LedgerError::AuthExpired) => true,
            ProtocolError::PropagationTimeout { .. } => true,
            _ => false,
        }
    }

    /// The requested state already exists.
    pub fn is_benign(&self) -> bool {
        matches!(self, ProtocolError::Program(e) if e.is_benign())
    }

    pub fn program_error(&self) -> Option<&VestigeError> {
        match self {
            ProtocolError::Program(e) => Some(e),
            _ => None,
        }
    }
}

use thiserror::Error;
use vestige_pubkey::Pubkey;

/// Coarse classes callers dispatch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Rejected input. Never retried.
    Validation,
    /// The operation is not valid in the current lifecycle state.
    State,
    /// Layers disagree or a transition is in flight. Retry with backoff.
    Consistency,
    /// The caller lacks authority for the requested path.
    Authority,
    /// The hosting ledger failed or rejected the transaction.
    Ledger,
}

/// Errors returned by program instructions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VestigeError {
    // ========================================================================
    // Validation
    // ========================================================================
    /// Sale start must be strictly before its end
    #[error("Invalid time range: start {start} must be before end {end}")]
    InvalidTimeRange { start: i64, end: i64 },

    /// Minimum must be positive and not above the maximum
    #[error("Invalid commitment bounds: min {min}, max {max}")]
    InvalidCommitmentBounds { min: u64, max: u64 },

    /// A zero supply, target or amount
    #[error("Amount must be greater than zero")]
    InvalidAmount,

    #[error("Commitment of {amount} is below the minimum of {min}")]
    BelowMinCommitment { amount: u64, min: u64 },

    #[error("Commitment total of {total} exceeds the maximum of {max}")]
    AboveMaxCommitment { total: u64, max: u64 },

    #[error("Sale has not started yet")]
    SaleNotStarted,

    #[error("Sale window is closed")]
    SaleWindowClosed,

    /// Instruction tag or payload could not be decoded
    #[error("Invalid instruction data")]
    InvalidInstructionData,

    // ========================================================================
    // State
    // ========================================================================
    #[error("Launch already graduated")]
    AlreadyGraduated,

    #[error("Launch has not graduated")]
    NotGraduated,

    /// Neither the target nor the window end has been reached
    #[error("Graduation conditions not met")]
    GraduationConditionsNotMet,

    /// The pool never went through graduate-and-undelegate
    #[error("Commitment pool has not been finalized")]
    GraduationNotFinalized,

    #[error("Allocation already calculated")]
    AllocationAlreadyCalculated,

    #[error("Allocation has not been calculated")]
    AllocationNotCalculated,

    #[error("Tokens already claimed")]
    AlreadyClaimed,

    #[error("Nothing committed")]
    NothingCommitted,

    /// Benign: the permission record is already in place
    #[error("Permission already exists")]
    PermissionAlreadyExists,

    #[error("Account already initialized")]
    AccountAlreadyInitialized,

    #[error("Account is not initialized")]
    UninitializedAccount,

    /// Benign: the account is already owned by the execution layer
    #[error("Account already delegated")]
    AlreadyDelegated,

    #[error("Ephemeral holding balance too low")]
    InsufficientHoldingBalance,

    #[error("Insufficient funds: needed {needed}, available {available}")]
    InsufficientFunds { needed: u64, available: u64 },

    // ========================================================================
    // Consistency
    // ========================================================================
    /// A delegation record for the account is mid-transition
    #[error("Delegation conflict: account is mid-transition")]
    DelegationConflict,

    /// The account has not landed on the layer the instruction ran on
    #[error("Account {0} not yet synced to this layer")]
    AccountNotYetSynced(Pubkey),

    /// The account is currently owned by the execution layer
    #[error("Account {0} is delegated to the execution layer")]
    AccountDelegated(Pubkey),

    // ========================================================================
    // Authority
    // ========================================================================
    /// The private path needs the pool to be delegated
    #[error("Commitment pool is not delegated")]
    NotDelegated,

    /// The public path is closed while the pool is delegated
    #[error("Commitment pool is delegated; use the private path")]
    PoolDelegated,

    #[error("Vault can never be delegated")]
    VaultNotDelegatable,

    #[error("No permission record for the account")]
    MissingPermission,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Missing required signature")]
    MissingSigner,

    #[error("Instruction not available on this layer")]
    WrongLayer,

    // ========================================================================
    // Program plumbing
    // ========================================================================
    #[error("Account address does not match its seeds")]
    InvalidSeeds,

    #[error("Invalid account data")]
    InvalidAccountData,

    #[error("Account {0} is not writable in this instruction")]
    ReadonlyAccount(Pubkey),

    #[error("Not enough account keys")]
    NotEnoughAccountKeys,

    #[error("Incorrect program id")]
    IncorrectProgramId,

    #[error("Arithmetic overflow")]
    ArithmeticOverflow,
}

impl VestigeError {
    pub fn category(&self) -> ErrorCategory {
        use VestigeError::*;
        match self {
            InvalidTimeRange { .. }
            | InvalidCommitmentBounds { .. }
            | InvalidAmount
            | BelowMinCommitment { .. }
            | AboveMaxCommitment { .. }
            | SaleNotStarted
            | SaleWindowClosed
            | InvalidInstructionData => ErrorCategory::Validation,

            AlreadyGraduated
            | NotGraduated
            | GraduationConditionsNotMet
            | GraduationNotFinalized
            | AllocationAlreadyCalculated
            | AllocationNotCalculated
            | AlreadyClaimed
            | NothingCommitted
            | PermissionAlreadyExists
            | AccountAlreadyInitialized
            | UninitializedAccount
            | AlreadyDelegated
            | InsufficientHoldingBalance
            | InsufficientFunds { .. } => ErrorCategory::State,

            DelegationConflict | AccountNotYetSynced(_) | AccountDelegated(_) => {
                ErrorCategory::Consistency
            }

            NotDelegated | PoolDelegated | VaultNotDelegatable | MissingPermission
            | Unauthorized | MissingSigner | WrongLayer => ErrorCategory::Authority,

            InvalidSeeds
            | InvalidAccountData
            | ReadonlyAccount(_)
            | NotEnoughAccountKeys
            | IncorrectProgramId
            | ArithmeticOverflow => ErrorCategory::Validation,
        }
    }

    /// Outcomes that mean the requested state is already in place.
    pub fn is_benign(&self) -> bool {
        matches!(
            self,
            VestigeError::PermissionAlreadyExists
                | VestigeError::AccountAlreadyInitialized
                | VestigeError::AlreadyDelegated
        )
    }
}

pub type Result<T> = std::result::Result<T, VestigeError>;

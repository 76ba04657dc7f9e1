//! Error types for pool lifecycle and liquidity accounting
//!
//! Every failure leaves pool state untouched; see [`ErrorKind`] for how callers
//! are expected to react to each class.

use crate::address::Address;
use thiserror::Error;

/// Result alias used across the engine
pub type AmmResult<T> = Result<T, AmmError>;

/// Broad classification of [`AmmError`] variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller-correctable input problem, surfaced before any state is read
    Validation,
    /// Pool or registry lifecycle mismatch
    State,
    /// Deposit could not be honored within the caller's stated bounds
    Economic,
    /// Checked arithmetic failed or reserves broke their ratio
    Arithmetic,
    /// Caller lacks the authority for the requested action
    Authorization,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AmmError {
    #[error("Deposit amount must be non-zero")]
    ZeroAmount,

    #[error("Mints must be ordered: {mint_a} must sort before {mint_b}")]
    InvalidMintOrder { mint_a: Address, mint_b: Address },

    #[error("Cannot pair mint {0} with itself")]
    IdenticalMints(Address),

    #[error("Fee of {fee_bps} bps exceeds maximum of {max_bps} bps")]
    InvalidFee { fee_bps: u16, max_bps: u16 },

    #[error("Pool {0} already exists")]
    AlreadyExists(Address),

    #[error("Pool {0} not found")]
    NotFound(Address),

    #[error("Global config already initialized")]
    AlreadyInitialized,

    #[error("Global config has not been initialized")]
    NotInitialized,

    #[error("Deposit ratio cannot be honored: {reason}")]
    SlippageExceeded { reason: &'static str },

    #[error("Insufficient balance of {token}: need {required}, have {available}")]
    InsufficientBalance {
        token: Address,
        required: u64,
        available: u64,
    },

    #[error("Arithmetic overflow in {context}")]
    ArithmeticOverflow { context: &'static str },

    #[error("Reserve invariant violated: {reason}")]
    InvariantViolation { reason: String },

    #[error("{signer} is not the authority of {target}")]
    Unauthorized { signer: Address, target: Address },
}

impl AmmError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AmmError::ZeroAmount
            | AmmError::InvalidMintOrder { .. }
            | AmmError::IdenticalMints(_)
            | AmmError::InvalidFee { .. } => ErrorKind::Validation,
            AmmError::AlreadyExists(_)
            | AmmError::NotFound(_)
            | AmmError::AlreadyInitialized
            | AmmError::NotInitialized => ErrorKind::State,
            AmmError::SlippageExceeded { .. } | AmmError::InsufficientBalance { .. } => {
                ErrorKind::Economic
            }
            AmmError::ArithmeticOverflow { .. } | AmmError::InvariantViolation { .. } => {
                ErrorKind::Arithmetic
            }
            AmmError::Unauthorized { .. } => ErrorKind::Authorization,
        }
    }

    /// Whether re-quoting and resubmitting the same kind of request can succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AmmError::SlippageExceeded { .. } | AmmError::AlreadyExists(_)
        )
    }

    pub(crate) fn overflow(context: &'static str) -> Self {
        tracing::error!(context, "checked arithmetic overflowed");
        AmmError::ArithmeticOverflow { context }
    }
}

//! Issuance Core Errors

use lib_types::{Amount, Timestamp};
use thiserror::Error;

/// Error during issuance operations
///
/// Every variant is a normal, expected outcome of precondition evaluation.
/// A failed operation leaves no residue, so callers may retry freely.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IssuanceError {
    #[error("Participant is not whitelisted")]
    NotListed,

    #[error("Whitelist bounds invalid: min {min} exceeds max {max}")]
    InvalidBounds { min: Amount, max: Amount },

    #[error("Cumulative contribution {cumulative} below minimum cap {min}")]
    BelowMinCap { cumulative: Amount, min: Amount },

    #[error("Cumulative contribution {cumulative} above maximum cap {max}")]
    AboveMaxCap { cumulative: Amount, max: Amount },

    #[error("Sale pool capacity exhausted")]
    SaleCapReached,

    #[error("Pool cap exceeded: cap {cap}, would have {would_have}")]
    PoolCapExceeded { cap: Amount, would_have: Amount },

    #[error("Global cap exceeded: cap {cap}, would have {would_have}")]
    GlobalCapExceeded { cap: Amount, would_have: Amount },

    #[error("Supply cap exceeded: max {max}, would have {would_have}")]
    SupplyCapExceeded { max: Amount, would_have: Amount },

    #[error("Minting is closed")]
    MintingClosed,

    #[error("Asset transfers are paused")]
    Paused,

    #[error("Zero address not allowed")]
    ZeroAddress,

    #[error("Zero amount not allowed")]
    ZeroAmount,

    #[error("Insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: Amount, need: Amount },

    #[error("Operation not permitted in the current sale window")]
    WrongState,

    #[error("Reconciliation date {date} not reached at {now}")]
    ReconciliationPending { date: Timestamp, now: Timestamp },

    #[error("Sale already finalized")]
    AlreadyFinalized,

    #[error("Sale remainder already reconciled into the adoption pool")]
    AlreadyReconciled,

    #[error("Caller is not authorized")]
    Unauthorized,

    #[error("Invalid pool index: {0}")]
    InvalidPool(u8),

    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Arithmetic underflow")]
    Underflow,

    #[error("Unknown vesting fund: {0}")]
    UnknownFund(u64),

    #[error("Settlement error: {0}")]
    Settlement(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for issuance operations
pub type IssuanceResult<T> = Result<T, IssuanceError>;

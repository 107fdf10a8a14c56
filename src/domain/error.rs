//! Domain Error Types
//!
//! Pure domain errors that don't depend on infrastructure.

use thiserror::Error;

use super::{AmountError, CurrencyType, TransactionStatus};

/// Business rule violations and domain invariant failures.
///
/// Independent of storage and messaging.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Insufficient funds for a debit
    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: i64, available: i64 },

    /// Zero or negative amount
    #[error(transparent)]
    InvalidAmount(#[from] AmountError),

    /// Currency name that maps to no balance column
    #[error("Unknown currency: {0}")]
    UnknownCurrency(String),

    /// Status text that maps to no known status
    #[error("Unknown transaction status: {0}")]
    UnknownStatus(String),

    /// Transition not permitted by the status state machine
    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: TransactionStatus,
        to: TransactionStatus,
    },

    /// Credit would overflow the balance column
    #[error("Balance overflow for {0}")]
    BalanceOverflow(CurrencyType),
}

impl DomainError {
    pub fn insufficient_funds(required: i64, available: i64) -> Self {
        Self::InsufficientFunds {
            required,
            available,
        }
    }
}

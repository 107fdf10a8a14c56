//! Error handling module
//!
//! Centralized error type for the handler and dispatch boundary.
//!
//! Expected rejections (`invalid_cost`, `user_not_found`, ...) are not errors;
//! they travel as a [`ReasonCode`](crate::domain::ReasonCode) in the handler
//! result. An `AppError` means the message could not be settled at all: the
//! dispatcher logs it and publishes nothing.

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Input errors
    #[error("Malformed message: {0}")]
    Malformed(#[from] crate::messaging::DecodeError),

    #[error("Transaction {transaction_id} belongs to user {owner}, not {user_id}")]
    ForeignTransaction {
        transaction_id: String,
        user_id: i64,
        owner: i64,
    },

    // Infrastructure errors
    #[error("Ledger error: {0}")]
    Ledger(#[from] crate::ledger::LedgerError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Bad input from a peer service, as opposed to a failure on our side
    pub fn is_malformed_input(&self) -> bool {
        matches!(self, AppError::Malformed(_))
    }

    /// Stable label for structured logs
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Malformed(_) => "malformed_message",
            AppError::ForeignTransaction { .. } => "foreign_transaction",
            AppError::Ledger(_) => "ledger_error",
            AppError::Internal(_) => "internal_error",
        }
    }
}

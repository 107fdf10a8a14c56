//! Ledger Errors
//!
//! Error types for ledger store operations.

use crate::domain::DomainError;

/// Postgres SQLSTATE codes that mean "another writer got there first".
const UNIQUE_VIOLATION: &str = "23505";
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";

/// Errors that can occur in the ledger store
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Concurrent writer conflict on a balance or transaction row
    #[error("Write conflict: {0}")]
    Conflict(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// Domain rule broken while settling a unit of work
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// A stored row could not be mapped back to domain types
    #[error("Corrupt ledger row: {0}")]
    CorruptRow(String),

    /// Maximum retries exceeded
    #[error("Maximum retries exceeded for ledger operation")]
    MaxRetriesExceeded,
}

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        let conflict = err
            .as_database_error()
            .and_then(|db| db.code())
            .is_some_and(|code| {
                matches!(
                    code.as_ref(),
                    UNIQUE_VIOLATION | SERIALIZATION_FAILURE | DEADLOCK_DETECTED
                )
            });

        if conflict {
            LedgerError::Conflict(err.to_string())
        } else {
            LedgerError::Database(err)
        }
    }
}

impl LedgerError {
    /// Check if this error is a write conflict
    pub fn is_conflict(&self) -> bool {
        matches!(self, LedgerError::Conflict(_))
    }

    /// Check if retrying the whole unit of work may succeed
    pub fn is_retryable(&self) -> bool {
        self.is_conflict()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_sqlx_error_is_not_conflict() {
        let err = LedgerError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, LedgerError::Database(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_conflict_is_retryable() {
        let err = LedgerError::Conflict("duplicate key".to_string());
        assert!(err.is_conflict());
        assert!(err.is_retryable());
        assert!(err.to_string().contains("duplicate key"));
    }
}

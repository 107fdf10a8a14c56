//! Transaction records
//!
//! A transaction is the audit row written for every reservation attempt that
//! reaches the funds check. Its status follows a small state machine:
//!
//! ```text
//! PENDING ──► RESERVED ──► COMPENSATED
//!    │            └──────► COMPLETED
//!    └──────► DECLINED
//! ```
//!
//! DECLINED, COMPENSATED and COMPLETED are terminal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{Amount, CurrencyType, DomainError};

/// Status of a ledger transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pending,
    Reserved,
    Declined,
    Compensated,
    Completed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "PENDING",
            TransactionStatus::Reserved => "RESERVED",
            TransactionStatus::Declined => "DECLINED",
            TransactionStatus::Compensated => "COMPENSATED",
            TransactionStatus::Completed => "COMPLETED",
        }
    }

    pub fn can_transition_to(&self, next: TransactionStatus) -> bool {
        use TransactionStatus::*;
        matches!(
            (*self, next),
            (Pending, Reserved) | (Pending, Declined) | (Reserved, Compensated) | (Reserved, Completed)
        )
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(TransactionStatus::Pending),
            "RESERVED" => Ok(TransactionStatus::Reserved),
            "DECLINED" => Ok(TransactionStatus::Declined),
            "COMPENSATED" => Ok(TransactionStatus::Compensated),
            "COMPLETED" => Ok(TransactionStatus::Completed),
            other => Err(DomainError::UnknownStatus(other.to_string())),
        }
    }
}

/// Service a transaction originated from. Ids are namespaced by origin so
/// that two services can never collide on the same correlation id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionOrigin {
    Shop,
    Guild,
}

impl TransactionOrigin {
    pub fn prefix(&self) -> &'static str {
        match self {
            TransactionOrigin::Shop => "shop",
            TransactionOrigin::Guild => "guild",
        }
    }
}

/// Globally unique, origin-namespaced transaction id (`"shop:<id>"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    pub fn new(origin: TransactionOrigin, correlation_id: &str) -> Self {
        Self(format!("{}:{}", origin.prefix(), correlation_id))
    }

    pub fn shop(transaction_id: &str) -> Self {
        Self::new(TransactionOrigin::Shop, transaction_id)
    }

    pub fn guild(correlation_id: &str) -> Self {
        Self::new(TransactionOrigin::Guild, correlation_id)
    }

    /// Wrap an id read back from storage, which is already namespaced.
    pub fn from_stored(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The caller's id with the namespace stripped.
    pub fn correlation_id(&self) -> &str {
        self.0.split_once(':').map_or(self.0.as_str(), |(_, id)| id)
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Immutable-after-settlement ledger record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    pub transaction_id: TransactionId,
    pub user_id: i64,
    pub currency: CurrencyType,
    pub amount: Amount,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

impl LedgerTransaction {
    /// New record in PENDING, before the funds check settles it.
    pub fn pending(
        transaction_id: TransactionId,
        user_id: i64,
        currency: CurrencyType,
        amount: Amount,
    ) -> Self {
        Self {
            transaction_id,
            user_id,
            currency,
            amount,
            status: TransactionStatus::Pending,
            created_at: Utc::now(),
        }
    }

    /// Move to `next`, enforcing the state machine.
    ///
    /// # Errors
    /// - `DomainError::InvalidTransition` if `next` is not reachable
    pub fn transition(mut self, next: TransactionStatus) -> Result<Self, DomainError> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending() -> LedgerTransaction {
        LedgerTransaction::pending(
            TransactionId::shop("tx1"),
            7,
            CurrencyType::Gold,
            Amount::new(50).unwrap(),
        )
    }

    #[test]
    fn test_transaction_id_namespacing() {
        let id = TransactionId::shop("abc");
        assert_eq!(id.as_str(), "shop:abc");
        assert_eq!(id.correlation_id(), "abc");

        let id = TransactionId::guild("war-1");
        assert_eq!(id.as_str(), "guild:war-1");
        assert_ne!(TransactionId::shop("x"), TransactionId::guild("x"));
    }

    #[test]
    fn test_correlation_id_keeps_inner_colons() {
        let id = TransactionId::shop("order:42");
        assert_eq!(id.correlation_id(), "order:42");
    }

    #[test]
    fn test_status_round_trip_through_text() {
        for status in [
            TransactionStatus::Pending,
            TransactionStatus::Reserved,
            TransactionStatus::Declined,
            TransactionStatus::Compensated,
            TransactionStatus::Completed,
        ] {
            assert_eq!(status.as_str().parse::<TransactionStatus>().unwrap(), status);
        }
        assert!("FAILED".parse::<TransactionStatus>().is_err());
    }

    #[test]
    fn test_reserve_then_compensate() {
        let tx = pending()
            .transition(TransactionStatus::Reserved)
            .unwrap()
            .transition(TransactionStatus::Compensated)
            .unwrap();
        assert_eq!(tx.status, TransactionStatus::Compensated);
    }

    #[test]
    fn test_terminal_states_reject_transitions() {
        let declined = pending().transition(TransactionStatus::Declined).unwrap();
        let err = declined.transition(TransactionStatus::Reserved).unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidTransition {
                from: TransactionStatus::Declined,
                to: TransactionStatus::Reserved,
            }
        );

        let compensated = pending()
            .transition(TransactionStatus::Reserved)
            .unwrap()
            .transition(TransactionStatus::Compensated)
            .unwrap();
        assert!(compensated.transition(TransactionStatus::Compensated).is_err());
    }

    #[test]
    fn test_pending_cannot_compensate() {
        assert!(pending().transition(TransactionStatus::Compensated).is_err());
    }
}

//! Ledger module
//!
//! Durable storage of per-user currency balances and the transaction ledger.
//!
//! Reads are exposed individually. Every mutation that pairs a balance change
//! with a transaction write is exposed only as one atomic unit of work
//! ([`LedgerStore::reserve`] and [`LedgerStore::compensate`]), so callers can
//! never observe a debit without its ledger row or the reverse.

pub mod accessor;
mod error;
mod memory;
mod postgres;

use async_trait::async_trait;

use crate::domain::{Amount, Balance, CurrencyType, LedgerTransaction, TransactionId};

pub use error::LedgerError;
pub use memory::InMemoryLedgerStore;
pub use postgres::PgLedgerStore;

/// A debit request for one unit of work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub transaction_id: TransactionId,
    pub user_id: i64,
    pub currency: CurrencyType,
    pub amount: Amount,
}

/// Result of a reservation unit of work
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReserveOutcome {
    /// Funds debited, transaction recorded as RESERVED
    Reserved {
        transaction: LedgerTransaction,
        balance_after: i64,
    },
    /// Funds short, transaction recorded as DECLINED, balance untouched
    Declined {
        transaction: LedgerTransaction,
        available: i64,
    },
    /// A transaction with this id was already recorded; nothing was written
    AlreadyRecorded(LedgerTransaction),
    /// The user has no balance row; nothing was written
    NoBalance,
}

/// Result of a compensation unit of work
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompensateOutcome {
    /// Recorded amount credited back, transaction moved to COMPENSATED
    Compensated {
        transaction: LedgerTransaction,
        balance_after: i64,
    },
    /// No transaction with this id for this user is currently RESERVED
    NotReserved,
    /// The user has no balance row; nothing was written
    NoBalance,
}

/// Storage contract behind the reservation and compensation handlers.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Whether the identity service knows this user
    async fn user_exists(&self, user_id: i64) -> Result<bool, LedgerError>;

    async fn get_balance(&self, user_id: i64) -> Result<Option<Balance>, LedgerError>;

    /// Look up a transaction owned by `user_id`
    async fn find_transaction(
        &self,
        transaction_id: &TransactionId,
        user_id: i64,
    ) -> Result<Option<LedgerTransaction>, LedgerError>;

    /// Debit if sufficient and record the transaction, atomically.
    ///
    /// Re-checks for an existing transaction under the balance lock, so two
    /// deliveries of the same request racing each other debit at most once.
    async fn reserve(&self, reservation: Reservation) -> Result<ReserveOutcome, LedgerError>;

    /// Credit back the recorded amount of a RESERVED transaction and move it
    /// to COMPENSATED, atomically.
    async fn compensate(
        &self,
        transaction_id: &TransactionId,
        user_id: i64,
    ) -> Result<CompensateOutcome, LedgerError>;
}

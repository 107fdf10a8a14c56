//! In-memory Ledger Store
//!
//! HashMap-backed [`LedgerStore`] for tests and local runs without a
//! database. One mutex guards all state, so every operation is trivially a
//! single atomic unit of work.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::{Balance, LedgerTransaction, TransactionId, TransactionStatus};

use super::{CompensateOutcome, LedgerError, LedgerStore, Reservation, ReserveOutcome};

#[derive(Debug, Default)]
struct State {
    users: HashSet<i64>,
    balances: HashMap<i64, Balance>,
    transactions: HashMap<TransactionId, LedgerTransaction>,
}

/// In-memory ledger store.
///
/// # Example
///
/// ```
/// use currency_ledger::domain::Balance;
/// use currency_ledger::ledger::{InMemoryLedgerStore, LedgerStore};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = InMemoryLedgerStore::new();
/// store.insert_balance(Balance::new(1, 100, 0)).await;
///
/// assert!(store.user_exists(1).await?);
/// assert_eq!(store.get_balance(1).await?.map(|b| b.gold), Some(100));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedgerStore {
    state: Arc<Mutex<State>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user without a balance row
    pub async fn insert_user(&self, user_id: i64) {
        self.state.lock().await.users.insert(user_id);
    }

    /// Register a user together with its balance row
    pub async fn insert_balance(&self, balance: Balance) {
        let mut state = self.state.lock().await;
        state.users.insert(balance.user_id);
        state.balances.insert(balance.user_id, balance);
    }

    /// Every stored transaction, in no particular order
    pub async fn transactions(&self) -> Vec<LedgerTransaction> {
        self.state.lock().await.transactions.values().cloned().collect()
    }

    /// Simulate storage being down: every call fails until reset
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), LedgerError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(LedgerError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn user_exists(&self, user_id: i64) -> Result<bool, LedgerError> {
        self.check_available()?;
        Ok(self.state.lock().await.users.contains(&user_id))
    }

    async fn get_balance(&self, user_id: i64) -> Result<Option<Balance>, LedgerError> {
        self.check_available()?;
        Ok(self.state.lock().await.balances.get(&user_id).cloned())
    }

    async fn find_transaction(
        &self,
        transaction_id: &TransactionId,
        user_id: i64,
    ) -> Result<Option<LedgerTransaction>, LedgerError> {
        self.check_available()?;
        Ok(self
            .state
            .lock()
            .await
            .transactions
            .get(transaction_id)
            .filter(|t| t.user_id == user_id)
            .cloned())
    }

    async fn reserve(&self, reservation: Reservation) -> Result<ReserveOutcome, LedgerError> {
        self.check_available()?;
        let mut state = self.state.lock().await;

        let Some(mut balance) = state.balances.get(&reservation.user_id).cloned() else {
            return Ok(ReserveOutcome::NoBalance);
        };

        if let Some(existing) = state.transactions.get(&reservation.transaction_id) {
            return Ok(ReserveOutcome::AlreadyRecorded(existing.clone()));
        }

        let pending = LedgerTransaction::pending(
            reservation.transaction_id.clone(),
            reservation.user_id,
            reservation.currency,
            reservation.amount,
        );

        // Work on a copy and write both rows back only once everything passed.
        let (transaction, outcome) =
            match balance.debit_if_sufficient(reservation.currency, reservation.amount) {
                Ok(balance_after) => {
                    let transaction = pending.transition(TransactionStatus::Reserved)?;
                    let outcome = ReserveOutcome::Reserved {
                        transaction: transaction.clone(),
                        balance_after,
                    };
                    (transaction, outcome)
                }
                Err(_) => {
                    let transaction = pending.transition(TransactionStatus::Declined)?;
                    let outcome = ReserveOutcome::Declined {
                        transaction: transaction.clone(),
                        available: balance.get(reservation.currency),
                    };
                    (transaction, outcome)
                }
            };

        state.balances.insert(reservation.user_id, balance);
        state
            .transactions
            .insert(transaction.transaction_id.clone(), transaction);

        Ok(outcome)
    }

    async fn compensate(
        &self,
        transaction_id: &TransactionId,
        user_id: i64,
    ) -> Result<CompensateOutcome, LedgerError> {
        self.check_available()?;
        let mut state = self.state.lock().await;

        let reserved = state
            .transactions
            .get(transaction_id)
            .filter(|t| t.user_id == user_id && t.status == TransactionStatus::Reserved)
            .cloned();
        let Some(reserved) = reserved else {
            return Ok(CompensateOutcome::NotReserved);
        };

        let Some(mut balance) = state.balances.get(&user_id).cloned() else {
            return Ok(CompensateOutcome::NoBalance);
        };

        let transaction = reserved.transition(TransactionStatus::Compensated)?;
        let balance_after = balance.credit(transaction.currency, transaction.amount)?;

        state.balances.insert(user_id, balance);
        state
            .transactions
            .insert(transaction.transaction_id.clone(), transaction.clone());

        Ok(CompensateOutcome::Compensated {
            transaction,
            balance_after,
        })
    }
}

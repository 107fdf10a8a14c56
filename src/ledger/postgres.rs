//! Postgres Ledger Store
//!
//! Each mutating operation is a single database transaction that locks the
//! balance row with `SELECT ... FOR UPDATE` before reading or writing. A unit
//! of work that loses a race (unique violation, serialization failure,
//! deadlock) is rolled back and retried from the start.

use async_trait::async_trait;
use sqlx::PgPool;
use std::future::Future;
use std::time::Duration;

use crate::domain::{Balance, LedgerTransaction, TransactionId, TransactionStatus};

use super::accessor::{self, TransactionRow, TRANSACTION_COLUMNS};
use super::{CompensateOutcome, LedgerError, LedgerStore, Reservation, ReserveOutcome};

const MAX_RETRIES: u32 = 3;

/// Ledger store backed by the `balance` and `user_transactions` tables
#[derive(Debug, Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    /// Create a new PgLedgerStore with a database pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn try_reserve(&self, reservation: &Reservation) -> Result<ReserveOutcome, LedgerError> {
        let mut tx = self.pool.begin().await?;

        let Some(balance) = accessor::lock_balance(&mut tx, reservation.user_id).await? else {
            return Ok(ReserveOutcome::NoBalance);
        };

        // Re-check under the balance lock: a concurrent delivery of the same
        // request may have committed since the handler's lookup.
        if let Some(existing) = accessor::lock_transaction(&mut tx, &reservation.transaction_id).await? {
            return Ok(ReserveOutcome::AlreadyRecorded(existing));
        }

        let pending = LedgerTransaction::pending(
            reservation.transaction_id.clone(),
            reservation.user_id,
            reservation.currency,
            reservation.amount,
        );

        let debited = accessor::debit_if_sufficient(
            &mut tx,
            reservation.user_id,
            reservation.currency,
            reservation.amount,
        )
        .await?;

        let outcome = match debited {
            Some(balance_after) => {
                let transaction = pending.transition(TransactionStatus::Reserved)?;
                accessor::insert_transaction(&mut tx, &transaction).await?;
                ReserveOutcome::Reserved {
                    transaction,
                    balance_after,
                }
            }
            None => {
                let transaction = pending.transition(TransactionStatus::Declined)?;
                accessor::insert_transaction(&mut tx, &transaction).await?;
                ReserveOutcome::Declined {
                    transaction,
                    available: balance.get(reservation.currency),
                }
            }
        };

        tx.commit().await?;

        Ok(outcome)
    }

    async fn try_compensate(
        &self,
        transaction_id: &TransactionId,
        user_id: i64,
    ) -> Result<CompensateOutcome, LedgerError> {
        let mut tx = self.pool.begin().await?;

        // Lock order is balance then transaction, same as reserve.
        let balance = accessor::lock_balance(&mut tx, user_id).await?;

        let reserved = accessor::lock_transaction(&mut tx, transaction_id)
            .await?
            .filter(|t| t.user_id == user_id && t.status == TransactionStatus::Reserved);
        let Some(reserved) = reserved else {
            return Ok(CompensateOutcome::NotReserved);
        };

        if balance.is_none() {
            return Ok(CompensateOutcome::NoBalance);
        }

        let transaction = reserved.transition(TransactionStatus::Compensated)?;

        // Credit what was actually reserved, whatever the request claims.
        let balance_after =
            accessor::credit(&mut tx, user_id, transaction.currency, transaction.amount)
                .await?
                .ok_or_else(|| {
                    LedgerError::Conflict(format!("balance row of user {user_id} vanished under lock"))
                })?;

        let updated = accessor::update_transaction_status(
            &mut tx,
            transaction_id,
            TransactionStatus::Reserved,
            TransactionStatus::Compensated,
        )
        .await?;
        if !updated {
            return Err(LedgerError::Conflict(format!(
                "transaction {transaction_id} left RESERVED under lock"
            )));
        }

        tx.commit().await?;

        Ok(CompensateOutcome::Compensated {
            transaction,
            balance_after,
        })
    }
}

/// Run `attempt` until it succeeds, fails with a non-conflict error, or
/// runs out of retries.
async fn with_retry<T, F, Fut>(operation: &str, mut attempt: F) -> Result<T, LedgerError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LedgerError>>,
{
    for n in 0..MAX_RETRIES {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && n < MAX_RETRIES - 1 => {
                let delay = Duration::from_millis(50 * (n as u64 + 1));
                tracing::warn!(
                    operation,
                    error = %e,
                    "Ledger write conflict, retrying (attempt {}/{})",
                    n + 1,
                    MAX_RETRIES
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) if e.is_retryable() => break,
            Err(e) => return Err(e),
        }
    }

    Err(LedgerError::MaxRetriesExceeded)
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn user_exists(&self, user_id: i64) -> Result<bool, LedgerError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }

    async fn get_balance(&self, user_id: i64) -> Result<Option<Balance>, LedgerError> {
        let row: Option<(i64, i64, i64)> =
            sqlx::query_as("SELECT user_id, gold, guild_rage FROM balance WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(user_id, gold, guild_rage)| Balance::new(user_id, gold, guild_rage)))
    }

    async fn find_transaction(
        &self,
        transaction_id: &TransactionId,
        user_id: i64,
    ) -> Result<Option<LedgerTransaction>, LedgerError> {
        let row: Option<TransactionRow> = sqlx::query_as(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM user_transactions WHERE transaction_id = $1 AND user_id = $2"
        ))
        .bind(transaction_id.as_str())
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(accessor::into_transaction).transpose()
    }

    async fn reserve(&self, reservation: Reservation) -> Result<ReserveOutcome, LedgerError> {
        let outcome = with_retry("reserve", || self.try_reserve(&reservation)).await?;

        tracing::debug!(
            transaction_id = %reservation.transaction_id,
            user_id = reservation.user_id,
            ?outcome,
            "Reservation unit of work finished"
        );

        Ok(outcome)
    }

    async fn compensate(
        &self,
        transaction_id: &TransactionId,
        user_id: i64,
    ) -> Result<CompensateOutcome, LedgerError> {
        let outcome =
            with_retry("compensate", || self.try_compensate(transaction_id, user_id)).await?;

        tracing::debug!(
            transaction_id = %transaction_id,
            user_id,
            ?outcome,
            "Compensation unit of work finished"
        );

        Ok(outcome)
    }
}

//! Reserve Handler
//!
//! Debit leg of the saga. Validation order:
//!
//! 1. replayed transaction id → stored outcome, nothing re-run
//! 2. `amount > 0` → else `invalid_cost`
//! 3. user exists → else `user_not_found`
//! 4. known currency with a balance row → else `invalid_currency`
//! 5. funds sufficient → debit + RESERVED, else DECLINED / `insufficient_funds`
//!
//! Steps 4 and 5 run inside the store's single unit of work.

use std::sync::Arc;

use crate::domain::{Amount, CurrencyType, LedgerTransaction, ReasonCode, TransactionStatus};
use crate::error::{AppError, AppResult};
use crate::ledger::{LedgerStore, Reservation, ReserveOutcome};

use super::commands::{BalanceChange, ReserveCommand, ReserveResult};

/// Handler for currency reservations
#[derive(Clone)]
pub struct ReserveHandler {
    store: Arc<dyn LedgerStore>,
}

impl ReserveHandler {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Execute the reserve command
    pub async fn execute(&self, command: ReserveCommand) -> AppResult<ReserveResult> {
        let ReserveCommand {
            transaction_id,
            user_id,
            currency_type,
            amount,
        } = command;

        // Idempotency: a redelivered request gets the stored outcome back
        if let Some(existing) = self.store.find_transaction(&transaction_id, user_id).await? {
            return replay(existing);
        }

        let Ok(amount) = Amount::new(amount) else {
            tracing::warn!(%transaction_id, user_id, amount, "Reservation rejected: invalid cost");
            return Ok(ReserveResult::rejected(transaction_id, user_id, ReasonCode::InvalidCost));
        };

        if !self.store.user_exists(user_id).await? {
            tracing::warn!(%transaction_id, user_id, "Reservation rejected: user not found");
            return Ok(ReserveResult::rejected(transaction_id, user_id, ReasonCode::UserNotFound));
        }

        let currency: CurrencyType = match currency_type.parse() {
            Ok(currency) => currency,
            Err(e) => {
                tracing::warn!(%transaction_id, user_id, error = %e, "Reservation rejected");
                return Ok(ReserveResult::rejected(
                    transaction_id,
                    user_id,
                    ReasonCode::InvalidCurrency,
                ));
            }
        };

        let outcome = self
            .store
            .reserve(Reservation {
                transaction_id: transaction_id.clone(),
                user_id,
                currency,
                amount,
            })
            .await?;

        match outcome {
            ReserveOutcome::Reserved { balance_after, .. } => {
                tracing::info!(
                    %transaction_id,
                    user_id,
                    %currency,
                    %amount,
                    balance_after,
                    "Funds reserved"
                );
                Ok(ReserveResult::reserved(
                    transaction_id,
                    user_id,
                    BalanceChange {
                        currency,
                        balance_after,
                    },
                ))
            }
            ReserveOutcome::Declined { available, .. } => {
                tracing::warn!(
                    %transaction_id,
                    user_id,
                    %currency,
                    %amount,
                    available,
                    "Reservation declined: insufficient funds"
                );
                Ok(ReserveResult::rejected(
                    transaction_id,
                    user_id,
                    ReasonCode::InsufficientFunds,
                ))
            }
            ReserveOutcome::NoBalance => {
                tracing::warn!(%transaction_id, user_id, "Reservation rejected: no balance row");
                Ok(ReserveResult::rejected(
                    transaction_id,
                    user_id,
                    ReasonCode::InvalidCurrency,
                ))
            }
            // Lost a race with a concurrent delivery of the same id
            ReserveOutcome::AlreadyRecorded(existing) if existing.user_id == user_id => {
                replay(existing)
            }
            ReserveOutcome::AlreadyRecorded(existing) => Err(AppError::ForeignTransaction {
                transaction_id: transaction_id.to_string(),
                user_id,
                owner: existing.user_id,
            }),
        }
    }
}

/// Answer a redelivered reservation from the stored transaction.
fn replay(existing: LedgerTransaction) -> AppResult<ReserveResult> {
    let LedgerTransaction {
        transaction_id,
        user_id,
        status,
        ..
    } = existing;

    tracing::info!(%transaction_id, user_id, %status, "Replayed reservation, returning stored outcome");

    match status {
        TransactionStatus::Reserved
        | TransactionStatus::Compensated
        | TransactionStatus::Completed => {
            Ok(ReserveResult::replayed(transaction_id, user_id, true, None))
        }
        TransactionStatus::Declined => Ok(ReserveResult::replayed(
            transaction_id,
            user_id,
            false,
            Some(ReasonCode::InsufficientFunds),
        )),
        TransactionStatus::Pending => Err(AppError::Internal(format!(
            "transaction {transaction_id} stored in non-settled status {status}"
        ))),
    }
}

//! Compensate Handler
//!
//! Credit-back leg of the saga. Only a transaction that is currently
//! RESERVED for this user can be compensated; anything else, including a
//! second delivery of the same compensation, answers `transaction_not_found`
//! without touching the balance.

use std::sync::Arc;

use crate::domain::{Amount, CurrencyType, ReasonCode, TransactionStatus};
use crate::error::AppResult;
use crate::ledger::{CompensateOutcome, LedgerStore};

use super::commands::{BalanceChange, CompensateCommand, CompensateResult};

/// Handler for reservation compensations
#[derive(Clone)]
pub struct CompensateHandler {
    store: Arc<dyn LedgerStore>,
}

impl CompensateHandler {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Execute the compensate command
    pub async fn execute(&self, command: CompensateCommand) -> AppResult<CompensateResult> {
        let CompensateCommand {
            transaction_id,
            user_id,
            currency_type,
            amount,
        } = command;

        let Ok(amount) = Amount::new(amount) else {
            tracing::warn!(%transaction_id, user_id, amount, "Compensation rejected: invalid cost");
            return Ok(CompensateResult::rejected(transaction_id, user_id, ReasonCode::InvalidCost));
        };

        if !self.store.user_exists(user_id).await? {
            tracing::warn!(%transaction_id, user_id, "Compensation rejected: user not found");
            return Ok(CompensateResult::rejected(
                transaction_id,
                user_id,
                ReasonCode::UserNotFound,
            ));
        }

        let reserved = self
            .store
            .find_transaction(&transaction_id, user_id)
            .await?
            .filter(|t| t.status == TransactionStatus::Reserved);
        let Some(reserved) = reserved else {
            tracing::warn!(
                %transaction_id,
                user_id,
                "Compensation rejected: no reserved transaction"
            );
            return Ok(CompensateResult::rejected(
                transaction_id,
                user_id,
                ReasonCode::TransactionNotFound,
            ));
        };

        // The recorded values win; a mismatching request is only worth a note.
        let requested_currency = currency_type.parse::<CurrencyType>().ok();
        if requested_currency != Some(reserved.currency) || amount != reserved.amount {
            tracing::warn!(
                %transaction_id,
                user_id,
                requested_currency = %currency_type,
                requested_amount = %amount,
                recorded_currency = %reserved.currency,
                recorded_amount = %reserved.amount,
                "Compensation request differs from reservation, crediting recorded values"
            );
        }

        match self.store.compensate(&transaction_id, user_id).await? {
            CompensateOutcome::Compensated {
                transaction,
                balance_after,
            } => {
                tracing::info!(
                    %transaction_id,
                    user_id,
                    currency = %transaction.currency,
                    amount = %transaction.amount,
                    balance_after,
                    "Reservation compensated"
                );
                Ok(CompensateResult::compensated(
                    transaction_id,
                    user_id,
                    BalanceChange {
                        currency: transaction.currency,
                        balance_after,
                    },
                ))
            }
            // Another delivery settled it between the lookup and the lock
            CompensateOutcome::NotReserved => {
                tracing::warn!(%transaction_id, user_id, "Compensation rejected: already settled");
                Ok(CompensateResult::rejected(
                    transaction_id,
                    user_id,
                    ReasonCode::TransactionNotFound,
                ))
            }
            CompensateOutcome::NoBalance => {
                tracing::warn!(%transaction_id, user_id, "Compensation rejected: no balance row");
                Ok(CompensateResult::rejected(
                    transaction_id,
                    user_id,
                    ReasonCode::InvalidCurrency,
                ))
            }
        }
    }
}

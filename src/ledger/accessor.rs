//! Balance Accessor
//!
//! Typed single-statement operations on the `balance` and
//! `user_transactions` tables. Every function runs inside a caller-owned
//! transaction; none of them commits.

use chrono::{DateTime, Utc};
use sqlx::{Postgres, Transaction};

use crate::domain::{
    Amount, Balance, CurrencyType, LedgerTransaction, TransactionId, TransactionStatus,
};

use super::LedgerError;

/// Raw `user_transactions` row
pub(crate) type TransactionRow = (String, i64, String, i64, String, DateTime<Utc>);

pub(crate) const TRANSACTION_COLUMNS: &str =
    "transaction_id, user_id, currency_type, amount, status, created_at";

/// Map a stored row back to a domain transaction
pub(crate) fn into_transaction(row: TransactionRow) -> Result<LedgerTransaction, LedgerError> {
    let (transaction_id, user_id, currency, amount, status, created_at) = row;
    let corrupt = |what: &str| LedgerError::CorruptRow(format!("{transaction_id}: {what}"));

    Ok(LedgerTransaction {
        currency: currency
            .parse()
            .map_err(|_| corrupt(&format!("currency_type '{currency}'")))?,
        amount: Amount::new(amount).map_err(|_| corrupt(&format!("amount {amount}")))?,
        status: status
            .parse()
            .map_err(|_| corrupt(&format!("status '{status}'")))?,
        transaction_id: TransactionId::from_stored(transaction_id.clone()),
        user_id,
        created_at,
    })
}

/// Lock and read the balance row of `user_id`.
pub async fn lock_balance(
    tx: &mut Transaction<'_, Postgres>,
    user_id: i64,
) -> Result<Option<Balance>, LedgerError> {
    let row: Option<(i64, i64, i64)> = sqlx::query_as(
        r#"
        SELECT user_id, gold, guild_rage
        FROM balance
        WHERE user_id = $1
        FOR UPDATE
        "#,
    )
    .bind(user_id)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(row.map(|(user_id, gold, guild_rage)| Balance::new(user_id, gold, guild_rage)))
}

/// Lock and read a transaction by id, whoever owns it.
pub async fn lock_transaction(
    tx: &mut Transaction<'_, Postgres>,
    transaction_id: &TransactionId,
) -> Result<Option<LedgerTransaction>, LedgerError> {
    let row: Option<TransactionRow> = sqlx::query_as(&format!(
        "SELECT {TRANSACTION_COLUMNS} FROM user_transactions WHERE transaction_id = $1 FOR UPDATE"
    ))
    .bind(transaction_id.as_str())
    .fetch_optional(&mut **tx)
    .await?;

    row.map(into_transaction).transpose()
}

/// Subtract `amount` only if the column covers it.
///
/// The sufficiency check and the write are one statement, so a stale read
/// elsewhere can never push the column negative.
/// Returns the new balance, or `None` when funds are insufficient.
pub async fn debit_if_sufficient(
    tx: &mut Transaction<'_, Postgres>,
    user_id: i64,
    currency: CurrencyType,
    amount: Amount,
) -> Result<Option<i64>, LedgerError> {
    let column = currency.column();
    let balance_after: Option<i64> = sqlx::query_scalar(&format!(
        r#"
        UPDATE balance
        SET {column} = {column} - $2
        WHERE user_id = $1 AND {column} >= $2
        RETURNING {column}
        "#
    ))
    .bind(user_id)
    .bind(amount.value())
    .fetch_optional(&mut **tx)
    .await?;

    Ok(balance_after)
}

/// Add `amount` to the column. Returns the new balance, or `None` when the
/// user has no balance row.
pub async fn credit(
    tx: &mut Transaction<'_, Postgres>,
    user_id: i64,
    currency: CurrencyType,
    amount: Amount,
) -> Result<Option<i64>, LedgerError> {
    let column = currency.column();
    let balance_after: Option<i64> = sqlx::query_scalar(&format!(
        r#"
        UPDATE balance
        SET {column} = {column} + $2
        WHERE user_id = $1
        RETURNING {column}
        "#
    ))
    .bind(user_id)
    .bind(amount.value())
    .fetch_optional(&mut **tx)
    .await?;

    Ok(balance_after)
}

/// Insert a settled transaction row.
pub async fn insert_transaction(
    tx: &mut Transaction<'_, Postgres>,
    transaction: &LedgerTransaction,
) -> Result<(), LedgerError> {
    sqlx::query(
        r#"
        INSERT INTO user_transactions (
            transaction_id, user_id, currency_type, amount, status, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(transaction.transaction_id.as_str())
    .bind(transaction.user_id)
    .bind(transaction.currency.as_str())
    .bind(transaction.amount.value())
    .bind(transaction.status.as_str())
    .bind(transaction.created_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Compare-and-set the status of a transaction.
///
/// Returns `false` when the row was not in status `from`.
pub async fn update_transaction_status(
    tx: &mut Transaction<'_, Postgres>,
    transaction_id: &TransactionId,
    from: TransactionStatus,
    to: TransactionStatus,
) -> Result<bool, LedgerError> {
    if !from.can_transition_to(to) {
        return Err(crate::domain::DomainError::InvalidTransition { from, to }.into());
    }

    let rows = sqlx::query(
        r#"
        UPDATE user_transactions
        SET status = $3, updated_at = NOW()
        WHERE transaction_id = $1 AND status = $2
        "#,
    )
    .bind(transaction_id.as_str())
    .bind(from.as_str())
    .bind(to.as_str())
    .execute(&mut **tx)
    .await?
    .rows_affected();

    Ok(rows == 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(currency: &str, amount: i64, status: &str) -> TransactionRow {
        (
            "shop:tx1".to_string(),
            7,
            currency.to_string(),
            amount,
            status.to_string(),
            Utc::now(),
        )
    }

    #[test]
    fn test_row_maps_to_transaction() {
        let tx = into_transaction(row("GOLD", 50, "RESERVED")).unwrap();
        assert_eq!(tx.transaction_id.as_str(), "shop:tx1");
        assert_eq!(tx.currency, CurrencyType::Gold);
        assert_eq!(tx.amount.value(), 50);
        assert_eq!(tx.status, TransactionStatus::Reserved);
    }

    #[test]
    fn test_corrupt_rows_are_reported() {
        let err = into_transaction(row("GOLD", 50, "FAILED")).unwrap_err();
        assert!(matches!(err, LedgerError::CorruptRow(ref msg) if msg.contains("FAILED")));

        let err = into_transaction(row("SILVER", 50, "RESERVED")).unwrap_err();
        assert!(matches!(err, LedgerError::CorruptRow(_)));

        let err = into_transaction(row("GOLD", 0, "RESERVED")).unwrap_err();
        assert!(matches!(err, LedgerError::CorruptRow(_)));
    }
}

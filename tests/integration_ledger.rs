//! Integration tests for the Postgres ledger store
//!
//! These tests require a database connection (DATABASE_URL).
//! Run with: cargo test --test integration_ledger -- --ignored

use std::sync::Arc;

use currency_ledger::domain::{Amount, CurrencyType, TransactionId, TransactionStatus};
use currency_ledger::handlers::{CompensateCommand, ReserveCommand, ReserveHandler};
use currency_ledger::ledger::{
    CompensateOutcome, LedgerStore, PgLedgerStore, Reservation, ReserveOutcome,
};
use currency_ledger::ReasonCode;

mod common;

fn reservation(id: &str, user_id: i64, amount: i64) -> Reservation {
    Reservation {
        transaction_id: TransactionId::shop(id),
        user_id,
        currency: CurrencyType::Gold,
        amount: Amount::new(amount).unwrap(),
    }
}

#[tokio::test]
#[ignore]
async fn test_reserve_and_compensate_persist() {
    let pool = common::setup_test_db().await;
    let user_id = common::seed_user(&pool, 200, 0).await;
    let store = PgLedgerStore::new(pool);
    let id = common::fresh_id();

    let outcome = store.reserve(reservation(&id, user_id, 75)).await.unwrap();
    assert!(matches!(outcome, ReserveOutcome::Reserved { balance_after: 125, .. }));

    let stored = store
        .find_transaction(&TransactionId::shop(&id), user_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, TransactionStatus::Reserved);
    assert_eq!(stored.amount.value(), 75);

    let outcome = store.compensate(&TransactionId::shop(&id), user_id).await.unwrap();
    assert!(matches!(outcome, CompensateOutcome::Compensated { balance_after: 200, .. }));

    let outcome = store.compensate(&TransactionId::shop(&id), user_id).await.unwrap();
    assert_eq!(outcome, CompensateOutcome::NotReserved);
    assert_eq!(store.get_balance(user_id).await.unwrap().unwrap().gold, 200);
}

#[tokio::test]
#[ignore]
async fn test_declined_reservation_is_recorded() {
    let pool = common::setup_test_db().await;
    let user_id = common::seed_user(&pool, 10, 0).await;
    let store = PgLedgerStore::new(pool);
    let id = common::fresh_id();

    let outcome = store.reserve(reservation(&id, user_id, 50)).await.unwrap();
    assert!(matches!(outcome, ReserveOutcome::Declined { available: 10, .. }));

    let again = store.reserve(reservation(&id, user_id, 50)).await.unwrap();
    assert!(matches!(again, ReserveOutcome::AlreadyRecorded(ref t) if t.status == TransactionStatus::Declined));
    assert_eq!(store.get_balance(user_id).await.unwrap().unwrap().gold, 10);
}

#[tokio::test]
#[ignore]
async fn test_missing_balance_row() {
    let pool = common::setup_test_db().await;
    let user_id = common::seed_user_without_balance(&pool).await;
    let store = PgLedgerStore::new(pool);

    assert!(store.user_exists(user_id).await.unwrap());
    let outcome = store.reserve(reservation(&common::fresh_id(), user_id, 5)).await.unwrap();
    assert_eq!(outcome, ReserveOutcome::NoBalance);
}

#[tokio::test]
#[ignore]
async fn test_concurrent_duplicate_deliveries_debit_once() {
    let pool = common::setup_test_db().await;
    let user_id = common::seed_user(&pool, 100, 0).await;
    let store: Arc<dyn LedgerStore> = Arc::new(PgLedgerStore::new(pool));
    let handler = ReserveHandler::new(store.clone());
    let id = common::fresh_id();

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let handler = handler.clone();
        let command = ReserveCommand::shop(&id, user_id, 30, "GOLD");
        tasks.push(tokio::spawn(async move { handler.execute(command).await }));
    }

    for task in tasks {
        let result = task.await.unwrap().unwrap();
        assert!(result.success);
    }

    assert_eq!(store.get_balance(user_id).await.unwrap().unwrap().gold, 70);
}

#[tokio::test]
#[ignore]
async fn test_concurrent_debits_never_overdraw() {
    let pool = common::setup_test_db().await;
    let user_id = common::seed_user(&pool, 100, 0).await;
    let store: Arc<dyn LedgerStore> = Arc::new(PgLedgerStore::new(pool));
    let handler = ReserveHandler::new(store.clone());

    let mut tasks = Vec::new();
    for _ in 0..10 {
        let handler = handler.clone();
        let command = ReserveCommand::shop(&common::fresh_id(), user_id, 30, "GOLD");
        tasks.push(tokio::spawn(async move { handler.execute(command).await }));
    }

    let mut reserved = 0;
    for task in tasks {
        let result = task.await.unwrap().unwrap();
        if result.success {
            reserved += 1;
        } else {
            assert_eq!(result.reason, Some(ReasonCode::InsufficientFunds));
        }
    }

    assert_eq!(reserved, 3);
    assert_eq!(store.get_balance(user_id).await.unwrap().unwrap().gold, 10);
}

#[tokio::test]
#[ignore]
async fn test_compensate_handler_against_postgres() {
    let pool = common::setup_test_db().await;
    let user_id = common::seed_user(&pool, 0, 25).await;
    let store: Arc<dyn LedgerStore> = Arc::new(PgLedgerStore::new(pool));
    let reserve = ReserveHandler::new(store.clone());
    let compensate = currency_ledger::handlers::CompensateHandler::new(store.clone());
    let war = common::fresh_id();

    assert!(reserve.execute(ReserveCommand::guild_war(&war, user_id)).await.unwrap().success);
    assert_eq!(store.get_balance(user_id).await.unwrap().unwrap().guild_rage, 15);

    let result = compensate
        .execute(CompensateCommand::guild_war(&war, user_id))
        .await
        .unwrap();
    assert!(result.success);
    assert_eq!(store.get_balance(user_id).await.unwrap().unwrap().guild_rage, 25);
}

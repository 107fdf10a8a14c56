//! Common test utilities

#![allow(dead_code)]

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};

use currency_ledger::domain::Balance;
use currency_ledger::ledger::InMemoryLedgerStore;
use currency_ledger::messaging::{EventEmitter, InMemoryPublisher, InboundMessage, RequestKind, Topics};
use currency_ledger::Dispatcher;

const SCHEMA: &str = include_str!("../../migrations/0001_currency_ledger.sql");

/// Connect to DATABASE_URL and make sure the ledger schema exists.
///
/// Tests never truncate; each one seeds its own user and uses fresh ids.
pub async fn setup_test_db() -> PgPool {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set for tests");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    pool.execute(SCHEMA).await.expect("Failed to apply schema");

    pool
}

/// Insert a fresh user with a balance row and return its id
pub async fn seed_user(pool: &PgPool, gold: i64, guild_rage: i64) -> i64 {
    let user_id = seed_user_without_balance(pool).await;

    sqlx::query("INSERT INTO balance (user_id, gold, guild_rage) VALUES ($1, $2, $3)")
        .bind(user_id)
        .bind(gold)
        .bind(guild_rage)
        .execute(pool)
        .await
        .expect("Failed to seed balance");

    user_id
}

pub async fn seed_user_without_balance(pool: &PgPool) -> i64 {
    sqlx::query_scalar("INSERT INTO users DEFAULT VALUES RETURNING id")
        .fetch_one(pool)
        .await
        .expect("Failed to seed user")
}

/// Unique caller-side transaction id
pub fn fresh_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Dispatcher wired to in-memory store and publisher
pub struct Harness {
    pub dispatcher: Dispatcher,
    pub store: InMemoryLedgerStore,
    pub publisher: InMemoryPublisher,
    pub topics: Topics,
}

impl Harness {
    pub async fn new(balances: &[Balance]) -> Self {
        let store = InMemoryLedgerStore::new();
        for balance in balances {
            store.insert_balance(balance.clone()).await;
        }

        let publisher = InMemoryPublisher::new();
        let topics = Topics::new("auth", Some("prod"), 1);
        let emitter = EventEmitter::new(Arc::new(publisher.clone()), topics.clone());
        let dispatcher = Dispatcher::new(Arc::new(store.clone()), emitter);

        Self {
            dispatcher,
            store,
            publisher,
            topics,
        }
    }

    /// Build a message on the inbound topic of `kind`
    pub fn message(&self, kind: RequestKind, payload: serde_json::Value) -> InboundMessage {
        InboundMessage::new(self.topics.inbound(kind), payload.to_string().into_bytes())
    }

    pub async fn gold(&self, user_id: i64) -> i64 {
        currency_ledger::ledger::LedgerStore::get_balance(&self.store, user_id)
            .await
            .unwrap()
            .unwrap()
            .gold
    }

    pub async fn guild_rage(&self, user_id: i64) -> i64 {
        currency_ledger::ledger::LedgerStore::get_balance(&self.store, user_id)
            .await
            .unwrap()
            .unwrap()
            .guild_rage
    }
}

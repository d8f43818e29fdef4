//! Relational store for users and messages

mod messages;
mod users;

pub use messages::{Message, MessageRepository, NewMessage};
pub use users::{NewUser, Role, User, UserRepository};

use deadpool_postgres::{Config, Pool, Runtime};
use tokio_postgres::NoTls;

/// Create a connection pool from a database URL
pub async fn create_pool(database_url: &str) -> Result<Pool, deadpool_postgres::CreatePoolError> {
    let mut cfg = Config::new();
    cfg.url = Some(database_url.to_string());
    cfg.create_pool(Some(Runtime::Tokio1), NoTls)
}

/// Bootstrap the schema. Idempotent; runs at startup.
///
/// `username` and `foreign_id` carry UNIQUE constraints so duplicate
/// registration cannot race past the handler-level pre-checks.
pub async fn init_schema(pool: &Pool) -> Result<(), crate::error::AppError> {
    let client = pool.get().await?;
    client
        .batch_execute(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id            BIGSERIAL PRIMARY KEY,
                username      TEXT NOT NULL UNIQUE,
                email         TEXT,
                password_hash TEXT NOT NULL,
                role          TEXT,
                foreign_id    TEXT UNIQUE
            );

            CREATE TABLE IF NOT EXISTS messages (
                id                   BIGSERIAL PRIMARY KEY,
                from_user_id         BIGINT NOT NULL,
                to_user_id           BIGINT NOT NULL,
                patient_personnummer TEXT NOT NULL,
                content              TEXT NOT NULL,
                sent_at              TIMESTAMPTZ NOT NULL DEFAULT now()
            );

            CREATE INDEX IF NOT EXISTS idx_messages_patient
                ON messages (patient_personnummer, sent_at DESC);
            CREATE INDEX IF NOT EXISTS idx_messages_from_user
                ON messages (from_user_id, sent_at DESC);
            CREATE INDEX IF NOT EXISTS idx_messages_to_user
                ON messages (to_user_id, sent_at DESC);
            "#,
        )
        .await?;
    Ok(())
}

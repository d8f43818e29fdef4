use chrono::{DateTime, Utc};
use deadpool_postgres::Pool;
use tokio_postgres::Row;

use crate::error::AppError;

/// A stored message. `patient_personnummer` is a weak reference into the
/// upstream FHIR server, advisory-checked but never enforced.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: i64,
    pub from_user_id: i64,
    pub to_user_id: i64,
    pub patient_personnummer: String,
    pub content: String,
    pub sent_at: DateTime<Utc>,
}

/// Fields for storing a message
pub struct NewMessage {
    pub from_user_id: i64,
    pub to_user_id: i64,
    pub patient_personnummer: String,
    pub content: String,
    pub sent_at: DateTime<Utc>,
}

fn row_to_message(row: &Row) -> Message {
    Message {
        id: row.get("id"),
        from_user_id: row.get("from_user_id"),
        to_user_id: row.get("to_user_id"),
        patient_personnummer: row.get("patient_personnummer"),
        content: row.get("content"),
        sent_at: row.get("sent_at"),
    }
}

/// Repository for message rows
#[derive(Clone)]
pub struct MessageRepository {
    pool: Pool,
}

impl MessageRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, message: NewMessage) -> Result<Message, AppError> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                "INSERT INTO messages \
                 (from_user_id, to_user_id, patient_personnummer, content, sent_at) \
                 VALUES ($1, $2, $3, $4, $5) \
                 RETURNING id, from_user_id, to_user_id, patient_personnummer, content, sent_at",
                &[
                    &message.from_user_id,
                    &message.to_user_id,
                    &message.patient_personnummer,
                    &message.content,
                    &message.sent_at,
                ],
            )
            .await?;
        Ok(row_to_message(&row))
    }

    pub async fn for_patient(&self, personnummer: &str) -> Result<Vec<Message>, AppError> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                "SELECT id, from_user_id, to_user_id, patient_personnummer, content, sent_at \
                 FROM messages WHERE patient_personnummer = $1 ORDER BY sent_at DESC",
                &[&personnummer],
            )
            .await?;
        Ok(rows.iter().map(row_to_message).collect())
    }

    pub async fn from_user(&self, user_id: i64) -> Result<Vec<Message>, AppError> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                "SELECT id, from_user_id, to_user_id, patient_personnummer, content, sent_at \
                 FROM messages WHERE from_user_id = $1 ORDER BY sent_at DESC",
                &[&user_id],
            )
            .await?;
        Ok(rows.iter().map(row_to_message).collect())
    }

    pub async fn to_user(&self, user_id: i64) -> Result<Vec<Message>, AppError> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                "SELECT id, from_user_id, to_user_id, patient_personnummer, content, sent_at \
                 FROM messages WHERE to_user_id = $1 ORDER BY sent_at DESC",
                &[&user_id],
            )
            .await?;
        Ok(rows.iter().map(row_to_message).collect())
    }
}

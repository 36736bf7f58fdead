//! PostgreSQL-backed notification queue.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use wayfarer_common::types::{NewQueueItem, QueueItem};

use crate::error::NotifierError;
use crate::queue::NotificationQueue;

/// Queue stored in the `notification_queue` table, with device tokens on `profiles`.
#[derive(Clone)]
pub struct PgNotificationQueue {
    pool: PgPool,
}

impl PgNotificationQueue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationQueue for PgNotificationQueue {
    async fn fetch_pending(&self, limit: usize) -> Result<Vec<QueueItem>, NotifierError> {
        let items: Vec<QueueItem> = sqlx::query_as(
            r#"
            SELECT id, token, title, body, data, sent, created_at
            FROM notification_queue
            WHERE sent = FALSE
            ORDER BY created_at ASC, id ASC
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    async fn mark_sent(&self, ids: &[Uuid]) -> Result<u64, NotifierError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query("UPDATE notification_queue SET sent = TRUE WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn clear_push_token(&self, token: &str) -> Result<u64, NotifierError> {
        let result = sqlx::query(
            "UPDATE profiles SET push_token = NULL, updated_at = NOW() WHERE push_token = $1",
        )
        .bind(token)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn delete_sent_before(&self, cutoff: DateTime<Utc>) -> Result<u64, NotifierError> {
        let result =
            sqlx::query("DELETE FROM notification_queue WHERE sent = TRUE AND created_at < $1")
                .bind(cutoff)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected())
    }

    async fn enqueue(&self, item: NewQueueItem) -> Result<QueueItem, NotifierError> {
        // Bound as text so the JSON column keeps the payload's key order.
        let data = serde_json::to_string(&item.data)?;

        let queued: QueueItem = sqlx::query_as(
            r#"
            INSERT INTO notification_queue (id, token, title, body, data)
            VALUES ($1, $2, $3, $4, $5::json)
            RETURNING id, token, title, body, data, sent, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&item.token)
        .bind(&item.title)
        .bind(&item.body)
        .bind(data)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(item_id = %queued.id, "Notification queued");
        Ok(queued)
    }
}

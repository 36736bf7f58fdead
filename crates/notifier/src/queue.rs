//! Storage seam for the notification queue.
//!
//! The dispatch job only touches state through this trait, so the whole run
//! can be exercised against [`crate::MemoryQueue`] in tests and against
//! [`crate::PgNotificationQueue`] in production.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use wayfarer_common::types::{NewQueueItem, QueueItem};

use crate::error::NotifierError;

#[async_trait]
pub trait NotificationQueue: Send + Sync {
    /// Up to `limit` rows with `sent = false`, oldest `created_at` first.
    async fn fetch_pending(&self, limit: usize) -> Result<Vec<QueueItem>, NotifierError>;

    /// Flag the given rows as terminal. Returns the number of rows updated.
    async fn mark_sent(&self, ids: &[Uuid]) -> Result<u64, NotifierError>;

    /// Remove `token` from every profile that still holds it.
    async fn clear_push_token(&self, token: &str) -> Result<u64, NotifierError>;

    /// Delete terminal rows created strictly before `cutoff`. Pending rows are never deleted.
    async fn delete_sent_before(&self, cutoff: DateTime<Utc>) -> Result<u64, NotifierError>;

    /// Queue a new pending notification.
    async fn enqueue(&self, item: NewQueueItem) -> Result<QueueItem, NotifierError>;
}

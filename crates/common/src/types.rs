use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque key/value payload forwarded to the client app untouched.
///
/// Key order is preserved end-to-end (`serde_json` is built with `preserve_order`).
pub type NotificationData = serde_json::Map<String, serde_json::Value>;

/// A row in `notification_queue`, one pending or terminal push notification.
///
/// Only `sent` ever changes, and only from `false` to `true`. A terminal row
/// means "stop retrying": it was either delivered or abandoned because its
/// destination token is permanently invalid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct QueueItem {
    pub id: Uuid,
    /// Destination device push token
    pub token: String,
    pub title: String,
    pub body: String,
    #[sqlx(json)]
    pub data: NotificationData,
    pub sent: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied when queueing a new notification.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewQueueItem {
    pub token: String,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub data: NotificationData,
}

impl NewQueueItem {
    pub fn new(token: impl Into<String>, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            title: title.into(),
            body: body.into(),
            data: NotificationData::new(),
        }
    }

    /// Append a payload entry, keeping insertion order.
    pub fn with_data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }
}

/// The push registration part of an account profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Profile {
    pub id: Uuid,
    /// At most one device token per account; cleared when the gateway rejects it
    pub push_token: Option<String>,
}

//! In-process notification queue.
//!
//! Holds queue rows and profile tokens behind a mutex. Used for tests and for
//! running the dispatcher without a database.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use wayfarer_common::types::{NewQueueItem, Profile, QueueItem};

use crate::error::NotifierError;
use crate::queue::NotificationQueue;

#[derive(Debug, Default)]
struct MemoryState {
    items: Vec<QueueItem>,
    profiles: Vec<Profile>,
}

#[derive(Debug, Default)]
pub struct MemoryQueue {
    state: Mutex<MemoryState>,
    unavailable: AtomicBool,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail as if the datastore were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Queue a row with an explicit creation time.
    pub async fn insert_at(&self, item: NewQueueItem, created_at: DateTime<Utc>) -> QueueItem {
        let queued = QueueItem {
            id: Uuid::new_v4(),
            token: item.token,
            title: item.title,
            body: item.body,
            data: item.data,
            sent: false,
            created_at,
        };
        self.state.lock().await.items.push(queued.clone());
        queued
    }

    /// Register a profile holding `token` and return its id.
    pub async fn add_profile(&self, token: impl Into<String>) -> Uuid {
        let id = Uuid::new_v4();
        self.state.lock().await.profiles.push(Profile {
            id,
            push_token: Some(token.into()),
        });
        id
    }

    pub async fn item(&self, id: Uuid) -> Option<QueueItem> {
        self.state
            .lock()
            .await
            .items
            .iter()
            .find(|item| item.id == id)
            .cloned()
    }

    pub async fn items(&self) -> Vec<QueueItem> {
        self.state.lock().await.items.clone()
    }

    pub async fn profile(&self, id: Uuid) -> Option<Profile> {
        self.state
            .lock()
            .await
            .profiles
            .iter()
            .find(|profile| profile.id == id)
            .cloned()
    }

    fn check_available(&self) -> Result<(), NotifierError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(NotifierError::Store("datastore unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationQueue for MemoryQueue {
    async fn fetch_pending(&self, limit: usize) -> Result<Vec<QueueItem>, NotifierError> {
        self.check_available()?;
        let state = self.state.lock().await;

        let mut pending: Vec<QueueItem> =
            state.items.iter().filter(|item| !item.sent).cloned().collect();
        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        pending.truncate(limit);

        Ok(pending)
    }

    async fn mark_sent(&self, ids: &[Uuid]) -> Result<u64, NotifierError> {
        self.check_available()?;
        let mut state = self.state.lock().await;

        let mut updated = 0;
        for item in state.items.iter_mut().filter(|item| ids.contains(&item.id)) {
            item.sent = true;
            updated += 1;
        }
        Ok(updated)
    }

    async fn clear_push_token(&self, token: &str) -> Result<u64, NotifierError> {
        self.check_available()?;
        let mut state = self.state.lock().await;

        let mut cleared = 0;
        for profile in state
            .profiles
            .iter_mut()
            .filter(|profile| profile.push_token.as_deref() == Some(token))
        {
            profile.push_token = None;
            cleared += 1;
        }
        Ok(cleared)
    }

    async fn delete_sent_before(&self, cutoff: DateTime<Utc>) -> Result<u64, NotifierError> {
        self.check_available()?;
        let mut state = self.state.lock().await;

        let before = state.items.len();
        state
            .items
            .retain(|item| !(item.sent && item.created_at < cutoff));
        Ok((before - state.items.len()) as u64)
    }

    async fn enqueue(&self, item: NewQueueItem) -> Result<QueueItem, NotifierError> {
        self.check_available()?;
        Ok(self.insert_at(item, Utc::now()).await)
    }
}

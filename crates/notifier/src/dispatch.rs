//! Notification dispatch job.
//!
//! One invocation:
//! 1. Fetches up to 100 pending queue rows, oldest first
//! 2. Translates each row into exactly one gateway message
//! 3. Submits the messages in chunks of 100, strictly one chunk at a time
//! 4. Reconciles each chunk's tickets positionally against its rows
//! 5. Deletes sent rows older than the retention window
//!
//! Tickets are matched to rows by index, so row order is carried unchanged
//! from the fetch through to the ticket array.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use wayfarer_common::types::QueueItem;

use crate::error::NotifierError;
use crate::gateway::{PushGateway, PushMessage, PushTicket};
use crate::queue::NotificationQueue;

/// Maximum rows fetched per invocation.
pub const FETCH_LIMIT: usize = 100;

/// Gateway's documented per-request message limit.
pub const CHUNK_SIZE: usize = 100;

/// Sent rows older than this are pruned.
pub const RETENTION_DAYS: i64 = 7;

/// Counts reported by a run that found work.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
    /// Rows fetched
    pub total: usize,
    /// Rows marked terminal (delivered or abandoned with a dead token)
    pub sent: usize,
    /// Rows whose ticket reported a retryable error
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Nothing was pending.
    Idle,
    Completed(DispatchSummary),
}

/// How a chunk's tickets map back onto its rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub delivered: Vec<Uuid>,
    /// Rows whose destination is permanently gone; terminal but not delivered.
    pub abandoned: Vec<Uuid>,
    pub retryable: Vec<Uuid>,
    /// Distinct tokens to remove from profiles.
    pub dead_tokens: Vec<String>,
}

impl Reconciliation {
    /// Rows to flag `sent = true`, in chunk order.
    pub fn terminal_ids(&self) -> Vec<Uuid> {
        self.delivered
            .iter()
            .chain(self.abandoned.iter())
            .copied()
            .collect()
    }
}

/// Translate fetched rows into gateway messages, one per row, same order.
pub fn to_messages(items: &[QueueItem]) -> Vec<PushMessage> {
    items.iter().map(PushMessage::from_item).collect()
}

/// Split `items` into consecutive chunks of at most `size` elements.
///
/// A `size` of zero is treated as one.
pub fn chunk<T>(items: &[T], size: usize) -> std::slice::Chunks<'_, T> {
    items.chunks(size.max(1))
}

/// Pair ticket `i` with row `i` and sort the rows into outcomes.
///
/// Callers must pass slices of equal length; extra elements on either side
/// are ignored.
pub fn reconcile(items: &[QueueItem], tickets: &[PushTicket]) -> Reconciliation {
    let mut result = Reconciliation::default();
    let mut seen_tokens = HashSet::new();

    for (item, ticket) in items.iter().zip(tickets) {
        match ticket {
            PushTicket::Ok { .. } => result.delivered.push(item.id),
            PushTicket::Error { .. } if ticket.is_device_not_registered() => {
                result.abandoned.push(item.id);
                if seen_tokens.insert(item.token.as_str()) {
                    result.dead_tokens.push(item.token.clone());
                }
            }
            PushTicket::Error { message, .. } => {
                tracing::warn!(
                    item_id = %item.id,
                    error = ticket.error_code().unwrap_or("unknown"),
                    message = message.as_deref().unwrap_or(""),
                    "Push ticket reported a retryable error"
                );
                result.retryable.push(item.id);
            }
        }
    }

    result
}

/// Drains the notification queue into the push gateway.
pub struct DispatchJob {
    queue: Arc<dyn NotificationQueue>,
    gateway: Arc<dyn PushGateway>,
    fetch_limit: usize,
    chunk_size: usize,
}

impl DispatchJob {
    pub fn new(queue: Arc<dyn NotificationQueue>, gateway: Arc<dyn PushGateway>) -> Self {
        Self {
            queue,
            gateway,
            fetch_limit: FETCH_LIMIT,
            chunk_size: CHUNK_SIZE,
        }
    }

    /// Override the fetch ceiling and chunk size.
    pub fn with_limits(mut self, fetch_limit: usize, chunk_size: usize) -> Self {
        self.fetch_limit = fetch_limit.max(1);
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub async fn run(&self) -> Result<DispatchOutcome, NotifierError> {
        self.run_at(Utc::now()).await
    }

    /// Run one invocation, using `now` as the reference for the retention sweep.
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<DispatchOutcome, NotifierError> {
        let items = self.queue.fetch_pending(self.fetch_limit).await?;

        if items.is_empty() {
            tracing::debug!("No pending notifications");
            return Ok(DispatchOutcome::Idle);
        }

        let messages = to_messages(&items);
        let mut summary = DispatchSummary {
            total: items.len(),
            ..Default::default()
        };

        tracing::info!(total = items.len(), "Dispatching pending notifications");

        let chunks = chunk(&items, self.chunk_size).zip(chunk(&messages, self.chunk_size));
        for (index, (item_chunk, message_chunk)) in chunks.enumerate() {
            let tickets = match self.submit(message_chunk).await {
                Ok(tickets) => tickets,
                Err(e) if e.is_chunk_scoped() => {
                    tracing::error!(
                        chunk = index,
                        size = message_chunk.len(),
                        error = %e,
                        "Push chunk failed, leaving its notifications pending"
                    );
                    continue;
                }
                Err(e) => return Err(e),
            };

            let outcome = reconcile(item_chunk, &tickets);
            self.apply(&outcome).await?;

            summary.sent += outcome.delivered.len() + outcome.abandoned.len();
            summary.failed += outcome.retryable.len();

            tracing::info!(
                chunk = index,
                delivered = outcome.delivered.len(),
                abandoned = outcome.abandoned.len(),
                retryable = outcome.retryable.len(),
                "Push chunk reconciled"
            );
        }

        let cutoff = now - Duration::days(RETENTION_DAYS);
        let pruned = self.queue.delete_sent_before(cutoff).await?;
        if pruned > 0 {
            tracing::info!(rows = pruned, "Pruned old sent notifications");
        }

        tracing::info!(
            total = summary.total,
            sent = summary.sent,
            failed = summary.failed,
            "Dispatch run finished"
        );

        Ok(DispatchOutcome::Completed(summary))
    }

    async fn submit(&self, messages: &[PushMessage]) -> Result<Vec<PushTicket>, NotifierError> {
        let tickets = self.gateway.send(messages).await?;
        if tickets.len() != messages.len() {
            return Err(NotifierError::TicketMismatch {
                expected: messages.len(),
                got: tickets.len(),
            });
        }
        Ok(tickets)
    }

    async fn apply(&self, outcome: &Reconciliation) -> Result<(), NotifierError> {
        for token in &outcome.dead_tokens {
            let cleared = self.queue.clear_push_token(token).await?;
            tracing::info!(profiles = cleared, "Cleared unregistered push token");
        }

        self.queue.mark_sent(&outcome.terminal_ids()).await?;
        Ok(())
    }
}

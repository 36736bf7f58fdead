//! Push notification dispatch.
//!
//! Drains the `notification_queue` table into an Expo-style push gateway:
//! fetch pending rows oldest-first, translate, submit in chunks of 100,
//! reconcile the per-message tickets back into the queue, then prune old
//! sent rows. Delivery is at-least-once.

pub mod dispatch;
pub mod error;
pub mod gateway;
pub mod memory;
pub mod pg;
pub mod queue;
pub mod scheduler;

pub use dispatch::{DispatchJob, DispatchOutcome, DispatchSummary};
pub use error::NotifierError;
pub use gateway::{ExpoPushClient, PushGateway, PushMessage, PushTicket};
pub use memory::MemoryQueue;
pub use pg::PgNotificationQueue;
pub use queue::NotificationQueue;

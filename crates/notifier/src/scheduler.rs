//! Background schedule for the dispatch job.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time;

use crate::dispatch::{DispatchJob, DispatchOutcome};

/// Spawn a task that runs `job` every `period`. Call this once at startup.
///
/// A failed run is logged and the next tick still fires.
pub fn spawn(job: Arc<DispatchJob>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        tracing::info!(period_secs = period.as_secs(), "Dispatch schedule started");

        loop {
            interval.tick().await;
            match job.run().await {
                Ok(DispatchOutcome::Idle) => {}
                Ok(DispatchOutcome::Completed(summary)) => {
                    tracing::debug!(
                        total = summary.total,
                        sent = summary.sent,
                        failed = summary.failed,
                        "Scheduled dispatch completed"
                    );
                }
                Err(e) => {
                    tracing::error!(error = %e, "Scheduled dispatch failed");
                }
            }
        }
    })
}

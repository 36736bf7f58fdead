//! HTTP trigger for the push dispatch job.
//!
//! Endpoints:
//! - POST /api/notifications/dispatch: run one dispatch invocation
//! - GET  /health: liveness

pub mod routes;
pub mod state;

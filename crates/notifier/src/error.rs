use thiserror::Error;

/// Errors raised while dispatching queued notifications.
#[derive(Debug, Error)]
pub enum NotifierError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Push gateway returned {status}: {body}")]
    Gateway { status: u16, body: String },

    #[error("Push gateway returned {got} tickets for {expected} messages")]
    TicketMismatch { expected: usize, got: usize },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store error: {0}")]
    Store(String),
}

impl NotifierError {
    /// Whether the error concerns a single gateway request rather than the datastore.
    ///
    /// Chunk-scoped errors leave that chunk pending and the run continues.
    pub fn is_chunk_scoped(&self) -> bool {
        matches!(
            self,
            NotifierError::Http(_)
                | NotifierError::Gateway { .. }
                | NotifierError::TicketMismatch { .. }
        )
    }
}

impl From<NotifierError> for wayfarer_common::error::AppError {
    fn from(err: NotifierError) -> Self {
        wayfarer_common::error::AppError::Dispatch(err.to_string())
    }
}

//! Durable-store error type.

use thiserror::Error;

/// Errors from the durable turn store.
///
/// These never reach a reply-cycle caller: `HistoryStore` logs them
/// and continues against the in-memory session (degraded mode).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store unavailable: {message}")]
    Unavailable { message: String },
}

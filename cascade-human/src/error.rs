//! Error types for the task coordinator.

use thiserror::Error;

/// Coordinator and store failures.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum TaskError {
    /// The task id is unknown.
    #[error("task not found: {0}")]
    NotFound(String),

    /// A response arrived for an already-completed task.
    /// Duplicates after the first are discarded.
    #[error("duplicate response for task {0}")]
    DuplicateResponse(String),

    /// A response failed validation against the declared UI.
    /// Recorded on the task; the waiting attempt fails retryable.
    #[error("invalid response for task {task_id}: {reason}")]
    InvalidResponse {
        /// The task the response was for.
        task_id: String,
        /// What failed validation.
        reason: String,
    },

    /// The delivery fabric rejected the hand-off.
    #[error("delivery failed: {0}")]
    DeliveryFailed(String),

    /// The durable store failed.
    #[error("store error: {0}")]
    Store(String),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

//! Error types for submission and job processing.

use duoledger_classifier::ClassifierError;
use duoledger_core::classification::ClassificationError;
use duoledger_core::error::CoreError;

/// Why a submission was rejected. No job row exists when this is returned.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    /// Validation or identity failure.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// No queue slot became free within the enqueue timeout.
    #[error("Job queue is at capacity, try again shortly")]
    AtCapacity,

    /// The worker pool has shut down.
    #[error("Job queue is closed")]
    QueueClosed,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Why a job ended `failed`. The `Display` output is persisted as the
/// job's `error_message`.
#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error(transparent)]
    Classifier(#[from] ClassifierError),

    #[error(transparent)]
    Classification(#[from] ClassificationError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The job left `processing` while its rows were being written.
    #[error("Job was no longer processing when its spendings were committed")]
    LostClaim,

    #[error("Internal error while processing job: {0}")]
    Panicked(String),
}

//! Asynchronous spend-categorization pipeline.
//!
//! - [`SubmissionService`] validates a request, persists a `pending` job,
//!   and hands it to the [`JobQueue`].
//! - [`WorkerPool`] runs N pull loops over the shared queue, each driving
//!   a [`JobProcessor`]: classify, validate, persist in one transaction,
//!   finalize.
//! - [`ReconciliationSweep`] re-enqueues stale `pending` jobs and fails
//!   jobs stuck in `processing`.
//! - [`status`] is the read path for pollers.

pub mod config;
pub mod error;
pub mod pool;
pub mod processor;
pub mod queue;
pub mod reconcile;
pub mod status;
pub mod submission;

pub use config::WorkerConfig;
pub use error::{ProcessingError, SubmissionError};
pub use pool::WorkerPool;
pub use processor::{JobOutcome, JobProcessor};
pub use queue::{JobQueue, JobReceiver, QueueError, QueueSlot, QueuedJob};
pub use reconcile::{ReconciliationSweep, SweepReport};
pub use status::{JobStatusReport, SpendingReport};
pub use submission::SubmissionService;

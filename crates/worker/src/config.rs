use std::time::Duration;

/// Worker pool, queue, and sweep configuration loaded from environment
/// variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Number of concurrent pull loops.
    pub worker_count: usize,
    /// Bounded queue capacity.
    pub queue_capacity: usize,
    /// How long a submission waits for a free queue slot.
    pub enqueue_timeout: Duration,
    /// Period of the reconciliation sweep.
    pub reconcile_interval: Duration,
    /// Age after which `pending`/`processing` jobs are considered stale.
    pub stale_after: Duration,
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default |
    /// |---------------------------|---------|
    /// | `WORKER_COUNT`            | `4`     |
    /// | `JOB_QUEUE_CAPACITY`      | `64`    |
    /// | `ENQUEUE_TIMEOUT_MS`      | `500`   |
    /// | `RECONCILE_INTERVAL_SECS` | `60`    |
    /// | `STALE_JOB_AFTER_SECS`    | `300`   |
    pub fn from_env() -> Self {
        let worker_count: usize = std::env::var("WORKER_COUNT")
            .unwrap_or_else(|_| "4".into())
            .parse()
            .expect("WORKER_COUNT must be a valid usize");

        let queue_capacity: usize = std::env::var("JOB_QUEUE_CAPACITY")
            .unwrap_or_else(|_| "64".into())
            .parse()
            .expect("JOB_QUEUE_CAPACITY must be a valid usize");

        let enqueue_timeout_ms: u64 = std::env::var("ENQUEUE_TIMEOUT_MS")
            .unwrap_or_else(|_| "500".into())
            .parse()
            .expect("ENQUEUE_TIMEOUT_MS must be a valid u64");

        let reconcile_interval_secs: u64 = std::env::var("RECONCILE_INTERVAL_SECS")
            .unwrap_or_else(|_| "60".into())
            .parse()
            .expect("RECONCILE_INTERVAL_SECS must be a valid u64");

        let stale_after_secs: u64 = std::env::var("STALE_JOB_AFTER_SECS")
            .unwrap_or_else(|_| "300".into())
            .parse()
            .expect("STALE_JOB_AFTER_SECS must be a valid u64");

        Self {
            worker_count: worker_count.max(1),
            queue_capacity: queue_capacity.max(1),
            enqueue_timeout: Duration::from_millis(enqueue_timeout_ms),
            reconcile_interval: Duration::from_secs(reconcile_interval_secs.max(1)),
            stale_after: Duration::from_secs(stale_after_secs),
        }
    }

    /// Check that a job may stay `processing` for the whole classification
    /// deadline without the sweep failing it.
    pub fn check_stale_after(&self, classify_deadline: Duration) -> Result<(), String> {
        if self.stale_after <= classify_deadline {
            return Err(format!(
                "STALE_JOB_AFTER_SECS ({}s) must exceed the classification deadline ({}s)",
                self.stale_after.as_secs(),
                classify_deadline.as_secs_f64()
            ));
        }
        Ok(())
    }
}

use std::time::Duration;

/// Highest accepted `CLASSIFIER_MAX_ATTEMPTS`.
pub const MAX_ATTEMPTS_LIMIT: u32 = 10;

const MAX_BACKOFF_EXPONENT: u32 = 16;

/// Classification service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Base URL of an OpenAI-compatible API, without trailing slash.
    pub base_url: String,
    /// Bearer token. Empty means no `Authorization` header is sent.
    pub api_key: String,
    /// Model name passed through to the service.
    pub model: String,
    /// Per-attempt timeout.
    pub timeout: Duration,
    /// Total attempts for transient failures (1 to [`MAX_ATTEMPTS_LIMIT`]).
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles for each further attempt.
    pub retry_backoff: Duration,
}

impl ClassifierConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default                     |
    /// |---------------------------|-----------------------------|
    /// | `CLASSIFIER_URL`          | `https://api.openai.com/v1` |
    /// | `CLASSIFIER_API_KEY`      | (empty)                     |
    /// | `CLASSIFIER_MODEL`        | `gpt-4o-mini`               |
    /// | `CLASSIFIER_TIMEOUT_SECS` | `60`                        |
    /// | `CLASSIFIER_MAX_ATTEMPTS` | `2`                         |
    pub fn from_env() -> Self {
        let base_url = std::env::var("CLASSIFIER_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".into())
            .trim_end_matches('/')
            .to_string();

        let api_key = std::env::var("CLASSIFIER_API_KEY").unwrap_or_default();

        let model = std::env::var("CLASSIFIER_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());

        let timeout_secs: u64 = std::env::var("CLASSIFIER_TIMEOUT_SECS")
            .unwrap_or_else(|_| "60".into())
            .parse()
            .expect("CLASSIFIER_TIMEOUT_SECS must be a valid u64");

        let max_attempts: u32 = std::env::var("CLASSIFIER_MAX_ATTEMPTS")
            .unwrap_or_else(|_| "2".into())
            .parse()
            .expect("CLASSIFIER_MAX_ATTEMPTS must be a valid u32");

        Self {
            base_url,
            api_key,
            model,
            timeout: Duration::from_secs(timeout_secs),
            max_attempts: max_attempts.clamp(1, MAX_ATTEMPTS_LIMIT),
            retry_backoff: Duration::from_millis(500),
        }
    }
}

impl ClassifierConfig {
    /// Sleep after failed attempt number `attempt` (1-based). Doubles per
    /// attempt, capped at `retry_backoff * 2^16`.
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(MAX_BACKOFF_EXPONENT);
        self.retry_backoff * (1u32 << exponent)
    }

    /// Upper bound on one `classify` call: every attempt timing out plus
    /// every backoff sleep in between.
    pub fn overall_deadline(&self) -> Duration {
        let attempts = self.max_attempts.max(1);
        let backoff: Duration = (1..attempts).map(|a| self.retry_delay(a)).sum();
        self.timeout * attempts + backoff
    }
}

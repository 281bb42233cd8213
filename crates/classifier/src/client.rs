//! The classification capability and its error type.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

/// Shared, dynamically dispatched classifier.
pub type DynClassifier = Arc<dyn Classifier>;

/// Turns a text prompt into a structured JSON payload.
///
/// Implementations only guarantee that the payload is valid JSON; its shape
/// is validated by the caller.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, prompt: &str) -> Result<serde_json::Value, ClassifierError>;
}

/// Errors from the classification service.
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("Classification request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-2xx status code.
    #[error("Classification service error ({status}): {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// No answer within the configured time.
    #[error("Classification service did not answer within {0:?}")]
    Timeout(Duration),

    /// The service answered without any content.
    #[error("Classification service returned an empty answer")]
    EmptyResponse,

    /// The answer was not a JSON document.
    #[error("Classification service returned invalid JSON: {0}")]
    InvalidJson(String),
}

impl ClassifierError {
    /// Whether another attempt could plausibly succeed.
    ///
    /// Transport failures, timeouts, rate limiting, and server errors are
    /// transient. A well-delivered but unusable answer is not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Request(e) => !e.is_builder() && !e.is_decode(),
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Timeout(_) => true,
            Self::EmptyResponse | Self::InvalidJson(_) => false,
        }
    }
}

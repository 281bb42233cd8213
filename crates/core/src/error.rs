use crate::types::DbId;

/// Domain-level error shared by every crate in the workspace.
///
/// The API layer maps each variant onto an HTTP status; the worker layer
/// only ever produces [`CoreError::Validation`] (through the classification
/// checks) and persists its message on the failed job.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    /// The caller did not present a usable identity.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The caller is identified but may not touch the resource.
    #[error("Forbidden: {0}")]
    Forbidden(String),
}

impl CoreError {
    /// Shorthand for a [`CoreError::Validation`] with an owned message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

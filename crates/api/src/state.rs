use std::sync::Arc;

use duoledger_worker::SubmissionService;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: duoledger_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Entry point into the job pipeline.
    pub submissions: Arc<SubmissionService>,
}

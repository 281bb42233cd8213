pub mod health;
pub mod spend_jobs;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /spend-jobs              list, submit
/// /spend-jobs/{id}         status
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/spend-jobs", spend_jobs::router())
}

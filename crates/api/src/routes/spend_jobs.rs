use axum::routing::get;
use axum::Router;

use crate::handlers::spend_jobs;
use crate::state::AppState;

/// Routes mounted at `/spend-jobs`. All require `X-User-Id`.
///
/// ```text
/// GET    /        -> list_spend_jobs
/// POST   /        -> submit_spend_job
/// GET    /{id}    -> get_spend_job
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(spend_jobs::list_spend_jobs).post(spend_jobs::submit_spend_job),
        )
        .route("/{id}", get(spend_jobs::get_spend_job))
}

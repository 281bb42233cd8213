//! Handlers for the `/spend-jobs` resource.
//!
//! Submission answers immediately; classification outcomes are only
//! visible through the status read.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use duoledger_core::error::CoreError;
use duoledger_core::types::DbId;
use duoledger_db::models::spend_job::{SpendJob, SpendJobListQuery, SubmitSpendJob};
use duoledger_db::models::status::SpendJobStatus;
use duoledger_db::repositories::SpendJobRepo;
use duoledger_worker::JobStatusReport;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of a successful submission.
#[derive(Debug, Serialize)]
pub struct SubmittedJob {
    pub job_id: DbId,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Fetch a job and check the caller is its buyer or recorded partner.
async fn find_and_authorize(
    pool: &sqlx::PgPool,
    job_id: DbId,
    auth: &AuthUser,
) -> AppResult<SpendJob> {
    let job = SpendJobRepo::find_by_id(pool, job_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "SpendJob",
            id: job_id,
        }))?;

    if job.buyer_id != auth.user_id && job.partner_id != Some(auth.user_id) {
        return Err(AppError::Core(CoreError::Forbidden(
            "Cannot view another household's spend job".into(),
        )));
    }

    Ok(job)
}

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

/// POST /api/v1/spend-jobs
///
/// Accept a spend for categorization. Returns 202 with the job id; 503 if
/// the queue stays full for the enqueue timeout (nothing is persisted).
pub async fn submit_spend_job(
    auth: AuthUser,
    State(state): State<AppState>,
    payload: Result<Json<SubmitSpendJob>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(input) = payload.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;

    let job = state.submissions.submit(auth.user_id, &input).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse {
            data: SubmittedJob { job_id: job.id },
        }),
    ))
}

// ---------------------------------------------------------------------------
// Get
// ---------------------------------------------------------------------------

/// GET /api/v1/spend-jobs/{id}
pub async fn get_spend_job(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let job = find_and_authorize(&state.pool, job_id, &auth).await?;
    let report = JobStatusReport::for_job(&state.pool, job).await?;
    Ok(Json(DataResponse { data: report }))
}

// ---------------------------------------------------------------------------
// List
// ---------------------------------------------------------------------------

/// GET /api/v1/spend-jobs
///
/// The caller's own submissions, newest first. Supports `status`, `limit`,
/// and `offset`.
pub async fn list_spend_jobs(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<SpendJobListQuery>,
) -> AppResult<impl IntoResponse> {
    let status = match params.status.as_deref() {
        None | Some("") => None,
        Some(name) => Some(SpendJobStatus::from_name(name).ok_or_else(|| {
            AppError::BadRequest(format!("Unknown status '{name}'"))
        })?),
    };

    let jobs = SpendJobRepo::list_by_buyer(
        &state.pool,
        auth.user_id,
        status,
        params.limit,
        params.offset,
    )
    .await?;

    let data: Vec<JobStatusReport> = jobs.into_iter().map(JobStatusReport::summary).collect();
    Ok(Json(DataResponse { data }))
}

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};

use crate::api::attempts::check_status_rate_limit;
use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::{metrics, state::AppState};
use crate::schemas::hybrid::{StatusResponse, UploadAttemptResponse};
use crate::services::{attempt_status, upload_pass};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/:exam_id/proctored-status", get(proctored_status))
        .route("/:exam_id/upload-attempt", post(upload_attempt))
}

/// Status of the caller's latest attempt on an upload exam.
async fn proctored_status(
    Path(exam_id): Path<String>,
    CurrentUser(user_id): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<StatusResponse>, ApiError> {
    check_status_rate_limit(&state, &user_id).await?;

    let status =
        attempt_status::resolve_proctored(&state.attempt_store(), &exam_id, &user_id).await?;
    metrics::record_status("proctored", status.kind());
    tracing::debug!(exam_id = %exam_id, kind = status.kind(), "Resolved upload exam status");

    Ok(Json(StatusResponse::from_status(&status)))
}

async fn upload_attempt(
    Path(exam_id): Path<String>,
    CurrentUser(user_id): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<UploadAttemptResponse>, ApiError> {
    let extension = state.settings().hybrid().upload_time_limit_seconds;
    let outcome = upload_pass::prepare(state.db(), &exam_id, &user_id, extension).await?;

    Ok(Json(outcome.into()))
}

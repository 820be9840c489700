use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use redis::RedisError;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::{metrics, state::AppState};
use crate::schemas::hybrid::{
    MonitorResponse, NavigationQuery, NavigationResponse, SlotFilesResponse, StatusResponse,
};
use crate::services::{attempt_status, hybrid_locator, monitor};

const STATUS_RATE_WINDOW_SECONDS: u64 = 60;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/:attempt_id/status", get(unproctored_status))
        .route("/:attempt_id/hybrid-navigation", get(hybrid_navigation))
        .route("/:attempt_id/monitor", get(monitor_descriptor))
        .route("/:attempt_id/slots/:slot/files", get(slot_files))
}

/// Per-user budget shared by both status endpoints. Polls are not limited
/// while Redis is unreachable.
pub(super) async fn check_status_rate_limit(
    state: &AppState,
    user_id: &str,
) -> Result<(), ApiError> {
    let limit = state.settings().hybrid().status_rate_limit;
    let polls = state.redis().count_status_poll(user_id, STATUS_RATE_WINDOW_SECONDS).await;

    if poll_within_budget(polls, limit, user_id) {
        Ok(())
    } else {
        Err(ApiError::TooManyRequests("Too many status requests, slow down polling"))
    }
}

/// `polls` is this window's count including the current poll; `None` or a
/// Redis error means nothing was counted and the poll goes through.
fn poll_within_budget(polls: Result<Option<u64>, RedisError>, limit: u64, user_id: &str) -> bool {
    match polls {
        Ok(Some(polls)) if polls > limit => {
            tracing::debug!(user_id = %user_id, polls, limit, "Status poll budget exhausted");
            false
        }
        Ok(_) => true,
        Err(err) => {
            tracing::warn!(error = %err, user_id = %user_id, "Status rate limit check failed");
            true
        }
    }
}

async fn unproctored_status(
    Path(attempt_id): Path<String>,
    CurrentUser(user_id): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<StatusResponse>, ApiError> {
    check_status_rate_limit(&state, &user_id).await?;

    let status =
        attempt_status::resolve_unproctored(&state.attempt_store(), &user_id, &attempt_id).await?;
    metrics::record_status("unproctored", status.kind());
    tracing::debug!(attempt_id = %attempt_id, kind = status.kind(), "Resolved attempt status");

    Ok(Json(StatusResponse::from_status(&status)))
}

async fn hybrid_navigation(
    Path(attempt_id): Path<String>,
    Query(params): Query<NavigationQuery>,
    CurrentUser(user_id): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<NavigationResponse>, ApiError> {
    params.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let attempt =
        attempt_status::load_owned_attempt(&state.attempt_store(), &attempt_id, &user_id).await?;
    let navigation = hybrid_locator::navigation(&attempt, params.page)?;

    if navigation.first.is_fallback() {
        tracing::warn!(attempt_id = %attempt_id, "Attempt has no hybrid question");
    }

    Ok(Json(NavigationResponse::new(&attempt, navigation)))
}

async fn monitor_descriptor(
    Path(attempt_id): Path<String>,
    CurrentUser(user_id): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<MonitorResponse>, ApiError> {
    let descriptor =
        monitor::describe(&state.attempt_store(), state.settings().hybrid(), &attempt_id, &user_id)
            .await?;

    tracing::info!(
        attempt_id = %attempt_id,
        mode = descriptor.mode.as_str(),
        show_upload_link = descriptor.upload_url.is_some(),
        "Monitor descriptor served"
    );

    Ok(Json(MonitorResponse::new(descriptor, &state.settings().api().api_v1_str)))
}

async fn slot_files(
    Path((attempt_id, slot)): Path<(String, i32)>,
    CurrentUser(user_id): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<SlotFilesResponse>, ApiError> {
    let files = monitor::slot_files(&state.attempt_store(), &attempt_id, &user_id, slot).await?;
    Ok(Json(files.into()))
}

use std::collections::HashMap;

use axum::{extract::State, http::header, http::StatusCode, response::IntoResponse, Json};

use crate::core::metrics;
use crate::core::redis::RedisHealth;
use crate::core::state::AppState;
use crate::repositories;
use crate::schemas::{HealthResponse, RootResponse};

const SERVICE_NAME: &str = "qrsub-api";

pub(crate) async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    let api = state.settings().api();
    Json(RootResponse {
        message: api.project_name.clone(),
        version: api.version.clone(),
        docs_url: format!("{}/docs", api.api_v1_str),
    })
}

/// Component health, worst first: `unhealthy` > `degraded` > `healthy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Overall {
    Healthy,
    Degraded,
    Unhealthy,
}

impl Overall {
    fn as_str(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Unhealthy => "unhealthy",
        }
    }
}

/// Redis only backs the poll rate limit, so losing it degrades the service.
async fn redis_component(state: &AppState) -> (Overall, String) {
    match state.redis().health().await {
        RedisHealth::Healthy => (Overall::Healthy, "healthy".to_string()),
        RedisHealth::Disconnected => (Overall::Healthy, "disconnected".to_string()),
        RedisHealth::Unhealthy(error) => (Overall::Degraded, format!("unhealthy: {error}")),
    }
}

async fn database_component(state: &AppState) -> (Overall, String) {
    match repositories::health::schema_ready(state.db()).await {
        Ok(true) => (Overall::Healthy, "healthy".to_string()),
        Ok(false) => (Overall::Unhealthy, "schema missing".to_string()),
        Err(err) => (Overall::Unhealthy, format!("unhealthy: {err}")),
    }
}

pub(crate) async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    let checks = [
        ("redis", redis_component(&state).await),
        ("database", database_component(&state).await),
    ];

    let overall = checks.iter().map(|(_, (level, _))| *level).max().unwrap_or(Overall::Healthy);
    let components: HashMap<String, String> = checks
        .into_iter()
        .map(|(name, (_, detail))| (name.to_string(), detail))
        .collect();

    if overall != Overall::Healthy {
        tracing::warn!(status = overall.as_str(), ?components, "Health check failed");
    }

    Json(HealthResponse {
        service: SERVICE_NAME.to_string(),
        status: overall.as_str().to_string(),
        components,
    })
}

pub(crate) async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    if !state.settings().telemetry().prometheus_enabled {
        return StatusCode::NOT_FOUND.into_response();
    }

    let Some(body) = metrics::render() else {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    };
    ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body).into_response()
}

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{db, response::ApiResponse, state::AppState};

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyResponse {
    pub status: &'static str,
    pub database: &'static str,
}

/// Liveness probe
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses((status = 200, description = "Process is up", body = HealthResponse))
)]
pub async fn health() -> impl IntoResponse {
    ApiResponse::success(HealthResponse {
        status: "ok",
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    })
}

/// Readiness probe; checks the database connection
#[utoipa::path(
    get,
    path = "/ready",
    tag = "health",
    responses(
        (status = 200, description = "Ready to serve", body = ReadyResponse),
        (status = 503, description = "Database unavailable")
    )
)]
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    match db::ping(&state.db).await {
        Ok(()) => (
            StatusCode::OK,
            ApiResponse::success(ReadyResponse {
                status: "ready",
                database: "connected",
            }),
        )
            .into_response(),
        Err(err) => {
            tracing::warn!(error = %err, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                ApiResponse::<()>::failure("SERVICE_UNAVAILABLE", "Database unavailable", None),
            )
                .into_response()
        }
    }
}

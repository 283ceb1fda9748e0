//! Liveness and readiness probes.

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct Readiness {
    pub status: &'static str,
    pub database: &'static str,
}

/// `GET /health`: the process is up. Dependencies are not checked.
pub async fn health() -> &'static str {
    "ok"
}

/// `GET /health/ready`: 503 until the database answers.
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<Readiness>) {
    match sqlx::query("SELECT 1").execute(state.pool()).await {
        Ok(_) => (
            StatusCode::OK,
            Json(Readiness {
                status: "ready",
                database: "up",
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(Readiness {
                    status: "unavailable",
                    database: "down",
                }),
            )
        }
    }
}

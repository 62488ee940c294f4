use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

use crate::webhooks::AppState;

/// Liveness plus a database round trip.
pub async fn health(State(state): State<AppState>) -> Response {
    match sqlx::query("SELECT 1").execute(&state.pool).await {
        Ok(_) => Json(json!({ "status": "ok" })).into_response(),
        Err(err) => {
            tracing::error!(error = %err, "health check database probe failed");
            (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "status": "degraded" })))
                .into_response()
        }
    }
}

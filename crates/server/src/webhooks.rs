//! HTTP surface. Slack-facing endpoints verify the request signature against
//! the raw body before any parsing; reminder endpoints take a bearer secret.
//!
//! Error policy differs by audience: Slack endpoints acknowledge with 200
//! even when handling fails (Slack retries on non-200 and users see raw
//! failures otherwise), while scheduler endpoints report real status codes.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};

use nextaction_core::id::new_record_id;
use nextaction_db::DbPool;
use nextaction_slack::blocks::MessageTemplate;
use nextaction_slack::commands::{CommandRouter, SlashCommandPayload};
use nextaction_slack::events::{parse_event, EventEnvelope};
use nextaction_slack::interactions::{parse_interaction, Interaction, SubmissionResponse};
use nextaction_slack::verify::verify_signature;

use crate::health;
use crate::reminders::ReminderSweeper;
use crate::workflow::GtdWorkflow;

#[derive(Clone)]
pub struct AppState {
    pub workflow: GtdWorkflow,
    pub command_router: Arc<CommandRouter<GtdWorkflow>>,
    pub sweeper: Arc<ReminderSweeper>,
    pub signing_secret: Option<SecretString>,
    pub cron_secret: Option<SecretString>,
    pub api_secret: Option<SecretString>,
    pub pool: DbPool,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/slack/commands", post(slash_command))
        .route("/slack/events", post(events))
        .route("/slack/interactions", post(interactions))
        .route("/cron/reminders", get(cron_reminders))
        .route("/trigger/reminders", post(trigger_reminders))
        .route("/export/{token}", get(export))
        .with_state(state)
}

fn verify_slack_request(
    state: &AppState,
    headers: &HeaderMap,
    body: &str,
) -> Result<(), StatusCode> {
    let Some(secret) = &state.signing_secret else {
        return Ok(());
    };

    let timestamp = headers
        .get("x-slack-request-timestamp")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let signature =
        headers.get("x-slack-signature").and_then(|v| v.to_str().ok()).unwrap_or_default();

    verify_signature(secret, timestamp, body, signature, Utc::now()).map_err(|err| {
        tracing::warn!(error = %err, "rejected slack request");
        StatusCode::UNAUTHORIZED
    })
}

fn check_bearer(expected: Option<&SecretString>, headers: &HeaderMap) -> Result<(), StatusCode> {
    let Some(expected) = expected else {
        tracing::error!("reminder endpoint called but no secret is configured");
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    };

    let provided = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    if provided == Some(expected.expose_secret()) {
        Ok(())
    } else {
        Err(StatusCode::UNAUTHORIZED)
    }
}

fn command_response(message: &MessageTemplate) -> Value {
    json!({
        "response_type": "ephemeral",
        "text": message.fallback_text,
        "blocks": message.blocks,
    })
}

async fn slash_command(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Response {
    if let Err(status) = verify_slack_request(&state, &headers, &body) {
        return status.into_response();
    }

    let payload: SlashCommandPayload = match serde_urlencoded::from_str(&body) {
        Ok(payload) => payload,
        Err(err) => {
            tracing::warn!(error = %err, "malformed slash command body");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    let message = state.command_router.dispatch(&payload).await;
    Json(command_response(&message)).into_response()
}

async fn events(State(state): State<AppState>, headers: HeaderMap, body: String) -> Response {
    if let Err(status) = verify_slack_request(&state, &headers, &body) {
        return status.into_response();
    }

    let parsed: Value = match serde_json::from_str(&body) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(error = %err, "malformed event body");
            return Json(json!({ "ok": false })).into_response();
        }
    };

    match parse_event(&parsed) {
        EventEnvelope::UrlVerification { challenge } => {
            Json(json!({ "challenge": challenge })).into_response()
        }
        EventEnvelope::AppHomeOpened { user_id, team_id } => {
            match state.workflow.on_home_opened(&user_id, &team_id).await {
                Ok(()) => Json(json!({ "ok": true })).into_response(),
                Err(err) => {
                    // Slack retries on non-200, so failures stay a 200 body.
                    let correlation_id = new_record_id();
                    tracing::error!(
                        correlation_id = %correlation_id,
                        user_id = %user_id,
                        error = %err,
                        "home tab publish failed"
                    );
                    Json(json!({ "ok": false })).into_response()
                }
            }
        }
        EventEnvelope::Ignored => Json(json!({ "ok": true })).into_response(),
    }
}

#[derive(Deserialize)]
struct InteractionForm {
    payload: String,
}

async fn interactions(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Response {
    if let Err(status) = verify_slack_request(&state, &headers, &body) {
        return status.into_response();
    }

    let form: InteractionForm = match serde_urlencoded::from_str(&body) {
        Ok(form) => form,
        Err(err) => {
            tracing::warn!(error = %err, "malformed interaction body");
            return Json(json!({ "ok": false })).into_response();
        }
    };
    let parsed: Value = match serde_json::from_str(&form.payload) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(error = %err, "malformed interaction payload");
            return Json(json!({ "ok": false })).into_response();
        }
    };

    let interaction = parse_interaction(&parsed);
    let is_view_submission = matches!(interaction, Interaction::ViewSubmission { .. });

    match state.workflow.handle_interaction(interaction).await {
        // "clear" closes the whole modal stack; anything else keeps it open.
        Ok(SubmissionResponse::Close) if is_view_submission => {
            Json(json!({ "response_action": "clear" })).into_response()
        }
        Ok(SubmissionResponse::Close) => Json(json!({ "ok": true })).into_response(),
        Ok(response @ SubmissionResponse::Errors(_)) => match response.to_body() {
            Some(errors) => Json(errors).into_response(),
            None => Json(json!({ "ok": true })).into_response(),
        },
        Err(err) => {
            // Ack anyway; a retry storm from Slack will not help.
            let correlation_id = new_record_id();
            tracing::error!(correlation_id = %correlation_id, error = %err, "interaction failed");
            Json(json!({ "ok": false })).into_response()
        }
    }
}

fn sweep_failed(err: &nextaction_core::errors::ApplicationError) -> Response {
    tracing::error!(error = %err, "reminder sweep failed");
    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": "reminder sweep failed" })))
        .into_response()
}

async fn cron_reminders(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(status) = check_bearer(state.cron_secret.as_ref(), &headers) {
        return status.into_response();
    }
    match state.sweeper.run(Utc::now()).await {
        Ok(report) => Json(report).into_response(),
        Err(err) => sweep_failed(&err),
    }
}

async fn trigger_reminders(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(status) = check_bearer(state.api_secret.as_ref(), &headers) {
        return status.into_response();
    }
    match state.sweeper.run(Utc::now()).await {
        Ok(report) => Json(json!({
            "sent": report.sent,
            "failed": report.failed,
            "total_checked": report.total_checked,
            "triggered_at": Utc::now().to_rfc3339(),
        }))
        .into_response(),
        Err(err) => sweep_failed(&err),
    }
}

async fn export(State(state): State<AppState>, Path(token): Path<String>) -> Response {
    match state.workflow.export_document(&token).await {
        Ok(Some(document)) => Json(document).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            tracing::error!(error = %err, "export lookup failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

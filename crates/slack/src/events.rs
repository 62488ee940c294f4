//! Events API callbacks. Only the URL handshake and home tab opens matter;
//! everything else is acknowledged and dropped.

use serde_json::Value;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventEnvelope {
    /// Slack's endpoint handshake; the challenge must be echoed back.
    UrlVerification { challenge: String },
    /// A user opened the App Home tab and needs a fresh view published.
    AppHomeOpened { user_id: String, team_id: String },
    /// Anything else. Acknowledged with an empty 200.
    Ignored,
}

pub fn parse_event(body: &Value) -> EventEnvelope {
    match body.get("type").and_then(Value::as_str) {
        Some("url_verification") => {
            let challenge =
                body.get("challenge").and_then(Value::as_str).unwrap_or_default().to_owned();
            EventEnvelope::UrlVerification { challenge }
        }
        Some("event_callback") => parse_callback(body),
        _ => EventEnvelope::Ignored,
    }
}

fn parse_callback(body: &Value) -> EventEnvelope {
    let Some(event) = body.get("event") else {
        return EventEnvelope::Ignored;
    };

    match event.get("type").and_then(Value::as_str) {
        Some("app_home_opened") => {
            // Message and about tabs fire the same event.
            if event.get("tab").and_then(Value::as_str) != Some("home") {
                return EventEnvelope::Ignored;
            }
            let Some(user_id) = event.get("user").and_then(Value::as_str) else {
                return EventEnvelope::Ignored;
            };
            let team_id =
                body.get("team_id").and_then(Value::as_str).unwrap_or_default().to_owned();
            EventEnvelope::AppHomeOpened { user_id: user_id.to_owned(), team_id }
        }
        _ => EventEnvelope::Ignored,
    }
}

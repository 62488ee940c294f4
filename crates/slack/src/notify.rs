//! Web API client. Three methods cover the whole bot: DMs via
//! `chat.postMessage`, home tab publishes via `views.publish`, and modal
//! opens via `views.open`.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

use crate::blocks::{HomeView, MessageTemplate, ModalView};

const DEFAULT_BASE_URL: &str = "https://slack.com/api";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{method} failed: {error}")]
    Api { method: &'static str, error: String },
}

#[async_trait::async_trait]
pub trait SlackNotifier: Send + Sync {
    /// Direct message to a user or channel id.
    async fn post_message(
        &self,
        channel: &str,
        message: &MessageTemplate,
    ) -> Result<(), NotifyError>;

    async fn publish_home(&self, user_id: &str, view: &HomeView) -> Result<(), NotifyError>;

    async fn open_view(&self, trigger_id: &str, view: &ModalView) -> Result<(), NotifyError>;
}

pub struct HttpSlackNotifier {
    http: reqwest::Client,
    bot_token: SecretString,
    base_url: String,
}

impl HttpSlackNotifier {
    pub fn new(bot_token: SecretString) -> Self {
        Self { http: reqwest::Client::new(), bot_token, base_url: DEFAULT_BASE_URL.to_owned() }
    }

    /// Point the client somewhere other than slack.com. Used against local
    /// stand-ins.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn call(
        &self,
        method: &'static str,
        body: serde_json::Value,
    ) -> Result<(), NotifyError> {
        let response = self
            .http
            .post(format!("{}/{method}", self.base_url))
            .bearer_auth(self.bot_token.expose_secret())
            .json(&body)
            .send()
            .await?;

        let outcome: ApiResponse = response.json().await?;
        if outcome.ok {
            tracing::debug!(method, "slack api call succeeded");
            Ok(())
        } else {
            let error = outcome.error.unwrap_or_else(|| "unknown_error".to_owned());
            tracing::warn!(method, error = %error, "slack api call rejected");
            Err(NotifyError::Api { method, error })
        }
    }
}

/// Slack wraps every method result in `{ "ok": bool, "error": "..." }`.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

#[async_trait::async_trait]
impl SlackNotifier for HttpSlackNotifier {
    async fn post_message(
        &self,
        channel: &str,
        message: &MessageTemplate,
    ) -> Result<(), NotifyError> {
        self.call(
            "chat.postMessage",
            serde_json::json!({
                "channel": channel,
                "text": message.fallback_text,
                "blocks": message.blocks,
            }),
        )
        .await
    }

    async fn publish_home(&self, user_id: &str, view: &HomeView) -> Result<(), NotifyError> {
        self.call(
            "views.publish",
            serde_json::json!({
                "user_id": user_id,
                "view": view,
            }),
        )
        .await
    }

    async fn open_view(&self, trigger_id: &str, view: &ModalView) -> Result<(), NotifyError> {
        self.call(
            "views.open",
            serde_json::json!({
                "trigger_id": trigger_id,
                "view": view,
            }),
        )
        .await
    }
}

/// Captures outgoing traffic instead of sending it. Channels listed in
/// `fail_channels` make `post_message` error, for exercising partial
/// delivery paths.
#[derive(Default)]
pub struct RecordingNotifier {
    pub messages: std::sync::Mutex<Vec<(String, MessageTemplate)>>,
    pub published_homes: std::sync::Mutex<Vec<(String, HomeView)>>,
    pub opened_views: std::sync::Mutex<Vec<(String, ModalView)>>,
    pub fail_channels: Vec<String>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(channels: &[&str]) -> Self {
        Self {
            fail_channels: channels.iter().map(|c| (*c).to_owned()).collect(),
            ..Self::default()
        }
    }
}

#[async_trait::async_trait]
impl SlackNotifier for RecordingNotifier {
    async fn post_message(
        &self,
        channel: &str,
        message: &MessageTemplate,
    ) -> Result<(), NotifyError> {
        if self.fail_channels.iter().any(|c| c == channel) {
            return Err(NotifyError::Api { method: "chat.postMessage", error: "channel_not_found".to_owned() });
        }
        self.messages.lock().unwrap().push((channel.to_owned(), message.clone()));
        Ok(())
    }

    async fn publish_home(&self, user_id: &str, view: &HomeView) -> Result<(), NotifyError> {
        self.published_homes.lock().unwrap().push((user_id.to_owned(), view.clone()));
        Ok(())
    }

    async fn open_view(&self, trigger_id: &str, view: &ModalView) -> Result<(), NotifyError> {
        self.opened_views.lock().unwrap().push((trigger_id.to_owned(), view.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::blocks::{home_view, HomeSnapshot, MessageBuilder};

    use super::{RecordingNotifier, SlackNotifier};

    #[tokio::test]
    async fn recording_notifier_captures_messages_in_order() {
        let notifier = RecordingNotifier::new();
        let message = MessageBuilder::new("first").build();

        notifier.post_message("D001", &message).await.expect("send");
        notifier.post_message("D002", &message).await.expect("send");
        notifier.publish_home("U1", &home_view(&HomeSnapshot::default())).await.expect("publish");

        let messages = notifier.messages.lock().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].0, "D001");
        assert_eq!(notifier.published_homes.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn recording_notifier_fails_only_for_listed_channels() {
        let notifier = RecordingNotifier::failing_for(&["D666"]);
        let message = MessageBuilder::new("hello").build();

        assert!(notifier.post_message("D666", &message).await.is_err());
        assert!(notifier.post_message("D001", &message).await.is_ok());
        assert_eq!(notifier.messages.lock().unwrap().len(), 1);
    }
}

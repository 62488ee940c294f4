use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A Slack workspace member known to the bot. Keyed by the Slack user id;
/// the team id is recorded for context but is not part of the key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub slack_user_id: String,
    pub slack_team_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A bearer token granting read access to one user's full data export.
/// The token string itself is the lookup key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExportToken {
    pub token: String,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
}

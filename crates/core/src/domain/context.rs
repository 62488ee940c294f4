use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContextId(pub String);

/// A GTD context tag such as `@home` or `@computer`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Context {
    pub id: ContextId,
    pub owner_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

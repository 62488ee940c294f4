use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::context::ContextId;
use crate::domain::project::ProjectId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub String);

/// Closed status enum stored as a string column. "Scheduled" is not a
/// status: it is `Active` plus a due date, a view-layer classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Inbox,
    Active,
    Someday,
    Waiting,
    Completed,
    Archived,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 6] = [
        Self::Inbox,
        Self::Active,
        Self::Someday,
        Self::Waiting,
        Self::Completed,
        Self::Archived,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inbox => "inbox",
            Self::Active => "active",
            Self::Someday => "someday",
            Self::Waiting => "waiting",
            Self::Completed => "completed",
            Self::Archived => "archived",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "inbox" => Some(Self::Inbox),
            "active" => Some(Self::Active),
            "someday" => Some(Self::Someday),
            "waiting" => Some(Self::Waiting),
            "completed" => Some(Self::Completed),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }

    /// Apply a lifecycle command, returning the resulting status.
    ///
    /// The transition table, in full:
    /// - `Clarify` is the sole edge out of `Inbox`.
    /// - `Move` reclassifies within the active family
    ///   {Active, Waiting, Someday}.
    /// - `Activate` is the one reverse edge, `Someday -> Active`.
    /// - `Complete` is allowed from everything except `Archived`;
    ///   re-completing a completed task is permitted (the service re-stamps
    ///   `completed_at`).
    pub fn apply(self, command: TaskCommand) -> Result<TaskStatus, TransitionError> {
        use TaskCommand::{Activate, Clarify, Complete, Move};
        use TaskStatus::{Active, Archived, Completed, Inbox, Someday, Waiting};

        let next = match (self, command) {
            (Inbox, Clarify(target)) => target.status(),
            (Active | Waiting | Someday, Move(target)) => target.status(),
            (Someday, Activate) => Active,
            (Archived, Complete) => {
                return Err(TransitionError::Invalid { status: self, command });
            }
            (_, Complete) => Completed,
            _ => return Err(TransitionError::Invalid { status: self, command }),
        };

        Ok(next)
    }
}

/// Targets reachable from the inbox via clarify.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClarifyTarget {
    Active,
    Someday,
    Waiting,
    Archived,
}

impl ClarifyTarget {
    pub fn status(self) -> TaskStatus {
        match self {
            Self::Active => TaskStatus::Active,
            Self::Someday => TaskStatus::Someday,
            Self::Waiting => TaskStatus::Waiting,
            Self::Archived => TaskStatus::Archived,
        }
    }
}

/// Targets reachable via move within the active family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveTarget {
    Active,
    Waiting,
    Someday,
}

impl MoveTarget {
    pub fn status(self) -> TaskStatus {
        match self {
            Self::Active => TaskStatus::Active,
            Self::Waiting => TaskStatus::Waiting,
            Self::Someday => TaskStatus::Someday,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskCommand {
    Clarify(ClarifyTarget),
    Move(MoveTarget),
    Activate,
    Complete,
}

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("cannot apply {command:?} to a task in status {status:?}")]
    Invalid { status: TaskStatus, command: TaskCommand },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeEstimate {
    Quick,
    HalfHour,
    Hour,
    TwoHoursPlus,
}

impl TimeEstimate {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Quick => "quick",
            Self::HalfHour => "30min",
            Self::Hour => "1hr",
            Self::TwoHoursPlus => "2hr+",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "quick" => Some(Self::Quick),
            "30min" => Some(Self::HalfHour),
            "1hr" => Some(Self::Hour),
            "2hr+" => Some(Self::TwoHoursPlus),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergyLevel {
    High,
    Medium,
    Low,
}

impl EnergyLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub owner_id: String,
    pub title: String,
    pub description: Option<String>,
    pub project_id: Option<ProjectId>,
    pub context_id: Option<ContextId>,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: Priority,
    pub status: TaskStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub delegated_to: Option<String>,
    pub time_estimate: Option<TimeEstimate>,
    pub energy_level: Option<EnergyLevel>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Active task with a due date: rendered under "Scheduled".
    pub fn is_scheduled(&self) -> bool {
        self.status == TaskStatus::Active && self.due_date.is_some()
    }
}

//! Scheduled sweeps. An external scheduler hits the reminder endpoints; this
//! module does the actual scanning and DM delivery.
//!
//! Delivery is sequential and failure-tolerant: one undeliverable DM is
//! counted and skipped, the rest of the batch still goes out.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use nextaction_core::domain::task::{Task, TaskStatus};
use nextaction_core::errors::ApplicationError;
use nextaction_db::repositories::TaskRepository;
use nextaction_slack::blocks::{self, TaskLine};
use nextaction_slack::notify::SlackNotifier;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub sent: usize,
    pub failed: usize,
    pub total_checked: usize,
}

impl SweepReport {
    fn merge(self, other: SweepReport) -> SweepReport {
        SweepReport {
            sent: self.sent + other.sent,
            failed: self.failed + other.failed,
            total_checked: self.total_checked + other.total_checked,
        }
    }
}

pub struct ReminderSweeper {
    tasks: Arc<dyn TaskRepository>,
    notifier: Arc<dyn SlackNotifier>,
    due_window_hours: u64,
    inbox_digest_limit: usize,
}

fn reminder_line(task: &Task) -> TaskLine {
    TaskLine {
        id: task.id.0.clone(),
        title: task.title.clone(),
        priority: task.priority,
        due_label: task.due_date.map(|d| d.format("%Y-%m-%d").to_string()),
        project_name: None,
        context_name: None,
        delegated_to: task.delegated_to.clone(),
    }
}

impl ReminderSweeper {
    pub fn new(
        tasks: Arc<dyn TaskRepository>,
        notifier: Arc<dyn SlackNotifier>,
        due_window_hours: u64,
        inbox_digest_limit: usize,
    ) -> Self {
        Self { tasks, notifier, due_window_hours, inbox_digest_limit }
    }

    pub async fn run(&self, now: DateTime<Utc>) -> Result<SweepReport, ApplicationError> {
        let due = self.sweep_due(now).await?;
        let inbox = self.sweep_inbox().await?;
        let report = due.merge(inbox);
        tracing::info!(
            sent = report.sent,
            failed = report.failed,
            total_checked = report.total_checked,
            "reminder sweep finished"
        );
        Ok(report)
    }

    /// One DM per active task due inside the window.
    async fn sweep_due(&self, now: DateTime<Utc>) -> Result<SweepReport, ApplicationError> {
        let until = now + Duration::hours(self.due_window_hours as i64);
        let due_tasks = self
            .tasks
            .list_due_between(now, until)
            .await
            .map_err(|err| ApplicationError::Persistence(err.to_string()))?;

        let mut report = SweepReport { total_checked: due_tasks.len(), ..SweepReport::default() };
        for task in &due_tasks {
            let line = reminder_line(task);
            let label = line.due_label.clone().unwrap_or_else(|| "soon".to_owned());
            let message = blocks::due_reminder_message(&line, &label);
            match self.notifier.post_message(&task.owner_id, &message).await {
                Ok(()) => report.sent += 1,
                Err(err) => {
                    report.failed += 1;
                    tracing::warn!(
                        task_id = %task.id.0,
                        owner_id = %task.owner_id,
                        error = %err,
                        "due reminder delivery failed"
                    );
                }
            }
        }
        Ok(report)
    }

    /// One digest DM per user with unclarified inbox tasks.
    async fn sweep_inbox(&self) -> Result<SweepReport, ApplicationError> {
        let inbox_tasks = self
            .tasks
            .list_by_status(TaskStatus::Inbox)
            .await
            .map_err(|err| ApplicationError::Persistence(err.to_string()))?;

        let mut per_owner: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for task in inbox_tasks {
            per_owner.entry(task.owner_id).or_default().push(task.title);
        }

        let mut report =
            SweepReport { total_checked: per_owner.len(), ..SweepReport::default() };
        for (owner_id, titles) in per_owner {
            let total = titles.len();
            let shown: Vec<String> =
                titles.into_iter().take(self.inbox_digest_limit).collect();
            let message = blocks::inbox_digest_message(&shown, total);
            match self.notifier.post_message(&owner_id, &message).await {
                Ok(()) => report.sent += 1,
                Err(err) => {
                    report.failed += 1;
                    tracing::warn!(
                        owner_id = %owner_id,
                        error = %err,
                        "inbox digest delivery failed"
                    );
                }
            }
        }
        Ok(report)
    }
}

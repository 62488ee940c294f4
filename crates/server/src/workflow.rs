//! Application layer. One struct owns the repositories and the Slack
//! client; the command router and the webhook handlers both drive it.
//!
//! Every mutation that changes what the home tab should show ends with a
//! republish for the affected user. Publish failures are logged and
//! swallowed so a flaky Web API call never fails the mutation itself.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use nextaction_core::domain::context::{Context, ContextId};
use nextaction_core::domain::export::ExportToken;
use nextaction_core::domain::patch::Patch;
use nextaction_core::domain::project::{Project, ProjectId};
use nextaction_core::domain::task::{
    ClarifyTarget, EnergyLevel, Priority, Task, TaskCommand, TaskId, TaskStatus, TimeEstimate,
};
use nextaction_core::errors::{ApplicationError, DomainError};
use nextaction_core::id::{new_export_token, new_record_id};
use nextaction_db::repositories::{
    ContextRepository, ExportTokenRepository, ProjectRepository, RepositoryError, TaskRepository,
    UserRepository,
};
use nextaction_slack::blocks::{self, HomeSnapshot, MessageTemplate, SelectOption, TaskLine};
use nextaction_slack::commands::{Caller, GtdCommandService};
use nextaction_slack::interactions::{
    FormState, Interaction, MoveChoice, Submission, SubmissionResponse, TaskAction,
};
use nextaction_slack::notify::{NotifyError, SlackNotifier};

#[derive(Clone)]
pub struct GtdWorkflow {
    users: Arc<dyn UserRepository>,
    tasks: Arc<dyn TaskRepository>,
    projects: Arc<dyn ProjectRepository>,
    contexts: Arc<dyn ContextRepository>,
    exports: Arc<dyn ExportTokenRepository>,
    notifier: Arc<dyn SlackNotifier>,
    export_base_url: String,
}

fn persistence(err: RepositoryError) -> ApplicationError {
    ApplicationError::Persistence(err.to_string())
}

fn integration(err: NotifyError) -> ApplicationError {
    ApplicationError::Integration(err.to_string())
}

fn task_not_found(id: &str) -> ApplicationError {
    DomainError::NotFound { kind: "task", id: id.to_owned() }.into()
}

/// Datepicker values are calendar dates; store them at noon UTC so the day
/// survives rendering in nearby timezones.
fn parse_due_date(value: &str) -> Option<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()?;
    let at_noon = date.and_hms_opt(12, 0, 0)?;
    Some(Utc.from_utc_datetime(&at_noon))
}

fn due_label(due: &DateTime<Utc>) -> String {
    due.format("%Y-%m-%d").to_string()
}

/// Titles are stored trimmed and clipped to the column limit.
const MAX_TITLE_CHARS: usize = 500;

fn clamp_title(raw: &str) -> String {
    raw.trim().chars().take(MAX_TITLE_CHARS).collect()
}

impl GtdWorkflow {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        users: Arc<dyn UserRepository>,
        tasks: Arc<dyn TaskRepository>,
        projects: Arc<dyn ProjectRepository>,
        contexts: Arc<dyn ContextRepository>,
        exports: Arc<dyn ExportTokenRepository>,
        notifier: Arc<dyn SlackNotifier>,
        export_base_url: impl Into<String>,
    ) -> Self {
        Self {
            users,
            tasks,
            projects,
            contexts,
            exports,
            notifier,
            export_base_url: export_base_url.into(),
        }
    }

    async fn ensure_user(&self, user_id: &str, team_id: &str) -> Result<(), ApplicationError> {
        self.users.find_or_create(user_id, team_id).await.map_err(persistence)?;
        Ok(())
    }

    async fn load_task(&self, owner_id: &str, id: &str) -> Result<Task, ApplicationError> {
        self.tasks
            .find_for_owner(&TaskId(id.to_owned()), owner_id)
            .await
            .map_err(persistence)?
            .ok_or_else(|| task_not_found(id))
    }

    async fn save_task(&self, task: Task) -> Result<(), ApplicationError> {
        self.tasks.save(task).await.map_err(persistence)
    }

    /// Load, apply a lifecycle command, stamp, save.
    async fn transition(
        &self,
        owner_id: &str,
        id: &str,
        command: TaskCommand,
    ) -> Result<Task, ApplicationError> {
        let mut task = self.load_task(owner_id, id).await?;
        let next = task
            .status
            .apply(command)
            .map_err(|err| ApplicationError::from(DomainError::from(err)))?;

        let now = Utc::now();
        task.status = next;
        task.updated_at = now;
        if next == TaskStatus::Completed {
            task.completed_at = Some(now);
        }

        self.save_task(task.clone()).await?;
        Ok(task)
    }

    async fn reference_names(
        &self,
        owner_id: &str,
    ) -> Result<(HashMap<String, String>, HashMap<String, String>), ApplicationError> {
        let projects = self
            .projects
            .list_for_owner(owner_id)
            .await
            .map_err(persistence)?
            .into_iter()
            .map(|p| (p.id.0, p.name))
            .collect();
        let contexts = self
            .contexts
            .list_for_owner(owner_id)
            .await
            .map_err(persistence)?
            .into_iter()
            .map(|c| (c.id.0, c.name))
            .collect();
        Ok((projects, contexts))
    }

    async fn project_options(&self, owner_id: &str) -> Result<Vec<SelectOption>, ApplicationError> {
        Ok(self
            .projects
            .list_for_owner(owner_id)
            .await
            .map_err(persistence)?
            .into_iter()
            .map(|p| SelectOption::new(p.name, p.id.0))
            .collect())
    }

    async fn context_options(&self, owner_id: &str) -> Result<Vec<SelectOption>, ApplicationError> {
        Ok(self
            .contexts
            .list_for_owner(owner_id)
            .await
            .map_err(persistence)?
            .into_iter()
            .map(|c| SelectOption::new(c.name, c.id.0))
            .collect())
    }

    fn task_line(
        task: &Task,
        project_names: &HashMap<String, String>,
        context_names: &HashMap<String, String>,
    ) -> TaskLine {
        TaskLine {
            id: task.id.0.clone(),
            title: task.title.clone(),
            priority: task.priority,
            due_label: task.due_date.as_ref().map(due_label),
            project_name: task
                .project_id
                .as_ref()
                .and_then(|p| project_names.get(&p.0))
                .cloned(),
            context_name: task
                .context_id
                .as_ref()
                .and_then(|c| context_names.get(&c.0))
                .cloned(),
            delegated_to: task.delegated_to.clone(),
        }
    }

    async fn home_snapshot(&self, owner_id: &str) -> Result<HomeSnapshot, ApplicationError> {
        let (project_names, context_names) = self.reference_names(owner_id).await?;
        let tasks = self.tasks.list_for_owner(owner_id, None).await.map_err(persistence)?;

        let mut snapshot = HomeSnapshot::default();
        for task in &tasks {
            let line = Self::task_line(task, &project_names, &context_names);
            match task.status {
                TaskStatus::Inbox => snapshot.inbox.push(line),
                TaskStatus::Active if task.is_scheduled() => snapshot.scheduled.push(line),
                TaskStatus::Active => snapshot.next_actions.push(line),
                TaskStatus::Waiting => snapshot.waiting.push(line),
                TaskStatus::Someday => snapshot.someday.push(line),
                TaskStatus::Completed | TaskStatus::Archived => {}
            }
        }
        Ok(snapshot)
    }

    pub async fn publish_home(&self, user_id: &str) -> Result<(), ApplicationError> {
        let snapshot = self.home_snapshot(user_id).await?;
        self.notifier
            .publish_home(user_id, &blocks::home_view(&snapshot))
            .await
            .map_err(integration)
    }

    async fn refresh_home_quietly(&self, user_id: &str) {
        if let Err(err) = self.publish_home(user_id).await {
            tracing::warn!(user_id, error = %err, "home tab refresh failed");
        }
    }

    pub async fn on_home_opened(&self, user_id: &str, team_id: &str) -> Result<(), ApplicationError> {
        self.ensure_user(user_id, team_id).await?;
        self.publish_home(user_id).await
    }

    fn new_inbox_task(&self, owner_id: &str, title: String) -> Task {
        let now = Utc::now();
        Task {
            id: TaskId(new_record_id()),
            owner_id: owner_id.to_owned(),
            title: clamp_title(&title),
            description: None,
            project_id: None,
            context_id: None,
            due_date: None,
            priority: Priority::default(),
            status: TaskStatus::Inbox,
            completed_at: None,
            delegated_to: None,
            time_estimate: None,
            energy_level: None,
            created_at: now,
            updated_at: now,
        }
    }

    // -- export ------------------------------------------------------------

    /// One token per user for the lifetime of the account; repeat requests
    /// come back with the same link.
    async fn mint_export_link(&self, owner_id: &str) -> Result<String, ApplicationError> {
        let candidate = ExportToken {
            token: new_export_token(),
            owner_id: owner_id.to_owned(),
            created_at: Utc::now(),
        };
        let grant = self.exports.find_or_create(candidate).await.map_err(persistence)?;
        Ok(format!("{}/export/{}", self.export_base_url, grant.token))
    }

    /// Resolves a bearer token to the owner's tasks grouped by status, or
    /// `None` when the token is unknown.
    pub async fn export_document(
        &self,
        token: &str,
    ) -> Result<Option<serde_json::Value>, ApplicationError> {
        let Some(grant) = self.exports.find(token).await.map_err(persistence)? else {
            return Ok(None);
        };

        let owner_id = grant.owner_id.as_str();
        let (project_names, context_names) = self.reference_names(owner_id).await?;
        let tasks = self.tasks.list_for_owner(owner_id, None).await.map_err(persistence)?;
        let total_tasks = tasks.len();

        let mut by_status = serde_json::Map::new();
        for status in TaskStatus::ALL {
            let entries: Vec<serde_json::Value> = tasks
                .iter()
                .filter(|t| t.status == status)
                .map(|t| {
                    serde_json::json!({
                        "id": t.id.0,
                        "title": t.title,
                        "description": t.description,
                        "priority": t.priority,
                        "due_date": t.due_date,
                        "project": t.project_id.as_ref().and_then(|p| project_names.get(&p.0)),
                        "context": t.context_id.as_ref().and_then(|c| context_names.get(&c.0)),
                        "delegated_to": t.delegated_to,
                        "time_estimate": t.time_estimate,
                        "energy_level": t.energy_level,
                        "completed_at": t.completed_at,
                        "created_at": t.created_at,
                    })
                })
                .collect();
            by_status.insert(status.as_str().to_owned(), serde_json::Value::Array(entries));
        }

        Ok(Some(serde_json::json!({
            "exported_at": Utc::now().to_rfc3339(),
            "total_tasks": total_tasks,
            "tasks": by_status,
        })))
    }

    // -- interactivity -----------------------------------------------------

    pub async fn handle_interaction(
        &self,
        interaction: Interaction,
    ) -> Result<SubmissionResponse, ApplicationError> {
        match interaction {
            Interaction::BlockAction { actor, trigger_id, action } => {
                self.ensure_user(&actor.user_id, &actor.team_id).await?;
                self.handle_action(&actor.user_id, &trigger_id, action).await?;
                Ok(SubmissionResponse::Close)
            }
            Interaction::ViewSubmission { actor, submission, form, .. } => {
                self.ensure_user(&actor.user_id, &actor.team_id).await?;
                self.handle_submission(&actor.user_id, submission, form).await
            }
            Interaction::MessageShortcut { actor, trigger_id, message_text, channel_id } => {
                self.ensure_user(&actor.user_id, &actor.team_id).await?;
                let modal = blocks::create_task_from_message_modal(
                    &message_text,
                    &channel_id.unwrap_or_default(),
                );
                self.notifier.open_view(&trigger_id, &modal).await.map_err(integration)?;
                Ok(SubmissionResponse::Close)
            }
            Interaction::Unsupported => Ok(SubmissionResponse::Close),
        }
    }

    async fn handle_action(
        &self,
        user_id: &str,
        trigger_id: &str,
        action: TaskAction,
    ) -> Result<(), ApplicationError> {
        match action {
            TaskAction::OpenAddTask => {
                let modal = blocks::add_task_modal(
                    &self.project_options(user_id).await?,
                    &self.context_options(user_id).await?,
                );
                self.notifier.open_view(trigger_id, &modal).await.map_err(integration)
            }
            TaskAction::OpenAddProject => self
                .notifier
                .open_view(trigger_id, &blocks::add_project_modal())
                .await
                .map_err(integration),
            TaskAction::OpenAddContext => self
                .notifier
                .open_view(trigger_id, &blocks::add_context_modal())
                .await
                .map_err(integration),
            TaskAction::OpenReviewDone => {
                let titles: Vec<String> = self
                    .tasks
                    .list_for_owner(user_id, Some(TaskStatus::Completed))
                    .await
                    .map_err(persistence)?
                    .into_iter()
                    .map(|t| t.title)
                    .collect();
                self.notifier
                    .open_view(trigger_id, &blocks::review_done_modal(&titles))
                    .await
                    .map_err(integration)
            }
            TaskAction::ClarifyActionable { task_id } => {
                let task = self.load_task(user_id, &task_id).await?;
                let due = task.due_date.as_ref().map(due_label);
                let modal = blocks::actionable_modal(
                    &task_id,
                    due.as_deref(),
                    &self.project_options(user_id).await?,
                    &self.context_options(user_id).await?,
                );
                self.notifier.open_view(trigger_id, &modal).await.map_err(integration)
            }
            TaskAction::ClarifyNotActionable { task_id } => {
                self.load_task(user_id, &task_id).await?;
                self.notifier
                    .open_view(trigger_id, &blocks::not_actionable_modal(&task_id))
                    .await
                    .map_err(integration)
            }
            TaskAction::Complete { task_id } => {
                self.transition(user_id, &task_id, TaskCommand::Complete).await?;
                self.refresh_home_quietly(user_id).await;
                Ok(())
            }
            TaskAction::Activate { task_id } => {
                // Parked tasks come back at medium urgency.
                let mut task = self.load_task(user_id, &task_id).await?;
                let next = task
                    .status
                    .apply(TaskCommand::Activate)
                    .map_err(|err| ApplicationError::from(DomainError::from(err)))?;
                task.status = next;
                task.priority = Priority::default();
                task.updated_at = Utc::now();
                self.save_task(task).await?;
                self.refresh_home_quietly(user_id).await;
                Ok(())
            }
            TaskAction::Delete { task_id } => {
                let task = self.load_task(user_id, &task_id).await?;
                self.notifier
                    .open_view(trigger_id, &blocks::delete_confirmation_modal(&task_id, &task.title))
                    .await
                    .map_err(integration)
            }
            TaskAction::Edit { task_id } => {
                let task = self.load_task(user_id, &task_id).await?;
                let project_options = self.project_options(user_id).await?;
                let context_options = self.context_options(user_id).await?;
                let current_project = task
                    .project_id
                    .as_ref()
                    .and_then(|p| project_options.iter().find(|o| o.value == p.0));
                let current_context = task
                    .context_id
                    .as_ref()
                    .and_then(|c| context_options.iter().find(|o| o.value == c.0));
                let due = task.due_date.as_ref().map(due_label);
                let prefill = blocks::EditTaskPrefill {
                    title: &task.title,
                    description: task.description.as_deref(),
                    due_date: due.as_deref(),
                    time_estimate: task.time_estimate,
                    energy_level: task.energy_level,
                };
                let modal = blocks::edit_task_modal(
                    &task_id,
                    &prefill,
                    &project_options,
                    &context_options,
                    current_project,
                    current_context,
                );
                self.notifier.open_view(trigger_id, &modal).await.map_err(integration)
            }
            TaskAction::Move { task_id } => {
                self.load_task(user_id, &task_id).await?;
                self.notifier
                    .open_view(trigger_id, &blocks::move_task_modal(&task_id))
                    .await
                    .map_err(integration)
            }
            TaskAction::SetPriority { task_id } => {
                let task = self.load_task(user_id, &task_id).await?;
                self.notifier
                    .open_view(trigger_id, &blocks::set_priority_modal(&task_id, task.priority))
                    .await
                    .map_err(integration)
            }
        }
    }

    async fn handle_submission(
        &self,
        user_id: &str,
        submission: Submission,
        form: FormState,
    ) -> Result<SubmissionResponse, ApplicationError> {
        match submission {
            Submission::AddTask => {
                let Some(title) = form.text("title_block", "title_input") else {
                    return Ok(SubmissionResponse::error("title_block", "Title is required"));
                };
                let mut task = self.new_inbox_task(user_id, title);
                task.description = form.text("description_block", "description_input");
                task.due_date = form
                    .date("due_date_block", "due_date_input")
                    .as_deref()
                    .and_then(parse_due_date);
                if let Some(priority) = form.selected("priority_block", "priority_select") {
                    task.priority = Priority::parse(&priority).unwrap_or_default();
                }
                task.project_id =
                    form.selected("project_block", "project_select").map(ProjectId);
                task.context_id =
                    form.selected("context_block", "context_select").map(ContextId);
                task.time_estimate = form
                    .selected("time_estimate_block", "time_estimate_select")
                    .as_deref()
                    .and_then(TimeEstimate::parse);
                task.energy_level = form
                    .selected("energy_block", "energy_select")
                    .as_deref()
                    .and_then(EnergyLevel::parse);
                self.save_task(task).await?;
                self.refresh_home_quietly(user_id).await;
                Ok(SubmissionResponse::Close)
            }
            Submission::CreateTaskFromMessage => {
                let Some(title) = form.text("title_block", "title_input") else {
                    return Ok(SubmissionResponse::error("title_block", "Title is required"));
                };
                let mut task = self.new_inbox_task(user_id, title);
                task.description = form.text("description_block", "description_input");
                self.save_task(task).await?;
                self.refresh_home_quietly(user_id).await;
                Ok(SubmissionResponse::Close)
            }
            Submission::AddProject => {
                let Some(name) = form.text("name_block", "name_input") else {
                    return Ok(SubmissionResponse::error("name_block", "Name is required"));
                };
                let now = Utc::now();
                let project = Project {
                    id: ProjectId(new_record_id()),
                    owner_id: user_id.to_owned(),
                    name,
                    description: form.text("description_block", "description_input"),
                    created_at: now,
                    updated_at: now,
                };
                self.projects.save(project).await.map_err(persistence)?;
                self.refresh_home_quietly(user_id).await;
                Ok(SubmissionResponse::Close)
            }
            Submission::AddContext => {
                let Some(name) = form.text("name_block", "name_input") else {
                    return Ok(SubmissionResponse::error("name_block", "Name is required"));
                };
                let context = Context {
                    id: ContextId(new_record_id()),
                    owner_id: user_id.to_owned(),
                    name,
                    created_at: Utc::now(),
                };
                self.contexts.save(context).await.map_err(persistence)?;
                self.refresh_home_quietly(user_id).await;
                Ok(SubmissionResponse::Close)
            }
            Submission::Actionable { task_id } => {
                let mut task = self.load_task(user_id, &task_id).await?;
                let delegated = form.text("delegated_block", "delegated_input");
                let target = if delegated.is_some() {
                    ClarifyTarget::Waiting
                } else {
                    ClarifyTarget::Active
                };
                let next = task
                    .status
                    .apply(TaskCommand::Clarify(target))
                    .map_err(|err| ApplicationError::from(DomainError::from(err)))?;

                task.status = next;
                task.delegated_to = delegated;
                // The picker is prefilled, so an untouched form re-submits
                // the stored date and an absent block leaves it alone.
                task.due_date = match form.date_patch("due_date_block", "due_date_input") {
                    Patch::Set(date) => parse_due_date(&date),
                    Patch::Clear => None,
                    Patch::Keep => task.due_date,
                };
                if let Some(priority) = form.selected("priority_block", "priority_select") {
                    task.priority = Priority::parse(&priority).unwrap_or(task.priority);
                }
                if let Some(project) = form.selected("project_block", "project_select") {
                    task.project_id = Some(ProjectId(project));
                }
                if let Some(context) = form.selected("context_block", "context_select") {
                    task.context_id = Some(ContextId(context));
                }
                task.time_estimate = form
                    .selected("time_estimate_block", "time_estimate_select")
                    .as_deref()
                    .and_then(TimeEstimate::parse)
                    .or(task.time_estimate);
                task.energy_level = form
                    .selected("energy_block", "energy_select")
                    .as_deref()
                    .and_then(EnergyLevel::parse)
                    .or(task.energy_level);
                task.updated_at = Utc::now();
                self.save_task(task).await?;
                self.refresh_home_quietly(user_id).await;
                Ok(SubmissionResponse::Close)
            }
            Submission::NotActionable { task_id } => {
                let target = match form
                    .selected("disposition_block", "disposition_select")
                    .as_deref()
                {
                    Some("someday") => ClarifyTarget::Someday,
                    Some("archived") => ClarifyTarget::Archived,
                    _ => {
                        return Ok(SubmissionResponse::error(
                            "disposition_block",
                            "Choose a disposition",
                        ));
                    }
                };
                self.transition(user_id, &task_id, TaskCommand::Clarify(target)).await?;
                self.refresh_home_quietly(user_id).await;
                Ok(SubmissionResponse::Close)
            }
            Submission::MoveTask { task_id } => {
                let Some(choice) = form.move_choice("target_block", "target_select") else {
                    return Ok(SubmissionResponse::error("target_block", "Choose a list"));
                };
                let mut task = self.load_task(user_id, &task_id).await?;
                let next = task
                    .status
                    .apply(TaskCommand::Move(choice.target()))
                    .map_err(|err| ApplicationError::from(DomainError::from(err)))?;

                task.status = next;
                // A delegate only makes sense on the waiting list; leaving
                // it drops the stale name.
                match choice {
                    MoveChoice::NextActions => {
                        task.due_date = None;
                        task.delegated_to = None;
                    }
                    MoveChoice::Scheduled => {
                        task.due_date = form
                            .date("due_date_block", "due_date_input")
                            .as_deref()
                            .and_then(parse_due_date)
                            .or_else(|| Some(Utc::now()));
                        task.delegated_to = None;
                    }
                    MoveChoice::Waiting => {
                        // A blank input keeps the current delegate.
                        if let Some(delegate) = form.text("delegated_block", "delegated_input") {
                            task.delegated_to = Some(delegate);
                        }
                    }
                    MoveChoice::Someday => {
                        task.delegated_to = None;
                    }
                }
                task.updated_at = Utc::now();
                self.save_task(task).await?;
                self.refresh_home_quietly(user_id).await;
                Ok(SubmissionResponse::Close)
            }
            Submission::EditTask { task_id } => {
                let mut task = self.load_task(user_id, &task_id).await?;
                if let Some(title) = form.text("title_block", "title_input") {
                    task.title = clamp_title(&title);
                }
                // Cleared inputs clear the stored value.
                task.description = Patch::from(form.text("description_block", "description_input"))
                    .apply(task.description);
                task.due_date = Patch::from(
                    form.date("due_date_block", "due_date_input")
                        .as_deref()
                        .and_then(parse_due_date),
                )
                .apply(task.due_date);
                task.project_id =
                    Patch::from(form.selected("project_block", "project_select").map(ProjectId))
                        .apply(task.project_id);
                task.context_id =
                    Patch::from(form.selected("context_block", "context_select").map(ContextId))
                        .apply(task.context_id);
                // The "none" option removes the stored value; anything else
                // replaces it.
                if let Some(value) = form.selected("time_estimate_block", "time_estimate_select") {
                    task.time_estimate = if value == "none" {
                        None
                    } else {
                        TimeEstimate::parse(&value).or(task.time_estimate)
                    };
                }
                if let Some(value) = form.selected("energy_block", "energy_select") {
                    task.energy_level = if value == "none" {
                        None
                    } else {
                        EnergyLevel::parse(&value).or(task.energy_level)
                    };
                }
                task.updated_at = Utc::now();
                self.save_task(task).await?;
                self.refresh_home_quietly(user_id).await;
                Ok(SubmissionResponse::Close)
            }
            Submission::SetPriority { task_id } => {
                let mut task = self.load_task(user_id, &task_id).await?;
                if let Some(priority) = form
                    .selected("priority_block", "priority_select")
                    .as_deref()
                    .and_then(Priority::parse)
                {
                    task.priority = priority;
                    task.updated_at = Utc::now();
                    self.save_task(task).await?;
                    self.refresh_home_quietly(user_id).await;
                }
                Ok(SubmissionResponse::Close)
            }
            Submission::DeleteConfirmation { task_id } => {
                let deleted = self
                    .tasks
                    .delete_for_owner(&TaskId(task_id.clone()), user_id)
                    .await
                    .map_err(persistence)?;
                if !deleted {
                    return Err(task_not_found(&task_id));
                }
                self.refresh_home_quietly(user_id).await;
                Ok(SubmissionResponse::Close)
            }
        }
    }
}

#[async_trait::async_trait]
impl GtdCommandService for GtdWorkflow {
    async fn add_task(
        &self,
        caller: &Caller,
        title: &str,
    ) -> Result<MessageTemplate, ApplicationError> {
        self.ensure_user(&caller.user_id, &caller.team_id).await?;
        let task = self.new_inbox_task(&caller.user_id, title.to_owned());
        let (id, title) = (task.id.0.clone(), task.title.clone());
        self.save_task(task).await?;
        self.refresh_home_quietly(&caller.user_id).await;
        Ok(blocks::task_added_message(&id, &title))
    }

    async fn list_tasks(
        &self,
        caller: &Caller,
        filter: Option<TaskStatus>,
    ) -> Result<MessageTemplate, ApplicationError> {
        self.ensure_user(&caller.user_id, &caller.team_id).await?;
        let (project_names, context_names) = self.reference_names(&caller.user_id).await?;
        let lines: Vec<TaskLine> = self
            .tasks
            .list_for_owner(&caller.user_id, filter)
            .await
            .map_err(persistence)?
            .iter()
            .map(|task| Self::task_line(task, &project_names, &context_names))
            .collect();
        let label = filter.map(TaskStatus::as_str).unwrap_or("all");
        Ok(blocks::task_list_message(label, &lines))
    }

    async fn complete_task(
        &self,
        caller: &Caller,
        task_id: &str,
    ) -> Result<MessageTemplate, ApplicationError> {
        self.ensure_user(&caller.user_id, &caller.team_id).await?;
        let task = self.transition(&caller.user_id, task_id, TaskCommand::Complete).await?;
        self.refresh_home_quietly(&caller.user_id).await;
        Ok(blocks::task_completed_message(&task.title))
    }

    async fn delete_task(
        &self,
        caller: &Caller,
        task_id: &str,
    ) -> Result<MessageTemplate, ApplicationError> {
        self.ensure_user(&caller.user_id, &caller.team_id).await?;
        let task = self.load_task(&caller.user_id, task_id).await?;
        self.tasks
            .delete_for_owner(&task.id, &caller.user_id)
            .await
            .map_err(persistence)?;
        self.refresh_home_quietly(&caller.user_id).await;
        Ok(blocks::task_deleted_message(&task.title))
    }

    async fn add_project(
        &self,
        caller: &Caller,
        name: &str,
    ) -> Result<MessageTemplate, ApplicationError> {
        self.ensure_user(&caller.user_id, &caller.team_id).await?;
        let now = Utc::now();
        let project = Project {
            id: ProjectId(new_record_id()),
            owner_id: caller.user_id.clone(),
            name: name.to_owned(),
            description: None,
            created_at: now,
            updated_at: now,
        };
        self.projects.save(project).await.map_err(persistence)?;
        Ok(blocks::project_added_message(name))
    }

    async fn list_projects(&self, caller: &Caller) -> Result<MessageTemplate, ApplicationError> {
        self.ensure_user(&caller.user_id, &caller.team_id).await?;
        let names: Vec<String> = self
            .projects
            .list_for_owner(&caller.user_id)
            .await
            .map_err(persistence)?
            .into_iter()
            .map(|p| p.name)
            .collect();
        Ok(blocks::project_list_message(&names))
    }

    async fn add_context(
        &self,
        caller: &Caller,
        name: &str,
    ) -> Result<MessageTemplate, ApplicationError> {
        self.ensure_user(&caller.user_id, &caller.team_id).await?;
        let context = Context {
            id: ContextId(new_record_id()),
            owner_id: caller.user_id.clone(),
            name: name.to_owned(),
            created_at: Utc::now(),
        };
        self.contexts.save(context).await.map_err(persistence)?;
        Ok(blocks::context_added_message(name))
    }

    async fn list_contexts(&self, caller: &Caller) -> Result<MessageTemplate, ApplicationError> {
        self.ensure_user(&caller.user_id, &caller.team_id).await?;
        let names: Vec<String> = self
            .contexts
            .list_for_owner(&caller.user_id)
            .await
            .map_err(persistence)?
            .into_iter()
            .map(|c| c.name)
            .collect();
        Ok(blocks::context_list_message(&names))
    }

    async fn export_link(&self, caller: &Caller) -> Result<MessageTemplate, ApplicationError> {
        self.ensure_user(&caller.user_id, &caller.team_id).await?;
        let url = self.mint_export_link(&caller.user_id).await?;
        Ok(blocks::export_link_message(&url))
    }
}

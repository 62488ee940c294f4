//! `/gtd` slash command parsing and routing.
//!
//! Classification is a pure function from the raw command text to a tagged
//! [`GtdCommand`]; the router only matches on the tag and delegates to a
//! [`GtdCommandService`], so malformed input never reaches the service layer.

use serde::Deserialize;

use nextaction_core::domain::task::TaskStatus;
use nextaction_core::errors::ApplicationError;
use nextaction_core::id::new_record_id;

use crate::blocks::{error_message, help_message, MessageTemplate};

/// The form-encoded body Slack posts to the slash command endpoint.
#[derive(Clone, Debug, Deserialize)]
pub struct SlashCommandPayload {
    pub team_id: String,
    pub user_id: String,
    pub command: String,
    #[serde(default)]
    pub text: String,
    pub response_url: String,
    pub trigger_id: String,
    pub channel_id: String,
}

/// Who issued the command. Passed through to the service so every
/// operation stays owner scoped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Caller {
    pub user_id: String,
    pub team_id: String,
}

impl From<&SlashCommandPayload> for Caller {
    fn from(payload: &SlashCommandPayload) -> Self {
        Self { user_id: payload.user_id.clone(), team_id: payload.team_id.clone() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GtdCommand {
    Add { title: String },
    List { filter: Option<TaskStatus> },
    Complete { id: String },
    Delete { id: String },
    AddProject { name: String },
    Projects,
    AddContext { name: String },
    Contexts,
    Export,
    Help,
    Malformed { hint: &'static str },
    Unknown { verb: String },
}

/// Splits the command text into a verb and its argument remainder. The verb
/// is lowercased; the argument keeps its original casing.
pub fn classify(text: &str) -> GtdCommand {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return GtdCommand::Help;
    }

    let (verb, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb.to_ascii_lowercase(), rest.trim()),
        None => (trimmed.to_ascii_lowercase(), ""),
    };

    match verb.as_str() {
        "add" => {
            if rest.is_empty() {
                GtdCommand::Malformed { hint: "Usage: `/gtd add <title>`" }
            } else {
                GtdCommand::Add { title: rest.to_owned() }
            }
        }
        "list" => {
            if rest.is_empty() {
                GtdCommand::List { filter: None }
            } else {
                match TaskStatus::parse(&rest.to_ascii_lowercase()) {
                    Some(status) => GtdCommand::List { filter: Some(status) },
                    None => GtdCommand::Malformed {
                        hint: "Usage: `/gtd list [inbox|active|waiting|someday|completed|archived]`",
                    },
                }
            }
        }
        "complete" | "done" => {
            if rest.is_empty() {
                GtdCommand::Malformed { hint: "Usage: `/gtd complete <task id>`" }
            } else {
                GtdCommand::Complete { id: rest.to_owned() }
            }
        }
        "delete" | "rm" => {
            if rest.is_empty() {
                GtdCommand::Malformed { hint: "Usage: `/gtd delete <task id>`" }
            } else {
                GtdCommand::Delete { id: rest.to_owned() }
            }
        }
        "add-project" => {
            if rest.is_empty() {
                GtdCommand::Malformed { hint: "Usage: `/gtd add-project <name>`" }
            } else {
                GtdCommand::AddProject { name: rest.to_owned() }
            }
        }
        "projects" => GtdCommand::Projects,
        "add-context" => {
            if rest.is_empty() {
                GtdCommand::Malformed { hint: "Usage: `/gtd add-context <name>`" }
            } else {
                GtdCommand::AddContext { name: rest.to_owned() }
            }
        }
        "contexts" => GtdCommand::Contexts,
        "export" => GtdCommand::Export,
        "help" => GtdCommand::Help,
        _ => GtdCommand::Unknown { verb },
    }
}

/// Application operations behind the slash command surface. Each returns the
/// ephemeral response to show the caller.
#[async_trait::async_trait]
pub trait GtdCommandService: Send + Sync {
    async fn add_task(
        &self,
        caller: &Caller,
        title: &str,
    ) -> Result<MessageTemplate, ApplicationError>;

    async fn list_tasks(
        &self,
        caller: &Caller,
        filter: Option<TaskStatus>,
    ) -> Result<MessageTemplate, ApplicationError>;

    async fn complete_task(
        &self,
        caller: &Caller,
        task_id: &str,
    ) -> Result<MessageTemplate, ApplicationError>;

    async fn delete_task(
        &self,
        caller: &Caller,
        task_id: &str,
    ) -> Result<MessageTemplate, ApplicationError>;

    async fn add_project(
        &self,
        caller: &Caller,
        name: &str,
    ) -> Result<MessageTemplate, ApplicationError>;

    async fn list_projects(&self, caller: &Caller) -> Result<MessageTemplate, ApplicationError>;

    async fn add_context(
        &self,
        caller: &Caller,
        name: &str,
    ) -> Result<MessageTemplate, ApplicationError>;

    async fn list_contexts(&self, caller: &Caller) -> Result<MessageTemplate, ApplicationError>;

    async fn export_link(&self, caller: &Caller) -> Result<MessageTemplate, ApplicationError>;
}

pub struct CommandRouter<S: GtdCommandService> {
    service: S,
}

impl<S: GtdCommandService> CommandRouter<S> {
    pub fn new(service: S) -> Self {
        Self { service }
    }

    /// Never fails: service errors are rendered as an ephemeral error
    /// message carrying a fresh correlation id.
    pub async fn dispatch(&self, payload: &SlashCommandPayload) -> MessageTemplate {
        let caller = Caller::from(payload);
        let command = classify(&payload.text);

        let outcome = match &command {
            GtdCommand::Add { title } => self.service.add_task(&caller, title).await,
            GtdCommand::List { filter } => self.service.list_tasks(&caller, *filter).await,
            GtdCommand::Complete { id } => self.service.complete_task(&caller, id).await,
            GtdCommand::Delete { id } => self.service.delete_task(&caller, id).await,
            GtdCommand::AddProject { name } => self.service.add_project(&caller, name).await,
            GtdCommand::Projects => self.service.list_projects(&caller).await,
            GtdCommand::AddContext { name } => self.service.add_context(&caller, name).await,
            GtdCommand::Contexts => self.service.list_contexts(&caller).await,
            GtdCommand::Export => self.service.export_link(&caller).await,
            GtdCommand::Help => return help_message(),
            GtdCommand::Malformed { hint } => return usage_message(hint),
            GtdCommand::Unknown { verb } => return unknown_verb_message(verb),
        };

        match outcome {
            Ok(message) => message,
            Err(error) => {
                let correlation_id = new_record_id();
                tracing::error!(
                    correlation_id = %correlation_id,
                    user_id = %caller.user_id,
                    error = %error,
                    "slash command failed"
                );
                let interface = error.into_interface(correlation_id.clone());
                error_message(interface.user_message(), &correlation_id)
            }
        }
    }
}

fn usage_message(hint: &str) -> MessageTemplate {
    crate::blocks::MessageBuilder::new("Invalid command")
        .section("gtd_usage", |section| {
            section.mrkdwn(hint.to_owned());
        })
        .build()
}

fn unknown_verb_message(verb: &str) -> MessageTemplate {
    crate::blocks::MessageBuilder::new(format!("Unknown command: {verb}"))
        .section("gtd_unknown", |section| {
            section.mrkdwn(format!("Unknown command `{verb}`. Try `/gtd help`."));
        })
        .build()
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use nextaction_core::domain::task::TaskStatus;
    use nextaction_core::errors::ApplicationError;

    use super::{classify, Caller, CommandRouter, GtdCommand, GtdCommandService, SlashCommandPayload};
    use crate::blocks::{MessageBuilder, MessageTemplate, TextObject};

    fn payload(text: &str) -> SlashCommandPayload {
        SlashCommandPayload {
            team_id: "T001".to_owned(),
            user_id: "U1".to_owned(),
            command: "/gtd".to_owned(),
            text: text.to_owned(),
            response_url: "https://hooks.slack.test/resp".to_owned(),
            trigger_id: "trig-1".to_owned(),
            channel_id: "D001".to_owned(),
        }
    }

    fn stub_message(label: &str) -> MessageTemplate {
        MessageBuilder::new(label.to_owned()).build()
    }

    /// Records which service method handled each dispatch.
    #[derive(Default)]
    struct RecordingService {
        calls: Mutex<Vec<&'static str>>,
        fail_next: bool,
    }

    impl RecordingService {
        fn record(&self, call: &'static str) -> Result<MessageTemplate, ApplicationError> {
            self.calls.lock().unwrap().push(call);
            if self.fail_next {
                Err(ApplicationError::Persistence("database is locked".to_owned()))
            } else {
                Ok(stub_message(call))
            }
        }
    }

    #[async_trait::async_trait]
    impl GtdCommandService for RecordingService {
        async fn add_task(
            &self,
            _caller: &Caller,
            _title: &str,
        ) -> Result<MessageTemplate, ApplicationError> {
            self.record("add_task")
        }

        async fn list_tasks(
            &self,
            _caller: &Caller,
            _filter: Option<TaskStatus>,
        ) -> Result<MessageTemplate, ApplicationError> {
            self.record("list_tasks")
        }

        async fn complete_task(
            &self,
            _caller: &Caller,
            _task_id: &str,
        ) -> Result<MessageTemplate, ApplicationError> {
            self.record("complete_task")
        }

        async fn delete_task(
            &self,
            _caller: &Caller,
            _task_id: &str,
        ) -> Result<MessageTemplate, ApplicationError> {
            self.record("delete_task")
        }

        async fn add_project(
            &self,
            _caller: &Caller,
            _name: &str,
        ) -> Result<MessageTemplate, ApplicationError> {
            self.record("add_project")
        }

        async fn list_projects(
            &self,
            _caller: &Caller,
        ) -> Result<MessageTemplate, ApplicationError> {
            self.record("list_projects")
        }

        async fn add_context(
            &self,
            _caller: &Caller,
            _name: &str,
        ) -> Result<MessageTemplate, ApplicationError> {
            self.record("add_context")
        }

        async fn list_contexts(
            &self,
            _caller: &Caller,
        ) -> Result<MessageTemplate, ApplicationError> {
            self.record("list_contexts")
        }

        async fn export_link(&self, _caller: &Caller) -> Result<MessageTemplate, ApplicationError> {
            self.record("export_link")
        }
    }

    #[test]
    fn classify_recognizes_every_verb() {
        assert_eq!(
            classify("add Water the plants"),
            GtdCommand::Add { title: "Water the plants".to_owned() }
        );
        assert_eq!(classify("list"), GtdCommand::List { filter: None });
        assert_eq!(
            classify("list waiting"),
            GtdCommand::List { filter: Some(TaskStatus::Waiting) }
        );
        assert_eq!(classify("complete a1b2c3d4"), GtdCommand::Complete { id: "a1b2c3d4".to_owned() });
        assert_eq!(classify("delete a1b2c3d4"), GtdCommand::Delete { id: "a1b2c3d4".to_owned() });
        assert_eq!(
            classify("add-project Apartment move"),
            GtdCommand::AddProject { name: "Apartment move".to_owned() }
        );
        assert_eq!(classify("projects"), GtdCommand::Projects);
        assert_eq!(
            classify("add-context @errands"),
            GtdCommand::AddContext { name: "@errands".to_owned() }
        );
        assert_eq!(classify("contexts"), GtdCommand::Contexts);
        assert_eq!(classify("export"), GtdCommand::Export);
        assert_eq!(classify("help"), GtdCommand::Help);
    }

    #[test]
    fn classify_is_case_insensitive_on_the_verb_but_not_the_argument() {
        assert_eq!(
            classify("ADD Buy Milk"),
            GtdCommand::Add { title: "Buy Milk".to_owned() }
        );
        assert_eq!(classify("List ACTIVE"), GtdCommand::List { filter: Some(TaskStatus::Active) });
    }

    #[test]
    fn classify_flags_missing_arguments_and_bad_filters() {
        assert!(matches!(classify("add"), GtdCommand::Malformed { .. }));
        assert!(matches!(classify("add   "), GtdCommand::Malformed { .. }));
        assert!(matches!(classify("complete"), GtdCommand::Malformed { .. }));
        assert!(matches!(classify("list urgent"), GtdCommand::Malformed { .. }));
        assert!(matches!(classify("frobnicate"), GtdCommand::Unknown { .. }));
        assert_eq!(classify(""), GtdCommand::Help);
        assert_eq!(classify("   "), GtdCommand::Help);
    }

    #[tokio::test]
    async fn dispatch_routes_each_verb_to_its_service_method() {
        let router = CommandRouter::new(RecordingService::default());

        for (text, expected) in [
            ("add Buy milk", "add_task"),
            ("list", "list_tasks"),
            ("complete a1b2c3d4", "complete_task"),
            ("delete a1b2c3d4", "delete_task"),
            ("add-project Move", "add_project"),
            ("projects", "list_projects"),
            ("add-context @home", "add_context"),
            ("contexts", "list_contexts"),
            ("export", "export_link"),
        ] {
            let response = router.dispatch(&payload(text)).await;
            assert_eq!(response.fallback_text, expected);
        }

        let calls = router.service.calls.lock().unwrap();
        assert_eq!(calls.len(), 9);
    }

    #[tokio::test]
    async fn dispatch_answers_help_without_touching_the_service() {
        let router = CommandRouter::new(RecordingService::default());

        let response = router.dispatch(&payload("help")).await;
        assert_eq!(response.fallback_text, "GTD command help");
        assert!(router.service.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn dispatch_renders_service_errors_as_ephemeral_error_messages() {
        let service = RecordingService { fail_next: true, ..RecordingService::default() };
        let router = CommandRouter::new(service);

        let response = router.dispatch(&payload("add Buy milk")).await;
        assert!(matches!(
            &response.blocks[0],
            crate::blocks::Block::Section { text: TextObject::Mrkdwn { text }, .. }
                if text.contains("temporarily unavailable")
        ));
    }
}

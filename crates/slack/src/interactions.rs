//! Interactivity payload decoding.
//!
//! Slack posts one JSON document for every button press, overflow pick,
//! shortcut, and modal submit. This module turns that document into typed
//! envelopes before any application code runs: unknown shapes fall out as
//! [`Interaction::Unsupported`] instead of panicking deep in a handler.
//!
//! Action ids and callback ids here mirror exactly what the renderers in
//! [`crate::blocks`] emit.

use std::collections::BTreeMap;

use serde_json::Value;

use nextaction_core::domain::patch::Patch;
use nextaction_core::domain::task::MoveTarget;

/// Destination picked in the move modal. "Next actions" and "scheduled"
/// both land in the active list; scheduled additionally carries a due date.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveChoice {
    NextActions,
    Scheduled,
    Waiting,
    Someday,
}

impl MoveChoice {
    pub fn target(self) -> MoveTarget {
        match self {
            Self::NextActions | Self::Scheduled => MoveTarget::Active,
            Self::Waiting => MoveTarget::Waiting,
            Self::Someday => MoveTarget::Someday,
        }
    }
}

/// Message shortcut registered in the app manifest.
pub const CREATE_TASK_SHORTCUT: &str = "create_gtd_task";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Actor {
    pub user_id: String,
    pub team_id: String,
}

/// A block action decoded to its verb and subject.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskAction {
    Complete { task_id: String },
    Delete { task_id: String },
    Edit { task_id: String },
    Move { task_id: String },
    SetPriority { task_id: String },
    Activate { task_id: String },
    ClarifyActionable { task_id: String },
    ClarifyNotActionable { task_id: String },
    OpenAddTask,
    OpenAddProject,
    OpenAddContext,
    OpenReviewDone,
}

/// What a `view_submission` callback id resolves to. Per-task modals carry
/// the task id as a callback id suffix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Submission {
    AddTask,
    AddProject,
    AddContext,
    CreateTaskFromMessage,
    Actionable { task_id: String },
    NotActionable { task_id: String },
    MoveTask { task_id: String },
    EditTask { task_id: String },
    SetPriority { task_id: String },
    DeleteConfirmation { task_id: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Interaction {
    BlockAction {
        actor: Actor,
        trigger_id: String,
        action: TaskAction,
    },
    ViewSubmission {
        actor: Actor,
        submission: Submission,
        form: FormState,
        private_metadata: Option<String>,
    },
    MessageShortcut {
        actor: Actor,
        trigger_id: String,
        message_text: String,
        channel_id: Option<String>,
    },
    Unsupported,
}

/// Decode the `payload` JSON document from an interactivity POST.
pub fn parse_interaction(payload: &Value) -> Interaction {
    let Some(actor) = parse_actor(payload) else {
        return Interaction::Unsupported;
    };

    match payload.get("type").and_then(Value::as_str) {
        Some("block_actions") => parse_block_action(payload, actor),
        Some("view_submission") => parse_view_submission(payload, actor),
        Some("message_action") => parse_message_shortcut(payload, actor),
        _ => Interaction::Unsupported,
    }
}

fn parse_actor(payload: &Value) -> Option<Actor> {
    let user = payload.get("user")?;
    let user_id = user.get("id")?.as_str()?.to_owned();
    let team_id = user
        .get("team_id")
        .or_else(|| payload.get("team").and_then(|t| t.get("id")))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();
    Some(Actor { user_id, team_id })
}

fn parse_block_action(payload: &Value, actor: Actor) -> Interaction {
    let trigger_id =
        payload.get("trigger_id").and_then(Value::as_str).unwrap_or_default().to_owned();

    let Some(first) = payload.get("actions").and_then(|a| a.get(0)) else {
        return Interaction::Unsupported;
    };
    let Some(action_id) = first.get("action_id").and_then(Value::as_str) else {
        return Interaction::Unsupported;
    };
    // Buttons put the value at the top level, overflow picks nest it under
    // selected_option.
    let value = first
        .get("selected_option")
        .and_then(|o| o.get("value"))
        .or_else(|| first.get("value"))
        .and_then(Value::as_str);

    match parse_task_action(action_id, value) {
        Some(action) => Interaction::BlockAction { actor, trigger_id, action },
        None => Interaction::Unsupported,
    }
}

/// Resolve an action id (plus the overflow value, when present) to a verb.
pub fn parse_task_action(action_id: &str, value: Option<&str>) -> Option<TaskAction> {
    match action_id {
        "open_add_task_modal" => return Some(TaskAction::OpenAddTask),
        "open_add_project_modal" => return Some(TaskAction::OpenAddProject),
        "open_add_context_modal" => return Some(TaskAction::OpenAddContext),
        "open_review_done_modal" => return Some(TaskAction::OpenReviewDone),
        _ => {}
    }

    if let Some(task_id) = action_id.strip_prefix("clarify_actionable_") {
        return Some(TaskAction::ClarifyActionable { task_id: task_id.to_owned() });
    }
    if let Some(task_id) = action_id.strip_prefix("clarify_not_actionable_") {
        return Some(TaskAction::ClarifyNotActionable { task_id: task_id.to_owned() });
    }

    if action_id.strip_prefix("task_overflow_").is_some() {
        let (verb, task_id) = value?.split_once(':')?;
        let task_id = task_id.to_owned();
        return match verb {
            "complete" => Some(TaskAction::Complete { task_id }),
            "delete" => Some(TaskAction::Delete { task_id }),
            "edit" => Some(TaskAction::Edit { task_id }),
            "move" => Some(TaskAction::Move { task_id }),
            "priority" => Some(TaskAction::SetPriority { task_id }),
            "activate" => Some(TaskAction::Activate { task_id }),
            _ => None,
        };
    }

    None
}

fn parse_view_submission(payload: &Value, actor: Actor) -> Interaction {
    let Some(view) = payload.get("view") else {
        return Interaction::Unsupported;
    };
    let Some(callback_id) = view.get("callback_id").and_then(Value::as_str) else {
        return Interaction::Unsupported;
    };
    let Some(submission) = parse_submission(callback_id) else {
        return Interaction::Unsupported;
    };

    let private_metadata = view
        .get("private_metadata")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .map(str::to_owned);

    let values = view
        .get("state")
        .and_then(|s| s.get("values"))
        .cloned()
        .unwrap_or(Value::Null);

    Interaction::ViewSubmission { actor, submission, form: FormState::new(values), private_metadata }
}

pub fn parse_submission(callback_id: &str) -> Option<Submission> {
    match callback_id {
        "add_task_modal" => return Some(Submission::AddTask),
        "add_project_modal" => return Some(Submission::AddProject),
        "add_context_modal" => return Some(Submission::AddContext),
        "create_task_from_message_modal" => return Some(Submission::CreateTaskFromMessage),
        _ => {}
    }

    type Make = fn(String) -> Submission;
    let suffixed: [(&str, Make); 6] = [
        ("not_actionable_modal_", |task_id| Submission::NotActionable { task_id }),
        ("actionable_modal_", |task_id| Submission::Actionable { task_id }),
        ("move_task_modal_", |task_id| Submission::MoveTask { task_id }),
        ("edit_task_modal_", |task_id| Submission::EditTask { task_id }),
        ("set_priority_modal_", |task_id| Submission::SetPriority { task_id }),
        ("delete_confirmation_modal_", |task_id| Submission::DeleteConfirmation { task_id }),
    ];

    for (prefix, make) in suffixed {
        if let Some(task_id) = callback_id.strip_prefix(prefix) {
            if task_id.is_empty() {
                return None;
            }
            return Some(make(task_id.to_owned()));
        }
    }
    None
}

fn parse_message_shortcut(payload: &Value, actor: Actor) -> Interaction {
    let callback_id = payload.get("callback_id").and_then(Value::as_str).unwrap_or_default();
    if callback_id != CREATE_TASK_SHORTCUT {
        return Interaction::Unsupported;
    }

    let trigger_id =
        payload.get("trigger_id").and_then(Value::as_str).unwrap_or_default().to_owned();
    let message_text = payload
        .get("message")
        .and_then(|m| m.get("text"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();
    let channel_id = payload
        .get("channel")
        .and_then(|c| c.get("id"))
        .and_then(Value::as_str)
        .map(str::to_owned);

    Interaction::MessageShortcut { actor, trigger_id, message_text, channel_id }
}

/// Typed access over a submitted view's `state.values` tree.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FormState {
    values: Value,
}

impl FormState {
    pub fn new(values: Value) -> Self {
        Self { values }
    }

    fn field(&self, block_id: &str, action_id: &str) -> Option<&Value> {
        self.values.get(block_id)?.get(action_id)
    }

    /// Trimmed value of a plain text input; empty inputs read as absent.
    pub fn text(&self, block_id: &str, action_id: &str) -> Option<String> {
        let raw = self.field(block_id, action_id)?.get("value")?.as_str()?;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_owned())
        }
    }

    /// Value of the chosen option in a static select.
    pub fn selected(&self, block_id: &str, action_id: &str) -> Option<String> {
        self.field(block_id, action_id)?
            .get("selected_option")?
            .get("value")?
            .as_str()
            .map(str::to_owned)
    }

    /// A datepicker's `selected_date`, in `YYYY-MM-DD` form.
    pub fn date(&self, block_id: &str, action_id: &str) -> Option<String> {
        self.field(block_id, action_id)?
            .get("selected_date")?
            .as_str()
            .map(str::to_owned)
    }

    /// A datepicker read with keep/clear/set semantics. A block that was
    /// never rendered reads as `Keep`; a rendered picker with no date
    /// reads as `Clear`.
    pub fn date_patch(&self, block_id: &str, action_id: &str) -> Patch<String> {
        match self.field(block_id, action_id) {
            None => Patch::Keep,
            Some(field) => match field.get("selected_date").and_then(Value::as_str) {
                Some(date) => Patch::Set(date.to_owned()),
                None => Patch::Clear,
            },
        }
    }

    /// The move modal's destination list, already narrowed to the legal set.
    pub fn move_choice(&self, block_id: &str, action_id: &str) -> Option<MoveChoice> {
        match self.selected(block_id, action_id)?.as_str() {
            "active" => Some(MoveChoice::NextActions),
            "scheduled" => Some(MoveChoice::Scheduled),
            "waiting" => Some(MoveChoice::Waiting),
            "someday" => Some(MoveChoice::Someday),
            _ => None,
        }
    }
}

/// What to send back in the HTTP response to a `view_submission`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmissionResponse {
    /// Empty 200; Slack closes the modal.
    Close,
    /// Keep the modal open and attach per-block validation errors.
    Errors(BTreeMap<String, String>),
}

impl SubmissionResponse {
    pub fn error(block_id: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = BTreeMap::new();
        errors.insert(block_id.into(), message.into());
        Self::Errors(errors)
    }

    pub fn to_body(&self) -> Option<Value> {
        match self {
            Self::Close => None,
            Self::Errors(errors) => Some(serde_json::json!({
                "response_action": "errors",
                "errors": errors,
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use nextaction_core::domain::patch::Patch;
    use nextaction_core::domain::task::{MoveTarget, Priority};

    use super::{
        parse_interaction, parse_submission, parse_task_action, FormState, Interaction, MoveChoice,
        Submission, SubmissionResponse, TaskAction,
    };
    use crate::blocks::{home_view, Block, Element, HomeSnapshot, TaskLine};

    fn line(id: &str) -> TaskLine {
        TaskLine {
            id: id.to_owned(),
            title: "t".to_owned(),
            priority: Priority::Medium,
            due_label: None,
            project_name: None,
            context_name: None,
            delegated_to: None,
        }
    }

    #[test]
    fn every_action_id_the_home_tab_renders_is_parseable() {
        let snapshot = HomeSnapshot {
            inbox: vec![line("aaaa1111")],
            next_actions: vec![line("bbbb2222")],
            someday: vec![line("cccc3333")],
            ..HomeSnapshot::default()
        };

        for block in home_view(&snapshot).blocks {
            match block {
                Block::Actions { elements, .. } => {
                    for element in elements {
                        assert!(
                            parse_task_action(element.action_id(), None).is_some(),
                            "unparseable action id {}",
                            element.action_id()
                        );
                    }
                }
                Block::Section {
                    accessory: Some(Element::Overflow { action_id, options }),
                    ..
                } => {
                    for option in options {
                        assert!(
                            parse_task_action(&action_id, Some(&option.value)).is_some(),
                            "unparseable overflow value {}",
                            option.value
                        );
                    }
                }
                _ => {}
            }
        }
    }

    #[test]
    fn overflow_values_resolve_to_verbs_with_the_task_id() {
        assert_eq!(
            parse_task_action("task_overflow_aaaa1111", Some("complete:aaaa1111")),
            Some(TaskAction::Complete { task_id: "aaaa1111".to_owned() })
        );
        assert_eq!(
            parse_task_action("task_overflow_cccc3333", Some("activate:cccc3333")),
            Some(TaskAction::Activate { task_id: "cccc3333".to_owned() })
        );
        assert_eq!(parse_task_action("task_overflow_aaaa1111", Some("explode:aaaa1111")), None);
        assert_eq!(parse_task_action("task_overflow_aaaa1111", None), None);
    }

    #[test]
    fn clarify_prefixes_do_not_shadow_each_other() {
        assert_eq!(
            parse_task_action("clarify_not_actionable_aaaa1111", None),
            Some(TaskAction::ClarifyNotActionable { task_id: "aaaa1111".to_owned() })
        );
        assert_eq!(
            parse_task_action("clarify_actionable_aaaa1111", None),
            Some(TaskAction::ClarifyActionable { task_id: "aaaa1111".to_owned() })
        );
    }

    #[test]
    fn callback_ids_with_suffixes_resolve_to_their_modal_kind() {
        assert_eq!(parse_submission("add_task_modal"), Some(Submission::AddTask));
        assert_eq!(
            parse_submission("not_actionable_modal_aaaa1111"),
            Some(Submission::NotActionable { task_id: "aaaa1111".to_owned() })
        );
        assert_eq!(
            parse_submission("actionable_modal_aaaa1111"),
            Some(Submission::Actionable { task_id: "aaaa1111".to_owned() })
        );
        assert_eq!(
            parse_submission("delete_confirmation_modal_zz99"),
            Some(Submission::DeleteConfirmation { task_id: "zz99".to_owned() })
        );
        assert_eq!(parse_submission("actionable_modal_"), None);
        assert_eq!(parse_submission("mystery_modal"), None);
    }

    #[test]
    fn block_action_payloads_decode_from_button_and_overflow_shapes() {
        let button = json!({
            "type": "block_actions",
            "user": { "id": "U1", "team_id": "T001" },
            "trigger_id": "trig-1",
            "actions": [
                { "action_id": "clarify_actionable_aaaa1111", "value": "aaaa1111" }
            ]
        });
        assert_eq!(
            parse_interaction(&button),
            Interaction::BlockAction {
                actor: super::Actor { user_id: "U1".to_owned(), team_id: "T001".to_owned() },
                trigger_id: "trig-1".to_owned(),
                action: TaskAction::ClarifyActionable { task_id: "aaaa1111".to_owned() },
            }
        );

        let overflow = json!({
            "type": "block_actions",
            "user": { "id": "U1", "team_id": "T001" },
            "trigger_id": "trig-2",
            "actions": [
                {
                    "action_id": "task_overflow_bbbb2222",
                    "selected_option": { "value": "delete:bbbb2222" }
                }
            ]
        });
        assert!(matches!(
            parse_interaction(&overflow),
            Interaction::BlockAction { action: TaskAction::Delete { task_id }, .. }
                if task_id == "bbbb2222"
        ));
    }

    #[test]
    fn view_submission_payloads_carry_the_form_state() {
        let payload = json!({
            "type": "view_submission",
            "user": { "id": "U1", "team_id": "T001" },
            "view": {
                "callback_id": "add_task_modal",
                "private_metadata": "",
                "state": {
                    "values": {
                        "title_block": {
                            "title_input": { "type": "plain_text_input", "value": "  Buy milk  " }
                        },
                        "priority_block": {
                            "priority_select": {
                                "type": "static_select",
                                "selected_option": { "value": "high" }
                            }
                        },
                        "due_date_block": {
                            "due_date_input": { "type": "datepicker", "selected_date": "2026-09-01" }
                        }
                    }
                }
            }
        });

        let Interaction::ViewSubmission { submission, form, private_metadata, .. } =
            parse_interaction(&payload)
        else {
            panic!("expected view submission");
        };

        assert_eq!(submission, Submission::AddTask);
        assert_eq!(private_metadata, None);
        assert_eq!(form.text("title_block", "title_input"), Some("Buy milk".to_owned()));
        assert_eq!(form.selected("priority_block", "priority_select"), Some("high".to_owned()));
        assert_eq!(form.date("due_date_block", "due_date_input"), Some("2026-09-01".to_owned()));
        assert_eq!(form.text("description_block", "description_input"), None);
    }

    #[test]
    fn move_choice_selection_rejects_values_outside_the_legal_set() {
        let form = FormState::new(json!({
            "target_block": {
                "target_select": {
                    "selected_option": { "value": "waiting" }
                }
            },
            "scheduled_block": {
                "target_select": {
                    "selected_option": { "value": "scheduled" }
                }
            },
            "bogus_block": {
                "target_select": {
                    "selected_option": { "value": "completed" }
                }
            }
        }));

        assert_eq!(form.move_choice("target_block", "target_select"), Some(MoveChoice::Waiting));
        assert_eq!(
            form.move_choice("scheduled_block", "target_select"),
            Some(MoveChoice::Scheduled)
        );
        assert_eq!(form.move_choice("bogus_block", "target_select"), None);
    }

    #[test]
    fn scheduled_and_next_actions_both_land_in_the_active_list() {
        assert_eq!(MoveChoice::NextActions.target(), MoveTarget::Active);
        assert_eq!(MoveChoice::Scheduled.target(), MoveTarget::Active);
        assert_eq!(MoveChoice::Waiting.target(), MoveTarget::Waiting);
        assert_eq!(MoveChoice::Someday.target(), MoveTarget::Someday);
    }

    #[test]
    fn date_patch_distinguishes_absent_cleared_and_picked() {
        let form = FormState::new(json!({
            "due_date_block": {
                "due_date_input": { "type": "datepicker", "selected_date": "2026-09-01" }
            },
            "cleared_block": {
                "due_date_input": { "type": "datepicker", "selected_date": null }
            }
        }));

        assert_eq!(
            form.date_patch("due_date_block", "due_date_input"),
            Patch::Set("2026-09-01".to_owned())
        );
        assert_eq!(form.date_patch("cleared_block", "due_date_input"), Patch::Clear);
        assert_eq!(form.date_patch("missing_block", "due_date_input"), Patch::Keep);
    }

    #[test]
    fn message_shortcut_decodes_source_text_and_channel() {
        let payload = json!({
            "type": "message_action",
            "callback_id": "create_gtd_task",
            "user": { "id": "U1", "team_id": "T001" },
            "trigger_id": "trig-3",
            "channel": { "id": "C123" },
            "message": { "text": "Can you review the Q3 numbers?" }
        });

        let Interaction::MessageShortcut { message_text, channel_id, .. } =
            parse_interaction(&payload)
        else {
            panic!("expected message shortcut");
        };
        assert_eq!(message_text, "Can you review the Q3 numbers?");
        assert_eq!(channel_id, Some("C123".to_owned()));
    }

    #[test]
    fn unknown_payload_types_are_unsupported_not_errors() {
        assert_eq!(
            parse_interaction(&json!({ "type": "dialog_submission", "user": { "id": "U1" } })),
            Interaction::Unsupported
        );
        assert_eq!(parse_interaction(&json!({ "type": "block_actions" })), Interaction::Unsupported);
    }

    #[test]
    fn validation_errors_serialize_as_a_response_action() {
        let response = SubmissionResponse::error("title_block", "Title is required");
        let body = response.to_body().expect("body");
        assert_eq!(body["response_action"], "errors");
        assert_eq!(body["errors"]["title_block"], "Title is required");

        assert_eq!(SubmissionResponse::Close.to_body(), None);
    }
}

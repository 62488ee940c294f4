//! Typed Block Kit documents. Everything here is pure construction; the
//! notifier serializes these to the Slack wire format.

use serde::Serialize;

use nextaction_core::domain::task::{EnergyLevel, Priority, TimeEstimate};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum TextObject {
    #[serde(rename = "plain_text")]
    Plain { text: String },
    #[serde(rename = "mrkdwn")]
    Mrkdwn { text: String },
}

impl TextObject {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Plain { text: text.into() }
    }

    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Plain { text } | Self::Mrkdwn { text } => text,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonStyle {
    Primary,
    Danger,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    pub text: TextObject,
    pub value: String,
}

impl SelectOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self { text: TextObject::plain(label), value: value.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Element {
    Button {
        action_id: String,
        text: TextObject,
        #[serde(skip_serializing_if = "Option::is_none")]
        style: Option<ButtonStyle>,
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<String>,
    },
    Overflow {
        action_id: String,
        options: Vec<SelectOption>,
    },
    StaticSelect {
        action_id: String,
        placeholder: TextObject,
        options: Vec<SelectOption>,
        #[serde(skip_serializing_if = "Option::is_none")]
        initial_option: Option<SelectOption>,
    },
    PlainTextInput {
        action_id: String,
        multiline: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        initial_value: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        placeholder: Option<TextObject>,
    },
    Datepicker {
        action_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        initial_date: Option<String>,
    },
}

impl Element {
    pub fn button(action_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self::Button {
            action_id: action_id.into(),
            text: TextObject::plain(label),
            style: None,
            value: None,
        }
    }

    pub fn styled(mut self, new_style: ButtonStyle) -> Self {
        if let Self::Button { style, .. } = &mut self {
            *style = Some(new_style);
        }
        self
    }

    pub fn with_value(mut self, new_value: impl Into<String>) -> Self {
        if let Self::Button { value, .. } = &mut self {
            *value = Some(new_value.into());
        }
        self
    }

    pub fn action_id(&self) -> &str {
        match self {
            Self::Button { action_id, .. }
            | Self::Overflow { action_id, .. }
            | Self::StaticSelect { action_id, .. }
            | Self::PlainTextInput { action_id, .. }
            | Self::Datepicker { action_id, .. } => action_id,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Header {
        text: TextObject,
    },
    Section {
        block_id: String,
        text: TextObject,
        #[serde(skip_serializing_if = "Option::is_none")]
        accessory: Option<Element>,
    },
    Actions {
        block_id: String,
        elements: Vec<Element>,
    },
    Context {
        block_id: String,
        elements: Vec<TextObject>,
    },
    Divider {},
    Input {
        block_id: String,
        label: TextObject,
        element: Element,
        optional: bool,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageTemplate {
    pub fallback_text: String,
    pub blocks: Vec<Block>,
}

pub struct MessageBuilder {
    fallback_text: String,
    blocks: Vec<Block>,
}

impl MessageBuilder {
    pub fn new(fallback_text: impl Into<String>) -> Self {
        Self { fallback_text: fallback_text.into(), blocks: Vec::new() }
    }

    pub fn header(mut self, text: impl Into<String>) -> Self {
        self.blocks.push(Block::Header { text: TextObject::plain(text) });
        self
    }

    pub fn section<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut SectionBuilder),
    {
        let mut builder = SectionBuilder::default();
        build(&mut builder);
        let (text, accessory) = builder.build();
        self.blocks.push(Block::Section { block_id: block_id.into(), text, accessory });
        self
    }

    pub fn actions<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut ActionsBuilder),
    {
        let mut builder = ActionsBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Actions { block_id: block_id.into(), elements: builder.build() });
        self
    }

    pub fn context<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut ContextBuilder),
    {
        let mut builder = ContextBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Context { block_id: block_id.into(), elements: builder.build() });
        self
    }

    pub fn divider(mut self) -> Self {
        self.blocks.push(Block::Divider {});
        self
    }

    pub fn build(self) -> MessageTemplate {
        MessageTemplate { fallback_text: self.fallback_text, blocks: self.blocks }
    }
}

#[derive(Default)]
pub struct SectionBuilder {
    text: Option<TextObject>,
    accessory: Option<Element>,
}

impl SectionBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::plain(text));
        self
    }

    pub fn mrkdwn(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::mrkdwn(text));
        self
    }

    pub fn accessory(&mut self, element: Element) -> &mut Self {
        self.accessory = Some(element);
        self
    }

    fn build(self) -> (TextObject, Option<Element>) {
        (self.text.unwrap_or_else(|| TextObject::plain("")), self.accessory)
    }
}

#[derive(Default)]
pub struct ActionsBuilder {
    elements: Vec<Element>,
}

impl ActionsBuilder {
    pub fn element(&mut self, element: Element) -> &mut Self {
        self.elements.push(element);
        self
    }

    fn build(self) -> Vec<Element> {
        self.elements
    }
}

#[derive(Default)]
pub struct ContextBuilder {
    elements: Vec<TextObject>,
}

impl ContextBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.elements.push(TextObject::plain(text));
        self
    }

    pub fn mrkdwn(&mut self, text: impl Into<String>) -> &mut Self {
        self.elements.push(TextObject::mrkdwn(text));
        self
    }

    fn build(self) -> Vec<TextObject> {
        self.elements
    }
}

/// A `view` payload for `views.open` / `views.push` / `views.update`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ModalView {
    #[serde(rename = "type")]
    pub view_type: &'static str,
    pub callback_id: String,
    pub title: TextObject,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submit: Option<TextObject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub close: Option<TextObject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_metadata: Option<String>,
    pub blocks: Vec<Block>,
}

impl ModalView {
    pub fn new(callback_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            view_type: "modal",
            callback_id: callback_id.into(),
            title: TextObject::plain(title),
            submit: Some(TextObject::plain("Submit")),
            close: Some(TextObject::plain("Cancel")),
            private_metadata: None,
            blocks: Vec::new(),
        }
    }

    pub fn submit_label(mut self, label: impl Into<String>) -> Self {
        self.submit = Some(TextObject::plain(label));
        self
    }

    pub fn metadata(mut self, metadata: impl Into<String>) -> Self {
        self.private_metadata = Some(metadata.into());
        self
    }

    pub fn input(
        mut self,
        block_id: impl Into<String>,
        label: impl Into<String>,
        element: Element,
        optional: bool,
    ) -> Self {
        self.blocks.push(Block::Input {
            block_id: block_id.into(),
            label: TextObject::plain(label),
            element,
            optional,
        });
        self
    }

    pub fn section(mut self, block_id: impl Into<String>, text: TextObject) -> Self {
        self.blocks.push(Block::Section { block_id: block_id.into(), text, accessory: None });
        self
    }
}

/// A `view` payload for `views.publish` (the App Home tab).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HomeView {
    #[serde(rename = "type")]
    pub view_type: &'static str,
    pub blocks: Vec<Block>,
}

// ---------------------------------------------------------------------------
// Rendering inputs

/// Everything the home tab needs to know about one task, denormalized so
/// rendering stays pure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskLine {
    pub id: String,
    pub title: String,
    pub priority: Priority,
    pub due_label: Option<String>,
    pub project_name: Option<String>,
    pub context_name: Option<String>,
    pub delegated_to: Option<String>,
}

/// The home tab's five buckets. "Scheduled" is active-with-due-date; the
/// split is done by the caller so the renderer never inspects statuses.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HomeSnapshot {
    pub inbox: Vec<TaskLine>,
    pub next_actions: Vec<TaskLine>,
    pub scheduled: Vec<TaskLine>,
    pub waiting: Vec<TaskLine>,
    pub someday: Vec<TaskLine>,
}

fn priority_icon(priority: Priority) -> &'static str {
    match priority {
        Priority::High => "🔴",
        Priority::Medium => "🟡",
        Priority::Low => "🟢",
    }
}

fn task_line_text(line: &TaskLine) -> String {
    let mut text = format!("{} *{}*", priority_icon(line.priority), line.title);
    if let Some(project) = &line.project_name {
        text.push_str(&format!("  📁 {project}"));
    }
    if let Some(context) = &line.context_name {
        text.push_str(&format!("  🏷 {context}"));
    }
    if let Some(due) = &line.due_label {
        text.push_str(&format!("  📅 {due}"));
    }
    if let Some(who) = &line.delegated_to {
        text.push_str(&format!("  ⏳ waiting on {who}"));
    }
    text
}

fn task_overflow(line: &TaskLine, with_activate: bool) -> Element {
    let mut options = vec![
        SelectOption::new("✅ Complete", format!("complete:{}", line.id)),
        SelectOption::new("✏️ Edit", format!("edit:{}", line.id)),
        SelectOption::new("📦 Move", format!("move:{}", line.id)),
        SelectOption::new("🎯 Set priority", format!("priority:{}", line.id)),
        SelectOption::new("🗑 Delete", format!("delete:{}", line.id)),
    ];
    if with_activate {
        options.insert(0, SelectOption::new("⚡ Activate", format!("activate:{}", line.id)));
    }
    Element::Overflow { action_id: format!("task_overflow_{}", line.id), options }
}

fn push_task_section(blocks: &mut Vec<Block>, line: &TaskLine, with_activate: bool) {
    blocks.push(Block::Section {
        block_id: format!("task_{}", line.id),
        text: TextObject::mrkdwn(task_line_text(line)),
        accessory: Some(task_overflow(line, with_activate)),
    });
}

/// Slack rejects home views past 100 blocks, so each bucket shows at most
/// this many rows and a trailing count for the rest.
const BUCKET_CAP: usize = 10;

fn push_bucket(
    blocks: &mut Vec<Block>,
    heading: &str,
    lines: &[TaskLine],
    empty_hint: &str,
    with_activate: bool,
) {
    blocks.push(Block::Header { text: TextObject::plain(heading.to_owned()) });
    if lines.is_empty() {
        blocks.push(Block::Context {
            block_id: format!("empty_{}", bucket_slug(heading)),
            elements: vec![TextObject::mrkdwn(empty_hint.to_owned())],
        });
        return;
    }
    for line in lines.iter().take(BUCKET_CAP) {
        push_task_section(blocks, line, with_activate);
    }
    if lines.len() > BUCKET_CAP {
        blocks.push(Block::Context {
            block_id: format!("overflow_{}", bucket_slug(heading)),
            elements: vec![TextObject::mrkdwn(format!("…and {} more", lines.len() - BUCKET_CAP))],
        });
    }
}

fn bucket_slug(heading: &str) -> String {
    heading
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ')
        .collect::<String>()
        .split_whitespace()
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

pub fn home_view(snapshot: &HomeSnapshot) -> HomeView {
    let mut blocks = Vec::new();

    blocks.push(Block::Actions {
        block_id: "home_actions".to_owned(),
        elements: vec![
            Element::button("open_add_task_modal", "➕ Add Task").styled(ButtonStyle::Primary),
            Element::button("open_add_project_modal", "📁 Add Project"),
            Element::button("open_add_context_modal", "🏷 Add Context"),
            Element::button("open_review_done_modal", "🎉 Review Done"),
        ],
    });
    blocks.push(Block::Divider {});

    blocks.push(Block::Header { text: TextObject::plain("📥 Inbox".to_owned()) });
    if snapshot.inbox.is_empty() {
        blocks.push(Block::Context {
            block_id: "empty_inbox".to_owned(),
            elements: vec![TextObject::mrkdwn("Inbox zero. Nice.".to_owned())],
        });
    }
    for line in snapshot.inbox.iter().take(BUCKET_CAP) {
        push_task_section(&mut blocks, line, false);
        // Inbox items carry the clarify pair instead of relying on overflow.
        blocks.push(Block::Actions {
            block_id: format!("clarify_{}", line.id),
            elements: vec![
                Element::button(format!("clarify_actionable_{}", line.id), "Actionable")
                    .styled(ButtonStyle::Primary)
                    .with_value(line.id.clone()),
                Element::button(format!("clarify_not_actionable_{}", line.id), "Not actionable")
                    .with_value(line.id.clone()),
            ],
        });
    }
    if snapshot.inbox.len() > BUCKET_CAP {
        blocks.push(Block::Context {
            block_id: "overflow_inbox".to_owned(),
            elements: vec![TextObject::mrkdwn(format!(
                "…and {} more",
                snapshot.inbox.len() - BUCKET_CAP
            ))],
        });
    }

    push_bucket(
        &mut blocks,
        "⚡ Next Actions",
        &snapshot.next_actions,
        "Nothing actionable yet. Clarify your inbox.",
        false,
    );
    push_bucket(&mut blocks, "📅 Scheduled", &snapshot.scheduled, "No dated tasks.", false);
    push_bucket(&mut blocks, "⏳ Waiting For", &snapshot.waiting, "Not waiting on anyone.", false);
    push_bucket(&mut blocks, "💤 Someday / Maybe", &snapshot.someday, "No parked ideas.", true);

    HomeView { view_type: "home", blocks }
}

// ---------------------------------------------------------------------------
// Messages

pub fn help_message() -> MessageTemplate {
    MessageBuilder::new("GTD command help")
        .section("gtd_help", |section| {
            section.mrkdwn(
                "*Available commands*\n\
                 • `/gtd add <title>` capture a task into your inbox\n\
                 • `/gtd list [status]` list tasks (inbox, active, waiting, someday, completed)\n\
                 • `/gtd complete <id>` mark a task done\n\
                 • `/gtd delete <id>` delete a task\n\
                 • `/gtd add-project <name>` and `/gtd projects`\n\
                 • `/gtd add-context <name>` and `/gtd contexts`\n\
                 • `/gtd export` get a link to your full data export\n\
                 • `/gtd help` this message",
            );
        })
        .build()
}

pub fn error_message(summary: &str, correlation_id: &str) -> MessageTemplate {
    MessageBuilder::new(summary.to_owned())
        .section("gtd_error", |section| {
            section.mrkdwn(format!(":warning: {summary}"));
        })
        .context("gtd_error_context", |context| {
            context.plain(format!("Correlation ID: {correlation_id}"));
        })
        .build()
}

pub fn task_added_message(id: &str, title: &str) -> MessageTemplate {
    MessageBuilder::new(format!("Added to inbox: {title}"))
        .section("gtd_task_added", |section| {
            section.mrkdwn(format!("📥 Added to your inbox: *{title}* (`{id}`)"));
        })
        .build()
}

pub fn task_completed_message(title: &str) -> MessageTemplate {
    MessageBuilder::new(format!("Completed: {title}"))
        .section("gtd_task_completed", |section| {
            section.mrkdwn(format!("✅ Completed: *{title}*"));
        })
        .build()
}

pub fn task_deleted_message(title: &str) -> MessageTemplate {
    MessageBuilder::new(format!("Deleted: {title}"))
        .section("gtd_task_deleted", |section| {
            section.mrkdwn(format!("🗑 Deleted: *{title}*"));
        })
        .build()
}

pub fn task_list_message(filter_label: &str, lines: &[TaskLine]) -> MessageTemplate {
    if lines.is_empty() {
        return MessageBuilder::new(format!("No {filter_label} tasks"))
            .section("gtd_task_list_empty", |section| {
                section.mrkdwn(format!("No *{filter_label}* tasks."));
            })
            .build();
    }

    let body = lines
        .iter()
        .map(|line| format!("{}  `{}`", task_line_text(line), line.id))
        .collect::<Vec<_>>()
        .join("\n");

    MessageBuilder::new(format!("{} {filter_label} tasks", lines.len()))
        .section("gtd_task_list", |section| {
            section.mrkdwn(format!("*{filter_label}*\n{body}"));
        })
        .build()
}

pub fn project_added_message(name: &str) -> MessageTemplate {
    MessageBuilder::new(format!("Added project: {name}"))
        .section("gtd_project_added", |section| {
            section.mrkdwn(format!("📁 Added project *{name}*"));
        })
        .build()
}

pub fn context_added_message(name: &str) -> MessageTemplate {
    MessageBuilder::new(format!("Added context: {name}"))
        .section("gtd_context_added", |section| {
            section.mrkdwn(format!("🏷 Added context *{name}*"));
        })
        .build()
}

pub fn project_list_message(names: &[String]) -> MessageTemplate {
    if names.is_empty() {
        return MessageBuilder::new("No projects yet")
            .section("gtd_projects_empty", |section| {
                section.mrkdwn("No projects yet. Try `/gtd add-project <name>`.");
            })
            .build();
    }
    let body = names.iter().map(|n| format!("• {n}")).collect::<Vec<_>>().join("\n");
    MessageBuilder::new(format!("{} projects", names.len()))
        .section("gtd_projects", |section| {
            section.mrkdwn(format!("*Projects*\n{body}"));
        })
        .build()
}

pub fn context_list_message(names: &[String]) -> MessageTemplate {
    if names.is_empty() {
        return MessageBuilder::new("No contexts yet")
            .section("gtd_contexts_empty", |section| {
                section.mrkdwn("No contexts yet. Try `/gtd add-context @name`.");
            })
            .build();
    }
    let body = names.iter().map(|n| format!("• {n}")).collect::<Vec<_>>().join("\n");
    MessageBuilder::new(format!("{} contexts", names.len()))
        .section("gtd_contexts", |section| {
            section.mrkdwn(format!("*Contexts*\n{body}"));
        })
        .build()
}

pub fn export_link_message(url: &str) -> MessageTemplate {
    MessageBuilder::new("Your export link")
        .section("gtd_export", |section| {
            section.mrkdwn(format!(
                "📤 Your data export is ready: <{url}|download JSON>\nAnyone with this link can read your export. Keep it private."
            ));
        })
        .build()
}

pub fn due_reminder_message(line: &TaskLine, due_label: &str) -> MessageTemplate {
    MessageBuilder::new(format!("Due soon: {}", line.title))
        .section("gtd_due_reminder", |section| {
            section.mrkdwn(format!("⏰ Due {due_label}: {}", task_line_text(line)));
        })
        .build()
}

pub fn inbox_digest_message(titles: &[String], total: usize) -> MessageTemplate {
    let shown = titles.len();
    let mut body = titles.iter().map(|t| format!("• {t}")).collect::<Vec<_>>().join("\n");
    if total > shown {
        body.push_str(&format!("\n…and {} more", total - shown));
    }

    MessageBuilder::new(format!("{total} tasks waiting in your inbox"))
        .section("gtd_inbox_digest", |section| {
            section.mrkdwn(format!(
                "📥 You have *{total}* unclarified task{} in your inbox:\n{body}",
                if total == 1 { "" } else { "s" }
            ));
        })
        .context("gtd_inbox_digest_hint", |context| {
            context.mrkdwn("Open the app home to clarify them.".to_owned());
        })
        .build()
}

// ---------------------------------------------------------------------------
// Modals

fn priority_options() -> Vec<SelectOption> {
    vec![
        SelectOption::new("🔴 High", "high"),
        SelectOption::new("🟡 Medium", "medium"),
        SelectOption::new("🟢 Low", "low"),
    ]
}

fn time_estimate_options() -> Vec<SelectOption> {
    vec![
        SelectOption::new("⚡ Quick (< 15 min)", "quick"),
        SelectOption::new("30 minutes", "30min"),
        SelectOption::new("1 hour", "1hr"),
        SelectOption::new("2+ hours", "2hr+"),
    ]
}

fn energy_options() -> Vec<SelectOption> {
    vec![
        SelectOption::new("High energy", "high"),
        SelectOption::new("Medium energy", "medium"),
        SelectOption::new("Low energy", "low"),
    ]
}

fn project_select(options: &[SelectOption], initial: Option<&SelectOption>) -> Element {
    Element::StaticSelect {
        action_id: "project_select".to_owned(),
        placeholder: TextObject::plain("Choose a project"),
        options: options.to_vec(),
        initial_option: initial.cloned(),
    }
}

fn context_select(options: &[SelectOption], initial: Option<&SelectOption>) -> Element {
    Element::StaticSelect {
        action_id: "context_select".to_owned(),
        placeholder: TextObject::plain("Choose a context"),
        options: options.to_vec(),
        initial_option: initial.cloned(),
    }
}

fn text_input(action_id: &str, placeholder: Option<&str>, multiline: bool) -> Element {
    Element::PlainTextInput {
        action_id: action_id.to_owned(),
        multiline,
        initial_value: None,
        placeholder: placeholder.map(TextObject::plain),
    }
}

pub fn add_task_modal(projects: &[SelectOption], contexts: &[SelectOption]) -> ModalView {
    let mut modal = ModalView::new("add_task_modal", "Add Task")
        .submit_label("Add")
        .input("title_block", "Title", text_input("title_input", Some("What needs doing?"), false), false)
        .input(
            "description_block",
            "Description",
            text_input("description_input", None, true),
            true,
        )
        .input(
            "due_date_block",
            "Due date",
            Element::Datepicker { action_id: "due_date_input".to_owned(), initial_date: None },
            true,
        )
        .input(
            "priority_block",
            "Priority",
            Element::StaticSelect {
                action_id: "priority_select".to_owned(),
                placeholder: TextObject::plain("Priority"),
                options: priority_options(),
                initial_option: None,
            },
            true,
        );

    if !projects.is_empty() {
        modal = modal.input("project_block", "Project", project_select(projects, None), true);
    }
    if !contexts.is_empty() {
        modal = modal.input("context_block", "Context", context_select(contexts, None), true);
    }

    modal
        .input(
            "time_estimate_block",
            "Time estimate",
            Element::StaticSelect {
                action_id: "time_estimate_select".to_owned(),
                placeholder: TextObject::plain("How long will it take?"),
                options: time_estimate_options(),
                initial_option: None,
            },
            true,
        )
        .input(
            "energy_block",
            "Energy level",
            Element::StaticSelect {
                action_id: "energy_select".to_owned(),
                placeholder: TextObject::plain("Energy needed"),
                options: energy_options(),
                initial_option: None,
            },
            true,
        )
}

pub fn add_project_modal() -> ModalView {
    ModalView::new("add_project_modal", "Add Project")
        .submit_label("Add")
        .input("name_block", "Name", text_input("name_input", Some("Project name"), false), false)
        .input(
            "description_block",
            "Description",
            text_input("description_input", None, true),
            true,
        )
}

pub fn add_context_modal() -> ModalView {
    ModalView::new("add_context_modal", "Add Context")
        .submit_label("Add")
        .input(
            "name_block",
            "Name",
            text_input("name_input", Some("@home, @computer, @errands…"), false),
            false,
        )
}

/// Opened from the "create task" message shortcut; the source message text
/// prefills the title and travels in private_metadata for traceability.
pub fn create_task_from_message_modal(message_text: &str, metadata: &str) -> ModalView {
    ModalView::new("create_task_from_message_modal", "Create Task")
        .submit_label("Add")
        .metadata(metadata)
        .input(
            "title_block",
            "Title",
            Element::PlainTextInput {
                action_id: "title_input".to_owned(),
                multiline: false,
                initial_value: Some(truncate_title(message_text)),
                placeholder: None,
            },
            false,
        )
        .input(
            "description_block",
            "Description",
            text_input("description_input", None, true),
            true,
        )
}

/// Clarify step 2a: the task is actionable. Collects scheduling detail;
/// a delegated-to value routes it to Waiting instead of Active. An existing
/// due date prefills the picker so an untouched form keeps it.
pub fn actionable_modal(
    task_id: &str,
    due_date: Option<&str>,
    projects: &[SelectOption],
    contexts: &[SelectOption],
) -> ModalView {
    let mut modal = ModalView::new(format!("actionable_modal_{task_id}"), "Make It Actionable")
        .submit_label("Save")
        .input(
            "due_date_block",
            "Due date",
            Element::Datepicker {
                action_id: "due_date_input".to_owned(),
                initial_date: due_date.map(str::to_owned),
            },
            true,
        )
        .input(
            "priority_block",
            "Priority",
            Element::StaticSelect {
                action_id: "priority_select".to_owned(),
                placeholder: TextObject::plain("Priority"),
                options: priority_options(),
                initial_option: None,
            },
            true,
        )
        .input(
            "delegated_block",
            "Waiting on someone?",
            text_input("delegated_input", Some("Who are you waiting on?"), false),
            true,
        );

    if !projects.is_empty() {
        modal = modal.input("project_block", "Project", project_select(projects, None), true);
    }
    if !contexts.is_empty() {
        modal = modal.input("context_block", "Context", context_select(contexts, None), true);
    }

    modal
        .input(
            "time_estimate_block",
            "Time estimate",
            Element::StaticSelect {
                action_id: "time_estimate_select".to_owned(),
                placeholder: TextObject::plain("How long will it take?"),
                options: time_estimate_options(),
                initial_option: None,
            },
            true,
        )
        .input(
            "energy_block",
            "Energy level",
            Element::StaticSelect {
                action_id: "energy_select".to_owned(),
                placeholder: TextObject::plain("Energy needed"),
                options: energy_options(),
                initial_option: None,
            },
            true,
        )
}

/// Clarify step 2b: not actionable. Park it or archive it.
pub fn not_actionable_modal(task_id: &str) -> ModalView {
    ModalView::new(format!("not_actionable_modal_{task_id}"), "Not Actionable")
        .submit_label("Save")
        .input(
            "disposition_block",
            "What should happen to it?",
            Element::StaticSelect {
                action_id: "disposition_select".to_owned(),
                placeholder: TextObject::plain("Choose"),
                options: vec![
                    SelectOption::new("💤 Someday / Maybe", "someday"),
                    SelectOption::new("🗄 Archive (reference)", "archived"),
                ],
                initial_option: None,
            },
            false,
        )
}

pub fn move_task_modal(task_id: &str) -> ModalView {
    ModalView::new(format!("move_task_modal_{task_id}"), "Move Task")
        .submit_label("Move")
        .input(
            "target_block",
            "Move to",
            Element::StaticSelect {
                action_id: "target_select".to_owned(),
                placeholder: TextObject::plain("Choose a list"),
                options: vec![
                    SelectOption::new("⚡ Next Actions", "active"),
                    SelectOption::new("📅 Scheduled", "scheduled"),
                    SelectOption::new("⏳ Waiting For", "waiting"),
                    SelectOption::new("💤 Someday / Maybe", "someday"),
                ],
                initial_option: None,
            },
            false,
        )
        .input(
            "due_date_block",
            "Due date (for Scheduled)",
            Element::Datepicker { action_id: "due_date_input".to_owned(), initial_date: None },
            true,
        )
        .input(
            "delegated_block",
            "Waiting on (for Waiting For)",
            text_input("delegated_input", Some("Who are you waiting on?"), false),
            true,
        )
}

pub fn set_priority_modal(task_id: &str, current: Priority) -> ModalView {
    let initial = priority_options()
        .into_iter()
        .find(|option| option.value == current.as_str());

    ModalView::new(format!("set_priority_modal_{task_id}"), "Set Priority")
        .submit_label("Set")
        .input(
            "priority_block",
            "Priority",
            Element::StaticSelect {
                action_id: "priority_select".to_owned(),
                placeholder: TextObject::plain("Priority"),
                options: priority_options(),
                initial_option: initial,
            },
            false,
        )
}

/// Current field values prefilled into the edit modal.
#[derive(Clone, Debug, Default)]
pub struct EditTaskPrefill<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub due_date: Option<&'a str>,
    pub time_estimate: Option<TimeEstimate>,
    pub energy_level: Option<EnergyLevel>,
}

/// Select options with an explicit "None" entry, so a stored value can be
/// removed from the edit modal rather than only replaced.
fn clearable_options(options: Vec<SelectOption>) -> Vec<SelectOption> {
    let mut all = vec![SelectOption::new("None", "none")];
    all.extend(options);
    all
}

fn initial_or_none(options: &[SelectOption], current: Option<&str>) -> Option<SelectOption> {
    let wanted = current.unwrap_or("none");
    options.iter().find(|option| option.value == wanted).cloned()
}

pub fn edit_task_modal(
    task_id: &str,
    prefill: &EditTaskPrefill<'_>,
    projects: &[SelectOption],
    contexts: &[SelectOption],
    current_project: Option<&SelectOption>,
    current_context: Option<&SelectOption>,
) -> ModalView {
    let time_options = clearable_options(time_estimate_options());
    let time_initial =
        initial_or_none(&time_options, prefill.time_estimate.map(TimeEstimate::as_str));
    let energy_options = clearable_options(energy_options());
    let energy_initial =
        initial_or_none(&energy_options, prefill.energy_level.map(EnergyLevel::as_str));

    let mut modal = ModalView::new(format!("edit_task_modal_{task_id}"), "Edit Task")
        .submit_label("Save")
        .input(
            "title_block",
            "Title",
            Element::PlainTextInput {
                action_id: "title_input".to_owned(),
                multiline: false,
                initial_value: Some(prefill.title.to_owned()),
                placeholder: None,
            },
            false,
        )
        .input(
            "description_block",
            "Description",
            Element::PlainTextInput {
                action_id: "description_input".to_owned(),
                multiline: true,
                initial_value: prefill.description.map(str::to_owned),
                placeholder: None,
            },
            true,
        )
        .input(
            "due_date_block",
            "Due date",
            Element::Datepicker {
                action_id: "due_date_input".to_owned(),
                initial_date: prefill.due_date.map(str::to_owned),
            },
            true,
        );

    if !projects.is_empty() {
        modal = modal.input(
            "project_block",
            "Project",
            project_select(projects, current_project),
            true,
        );
    }
    if !contexts.is_empty() {
        modal = modal.input(
            "context_block",
            "Context",
            context_select(contexts, current_context),
            true,
        );
    }

    modal
        .input(
            "time_estimate_block",
            "Time estimate",
            Element::StaticSelect {
                action_id: "time_estimate_select".to_owned(),
                placeholder: TextObject::plain("How long will it take?"),
                options: time_options,
                initial_option: time_initial,
            },
            true,
        )
        .input(
            "energy_block",
            "Energy level",
            Element::StaticSelect {
                action_id: "energy_select".to_owned(),
                placeholder: TextObject::plain("Energy needed"),
                options: energy_options,
                initial_option: energy_initial,
            },
            true,
        )
}

pub fn delete_confirmation_modal(task_id: &str, title: &str) -> ModalView {
    ModalView::new(format!("delete_confirmation_modal_{task_id}"), "Delete Task")
        .submit_label("Delete")
        .section(
            "confirm_block",
            TextObject::mrkdwn(format!("Delete *{title}*? This cannot be undone.")),
        )
}

pub fn review_done_modal(completed_titles: &[String]) -> ModalView {
    let mut modal = ModalView::new("review_done_modal", "Done This Week");
    modal.submit = None;
    modal.close = Some(TextObject::plain("Close"));

    if completed_titles.is_empty() {
        return modal.section(
            "done_empty",
            TextObject::mrkdwn("Nothing completed yet. Go finish something!".to_owned()),
        );
    }

    let body =
        completed_titles.iter().map(|t| format!("✅ {t}")).collect::<Vec<_>>().join("\n");
    modal.section("done_list", TextObject::mrkdwn(body))
}

fn truncate_title(text: &str) -> String {
    const MAX: usize = 150;
    let trimmed = text.trim();
    if trimmed.chars().count() <= MAX {
        return trimmed.to_owned();
    }
    let mut out: String = trimmed.chars().take(MAX - 1).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use nextaction_core::domain::task::{Priority, TimeEstimate};

    use super::{
        actionable_modal, add_task_modal, edit_task_modal, error_message, help_message, home_view,
        inbox_digest_message, move_task_modal, task_list_message, Block, EditTaskPrefill, Element,
        HomeSnapshot, SelectOption, TaskLine, TextObject,
    };

    fn input_element<'a>(modal: &'a super::ModalView, block_id: &str) -> &'a Element {
        modal
            .blocks
            .iter()
            .find_map(|block| match block {
                Block::Input { block_id: id, element, .. } if id == block_id => Some(element),
                _ => None,
            })
            .unwrap_or_else(|| panic!("no input block {block_id}"))
    }

    fn line(id: &str, title: &str) -> TaskLine {
        TaskLine {
            id: id.to_owned(),
            title: title.to_owned(),
            priority: Priority::Medium,
            due_label: None,
            project_name: None,
            context_name: None,
            delegated_to: None,
        }
    }

    #[test]
    fn home_view_renders_clarify_buttons_for_inbox_items_only() {
        let snapshot = HomeSnapshot {
            inbox: vec![line("aaaa1111", "Sort mail")],
            next_actions: vec![line("bbbb2222", "Write report")],
            ..HomeSnapshot::default()
        };

        let view = home_view(&snapshot);
        assert_eq!(view.view_type, "home");

        let clarify_blocks: Vec<&Block> = view
            .blocks
            .iter()
            .filter(|block| {
                matches!(block, Block::Actions { block_id, .. } if block_id.starts_with("clarify_"))
            })
            .collect();
        assert_eq!(clarify_blocks.len(), 1);

        if let Block::Actions { elements, .. } = clarify_blocks[0] {
            assert_eq!(elements.len(), 2);
            assert_eq!(elements[0].action_id(), "clarify_actionable_aaaa1111");
            assert_eq!(elements[1].action_id(), "clarify_not_actionable_aaaa1111");
        }
    }

    #[test]
    fn home_view_attaches_overflow_menus_to_task_rows() {
        let snapshot = HomeSnapshot {
            next_actions: vec![line("bbbb2222", "Write report")],
            ..HomeSnapshot::default()
        };

        let view = home_view(&snapshot);
        let task_row = view
            .blocks
            .iter()
            .find(|block| matches!(block, Block::Section { block_id, .. } if block_id == "task_bbbb2222"))
            .expect("task row");

        if let Block::Section { accessory: Some(Element::Overflow { action_id, options }), .. } =
            task_row
        {
            assert_eq!(action_id, "task_overflow_bbbb2222");
            assert!(options.iter().any(|o| o.value == "complete:bbbb2222"));
            assert!(options.iter().any(|o| o.value == "delete:bbbb2222"));
            assert!(!options.iter().any(|o| o.value.starts_with("activate:")));
        } else {
            panic!("expected overflow accessory");
        }
    }

    #[test]
    fn someday_rows_offer_an_activate_entry() {
        let snapshot =
            HomeSnapshot { someday: vec![line("cccc3333", "Learn piano")], ..HomeSnapshot::default() };

        let view = home_view(&snapshot);
        let task_row = view
            .blocks
            .iter()
            .find(|block| matches!(block, Block::Section { block_id, .. } if block_id == "task_cccc3333"))
            .expect("task row");

        if let Block::Section { accessory: Some(Element::Overflow { options, .. }), .. } = task_row {
            assert_eq!(options[0].value, "activate:cccc3333");
        } else {
            panic!("expected overflow accessory");
        }
    }

    #[test]
    fn home_view_renders_empty_hints_for_vacant_buckets() {
        let view = home_view(&HomeSnapshot::default());
        let hints = view
            .blocks
            .iter()
            .filter(|block| {
                matches!(block, Block::Context { block_id, .. } if block_id.starts_with("empty_"))
            })
            .count();
        assert_eq!(hints, 5);
    }

    #[test]
    fn home_view_caps_long_buckets_and_counts_the_rest() {
        let snapshot = HomeSnapshot {
            next_actions: (0..13).map(|i| line(&format!("id{i:06}"), "task")).collect(),
            ..HomeSnapshot::default()
        };

        let view = home_view(&snapshot);
        let rows = view
            .blocks
            .iter()
            .filter(|block| {
                matches!(block, Block::Section { block_id, .. } if block_id.starts_with("task_"))
            })
            .count();
        assert_eq!(rows, 10);
        assert!(view.blocks.iter().any(|block| matches!(
            block,
            Block::Context { block_id, elements }
                if block_id == "overflow_next_actions"
                    && matches!(&elements[0], TextObject::Mrkdwn { text } if text.contains("3 more"))
        )));
    }

    #[test]
    fn add_task_modal_omits_project_select_when_no_projects_exist() {
        let without = add_task_modal(&[], &[]);
        assert!(!without
            .blocks
            .iter()
            .any(|block| matches!(block, Block::Input { block_id, .. } if block_id == "project_block")));

        let with = add_task_modal(&[SelectOption::new("Apartment move", "p1")], &[]);
        assert!(with
            .blocks
            .iter()
            .any(|block| matches!(block, Block::Input { block_id, .. } if block_id == "project_block")));
        assert_eq!(with.callback_id, "add_task_modal");
    }

    #[test]
    fn move_modal_offers_scheduled_with_date_and_delegate_fields() {
        let modal = move_task_modal("aaaa1111");

        let Element::StaticSelect { options, .. } = input_element(&modal, "target_block") else {
            panic!("target_block should hold a static select");
        };
        let values: Vec<&str> = options.iter().map(|o| o.value.as_str()).collect();
        assert_eq!(values, ["active", "scheduled", "waiting", "someday"]);

        assert!(matches!(
            input_element(&modal, "due_date_block"),
            Element::Datepicker { .. }
        ));
        assert!(matches!(
            input_element(&modal, "delegated_block"),
            Element::PlainTextInput { .. }
        ));
    }

    #[test]
    fn actionable_modal_prefills_the_existing_due_date() {
        let modal = actionable_modal("aaaa1111", Some("2026-09-01"), &[], &[]);
        let Element::Datepicker { initial_date, .. } = input_element(&modal, "due_date_block")
        else {
            panic!("due_date_block should hold a datepicker");
        };
        assert_eq!(initial_date.as_deref(), Some("2026-09-01"));

        let blank = actionable_modal("aaaa1111", None, &[], &[]);
        let Element::Datepicker { initial_date, .. } = input_element(&blank, "due_date_block")
        else {
            panic!("due_date_block should hold a datepicker");
        };
        assert!(initial_date.is_none());
    }

    #[test]
    fn edit_modal_carries_clearable_time_and_energy_selects() {
        let prefill = EditTaskPrefill {
            title: "Book movers",
            time_estimate: Some(TimeEstimate::Hour),
            ..EditTaskPrefill::default()
        };
        let modal = edit_task_modal("aaaa1111", &prefill, &[], &[], None, None);

        let Element::StaticSelect { options, initial_option, .. } =
            input_element(&modal, "time_estimate_block")
        else {
            panic!("time_estimate_block should hold a static select");
        };
        assert_eq!(options[0].value, "none", "first option removes the stored value");
        assert_eq!(initial_option.as_ref().map(|o| o.value.as_str()), Some("1hr"));

        let Element::StaticSelect { initial_option, .. } = input_element(&modal, "energy_block")
        else {
            panic!("energy_block should hold a static select");
        };
        assert_eq!(
            initial_option.as_ref().map(|o| o.value.as_str()),
            Some("none"),
            "an unset field prefills the None option",
        );
    }

    #[test]
    fn error_template_contains_correlation_id() {
        let message = error_message("Cannot process request", "req-123");
        let elements = if let Block::Context { elements, .. } = &message.blocks[1] {
            Some(elements)
        } else {
            None
        };
        assert!(elements.is_some(), "expected context block");
        let elements = elements.expect("context block asserted above");
        assert!(matches!(
            elements.first(),
            Some(TextObject::Plain { text }) if text.contains("req-123")
        ));
    }

    #[test]
    fn task_list_message_shows_ids_and_handles_empty() {
        let populated = task_list_message("inbox", &[line("aaaa1111", "Sort mail")]);
        assert!(matches!(
            &populated.blocks[0],
            Block::Section { text: TextObject::Mrkdwn { text }, .. } if text.contains("`aaaa1111`")
        ));

        let empty = task_list_message("waiting", &[]);
        assert!(empty.fallback_text.contains("No waiting tasks"));
    }

    #[test]
    fn inbox_digest_reports_overflow_beyond_shown_titles() {
        let titles =
            vec!["a".to_owned(), "b".to_owned(), "c".to_owned(), "d".to_owned(), "e".to_owned()];
        let message = inbox_digest_message(&titles, 8);
        assert!(matches!(
            &message.blocks[0],
            Block::Section { text: TextObject::Mrkdwn { text }, .. } if text.contains("…and 3 more")
        ));
        assert!(message.fallback_text.contains("8 tasks"));
    }

    #[test]
    fn help_message_lists_every_verb() {
        let message = help_message();
        let Block::Section { text: TextObject::Mrkdwn { text }, .. } = &message.blocks[0] else {
            panic!("expected markdown section");
        };
        for verb in
            ["add", "list", "complete", "delete", "add-project", "add-context", "export", "help"]
        {
            assert!(text.contains(verb), "help should mention `{verb}`");
        }
    }
}

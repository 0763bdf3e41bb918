//! Conversation state machine for task creation and in-place edits.
//!
//! Every handler takes the [`EventOrigin`] of the inbound event, mutates at
//! most that user's session, and returns the messages to send back. Store
//! and scheduler calls happen inline; nothing here blocks on the transport.

use crate::calendar::{DatePicker, PickerError, PickerOutcome, PickerView};
use crate::chat::types::{
    ChatId, InboundEvent, InboundKind, InlineButton, InlineKeyboard, MessageId, OutboundMessage,
};
use crate::clock::Clock;
use crate::dialog::session::{
    DialogSession, DialogStage, EditKind, EditTarget, SessionRegistry,
};
use crate::scheduler::{ReminderPeriod, ReminderScheduler};
use crate::task::{
    DATE_FORMAT, Priority, TaskId, TaskStatus, TaskStore, TaskStoreError, UserId,
};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub(crate) const TITLE_PROMPT: &str = "Please send me the task title.";
pub(crate) const PRIORITY_PROMPT: &str = "Select the task priority:";
pub(crate) const TASK_NOT_FOUND: &str = "Task not found.";
pub(crate) const ACTION_NOT_FOUND: &str = "Sorry, that action was not found.";
pub(crate) const STORE_FAILURE: &str = "Something went wrong. Please try again.";
const CREATE_FAILURE: &str = "Sorry, the task could not be saved. Please start again with /newtask.";
const SESSION_DISCARDED: &str = "Your previous dialogue was discarded.";
const PICKER_INACTIVE: &str = "This date picker is no longer active.";
const SELECTION_INACTIVE: &str = "This selection is no longer active.";
const INVALID_DATE: &str = "Sorry, that date is not valid.";
const USE_BUTTONS: &str = "Please use the buttons above.";
const IDLE_HINT: &str = "Use /newtask to create a task.";
const NO_PENDING_TASKS: &str = "No pending tasks found.";
const REMIND_FIRST: &str = "Please choose a task with /remind first.";

/// Who sent an event and where replies go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventOrigin {
    pub user: UserId,
    pub chat: ChatId,
    /// Message carrying the pressed button, for in-place edits.
    pub message: Option<MessageId>,
}

impl EventOrigin {
    fn reply(&self, text: impl Into<String>) -> OutboundMessage {
        OutboundMessage::text(self.chat, text)
    }

    /// Replace the message carrying the pressed button, or send a new one.
    fn update(&self, text: impl Into<String>) -> OutboundMessage {
        OutboundMessage::text(self.chat, text).editing(self.message)
    }
}

impl From<&InboundEvent> for EventOrigin {
    fn from(event: &InboundEvent) -> Self {
        let message = match &event.kind {
            InboundKind::Callback { message, .. } => *message,
            InboundKind::Text(_) => None,
        };
        Self {
            user: event.user,
            chat: event.chat,
            message,
        }
    }
}

/// Drives multi-step dialogues; owns every user's [`DialogSession`].
pub struct ConversationEngine {
    sessions: SessionRegistry,
    store: Arc<dyn TaskStore>,
    scheduler: ReminderScheduler,
    clock: Arc<dyn Clock>,
    picker: DatePicker,
    /// Tag handed to the most recently shown picker.
    last_picker: u32,
    max_title_chars: usize,
}

impl ConversationEngine {
    pub fn new(
        store: Arc<dyn TaskStore>,
        scheduler: ReminderScheduler,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            sessions: SessionRegistry::new(),
            store,
            scheduler,
            clock,
            picker: DatePicker::default(),
            // Random start so pickers left over from a previous run do not
            // match new ones.
            last_picker: uuid::Uuid::new_v4().as_u128() as u32,
            max_title_chars: 256,
        }
    }

    pub fn with_picker(mut self, picker: DatePicker) -> Self {
        self.picker = picker;
        self
    }

    pub fn with_max_title_chars(mut self, max: usize) -> Self {
        self.max_title_chars = max.max(1);
        self
    }

    /// Current dialogue stage for `user`.
    #[must_use]
    pub fn stage(&self, user: UserId) -> DialogStage {
        self.sessions.stage(user)
    }

    #[must_use]
    pub fn session(&self, user: UserId) -> Option<&DialogSession> {
        self.sessions.get(user)
    }

    /// Install a session, telling the user when an active one was replaced.
    fn begin(
        &mut self,
        origin: &EventOrigin,
        session: DialogSession,
        out: &mut Vec<OutboundMessage>,
    ) {
        let next = session.stage;
        if let Some(previous) = self.sessions.begin(origin.user, session)
            && previous.stage != DialogStage::Idle
        {
            warn!(
                "user {} started {next} while in {}, previous dialogue discarded",
                origin.user, previous.stage
            );
            out.push(origin.reply(SESSION_DISCARDED));
        } else {
            debug!("user {} entered {next}", origin.user);
        }
    }

    fn picker_message(&self, origin: &EventOrigin, view: PickerView) -> OutboundMessage {
        origin.reply(view.prompt).with_keyboard(view.keyboard)
    }

    fn next_picker_tag(&mut self) -> u32 {
        self.last_picker = self.last_picker.wrapping_add(1);
        self.last_picker
    }

    fn today(&self) -> NaiveDate {
        self.clock.now().date_naive()
    }

    // ── creation flow ───────────────────────────────────────────────

    /// `/newtask`: start the creation dialogue.
    pub fn start_creation(&mut self, origin: &EventOrigin) -> Vec<OutboundMessage> {
        let mut out = Vec::new();
        self.begin(origin, DialogSession::creation(), &mut out);
        out.push(origin.reply(TITLE_PROMPT));
        out
    }

    /// Free text. Only the title stage consumes it.
    pub fn handle_text(&mut self, origin: &EventOrigin, text: &str) -> Vec<OutboundMessage> {
        match self.sessions.stage(origin.user) {
            DialogStage::AwaitingTitle => self.submit_title(origin, text),
            DialogStage::Idle => vec![origin.reply(IDLE_HINT)],
            stage => {
                debug!("ignoring free text from user {} in {stage}", origin.user);
                vec![origin.reply(USE_BUTTONS)]
            }
        }
    }

    fn submit_title(&mut self, origin: &EventOrigin, text: &str) -> Vec<OutboundMessage> {
        let title = text.trim();
        if title.is_empty() {
            return vec![origin.reply(format!(
                "The task title cannot be empty. {TITLE_PROMPT}"
            ))];
        }
        if title.chars().count() > self.max_title_chars {
            return vec![origin.reply(format!(
                "The task title is too long (max {} characters). Please send a shorter title.",
                self.max_title_chars
            ))];
        }

        let Some(session) = self.sessions.get_mut(origin.user) else {
            return vec![origin.reply(IDLE_HINT)];
        };
        session.draft.title = Some(title.to_owned());
        session.stage = DialogStage::AwaitingPriority;
        debug!("user {} entered {}", origin.user, session.stage);

        let buttons = Priority::ALL
            .iter()
            .map(|p| InlineButton::new(p.label(), format!("priority_{}", p.as_str())))
            .collect();
        vec![origin
            .reply(PRIORITY_PROMPT)
            .with_keyboard(InlineKeyboard::row(buttons))]
    }

    /// Priority button of the creation flow.
    pub fn choose_priority(
        &mut self,
        origin: &EventOrigin,
        priority: Priority,
    ) -> Vec<OutboundMessage> {
        if self.sessions.stage(origin.user) != DialogStage::AwaitingPriority {
            return vec![origin.reply(SELECTION_INACTIVE)];
        }
        let tag = self.next_picker_tag();
        let Some(session) = self.sessions.get_mut(origin.user) else {
            return vec![origin.reply(SELECTION_INACTIVE)];
        };
        session.draft.priority = Some(priority);
        session.stage = DialogStage::AwaitingDate;
        session.picker = Some(tag);
        debug!("user {} entered {}", origin.user, session.stage);

        let view = self.picker.start(self.today(), tag);
        vec![
            origin.update(format!("Priority set to {priority}")),
            self.picker_message(origin, view),
        ]
    }

    // ── date picker ─────────────────────────────────────────────────

    /// Calendar token from a picker keyboard. Only tokens of the picker shown
    /// by the user's current session are accepted.
    pub fn handle_calendar(&mut self, origin: &EventOrigin, data: &str) -> Vec<OutboundMessage> {
        let Some(tag) = self
            .sessions
            .get(origin.user)
            .and_then(DialogSession::active_picker)
        else {
            debug!("stale calendar token from user {}: {data}", origin.user);
            return vec![origin.reply(PICKER_INACTIVE)];
        };

        match self.picker.process(data, tag) {
            Ok(PickerOutcome::Ignore) => Vec::new(),
            Ok(PickerOutcome::Navigate(view)) => vec![
                origin
                    .update(view.prompt)
                    .with_keyboard(view.keyboard),
            ],
            Ok(PickerOutcome::Resolved(date)) => self.resolve_date(origin, date),
            Err(PickerError::Malformed(token)) => {
                debug!("malformed calendar token from user {}: {token}", origin.user);
                vec![origin.reply(ACTION_NOT_FOUND)]
            }
            Err(e @ PickerError::InvalidDate { .. }) => {
                debug!("user {} picked an invalid date: {e}", origin.user);
                vec![origin.reply(INVALID_DATE)]
            }
            Err(e @ PickerError::Stale { .. }) => {
                debug!("user {} pressed an inactive picker: {e}", origin.user);
                vec![origin.reply(PICKER_INACTIVE)]
            }
        }
    }

    fn resolve_date(&mut self, origin: &EventOrigin, date: NaiveDate) -> Vec<OutboundMessage> {
        match self.sessions.get(origin.user).and_then(|s| s.edit) {
            Some(EditTarget {
                task_id,
                kind: EditKind::Date,
            }) => self.finish_date_edit(origin, task_id, date),
            _ => self.finish_creation(origin, date),
        }
    }

    fn finish_creation(&mut self, origin: &EventOrigin, date: NaiveDate) -> Vec<OutboundMessage> {
        // The session is gone before the write, so a replayed token finds no
        // date stage.
        let Some(mut session) = self.sessions.end(origin.user) else {
            return vec![origin.reply(PICKER_INACTIVE)];
        };
        session.draft.date = Some(date);
        let Some(new_task) = session.draft.into_new_task(origin.user) else {
            error!(
                "user {} reached the date stage with an incomplete draft",
                origin.user
            );
            return vec![origin.reply(CREATE_FAILURE)];
        };

        let date_text = date.format(DATE_FORMAT).to_string();
        match self.store.create(new_task) {
            Ok(task) => {
                info!("user {} created task {}", origin.user, task.id);
                vec![
                    origin.update(format!("Date set to {date_text}")),
                    origin.reply("Task added!"),
                ]
            }
            Err(e) => {
                error!("failed to create task for user {}: {e}", origin.user);
                vec![origin.reply(CREATE_FAILURE)]
            }
        }
    }

    // ── date edit ───────────────────────────────────────────────────

    /// `change_date_<id>`: start a date edit for an existing task.
    pub fn start_date_edit(&mut self, origin: &EventOrigin, task_id: TaskId) -> Vec<OutboundMessage> {
        match self.store.get_by_id(origin.user, task_id) {
            Ok(Some(_)) => {}
            Ok(None) => return vec![origin.reply(TASK_NOT_FOUND)],
            Err(e) => {
                error!("failed to look up task {task_id}: {e}");
                return vec![origin.reply(STORE_FAILURE)];
            }
        }

        let tag = self.next_picker_tag();
        let mut session = DialogSession::edit(task_id, EditKind::Date);
        session.picker = Some(tag);
        let mut out = Vec::new();
        self.begin(origin, session, &mut out);
        let view = self.picker.start(self.today(), tag);
        out.push(self.picker_message(origin, view));
        out
    }

    fn finish_date_edit(
        &mut self,
        origin: &EventOrigin,
        task_id: TaskId,
        date: NaiveDate,
    ) -> Vec<OutboundMessage> {
        match self.store.update_date(origin.user, task_id, date) {
            Ok(_) => {
                self.sessions.end(origin.user);
                info!("user {} moved task {task_id} to {date}", origin.user);
                vec![origin.update(format!(
                    "Date of task {task_id} set to {}.",
                    date.format(DATE_FORMAT)
                ))]
            }
            Err(TaskStoreError::NotFound(_)) => vec![origin.reply(TASK_NOT_FOUND)],
            Err(e) => {
                error!("failed to update date of task {task_id}: {e}");
                vec![origin.reply(STORE_FAILURE)]
            }
        }
    }

    // ── reminders ───────────────────────────────────────────────────

    /// `/remind`: list pending tasks to pick from.
    pub fn start_reminder(&mut self, origin: &EventOrigin) -> Vec<OutboundMessage> {
        let tasks = match self
            .store
            .list_by_owner(origin.user, Some(TaskStatus::Pending))
        {
            Ok(tasks) => tasks,
            Err(e) => {
                error!("failed to list tasks for user {}: {e}", origin.user);
                return vec![origin.reply(STORE_FAILURE)];
            }
        };
        if tasks.is_empty() {
            return vec![origin.reply(NO_PENDING_TASKS)];
        }

        let mut out = Vec::new();
        self.begin(origin, DialogSession::reminder_selection(), &mut out);
        let buttons = tasks
            .into_iter()
            .map(|task| InlineButton::new(task.title, format!("remind_select_{}", task.id)))
            .collect();
        out.push(
            origin
                .reply("Select a task to set a reminder:")
                .with_keyboard(InlineKeyboard::column(buttons)),
        );
        out
    }

    /// `remind_select_<id>`: remember the task and offer the periods.
    pub fn select_reminder_task(
        &mut self,
        origin: &EventOrigin,
        task_id: TaskId,
    ) -> Vec<OutboundMessage> {
        match self.store.get_by_id(origin.user, task_id) {
            Ok(Some(_)) => {}
            Ok(None) => return vec![origin.reply(TASK_NOT_FOUND)],
            Err(e) => {
                error!("failed to look up task {task_id}: {e}");
                return vec![origin.reply(STORE_FAILURE)];
            }
        }

        let mut out = Vec::new();
        let session = DialogSession::edit(task_id, EditKind::Reminder);
        if self.sessions.stage(origin.user) == DialogStage::AwaitingEditTarget {
            self.sessions.begin(origin.user, session);
            debug!("user {} selected task {task_id} for a reminder", origin.user);
        } else {
            self.begin(origin, session, &mut out);
        }

        let buttons = ReminderPeriod::ALL
            .iter()
            .map(|p| InlineButton::new(p.label(), p.payload()))
            .collect();
        out.push(
            origin
                .reply("Select reminder period:")
                .with_keyboard(InlineKeyboard::column(buttons)),
        );
        out
    }

    /// `remind_<n>_<unit>`: schedule the reminder for the selected task.
    pub fn choose_reminder_period(
        &mut self,
        origin: &EventOrigin,
        period: ReminderPeriod,
    ) -> Vec<OutboundMessage> {
        let target = self.sessions.get(origin.user).and_then(|s| match s.edit {
            Some(EditTarget {
                task_id,
                kind: EditKind::Reminder,
            }) if s.stage == DialogStage::AwaitingEditValue => Some(task_id),
            _ => None,
        });
        let Some(task_id) = target else {
            return vec![origin.reply(REMIND_FIRST)];
        };

        self.sessions.end(origin.user);
        self.scheduler
            .schedule_in(origin.chat, origin.user, task_id, period);
        vec![origin.update(format!("Reminder set for {} from now.", period.describe()))]
    }

    // ── cancellation ────────────────────────────────────────────────

    /// `/cancel`: destroy the user's session without writing anything.
    pub fn cancel(&mut self, origin: &EventOrigin) -> Vec<OutboundMessage> {
        let text = match self.sessions.end(origin.user).map(|s| s.stage) {
            None | Some(DialogStage::Idle) => "Nothing to cancel.",
            Some(
                stage @ (DialogStage::AwaitingTitle
                | DialogStage::AwaitingPriority
                | DialogStage::AwaitingDate),
            ) => {
                info!("user {} canceled task creation in {stage}", origin.user);
                "Task creation canceled."
            }
            Some(stage) => {
                info!("user {} canceled an edit in {stage}", origin.user);
                "Edit canceled."
            }
        };
        vec![origin.reply(text)]
    }
}

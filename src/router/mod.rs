//! Inbound event routing.
//!
//! [`CommandRouter`] classifies each [`InboundEvent`] as a command, free
//! text, or a button press and dispatches it. Dialogue steps go to the
//! [`ConversationEngine`]; listing, completion and priority edits are
//! one-shot handlers that talk to the store directly.

pub mod payload;

pub use payload::{CallbackAction, Command, PayloadError};

use crate::chat::types::{InboundEvent, InboundKind, InlineButton, InlineKeyboard, OutboundMessage};
use crate::dialog::engine::{ACTION_NOT_FOUND, STORE_FAILURE, TASK_NOT_FOUND};
use crate::dialog::{ConversationEngine, EventOrigin};
use crate::task::{Priority, TaskId, TaskStore, TaskStoreError};
use std::sync::Arc;
use tracing::{debug, error, info};

const WELCOME: &str = "Welcome to the Task Management Bot! Use /newtask to create a new task.";
const HELP: &str = "Available commands:\n\
/newtask - create a new task\n\
/tasks - list your tasks\n\
/remind - set a reminder for a pending task\n\
/cancel - cancel the current dialogue\n\
/help - show this message";

/// Routes inbound events to dialogue transitions and one-shot task actions.
pub struct CommandRouter {
    engine: ConversationEngine,
    store: Arc<dyn TaskStore>,
}

impl CommandRouter {
    pub fn new(engine: ConversationEngine, store: Arc<dyn TaskStore>) -> Self {
        Self { engine, store }
    }

    #[must_use]
    pub fn engine(&self) -> &ConversationEngine {
        &self.engine
    }

    /// Handle one inbound event and return the replies.
    pub fn handle(&mut self, event: &InboundEvent) -> Vec<OutboundMessage> {
        let origin = EventOrigin::from(event);
        match &event.kind {
            InboundKind::Text(text) => match Command::parse(text) {
                Some(command) => self.handle_command(&origin, command),
                None => self.engine.handle_text(&origin, text),
            },
            InboundKind::Callback { data, .. } => match CallbackAction::decode(data) {
                Ok(action) => self.handle_callback(&origin, action),
                Err(e) => {
                    debug!("rejected callback from user {}: {e}", origin.user);
                    vec![OutboundMessage::text(origin.chat, ACTION_NOT_FOUND)]
                }
            },
        }
    }

    fn handle_command(&mut self, origin: &EventOrigin, command: Command) -> Vec<OutboundMessage> {
        debug!("user {} sent {command:?}", origin.user);
        match command {
            Command::Start => vec![OutboundMessage::text(origin.chat, WELCOME)],
            Command::Help => vec![OutboundMessage::text(
                origin.chat,
                format!("{WELCOME}\n\n{HELP}"),
            )],
            Command::NewTask => self.engine.start_creation(origin),
            Command::Tasks => self.list_tasks(origin),
            Command::Remind => self.engine.start_reminder(origin),
            Command::Cancel => self.engine.cancel(origin),
            Command::Unknown(name) => vec![OutboundMessage::text(
                origin.chat,
                format!("Unknown command /{name}.\n\n{HELP}"),
            )],
        }
    }

    fn handle_callback(
        &mut self,
        origin: &EventOrigin,
        action: CallbackAction,
    ) -> Vec<OutboundMessage> {
        match action {
            CallbackAction::ChangePriority(task) => self.offer_priorities(origin, task),
            CallbackAction::ChangeDate(task) => self.engine.start_date_edit(origin, task),
            CallbackAction::MarkCompleted(task) => self.mark_completed(origin, task),
            CallbackAction::SetPriority { priority, task } => {
                self.set_priority(origin, task, priority)
            }
            CallbackAction::RemindSelect(task) => self.engine.select_reminder_task(origin, task),
            CallbackAction::RemindPeriod(period) => {
                self.engine.choose_reminder_period(origin, period)
            }
            CallbackAction::ChoosePriority(priority) => {
                self.engine.choose_priority(origin, priority)
            }
            CallbackAction::Calendar(token) => self.engine.handle_calendar(origin, &token),
        }
    }

    /// `/tasks`: one message per task with its action buttons.
    fn list_tasks(&self, origin: &EventOrigin) -> Vec<OutboundMessage> {
        let tasks = match self.store.list_by_owner(origin.user, None) {
            Ok(tasks) => tasks,
            Err(e) => {
                error!("failed to list tasks for user {}: {e}", origin.user);
                return vec![OutboundMessage::text(origin.chat, STORE_FAILURE)];
            }
        };
        if tasks.is_empty() {
            return vec![OutboundMessage::text(origin.chat, "No tasks found.")];
        }

        tasks
            .iter()
            .map(|task| {
                let id = task.id;
                OutboundMessage::text(origin.chat, task.summary_line()).with_keyboard(
                    InlineKeyboard::row(vec![
                        InlineButton::new("Change Priority", format!("change_priority_{id}")),
                        InlineButton::new("Change Date", format!("change_date_{id}")),
                        InlineButton::new("Mark as Completed", format!("mark_completed_{id}")),
                    ]),
                )
            })
            .collect()
    }

    fn offer_priorities(&self, origin: &EventOrigin, task: TaskId) -> Vec<OutboundMessage> {
        match self.store.get_by_id(origin.user, task) {
            Ok(Some(_)) => {}
            Ok(None) => return vec![OutboundMessage::text(origin.chat, TASK_NOT_FOUND)],
            Err(e) => {
                error!("failed to look up task {task}: {e}");
                return vec![OutboundMessage::text(origin.chat, STORE_FAILURE)];
            }
        }
        let buttons = Priority::ALL
            .iter()
            .map(|p| InlineButton::new(p.label(), format!("set_priority_{}_{task}", p.as_str())))
            .collect();
        vec![
            OutboundMessage::text(origin.chat, "Select new priority:")
                .with_keyboard(InlineKeyboard::column(buttons)),
        ]
    }

    fn set_priority(
        &self,
        origin: &EventOrigin,
        task: TaskId,
        priority: Priority,
    ) -> Vec<OutboundMessage> {
        let text = match self.store.update_priority(origin.user, task, priority) {
            Ok(_) => {
                info!("user {} set priority of task {task} to {priority}", origin.user);
                format!("Priority of task {task} set to {priority}.")
            }
            Err(TaskStoreError::NotFound(_)) => TASK_NOT_FOUND.to_owned(),
            Err(e) => {
                error!("failed to update priority of task {task}: {e}");
                STORE_FAILURE.to_owned()
            }
        };
        vec![OutboundMessage::text(origin.chat, text).editing(origin.message)]
    }

    fn mark_completed(&self, origin: &EventOrigin, task: TaskId) -> Vec<OutboundMessage> {
        match self.store.mark_completed(origin.user, task) {
            Ok(_) => {
                info!("user {} completed task {task}", origin.user);
                vec![
                    OutboundMessage::text(origin.chat, format!("Task {task} marked as completed."))
                        .editing(origin.message),
                ]
            }
            Err(TaskStoreError::NotFound(_)) => {
                vec![OutboundMessage::text(origin.chat, TASK_NOT_FOUND)]
            }
            Err(e) => {
                error!("failed to complete task {task}: {e}");
                vec![OutboundMessage::text(origin.chat, STORE_FAILURE)]
            }
        }
    }
}

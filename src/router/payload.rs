//! Inbound command and callback payload decoding.
//!
//! Callback payloads are decoded once into [`CallbackAction`]. Prefixes are
//! tried most specific first: `set_priority_` before `priority_`, and
//! `remind_select_` before `remind_`.

use crate::calendar::CALENDAR_PREFIX;
use crate::scheduler::ReminderPeriod;
use crate::task::{Priority, TaskId};

/// Callback decoding errors. All of them produce a "not found" reply.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    #[error("unrecognized callback payload `{0}`")]
    Unrecognized(String),
    #[error("invalid task id in `{0}`")]
    BadTaskId(String),
    #[error("unknown priority in `{0}`")]
    UnknownPriority(String),
    #[error("unknown reminder period in `{0}`")]
    UnknownPeriod(String),
}

/// Decoded button payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    /// `change_priority_<id>`: offer the priority buttons for a task.
    ChangePriority(TaskId),
    /// `change_date_<id>`: start a date edit.
    ChangeDate(TaskId),
    /// `mark_completed_<id>`.
    MarkCompleted(TaskId),
    /// `set_priority_<level>_<id>`: one-shot priority update.
    SetPriority { priority: Priority, task: TaskId },
    /// `remind_select_<id>`.
    RemindSelect(TaskId),
    /// `remind_<amount>_<unit>`.
    RemindPeriod(ReminderPeriod),
    /// `priority_<level>`: priority choice inside the creation flow.
    ChoosePriority(Priority),
    /// Date picker token, passed through untouched.
    Calendar(String),
}

impl CallbackAction {
    /// Decode a raw callback payload.
    pub fn decode(data: &str) -> Result<Self, PayloadError> {
        let task_id = |raw: &str| -> Result<TaskId, PayloadError> {
            raw.parse()
                .map_err(|_| PayloadError::BadTaskId(data.to_owned()))
        };
        let priority = |raw: &str| -> Result<Priority, PayloadError> {
            raw.parse()
                .map_err(|_| PayloadError::UnknownPriority(data.to_owned()))
        };

        if let Some(rest) = data.strip_prefix("set_priority_") {
            let (level, id) = rest
                .rsplit_once('_')
                .ok_or_else(|| PayloadError::Unrecognized(data.to_owned()))?;
            return Ok(Self::SetPriority {
                priority: priority(level)?,
                task: task_id(id)?,
            });
        }
        if let Some(id) = data.strip_prefix("change_priority_") {
            return Ok(Self::ChangePriority(task_id(id)?));
        }
        if let Some(id) = data.strip_prefix("change_date_") {
            return Ok(Self::ChangeDate(task_id(id)?));
        }
        if let Some(id) = data.strip_prefix("mark_completed_") {
            return Ok(Self::MarkCompleted(task_id(id)?));
        }
        if let Some(id) = data.strip_prefix("remind_select_") {
            return Ok(Self::RemindSelect(task_id(id)?));
        }
        if let Some(rest) = data.strip_prefix("remind_") {
            return rest
                .split_once('_')
                .and_then(|(amount, unit)| ReminderPeriod::from_parts(amount, unit))
                .map(Self::RemindPeriod)
                .ok_or_else(|| PayloadError::UnknownPeriod(data.to_owned()));
        }
        if let Some(level) = data.strip_prefix("priority_") {
            return Ok(Self::ChoosePriority(priority(level)?));
        }
        if data.starts_with(CALENDAR_PREFIX) {
            return Ok(Self::Calendar(data.to_owned()));
        }
        Err(PayloadError::Unrecognized(data.to_owned()))
    }
}

/// Slash command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    NewTask,
    Tasks,
    Remind,
    Cancel,
    Unknown(String),
}

impl Command {
    /// Parse a text message as a command. Returns `None` for free text.
    ///
    /// Arguments after the command word are ignored and a `@botname` suffix
    /// is stripped.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.trim_start().strip_prefix('/')?.split_whitespace().next()?;
        let name = word.split_once('@').map_or(word, |(name, _)| name);
        let command = match name.to_ascii_lowercase().as_str() {
            "start" => Self::Start,
            "help" => Self::Help,
            "newtask" => Self::NewTask,
            "tasks" => Self::Tasks,
            "remind" => Self::Remind,
            "cancel" => Self::Cancel,
            _ => Self::Unknown(name.to_owned()),
        };
        Some(command)
    }
}

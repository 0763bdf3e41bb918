//! Per-user dialogue state and the session registry.

use crate::task::{NewTask, Priority, TaskId, UserId};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::fmt;

/// Point in a dialogue awaiting a specific kind of input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DialogStage {
    #[default]
    Idle,
    AwaitingTitle,
    AwaitingPriority,
    AwaitingDate,
    /// Waiting for the user to pick which task a reminder is for.
    AwaitingEditTarget,
    /// Waiting for the new value of an edit (a date or a reminder period).
    AwaitingEditValue,
}

impl DialogStage {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AwaitingTitle => "awaiting_title",
            Self::AwaitingPriority => "awaiting_priority",
            Self::AwaitingDate => "awaiting_date",
            Self::AwaitingEditTarget => "awaiting_edit_target",
            Self::AwaitingEditValue => "awaiting_edit_value",
        }
    }
}

impl fmt::Display for DialogStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields collected by the creation flow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: Option<String>,
    pub priority: Option<Priority>,
    pub date: Option<NaiveDate>,
}

impl TaskDraft {
    /// The task to create, once every field is set.
    #[must_use]
    pub fn into_new_task(self, owner: UserId) -> Option<NewTask> {
        Some(NewTask {
            owner,
            title: self.title?,
            priority: self.priority?,
            date: self.date?,
        })
    }
}

/// Which value an edit flow is collecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    Date,
    Reminder,
}

/// Task being edited and the kind of value expected for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditTarget {
    pub task_id: TaskId,
    pub kind: EditKind,
}

/// Transient state of one user's dialogue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DialogSession {
    pub stage: DialogStage,
    pub draft: TaskDraft,
    pub edit: Option<EditTarget>,
    /// Tag of the date picker shown in this session.
    pub picker: Option<u32>,
}

impl DialogSession {
    /// Fresh creation dialogue waiting for a title.
    #[must_use]
    pub fn creation() -> Self {
        Self {
            stage: DialogStage::AwaitingTitle,
            ..Self::default()
        }
    }

    /// Reminder dialogue waiting for a task selection.
    #[must_use]
    pub fn reminder_selection() -> Self {
        Self {
            stage: DialogStage::AwaitingEditTarget,
            ..Self::default()
        }
    }

    /// Edit dialogue waiting for a new value for `task_id`.
    #[must_use]
    pub fn edit(task_id: TaskId, kind: EditKind) -> Self {
        Self {
            stage: DialogStage::AwaitingEditValue,
            edit: Some(EditTarget { task_id, kind }),
            ..Self::default()
        }
    }

    /// Whether a calendar selection means anything in this session.
    #[must_use]
    pub fn awaits_date(&self) -> bool {
        match self.stage {
            DialogStage::AwaitingDate => true,
            DialogStage::AwaitingEditValue => {
                matches!(self.edit, Some(EditTarget { kind: EditKind::Date, .. }))
            }
            _ => false,
        }
    }

    /// Tag of the picker whose tokens this session accepts right now.
    #[must_use]
    pub fn active_picker(&self) -> Option<u32> {
        self.picker.filter(|_| self.awaits_date())
    }
}

/// Active dialogues keyed by user. At most one session per user.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<UserId, DialogSession>,
}

impl SessionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, user: UserId) -> Option<&DialogSession> {
        self.sessions.get(&user)
    }

    pub fn get_mut(&mut self, user: UserId) -> Option<&mut DialogSession> {
        self.sessions.get_mut(&user)
    }

    /// Current stage, `Idle` when the user has no session.
    #[must_use]
    pub fn stage(&self, user: UserId) -> DialogStage {
        self.sessions
            .get(&user)
            .map_or(DialogStage::Idle, |session| session.stage)
    }

    /// Install `session` for `user`, returning any session it replaced.
    pub fn begin(&mut self, user: UserId, session: DialogSession) -> Option<DialogSession> {
        self.sessions.insert(user, session)
    }

    /// Destroy the user's session.
    pub fn end(&mut self, user: UserId) -> Option<DialogSession> {
        self.sessions.remove(&user)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

//! Task store contract.
//!
//! The conversation layer and the reminder scheduler both hold an
//! `Arc<dyn TaskStore>`. Implementations serialize access internally and
//! make every operation atomic per record.

use super::types::{NewTask, Priority, Task, TaskId, TaskStatus, UserId};
use chrono::NaiveDate;

/// Errors raised by task store implementations.
#[derive(Debug, thiserror::Error)]
pub enum TaskStoreError {
    /// No task with this id exists for the requesting owner.
    #[error("task {0} not found")]
    NotFound(TaskId),

    /// Underlying SQLite error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A stored row holds a value outside the task field domains.
    #[error("corrupt task row: {0}")]
    Corrupt(String),

    /// Store lock poisoned by a panicking writer.
    #[error("task store lock poisoned")]
    Lock,

    /// I/O error preparing the store location.
    #[error("I/O error: {0}")]
    Io(String),
}

/// Durable CRUD over task records, scoped by owner.
pub trait TaskStore: Send + Sync {
    /// Insert a new task with status `Pending` and return it with its id.
    fn create(&self, task: NewTask) -> Result<Task, TaskStoreError>;

    /// Fetch a task owned by `owner`, or `None` when absent.
    fn get_by_id(&self, owner: UserId, id: TaskId) -> Result<Option<Task>, TaskStoreError>;

    /// List tasks owned by `owner`, optionally filtered by status, in id order.
    fn list_by_owner(
        &self,
        owner: UserId,
        status: Option<TaskStatus>,
    ) -> Result<Vec<Task>, TaskStoreError>;

    /// Set a task's priority. Fails with `NotFound` for unknown ids.
    fn update_priority(
        &self,
        owner: UserId,
        id: TaskId,
        priority: Priority,
    ) -> Result<Task, TaskStoreError>;

    /// Set a task's due date. Fails with `NotFound` for unknown ids.
    fn update_date(&self, owner: UserId, id: TaskId, date: NaiveDate)
    -> Result<Task, TaskStoreError>;

    /// Mark a task completed. Idempotent for already-completed tasks.
    fn mark_completed(&self, owner: UserId, id: TaskId) -> Result<Task, TaskStoreError>;
}

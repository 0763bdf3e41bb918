//! Shared test utilities used across multiple test modules.

use crate::clock::ManualClock;
use crate::task::{NewTask, Priority, Task, TaskId, TaskStatus, TaskStore, TaskStoreError, UserId};
use chrono::{NaiveDate, TimeZone, Utc};
use std::sync::Arc;

/// Manual clock starting at 2024-03-01 09:00:00 UTC.
pub fn test_clock() -> Arc<ManualClock> {
    let start = Utc
        .with_ymd_and_hms(2024, 3, 1, 9, 0, 0)
        .single()
        .expect("valid start instant");
    Arc::new(ManualClock::new(start))
}

/// Store whose every operation fails, for exercising failure paths.
pub struct FailingStore;

impl FailingStore {
    fn fail<T>() -> Result<T, TaskStoreError> {
        Err(TaskStoreError::Io("store unavailable".to_owned()))
    }
}

impl TaskStore for FailingStore {
    fn create(&self, _task: NewTask) -> Result<Task, TaskStoreError> {
        Self::fail()
    }

    fn get_by_id(&self, _owner: UserId, _id: TaskId) -> Result<Option<Task>, TaskStoreError> {
        Self::fail()
    }

    fn list_by_owner(
        &self,
        _owner: UserId,
        _status: Option<TaskStatus>,
    ) -> Result<Vec<Task>, TaskStoreError> {
        Self::fail()
    }

    fn update_priority(
        &self,
        _owner: UserId,
        _id: TaskId,
        _priority: Priority,
    ) -> Result<Task, TaskStoreError> {
        Self::fail()
    }

    fn update_date(
        &self,
        _owner: UserId,
        _id: TaskId,
        _date: NaiveDate,
    ) -> Result<Task, TaskStoreError> {
        Self::fail()
    }

    fn mark_completed(&self, _owner: UserId, _id: TaskId) -> Result<Task, TaskStoreError> {
        Self::fail()
    }
}

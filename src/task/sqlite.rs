//! SQLite-backed task store.
//!
//! A single `tasks` table in one database file. Thread-safe via an internal
//! `Mutex<Connection>`; every operation holds the lock for its whole
//! read-modify-read sequence, so no partial update is ever observable.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::debug;

use super::schema::{apply_schema, read_schema_version};
use super::store::{TaskStore, TaskStoreError};
use super::types::{DATE_FORMAT, NewTask, Priority, Task, TaskId, TaskStatus, UserId};

const SELECT_COLUMNS: &str = "SELECT id, user_id, title, priority, date, status FROM tasks";

/// SQLite-backed [`TaskStore`].
pub struct SqliteTaskStore {
    conn: Mutex<Connection>,
}

impl SqliteTaskStore {
    /// Open (or create) the database at `path`, creating parent directories.
    pub fn open(path: &Path) -> Result<Self, TaskStoreError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| TaskStoreError::Io(e.to_string()))?;
        }
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, TaskStoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, TaskStoreError> {
        apply_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Read the current schema version from the database.
    pub fn schema_version(&self) -> Result<Option<u32>, TaskStoreError> {
        let conn = self.lock()?;
        Ok(read_schema_version(&conn)?)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, TaskStoreError> {
        self.conn.lock().map_err(|_| TaskStoreError::Lock)
    }
}

fn fetch(conn: &Connection, owner: UserId, id: TaskId) -> Result<Option<Task>, TaskStoreError> {
    let sql = format!("{SELECT_COLUMNS} WHERE id = ?1 AND user_id = ?2");
    let raw = conn
        .query_row(&sql, params![id.0, owner.0], RawTask::from_row)
        .optional()?;
    raw.map(RawTask::into_task).transpose()
}

fn fetch_existing(conn: &Connection, owner: UserId, id: TaskId) -> Result<Task, TaskStoreError> {
    fetch(conn, owner, id)?.ok_or(TaskStoreError::NotFound(id))
}

impl TaskStore for SqliteTaskStore {
    fn create(&self, task: NewTask) -> Result<Task, TaskStoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO tasks (user_id, title, priority, date, status) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                task.owner.0,
                task.title,
                task.priority.as_str(),
                task.date.format(DATE_FORMAT).to_string(),
                TaskStatus::Pending.as_str()
            ],
        )?;
        let id = TaskId(conn.last_insert_rowid());
        debug!("created task {id} for user {}", task.owner);
        Ok(Task {
            id,
            owner: task.owner,
            title: task.title,
            priority: task.priority,
            date: task.date,
            status: TaskStatus::Pending,
        })
    }

    fn get_by_id(&self, owner: UserId, id: TaskId) -> Result<Option<Task>, TaskStoreError> {
        let conn = self.lock()?;
        fetch(&conn, owner, id)
    }

    fn list_by_owner(
        &self,
        owner: UserId,
        status: Option<TaskStatus>,
    ) -> Result<Vec<Task>, TaskStoreError> {
        let conn = self.lock()?;
        let raws = match status {
            Some(status) => {
                let sql = format!("{SELECT_COLUMNS} WHERE user_id = ?1 AND status = ?2 ORDER BY id");
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params![owner.0, status.as_str()], RawTask::from_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
            None => {
                let sql = format!("{SELECT_COLUMNS} WHERE user_id = ?1 ORDER BY id");
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params![owner.0], RawTask::from_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
        };
        raws.into_iter().map(RawTask::into_task).collect()
    }

    fn update_priority(
        &self,
        owner: UserId,
        id: TaskId,
        priority: Priority,
    ) -> Result<Task, TaskStoreError> {
        let conn = self.lock()?;
        let rows = conn.execute(
            "UPDATE tasks SET priority = ?1 WHERE id = ?2 AND user_id = ?3",
            params![priority.as_str(), id.0, owner.0],
        )?;
        if rows == 0 {
            return Err(TaskStoreError::NotFound(id));
        }
        fetch_existing(&conn, owner, id)
    }

    fn update_date(
        &self,
        owner: UserId,
        id: TaskId,
        date: NaiveDate,
    ) -> Result<Task, TaskStoreError> {
        let conn = self.lock()?;
        let rows = conn.execute(
            "UPDATE tasks SET date = ?1 WHERE id = ?2 AND user_id = ?3",
            params![date.format(DATE_FORMAT).to_string(), id.0, owner.0],
        )?;
        if rows == 0 {
            return Err(TaskStoreError::NotFound(id));
        }
        fetch_existing(&conn, owner, id)
    }

    fn mark_completed(&self, owner: UserId, id: TaskId) -> Result<Task, TaskStoreError> {
        let conn = self.lock()?;
        let rows = conn.execute(
            "UPDATE tasks SET status = ?1 WHERE id = ?2 AND user_id = ?3",
            params![TaskStatus::Completed.as_str(), id.0, owner.0],
        )?;
        if rows == 0 {
            return Err(TaskStoreError::NotFound(id));
        }
        fetch_existing(&conn, owner, id)
    }
}

/// Row as stored, before domain validation.
struct RawTask {
    id: i64,
    user_id: i64,
    title: String,
    priority: String,
    date: String,
    status: String,
}

impl RawTask {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            title: row.get(2)?,
            priority: row.get(3)?,
            date: row.get(4)?,
            status: row.get(5)?,
        })
    }

    fn into_task(self) -> Result<Task, TaskStoreError> {
        let corrupt = |e: &dyn std::fmt::Display| {
            TaskStoreError::Corrupt(format!("task {}: {e}", self.id))
        };
        let priority = self.priority.parse::<Priority>().map_err(|e| corrupt(&e))?;
        let status = self.status.parse::<TaskStatus>().map_err(|e| corrupt(&e))?;
        let date = NaiveDate::parse_from_str(&self.date, DATE_FORMAT).map_err(|e| corrupt(&e))?;
        Ok(Task {
            id: TaskId(self.id),
            owner: UserId(self.user_id),
            title: self.title,
            priority,
            date,
            status,
        })
    }
}

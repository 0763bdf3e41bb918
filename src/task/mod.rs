//! Task records and their persistent store.
//!
//! Sub-modules:
//! - `types`: task record, priority, status, and ids.
//! - `store`: the [`TaskStore`] contract and its error type.
//! - `schema`: SQLite DDL definitions.
//! - `sqlite`: SQLite-backed [`SqliteTaskStore`].

pub(crate) mod schema;
pub mod sqlite;
pub mod store;
pub mod types;

pub use sqlite::SqliteTaskStore;
pub use store::{TaskStore, TaskStoreError};
pub use types::{DATE_FORMAT, NewTask, Priority, Task, TaskId, TaskStatus, UnknownValue, UserId};

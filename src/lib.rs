//! Taskbot: a chat-driven task manager.
//!
//! Users create tasks through a guided dialogue, list and edit them from
//! inline buttons, and ask for reminders that fire later.
//!
//! # Architecture
//!
//! - **Task store**: durable CRUD over task records (`rusqlite`)
//! - **Reminder scheduler**: one-shot timed jobs fired on their own tokio task
//! - **Dialog sessions**: per-user transient state for multi-step flows
//! - **Conversation engine**: the state machine driving creation and edits
//! - **Command router**: classifies inbound chat events and dispatches them
//! - **Chat transport**: pluggable adapters (Telegram Bot API)

pub mod calendar;
pub mod chat;
pub mod clock;
pub mod config;
pub mod dialog;
pub mod error;
pub mod router;
pub mod runtime;
pub mod scheduler;
pub mod task;

#[cfg(test)]
pub(crate) mod test_utils;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::BotConfig;
pub use error::{BotError, Result};
pub use router::CommandRouter;
pub use runtime::BotRuntime;
pub use scheduler::ReminderScheduler;
pub use task::{Priority, SqliteTaskStore, Task, TaskId, TaskStatus, TaskStore, UserId};

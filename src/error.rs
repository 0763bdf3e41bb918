//! Error types for the task bot.

use crate::task::store::TaskStoreError;

/// Top-level error type for the task bot.
#[derive(Debug, thiserror::Error)]
pub enum BotError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Task store error.
    #[error("store error: {0}")]
    Store(#[from] TaskStoreError),

    /// Reminder scheduler error (job persistence, state file).
    #[error("scheduler error: {0}")]
    Scheduler(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, BotError>;

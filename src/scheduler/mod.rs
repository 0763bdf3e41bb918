//! Reminder scheduling.
//!
//! Users pick one of a fixed set of relative delays for a task; the
//! scheduler turns that into an absolute fire time and delivers a one-shot
//! reminder into the chat outbox when it comes due.

pub mod reminder;
pub mod runner;

pub use reminder::{PeriodUnit, ReminderJob, ReminderPeriod};
pub use runner::{FiredReminder, ReminderOutcome, ReminderScheduler};

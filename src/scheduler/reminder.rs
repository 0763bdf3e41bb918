//! Reminder job and period definitions.

use crate::chat::types::ChatId;
use crate::task::{TaskId, UserId};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unit of a reminder period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodUnit {
    Hour,
    Day,
}

/// The fixed set of relative delays a user may pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReminderPeriod {
    OneHour,
    FiveHours,
    TenHours,
    OneDay,
    ThreeDays,
    TenDays,
}

impl ReminderPeriod {
    /// All periods in menu order.
    pub const ALL: [Self; 6] = [
        Self::OneHour,
        Self::FiveHours,
        Self::TenHours,
        Self::OneDay,
        Self::ThreeDays,
        Self::TenDays,
    ];

    #[must_use]
    pub fn amount(self) -> u32 {
        match self {
            Self::OneHour | Self::OneDay => 1,
            Self::ThreeDays => 3,
            Self::FiveHours => 5,
            Self::TenHours | Self::TenDays => 10,
        }
    }

    #[must_use]
    pub fn unit(self) -> PeriodUnit {
        match self {
            Self::OneHour | Self::FiveHours | Self::TenHours => PeriodUnit::Hour,
            Self::OneDay | Self::ThreeDays | Self::TenDays => PeriodUnit::Day,
        }
    }

    /// Delay between scheduling and firing.
    #[must_use]
    pub fn duration(self) -> Duration {
        let amount = i64::from(self.amount());
        match self.unit() {
            PeriodUnit::Hour => Duration::hours(amount),
            PeriodUnit::Day => Duration::days(amount),
        }
    }

    /// Lower-case description, e.g. `5 hours`.
    #[must_use]
    pub fn describe(self) -> String {
        let unit = match (self.unit(), self.amount()) {
            (PeriodUnit::Hour, 1) => "hour",
            (PeriodUnit::Hour, _) => "hours",
            (PeriodUnit::Day, 1) => "day",
            (PeriodUnit::Day, _) => "days",
        };
        format!("{} {unit}", self.amount())
    }

    /// Button label, e.g. `5 Hours`.
    #[must_use]
    pub fn label(self) -> String {
        let mut described = self.describe();
        if let Some(space) = described.find(' ') {
            described[space + 1..space + 2].make_ascii_uppercase();
        }
        described
    }

    /// Button payload, e.g. `remind_5_hours`.
    #[must_use]
    pub fn payload(self) -> String {
        format!("remind_{}", self.describe().replace(' ', "_"))
    }

    /// Match an `<amount>_<unit>` pair against the fixed set. Singular and
    /// plural unit spellings are both accepted.
    #[must_use]
    pub fn from_parts(amount: &str, unit: &str) -> Option<Self> {
        let amount: u32 = amount.parse().ok()?;
        let unit = match unit {
            "hour" | "hours" => PeriodUnit::Hour,
            "day" | "days" => PeriodUnit::Day,
            _ => return None,
        };
        Self::ALL
            .into_iter()
            .find(|p| p.amount() == amount && p.unit() == unit)
    }
}

/// A pending one-shot reminder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderJob {
    pub id: Uuid,
    pub chat: ChatId,
    pub owner: UserId,
    pub task_id: TaskId,
    pub fire_at: DateTime<Utc>,
}

impl ReminderJob {
    #[must_use]
    pub fn new(chat: ChatId, owner: UserId, task_id: TaskId, fire_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            chat,
            owner,
            task_id,
            fire_at,
        }
    }

    /// Whether the job is due at `now`.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.fire_at <= now
    }
}

//! Inline-keyboard date picker.
//!
//! The picker is stateless: every button carries a token describing the page
//! it leads to or the value it selects, and [`DatePicker::process`] maps a
//! token to either a new page ([`PickerOutcome::Navigate`]) or a concrete
//! date ([`PickerOutcome::Resolved`]). The dialogue engine never sees picker
//! internals beyond that outcome.
//!
//! Token layout: `cal_<tag>_<step>_<action>_<year>_<month>_<day>`. `tag`
//! identifies one shown picker; tokens from any other picker are rejected as
//! [`PickerError::Stale`]. `step` is `y`, `m` or `d` and `action` is `go`
//! (show a page) or `set` (select). Filler cells carry `cal_ignore`.

use crate::chat::types::{InlineButton, InlineKeyboard};
use chrono::{Datelike, NaiveDate};
use std::fmt;

/// Prefix shared by every picker token.
pub const CALENDAR_PREFIX: &str = "cal_";

const IGNORE_TOKEN: &str = "cal_ignore";
/// Largest number of years shown on one year page.
pub const MAX_YEAR_SPAN: i32 = 12;
const MIN_YEAR: i32 = 1;
const MAX_YEAR: i32 = 9999;
const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];
const WEEKDAY_NAMES: [&str; 7] = ["Mo", "Tu", "We", "Th", "Fr", "Sa", "Su"];

/// Picker token decoding errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PickerError {
    #[error("malformed calendar token `{0}`")]
    Malformed(String),
    #[error("calendar date out of range: {year}-{month}-{day}")]
    InvalidDate { year: i32, month: u32, day: u32 },
    #[error("calendar token belongs to picker {found}, active picker is {active}")]
    Stale { found: u32, active: u32 },
}

/// Calendar page level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerStep {
    Year,
    Month,
    Day,
}

impl PickerStep {
    fn code(self) -> &'static str {
        match self {
            Self::Year => "y",
            Self::Month => "m",
            Self::Day => "d",
        }
    }

    fn prompt(self) -> &'static str {
        match self {
            Self::Year => "Select year",
            Self::Month => "Select month",
            Self::Day => "Select day",
        }
    }
}

/// What pressing a picker button does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerAction {
    /// Show the page identified by the token.
    Go,
    /// Select the value identified by the token.
    Set,
}

/// Decoded picker token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PickerToken {
    pub tag: u32,
    pub step: PickerStep,
    pub action: PickerAction,
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl PickerToken {
    fn new(
        tag: u32,
        step: PickerStep,
        action: PickerAction,
        year: i32,
        month: u32,
        day: u32,
    ) -> Self {
        Self {
            tag,
            step,
            action,
            year,
            month,
            day,
        }
    }
}

impl fmt::Display for PickerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let action = match self.action {
            PickerAction::Go => "go",
            PickerAction::Set => "set",
        };
        write!(
            f,
            "{CALENDAR_PREFIX}{}_{}_{action}_{}_{}_{}",
            self.tag,
            self.step.code(),
            self.year,
            self.month,
            self.day
        )
    }
}

/// Decoded picker payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerInput {
    Token(PickerToken),
    /// Filler cell (weekday header, blank day).
    Ignore,
}

impl PickerInput {
    /// Decode a callback payload.
    pub fn parse(data: &str) -> Result<Self, PickerError> {
        if data == IGNORE_TOKEN {
            return Ok(Self::Ignore);
        }
        let malformed = || PickerError::Malformed(data.to_owned());
        let rest = data.strip_prefix(CALENDAR_PREFIX).ok_or_else(malformed)?;
        let parts: Vec<&str> = rest.split('_').collect();
        let [tag, step, action, year, month, day] = parts.as_slice() else {
            return Err(malformed());
        };
        let tag: u32 = tag.parse().map_err(|_| malformed())?;
        let step = match *step {
            "y" => PickerStep::Year,
            "m" => PickerStep::Month,
            "d" => PickerStep::Day,
            _ => return Err(malformed()),
        };
        let action = match *action {
            "go" => PickerAction::Go,
            "set" => PickerAction::Set,
            _ => return Err(malformed()),
        };
        let year: i32 = year.parse().map_err(|_| malformed())?;
        let month: u32 = month.parse().map_err(|_| malformed())?;
        let day: u32 = day.parse().map_err(|_| malformed())?;
        Ok(Self::Token(PickerToken::new(
            tag, step, action, year, month, day,
        )))
    }
}

/// A rendered picker page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickerView {
    pub prompt: String,
    pub keyboard: InlineKeyboard,
}

/// Result of processing a picker payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerOutcome {
    /// Still navigating; re-render with this page.
    Navigate(PickerView),
    /// The user picked a concrete date.
    Resolved(NaiveDate),
    /// Filler button; nothing to do.
    Ignore,
}

/// Stateless three-step date picker (year, month, day).
///
/// Every page is rendered for one picker tag, chosen by the caller when the
/// picker is first shown.
#[derive(Debug, Clone, Copy)]
pub struct DatePicker {
    year_span: i32,
}

impl Default for DatePicker {
    fn default() -> Self {
        Self::new(4)
    }
}

impl DatePicker {
    #[must_use]
    pub fn new(year_span: i32) -> Self {
        Self {
            year_span: year_span.clamp(1, MAX_YEAR_SPAN),
        }
    }

    /// First page of picker `tag`: years starting at `today`'s year.
    #[must_use]
    pub fn start(&self, today: NaiveDate, tag: u32) -> PickerView {
        self.year_page(tag, today.year())
    }

    /// Process a payload pressed on picker `tag`.
    pub fn process(&self, data: &str, tag: u32) -> Result<PickerOutcome, PickerError> {
        let token = match PickerInput::parse(data)? {
            PickerInput::Ignore => return Ok(PickerOutcome::Ignore),
            PickerInput::Token(token) => token,
        };
        if token.tag != tag {
            return Err(PickerError::Stale {
                found: token.tag,
                active: tag,
            });
        }
        let invalid = || PickerError::InvalidDate {
            year: token.year,
            month: token.month,
            day: token.day,
        };
        if !(MIN_YEAR..=MAX_YEAR).contains(&token.year) {
            return Err(invalid());
        }

        let outcome = match (token.step, token.action) {
            (PickerStep::Year, PickerAction::Go) => {
                PickerOutcome::Navigate(self.year_page(tag, token.year))
            }
            (PickerStep::Year, PickerAction::Set) | (PickerStep::Month, PickerAction::Go) => {
                PickerOutcome::Navigate(self.month_page(tag, token.year))
            }
            (PickerStep::Month, PickerAction::Set) | (PickerStep::Day, PickerAction::Go) => {
                let first = NaiveDate::from_ymd_opt(token.year, token.month, 1).ok_or_else(invalid)?;
                PickerOutcome::Navigate(self.day_page(tag, first))
            }
            (PickerStep::Day, PickerAction::Set) => {
                let date = NaiveDate::from_ymd_opt(token.year, token.month, token.day)
                    .ok_or_else(invalid)?;
                PickerOutcome::Resolved(date)
            }
        };
        Ok(outcome)
    }

    fn year_page(&self, tag: u32, start: i32) -> PickerView {
        let start = start.clamp(MIN_YEAR, MAX_YEAR);
        let end = start.saturating_add(self.year_span - 1).min(MAX_YEAR);
        let years: Vec<InlineButton> = (start..=end)
            .map(|year| {
                InlineButton::new(
                    year.to_string(),
                    PickerToken::new(tag, PickerStep::Year, PickerAction::Set, year, 1, 1)
                        .to_string(),
                )
            })
            .collect();
        let prev = start.saturating_sub(self.year_span).max(MIN_YEAR);
        let next = start.saturating_add(self.year_span).min(MAX_YEAR);
        let nav = vec![
            nav_button("«", PickerToken::new(tag, PickerStep::Year, PickerAction::Go, prev, 1, 1)),
            nav_button("»", PickerToken::new(tag, PickerStep::Year, PickerAction::Go, next, 1, 1)),
        ];
        view(PickerStep::Year, vec![years, nav])
    }

    fn month_page(&self, tag: u32, year: i32) -> PickerView {
        let mut rows: Vec<Vec<InlineButton>> = MONTH_NAMES
            .chunks(4)
            .enumerate()
            .map(|(chunk, names)| {
                names
                    .iter()
                    .enumerate()
                    .map(|(i, name)| {
                        let month = (chunk * 4 + i + 1) as u32;
                        InlineButton::new(
                            *name,
                            PickerToken::new(
                                tag,
                                PickerStep::Month,
                                PickerAction::Set,
                                year,
                                month,
                                1,
                            )
                            .to_string(),
                        )
                    })
                    .collect()
            })
            .collect();
        rows.push(vec![
            nav_button(
                "«",
                PickerToken::new(
                    tag,
                    PickerStep::Month,
                    PickerAction::Go,
                    (year - 1).max(MIN_YEAR),
                    1,
                    1,
                ),
            ),
            nav_button(
                &year.to_string(),
                PickerToken::new(tag, PickerStep::Year, PickerAction::Go, year, 1, 1),
            ),
            nav_button(
                "»",
                PickerToken::new(
                    tag,
                    PickerStep::Month,
                    PickerAction::Go,
                    (year + 1).min(MAX_YEAR),
                    1,
                    1,
                ),
            ),
        ]);
        view(PickerStep::Month, rows)
    }

    fn day_page(&self, tag: u32, first: NaiveDate) -> PickerView {
        let (year, month) = (first.year(), first.month());
        let mut rows = vec![
            WEEKDAY_NAMES
                .iter()
                .map(|name| InlineButton::new(*name, IGNORE_TOKEN))
                .collect::<Vec<_>>(),
        ];

        let mut week: Vec<InlineButton> = (0..first.weekday().num_days_from_monday())
            .map(|_| InlineButton::new(" ", IGNORE_TOKEN))
            .collect();
        for day in 1..=days_in_month(first) {
            week.push(InlineButton::new(
                day.to_string(),
                PickerToken::new(tag, PickerStep::Day, PickerAction::Set, year, month, day)
                    .to_string(),
            ));
            if week.len() == 7 {
                rows.push(std::mem::take(&mut week));
            }
        }
        if !week.is_empty() {
            week.resize(7, InlineButton::new(" ", IGNORE_TOKEN));
            rows.push(week);
        }

        let (prev_year, prev_month) = if month == 1 {
            (year - 1, 12)
        } else {
            (year, month - 1)
        };
        let (next_year, next_month) = if month == 12 {
            (year + 1, 1)
        } else {
            (year, month + 1)
        };
        let mut nav = Vec::with_capacity(3);
        if prev_year >= MIN_YEAR {
            nav.push(nav_button(
                "«",
                PickerToken::new(tag, PickerStep::Day, PickerAction::Go, prev_year, prev_month, 1),
            ));
        }
        nav.push(nav_button(
            &format!("{} {year}", MONTH_NAMES[(month - 1) as usize]),
            PickerToken::new(tag, PickerStep::Month, PickerAction::Go, year, 1, 1),
        ));
        if next_year <= MAX_YEAR {
            nav.push(nav_button(
                "»",
                PickerToken::new(tag, PickerStep::Day, PickerAction::Go, next_year, next_month, 1),
            ));
        }
        rows.push(nav);
        view(PickerStep::Day, rows)
    }
}

fn nav_button(label: &str, token: PickerToken) -> InlineButton {
    InlineButton::new(label, token.to_string())
}

fn view(step: PickerStep, rows: Vec<Vec<InlineButton>>) -> PickerView {
    PickerView {
        prompt: step.prompt().to_owned(),
        keyboard: InlineKeyboard { rows },
    }
}

fn days_in_month(first: NaiveDate) -> u32 {
    let next = if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
    };
    next.map_or(31, |next| (next - first).num_days() as u32)
}

//! Reporting window resolution.
//!
//! A window is either given explicitly as two calendar dates, or derived from
//! "N weeks back" plus the weekday a week starts on.

use chrono::{DateTime, Datelike, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use thiserror::Error;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Errors produced while resolving a window.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WindowError {
    /// A date flag was not in `YYYY-MM-DD` form.
    #[error("invalid date {value:?}: expected YYYY-MM-DD")]
    InvalidDate { value: String },

    /// The start-of-week value is not a weekday name.
    #[error("invalid value for --start-of-week: {value:?}")]
    InvalidWeekday { value: String },

    /// The window would end before it starts.
    #[error("window start {start} is after window end {end}")]
    InvalidRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// A half-open instant range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    /// Creates a window, rejecting `start > end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, WindowError> {
        if start > end {
            return Err(WindowError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Returns true if `instant` lies in `[start, end)`.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant < self.end
    }
}

/// Parses a full weekday name, ignoring case.
pub fn parse_weekday(name: &str) -> Result<Weekday, WindowError> {
    match name.trim().to_ascii_lowercase().as_str() {
        "sunday" => Ok(Weekday::Sun),
        "monday" => Ok(Weekday::Mon),
        "tuesday" => Ok(Weekday::Tue),
        "wednesday" => Ok(Weekday::Wed),
        "thursday" => Ok(Weekday::Thu),
        "friday" => Ok(Weekday::Fri),
        "saturday" => Ok(Weekday::Sat),
        _ => Err(WindowError::InvalidWeekday {
            value: name.to_string(),
        }),
    }
}

/// Resolves the reporting window.
///
/// When both `start_date` and `end_date` are given they are parsed as UTC
/// midnights and used as-is, so `end_date` should be the day after the last
/// day wanted. Otherwise the week `weeks_back` weeks before `now` is used,
/// starting at local midnight on `week_start` in `now`'s time zone.
pub fn resolve<Tz: TimeZone>(
    start_date: Option<&str>,
    end_date: Option<&str>,
    week_start: &str,
    weeks_back: u32,
    now: &DateTime<Tz>,
) -> Result<TimeWindow, WindowError> {
    match (start_date, end_date) {
        (Some(start), Some(end)) => {
            let start = parse_date(start)?;
            let end = parse_date(end)?;
            TimeWindow::new(start, end)
        }
        (start, end) => {
            if start.is_some() || end.is_some() {
                tracing::debug!(
                    ?start,
                    ?end,
                    "only one explicit date given, falling back to weekly window"
                );
            }
            let first_day = parse_weekday(week_start)?;
            Ok(week_bounds(now, weeks_back, first_day))
        }
    }
}

fn parse_date(value: &str) -> Result<DateTime<Utc>, WindowError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
        .map_err(|_| WindowError::InvalidDate {
            value: value.to_string(),
        })
}

/// Computes the week `weeks_back` weeks before `now` that begins on `first_day`.
///
/// Both bounds are local midnights, so the window covers seven calendar days
/// even across a DST change.
fn week_bounds<Tz: TimeZone>(
    now: &DateTime<Tz>,
    weeks_back: u32,
    first_day: Weekday,
) -> TimeWindow {
    let tz = now.timezone();
    let anchor = now.date_naive() - chrono::Duration::days(7 * i64::from(weeks_back));
    let days_since_first = (anchor.weekday().num_days_from_monday() + 7
        - first_day.num_days_from_monday())
        % 7;
    let first = anchor - chrono::Duration::days(i64::from(days_since_first));
    let next = first + chrono::Duration::days(7);

    TimeWindow {
        start: local_midnight_to_utc(&tz, first),
        end: local_midnight_to_utc(&tz, next),
    }
}

/// Converts a local date at midnight to UTC.
/// Handles DST ambiguity by picking the earlier time.
fn local_midnight_to_utc<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    match tz.from_local_datetime(&midnight) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
        LocalResult::None => {
            // Midnight skipped by a spring-forward transition
            let one_am = midnight + chrono::Duration::hours(1);
            tz.from_local_datetime(&one_am)
                .earliest()
                .map_or_else(|| midnight.and_utc(), |dt| dt.with_timezone(&Utc))
        }
    }
}

//! Calendar helpers shared by the resolver, the view windows and the timeline.
//!
//! Every day-boundary computation goes through the household timezone: a
//! "day" is always a local calendar day, never a UTC day. Functions here take
//! an already-parsed [`Tz`]; parsing strings into timezones, instants and day
//! keys happens once at the boundary via [`parse_timezone`], [`parse_instant`]
//! and [`parse_day_key`].

use chrono::{
    DateTime, Datelike, Days, Duration, NaiveDate, NaiveTime, TimeZone, Utc, Weekday,
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Format used for day keys and skip dates.
pub const DAY_KEY_FORMAT: &str = "%Y-%m-%d";

// ── Configurable week start ─────────────────────────────────────────────────

/// Which day begins a week for week-view and month-grid computations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekStartDay {
    /// ISO 8601 standard (Monday = day 0 of the week).
    #[default]
    Monday,
    /// US/Canada convention (Sunday = day 0 of the week).
    Sunday,
}

/// How many days `weekday` is from the week-start day.
fn days_from_week_start(weekday: Weekday, week_start: WeekStartDay) -> u64 {
    match week_start {
        WeekStartDay::Monday => u64::from(weekday.num_days_from_monday()),
        WeekStartDay::Sunday => u64::from(weekday.num_days_from_sunday()),
    }
}

/// The first day of the week containing `date`.
///
/// Fails only when that day falls before the earliest representable date.
pub fn week_start(date: NaiveDate, week_start: WeekStartDay) -> Result<NaiveDate> {
    let back = days_from_week_start(date.weekday(), week_start);
    date.checked_sub_days(Days::new(back))
        .ok_or_else(|| EngineError::InvalidDate(format!("no week start before {}", date)))
}

// ── Boundary parsing ────────────────────────────────────────────────────────

/// Parse an IANA timezone string into `Tz`.
pub fn parse_timezone(s: &str) -> Result<Tz> {
    s.parse::<Tz>()
        .map_err(|_| EngineError::InvalidTimezone(format!("'{}'", s)))
}

/// Parse an RFC 3339 datetime string into `DateTime<Utc>`.
pub fn parse_instant(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| EngineError::InvalidDatetime(format!("'{}': {}", s, e)))
}

/// Parse a `YYYY-MM-DD` day key.
pub fn parse_day_key(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DAY_KEY_FORMAT)
        .map_err(|e| EngineError::InvalidDate(format!("'{}': {}", s, e)))
}

// ── Day keys and local days ─────────────────────────────────────────────────

/// Render a date as a day key (`YYYY-MM-DD`).
pub fn day_key(date: NaiveDate) -> String {
    date.format(DAY_KEY_FORMAT).to_string()
}

/// The local calendar day of `instant` in `tz`.
pub fn local_date(instant: DateTime<Utc>, tz: Tz) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}

/// The day key of `instant` in `tz`.
pub fn format_day(instant: DateTime<Utc>, tz: Tz) -> String {
    day_key(local_date(instant, tz))
}

/// Convert a local wall-clock time to a UTC instant.
///
/// Ambiguous times (DST fall-back) pick the earlier instant. Nonexistent
/// times (DST spring-forward gap) move forward by the gap, one hour at most.
pub fn local_instant(date: NaiveDate, time: NaiveTime, tz: Tz) -> Result<DateTime<Utc>> {
    let naive = date.and_time(time);
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| {
            let shifted = naive.checked_add_signed(Duration::hours(1))?;
            tz.from_local_datetime(&shifted).earliest()
        })
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| {
            EngineError::InvalidDatetime(format!("nonexistent local time {} in {}", naive, tz))
        })
}

/// The instant the local day `date` begins.
pub fn start_of_day(date: NaiveDate, tz: Tz) -> Result<DateTime<Utc>> {
    local_instant(date, NaiveTime::MIN, tz)
}

/// The last representable instant of the local day `date`.
pub fn end_of_day(date: NaiveDate, tz: Tz) -> Result<DateTime<Utc>> {
    let next = date
        .succ_opt()
        .ok_or_else(|| EngineError::InvalidDate(format!("no day after {}", date)))?;
    start_of_day(next, tz)?
        .checked_sub_signed(Duration::nanoseconds(1))
        .ok_or_else(|| EngineError::InvalidDate(format!("no end of day for {}", date)))
}

// ── Month arithmetic ────────────────────────────────────────────────────────

/// The first day of `year`-`month`.
pub fn first_of_month(year: i32, month: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| EngineError::InvalidDate(format!("{}-{:02}", year, month)))
}

/// Number of days in `year`-`month`, or `None` for an invalid month.
pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let (ny, nm) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let first_next = NaiveDate::from_ymd_opt(ny, nm, 1)?;
    Some(first_next.pred_opt()?.day())
}

/// Build a date, clamping `day` to the last valid day of the month.
///
/// `clamped_date(2023, 2, 29)` is Feb 28, 2023; `clamped_date(2024, 4, 31)`
/// is Apr 30, 2024.
pub fn clamped_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    let last = days_in_month(year, month)?;
    NaiveDate::from_ymd_opt(year, month, day.clamp(1, last))
}

// ── Tests ───────────────────────────────────────────────────────────────────

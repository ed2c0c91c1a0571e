//! Query windows for the calendar views.
//!
//! Every view reduces to a [`DateWindow`]: an inclusive pair of instants
//! spanning whole local days in the household timezone. The materializer
//! treats all windows uniformly.
//!
//! - agenda: rolling N days from a start day, extended in 14-day pages
//! - week: 7 days from the week start on/before a date
//! - month: a fixed 42-cell grid from the week start on/before the 1st
//! - custom: any user-chosen day range, optionally saved as a [`NamedRange`]

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::temporal::{
    end_of_day, first_of_month, local_date, start_of_day, week_start, WeekStartDay,
};

/// Default length of the agenda view, in days.
pub const DEFAULT_AGENDA_DAYS: u32 = 14;

/// Days appended each time the agenda is scrolled to its end.
pub const AGENDA_PAGE_DAYS: u32 = 14;

/// Cells in a month grid: six weeks.
pub const MONTH_GRID_CELLS: usize = 42;

// ── DateWindow ──────────────────────────────────────────────────────────────

/// An inclusive `[start, end]` query window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateWindow {
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidWindow`] if `start` is after `end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start > end {
            return Err(EngineError::InvalidWindow(format!(
                "start {} is after end {}",
                start.to_rfc3339(),
                end.to_rfc3339()
            )));
        }
        Ok(DateWindow { start, end })
    }

    /// The window covering local days `first..=last` in `tz`.
    pub fn from_days(first: NaiveDate, last: NaiveDate, tz: Tz) -> Result<Self> {
        if first > last {
            return Err(EngineError::InvalidWindow(format!(
                "first day {} is after last day {}",
                first, last
            )));
        }
        DateWindow::new(start_of_day(first, tz)?, end_of_day(last, tz)?)
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }

    /// Local days touched by this window, in order.
    pub fn local_days(&self, tz: Tz) -> Vec<NaiveDate> {
        let first = local_date(self.start, tz);
        let last = local_date(self.end, tz);
        first.iter_days().take_while(|d| *d <= last).collect()
    }
}

// ── Agenda ──────────────────────────────────────────────────────────────────

/// A rolling window of `days` local days starting at `start`.
pub fn agenda(start: NaiveDate, days: u32, tz: Tz) -> Result<DateWindow> {
    if days == 0 {
        return Err(EngineError::InvalidWindow(
            "agenda must span at least one day".to_string(),
        ));
    }
    DateWindow::from_days(start, last_day(start, u64::from(days))?, tz)
}

/// The last day of a span of `days` days beginning at `first`.
fn last_day(first: NaiveDate, days: u64) -> Result<NaiveDate> {
    first
        .checked_add_days(Days::new(days.saturating_sub(1)))
        .ok_or_else(|| {
            EngineError::InvalidWindow(format!("{} days from {} is out of range", days, first))
        })
}

/// The growing agenda a user scrolls through.
///
/// The window always starts at the same day; each [`AgendaCursor::extend`]
/// appends another page so results accumulate rather than replace.
#[derive(Debug, Clone)]
pub struct AgendaCursor {
    start: NaiveDate,
    days: u32,
    tz: Tz,
}

impl AgendaCursor {
    pub fn new(start: NaiveDate, days: u32, tz: Tz) -> Self {
        AgendaCursor {
            start,
            days: days.max(1),
            tz,
        }
    }

    pub fn days(&self) -> u32 {
        self.days
    }

    pub fn window(&self) -> Result<DateWindow> {
        agenda(self.start, self.days, self.tz)
    }

    /// Called when the list end is reached.
    pub fn extend(&mut self) -> Result<DateWindow> {
        self.days = self.days.saturating_add(AGENDA_PAGE_DAYS);
        self.window()
    }
}

// ── Week ────────────────────────────────────────────────────────────────────

/// The 7-day week containing `date`.
pub fn week(date: NaiveDate, tz: Tz, first_day: WeekStartDay) -> Result<DateWindow> {
    let first = week_start(date, first_day)?;
    DateWindow::from_days(first, last_day(first, 7)?, tz)
}

// ── Month ───────────────────────────────────────────────────────────────────

/// One cell of a month grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridCell {
    pub date: NaiveDate,
    /// False for the leading/trailing days rendered de-emphasized.
    pub in_month: bool,
}

/// The 42 cells of the grid for `year`-`month`.
pub fn month_grid(year: i32, month: u32, first_day: WeekStartDay) -> Result<Vec<GridCell>> {
    let first = first_of_month(year, month)?;
    let grid_start = week_start(first, first_day)?;
    Ok(grid_start
        .iter_days()
        .take(MONTH_GRID_CELLS)
        .map(|date| GridCell {
            date,
            in_month: date.month() == month,
        })
        .collect())
}

/// The window covering the whole 42-cell month grid, so leading and
/// trailing days outside the month are matched too.
pub fn month(year: i32, month: u32, tz: Tz, first_day: WeekStartDay) -> Result<DateWindow> {
    let first = week_start(first_of_month(year, month)?, first_day)?;
    DateWindow::from_days(first, last_day(first, MONTH_GRID_CELLS as u64)?, tz)
}

// ── Custom ──────────────────────────────────────────────────────────────────

pub fn custom(start: NaiveDate, end: NaiveDate, tz: Tz) -> Result<DateWindow> {
    DateWindow::from_days(start, end, tz)
}

/// A user-saved custom range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRange {
    pub name: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl NamedRange {
    pub fn new(name: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(EngineError::InvalidWindow("range name is empty".to_string()));
        }
        if start > end {
            return Err(EngineError::InvalidWindow(format!(
                "range '{}' starts {} after it ends {}",
                name, start, end
            )));
        }
        Ok(NamedRange { name, start, end })
    }

    pub fn window(&self, tz: Tz) -> Result<DateWindow> {
        custom(self.start, self.end, tz)
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

//! Single-day timeline: task intervals, busy blocks and free slots.
//!
//! Each visible task on the day becomes an interval. A same-day
//! `start_at`/`due_at` pair is used as-is; otherwise a 30-minute interval is
//! synthesized around the known instant (starting at `next_occurrence_at`,
//! ending at `due_at`). Overlapping or touching intervals are merged into busy
//! blocks, and the gaps inside the display window are the free slots.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::materialize::visible_in_window;
use crate::model::Task;
use crate::temporal::{local_date, local_instant};
use crate::views::DateWindow;

/// Length of a synthesized interval, in minutes.
pub const DEFAULT_INTERVAL_MINUTES: i64 = 30;

/// The part of the day the timeline renders, in local wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl Default for DisplayWindow {
    fn default() -> Self {
        DisplayWindow {
            start: NaiveTime::from_hms_opt(6, 0, 0).unwrap_or(NaiveTime::MIN),
            end: NaiveTime::from_hms_opt(22, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

impl DisplayWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self> {
        if start >= end {
            return Err(EngineError::InvalidWindow(format!(
                "display window {} must start before {}",
                start, end
            )));
        }
        Ok(DisplayWindow { start, end })
    }

    /// The display window as instants on local day `date`.
    pub fn on(&self, date: NaiveDate, tz: Tz) -> Result<DateWindow> {
        DateWindow::new(
            local_instant(date, self.start, tz)?,
            local_instant(date, self.end, tz)?,
        )
    }
}

/// A half-open span of time `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Interval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Interval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Interval { start, end }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// A task placed on the timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry<'a> {
    pub task: &'a Task,
    pub interval: Interval,
    /// True when the interval was synthesized from a single instant.
    pub synthesized: bool,
}

/// Everything the timeline view renders for one day.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayTimeline<'a> {
    pub date: NaiveDate,
    pub display: DateWindow,
    pub entries: Vec<TimelineEntry<'a>>,
    pub busy: Vec<Interval>,
    pub free: Vec<Interval>,
}

/// The interval a task occupies, and whether it was synthesized.
///
/// Returns `None` for a task with no effective instant.
pub fn task_interval(task: &Task, tz: Tz) -> Option<(Interval, bool)> {
    let slot = Duration::minutes(DEFAULT_INTERVAL_MINUTES);

    if let Some(next) = task.next_occurrence_at {
        return Some((Interval::new(next, next + slot), true));
    }

    let due = task.due_at?;
    match task.start_at {
        Some(start) if start <= due && local_date(start, tz) == local_date(due, tz) => {
            Some((Interval::new(start, due), false))
        }
        _ => Some((Interval::new(due - slot, due), true)),
    }
}

/// Union of `intervals`, sorted by start. Touching intervals are merged.
pub fn merge_intervals(mut intervals: Vec<Interval>) -> Vec<Interval> {
    intervals.sort();
    let mut merged: Vec<Interval> = Vec::with_capacity(intervals.len());
    for interval in intervals {
        match merged.last_mut() {
            Some(last) if interval.start <= last.end => {
                last.end = last.end.max(interval.end);
            }
            _ => merged.push(interval),
        }
    }
    merged
}

/// Gaps between `busy` intervals, clipped to `window`.
pub fn free_slots(busy: &[Interval], window: &DateWindow) -> Vec<Interval> {
    let mut free = Vec::new();
    let mut cursor = window.start;
    for block in merge_intervals(busy.to_vec()) {
        if block.end <= cursor {
            continue;
        }
        if block.start >= window.end {
            break;
        }
        if block.start > cursor {
            free.push(Interval::new(cursor, block.start));
        }
        cursor = block.end;
    }
    if cursor < window.end {
        free.push(Interval::new(cursor, window.end));
    }
    free
}

/// Build the timeline for local day `date`.
pub fn day_timeline<'a>(
    tasks: &'a [Task],
    date: NaiveDate,
    tz: Tz,
    display: &DisplayWindow,
) -> Result<DayTimeline<'a>> {
    let day = DateWindow::from_days(date, date, tz)?;
    let display_window = display.on(date, tz)?;

    let entries: Vec<TimelineEntry<'a>> = visible_in_window(tasks, &day, tz)
        .into_iter()
        .filter_map(|task| {
            task_interval(task, tz).map(|(interval, synthesized)| TimelineEntry {
                task,
                interval,
                synthesized,
            })
        })
        .collect();

    let busy = merge_intervals(entries.iter().map(|e| e.interval).collect());
    let free = free_slots(&busy, &display_window);

    tracing::debug!(
        %date,
        entries = entries.len(),
        busy = busy.len(),
        free = free.len(),
        "built day timeline"
    );

    Ok(DayTimeline {
        date,
        display: display_window,
        entries,
        busy,
        free,
    })
}

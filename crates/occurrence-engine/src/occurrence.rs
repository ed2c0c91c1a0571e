//! Occurrence resolution and recurrence advancement.
//!
//! [`resolve`] decides where (and whether) a task appears for a query window.
//! Skip and pause exceptions are compared by local calendar day in the
//! household timezone, never by instant, so a task paused "until Tuesday" is
//! hidden for every day before Tuesday regardless of time-of-day.
//!
//! [`advance_recurrence`] moves a yearly-anniversary task to its next
//! anniversary on or after a reference day.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::error::{EngineError, Result};
use crate::model::{Recurrence, Task};
use crate::temporal::{clamped_date, local_date, local_instant};

/// Where a task lands for a given query, after exceptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveOccurrence {
    pub display_instant: Option<DateTime<Utc>>,
    pub visible: bool,
}

impl EffectiveOccurrence {
    fn hidden(display_instant: Option<DateTime<Utc>>) -> Self {
        EffectiveOccurrence {
            display_instant,
            visible: false,
        }
    }
}

/// Resolve a task's effective occurrence for a query window starting at
/// `window_start` (for a point-in-time query, pass "now").
///
/// A task with neither `next_occurrence_at` nor `due_at` resolves to no
/// instant and is not visible. This is an empty result, not an error.
///
/// Pause is evaluated against the window start: the task is hidden when the
/// window's local start day is before the local day of `paused_until`.
pub fn resolve(task: &Task, window_start: DateTime<Utc>, tz: Tz) -> EffectiveOccurrence {
    let Some(display) = task.effective_instant() else {
        return EffectiveOccurrence::hidden(None);
    };

    let day = local_date(display, tz);
    if task.skip_dates.contains(&day) {
        tracing::trace!(task = %task.id, %day, "occurrence skipped");
        return EffectiveOccurrence::hidden(Some(display));
    }

    if let Some(paused_until) = task.paused_until {
        let resume_day = local_date(paused_until, tz);
        if local_date(window_start, tz) < resume_day {
            tracing::trace!(task = %task.id, %resume_day, "occurrence paused");
            return EffectiveOccurrence::hidden(Some(display));
        }
    }

    EffectiveOccurrence {
        display_instant: Some(display),
        visible: true,
    }
}

// ── Recurrence advancement ──────────────────────────────────────────────────

/// The first anniversary of (`month`, `day`) on or after `from`.
///
/// Days past the end of the target month are clamped to its last day, so a
/// Feb 29 anchor lands on Feb 28 in non-leap years. The comparison is by
/// day: an anniversary falling on `from` itself is returned unchanged.
///
/// Returns `None` only for a month outside 1..=12.
pub fn next_anniversary(month: u32, day: u32, from: NaiveDate) -> Option<NaiveDate> {
    let candidate = clamped_date(from.year(), month, day)?;
    if candidate < from {
        clamped_date(from.year() + 1, month, day)
    } else {
        Some(candidate)
    }
}

/// Advance a recurring task so `next_occurrence_at` is its next occurrence
/// on or after the local day of `now`.
///
/// The local time-of-day of the task's current effective instant is kept
/// (midnight when the task has none). Tasks without a recurrence are
/// returned unchanged.
pub fn advance_recurrence(task: &Task, now: DateTime<Utc>, tz: Tz) -> Result<Task> {
    let Some(recurrence) = task.recurrence else {
        return Ok(task.clone());
    };

    let from = local_date(now, tz);
    let next_day = match recurrence {
        Recurrence::YearlyAnniversary { month, day } => next_anniversary(month, day, from)
            .ok_or_else(|| {
                EngineError::InvalidRecurrence(format!("task '{}': {}", task.id, recurrence))
            })?,
    };

    let time_of_day = task
        .effective_instant()
        .map_or(NaiveTime::MIN, |instant| instant.with_timezone(&tz).time());

    let mut advanced = task.clone();
    advanced.next_occurrence_at = Some(local_instant(next_day, time_of_day, tz)?);
    tracing::debug!(
        task = %task.id,
        next = %next_day,
        "advanced recurrence"
    );
    Ok(advanced)
}

/// Advance every recurring task in `tasks`; non-recurring tasks pass through.
pub fn advance_all(tasks: &[Task], now: DateTime<Utc>, tz: Tz) -> Result<Vec<Task>> {
    tasks
        .iter()
        .map(|task| advance_recurrence(task, now, tz))
        .collect()
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TaskType;
    use crate::temporal::parse_instant;

    const OSLO: Tz = chrono_tz::Europe::Oslo;

    fn at(s: &str) -> DateTime<Utc> {
        parse_instant(s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn chore_due(due: &str) -> Task {
        Task {
            due_at: Some(at(due)),
            ..Task::new("t1", "Vacuum", TaskType::Chore)
        }
    }

    // ── resolve ─────────────────────────────────────────────────────────

    #[test]
    fn test_resolve_without_instant_is_hidden_not_error() {
        let task = Task::new("t1", "Someday", TaskType::Checklist);
        let occ = resolve(&task, at("2024-03-01T00:00:00Z"), OSLO);
        assert_eq!(occ.display_instant, None);
        assert!(!occ.visible);
    }

    #[test]
    fn test_resolve_plain_due_is_visible() {
        let task = chore_due("2024-03-05T09:00:00Z");
        let occ = resolve(&task, at("2024-03-01T00:00:00Z"), OSLO);
        assert_eq!(occ.display_instant, Some(at("2024-03-05T09:00:00Z")));
        assert!(occ.visible);
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let mut task = chore_due("2024-03-05T09:00:00Z");
        task.paused_until = Some(at("2024-03-03T00:00:00Z"));
        let start = at("2024-03-04T00:00:00Z");
        assert_eq!(resolve(&task, start, OSLO), resolve(&task, start, OSLO));
    }

    #[test]
    fn test_resolve_skip_date_suppresses() {
        let mut task = chore_due("2024-03-05T09:00:00+01:00");
        task.skip_dates.insert(date(2024, 3, 5));
        let occ = resolve(&task, at("2024-03-04T00:00:00Z"), OSLO);
        assert!(!occ.visible);
        assert!(occ.display_instant.is_some());
    }

    #[test]
    fn test_resolve_skip_date_uses_local_day_not_utc() {
        // 23:30 UTC on March 4 is March 5 in Oslo
        let mut task = chore_due("2024-03-04T23:30:00Z");
        task.skip_dates.insert(date(2024, 3, 4));
        assert!(resolve(&task, at("2024-03-01T00:00:00Z"), OSLO).visible);
        assert!(!resolve(&task, at("2024-03-01T00:00:00Z"), chrono_tz::UTC).visible);

        task.skip_dates.insert(date(2024, 3, 5));
        assert!(!resolve(&task, at("2024-03-01T00:00:00Z"), OSLO).visible);
    }

    #[test]
    fn test_resolve_pause_is_day_granular() {
        let mut task = chore_due("2024-03-12T09:00:00Z");
        task.paused_until = Some(at("2024-03-10T00:00:00Z"));

        assert!(!resolve(&task, at("2024-03-08T00:00:00+01:00"), OSLO).visible);
        assert!(!resolve(&task, at("2024-03-09T23:00:00+01:00"), OSLO).visible);
        // Any time on the resume day counts as resumed
        assert!(resolve(&task, at("2024-03-10T00:00:00+01:00"), OSLO).visible);
        assert!(resolve(&task, at("2024-03-10T18:00:00+01:00"), OSLO).visible);
        assert!(resolve(&task, at("2024-03-15T00:00:00+01:00"), OSLO).visible);
    }

    // ── next_anniversary ────────────────────────────────────────────────

    #[test]
    fn test_next_anniversary_later_this_year() {
        assert_eq!(next_anniversary(7, 14, date(2024, 3, 1)), Some(date(2024, 7, 14)));
    }

    #[test]
    fn test_next_anniversary_on_the_day_is_today() {
        assert_eq!(next_anniversary(3, 1, date(2024, 3, 1)), Some(date(2024, 3, 1)));
    }

    #[test]
    fn test_next_anniversary_rolls_to_next_year() {
        assert_eq!(next_anniversary(1, 10, date(2024, 3, 1)), Some(date(2025, 1, 10)));
    }

    #[test]
    fn test_next_anniversary_leap_day_from_non_leap_year() {
        // 2023-02-28 (clamped) is before March 1, so roll into 2024 which has Feb 29
        assert_eq!(next_anniversary(2, 29, date(2023, 3, 1)), Some(date(2024, 2, 29)));
    }

    #[test]
    fn test_next_anniversary_leap_day_clamps_to_feb_28() {
        assert_eq!(next_anniversary(2, 29, date(2024, 3, 1)), Some(date(2025, 2, 28)));
        assert_eq!(next_anniversary(2, 29, date(2023, 2, 1)), Some(date(2023, 2, 28)));
    }

    #[test]
    fn test_next_anniversary_day_31_in_30_day_month() {
        assert_eq!(next_anniversary(4, 31, date(2024, 4, 2)), Some(date(2024, 4, 30)));
    }

    #[test]
    fn test_next_anniversary_invalid_month() {
        assert_eq!(next_anniversary(13, 1, date(2024, 1, 1)), None);
    }

    // ── advance_recurrence ──────────────────────────────────────────────

    #[test]
    fn test_advance_keeps_local_time_of_day() {
        let mut task = Task::new("b1", "Ada's birthday", TaskType::Event);
        task.recurrence = Some(Recurrence::YearlyAnniversary { month: 2, day: 29 });
        task.next_occurrence_at = Some(at("2024-02-29T08:00:00+01:00"));

        let advanced = advance_recurrence(&task, at("2024-06-01T12:00:00Z"), OSLO).unwrap();
        assert_eq!(
            advanced.next_occurrence_at,
            Some(at("2025-02-28T08:00:00+01:00"))
        );
    }

    #[test]
    fn test_advance_without_instant_uses_local_midnight() {
        let mut task = Task::new("b1", "Bo's birthday", TaskType::Event);
        task.recurrence = Some(Recurrence::YearlyAnniversary { month: 7, day: 14 });

        let advanced = advance_recurrence(&task, at("2024-03-01T12:00:00Z"), OSLO).unwrap();
        // Midnight in Oslo summer time (UTC+2)
        assert_eq!(
            advanced.next_occurrence_at,
            Some(at("2024-07-13T22:00:00Z"))
        );
    }

    #[test]
    fn test_advance_uses_household_day_for_now() {
        let mut task = Task::new("b1", "Cy's birthday", TaskType::Event);
        task.recurrence = Some(Recurrence::YearlyAnniversary { month: 3, day: 5 });
        // 23:30 UTC March 4 is already March 5 in Oslo, so the birthday is today
        let now = at("2024-03-04T23:30:00Z");
        let in_oslo = advance_recurrence(&task, now, OSLO).unwrap();
        assert_eq!(in_oslo.next_occurrence_at, Some(at("2024-03-04T23:00:00Z")));
        let in_utc = advance_recurrence(&task, now, chrono_tz::UTC).unwrap();
        assert_eq!(in_utc.next_occurrence_at, Some(at("2024-03-05T00:00:00Z")));
    }

    #[test]
    fn test_advance_non_recurring_is_unchanged() {
        let task = chore_due("2020-01-01T00:00:00Z");
        let advanced = advance_recurrence(&task, at("2024-03-01T00:00:00Z"), OSLO).unwrap();
        assert_eq!(advanced, task);
    }

    #[test]
    fn test_advance_all_preserves_order() {
        let mut birthday = Task::new("b1", "Birthday", TaskType::Event);
        birthday.recurrence = Some(Recurrence::YearlyAnniversary { month: 12, day: 1 });
        let tasks = vec![chore_due("2024-03-05T09:00:00Z"), birthday];
        let advanced = advance_all(&tasks, at("2024-03-01T00:00:00Z"), chrono_tz::UTC).unwrap();
        assert_eq!(advanced[0].id, "t1");
        assert_eq!(
            advanced[1].next_occurrence_at,
            Some(at("2024-12-01T00:00:00Z"))
        );
    }
}

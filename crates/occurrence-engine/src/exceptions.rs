//! Per-task exception operations.
//!
//! These mirror the writes the app issues against the store (skip a day,
//! pause until a date, shift by minutes). Each returns a new [`Task`] with the
//! effect applied; the resolver then reads the effect as plain fields.

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};

use crate::error::{EngineError, Result};
use crate::model::Task;

/// Hide the occurrence that falls on local day `date`.
pub fn add_skip_date(task: &Task, date: NaiveDate) -> Task {
    let mut updated = task.clone();
    updated.skip_dates.insert(date);
    updated
}

/// Undo a previous [`add_skip_date`].
pub fn remove_skip_date(task: &Task, date: NaiveDate) -> Task {
    let mut updated = task.clone();
    updated.skip_dates.remove(&date);
    updated
}

/// Pause the task until `until`, or clear the pause with `None`.
pub fn set_paused_until(task: &Task, until: Option<DateTime<Utc>>) -> Task {
    let mut updated = task.clone();
    updated.paused_until = until;
    updated
}

/// Move the task's effective instant by `minutes` (negative moves earlier).
///
/// Only the authoritative field moves: `next_occurrence_at` when set,
/// otherwise `due_at`. `start_at` moves with a shifted `due_at` so the
/// timeline interval keeps its length. A task with no instant is unchanged.
///
/// # Errors
///
/// Returns [`EngineError::InvalidDatetime`] when the shift leaves the
/// representable range of instants.
pub fn shift_by_minutes(task: &Task, minutes: i64) -> Result<Task> {
    let out_of_range = || {
        EngineError::InvalidDatetime(format!(
            "task '{}': shift by {} minutes is out of range",
            task.id, minutes
        ))
    };
    let delta = TimeDelta::try_minutes(minutes).ok_or_else(out_of_range)?;
    let shift = |instant: DateTime<Utc>| {
        instant
            .checked_add_signed(delta)
            .ok_or_else(out_of_range)
    };

    let mut updated = task.clone();
    if let Some(next) = updated.next_occurrence_at {
        updated.next_occurrence_at = Some(shift(next)?);
    } else if let Some(due) = updated.due_at {
        updated.due_at = Some(shift(due)?);
        updated.start_at = updated.start_at.map(shift).transpose()?;
    }
    Ok(updated)
}

//! Range materialization: placing tasks into local-day buckets.

use std::collections::BTreeMap;

use chrono_tz::Tz;
use serde::Serialize;

use crate::filter::{self, FilterOptions};
use crate::model::Task;
use crate::occurrence::resolve;
use crate::temporal::format_day;
use crate::views::DateWindow;

/// Tasks keyed by local day (`YYYY-MM-DD`), days ascending.
pub type DayBuckets<'a> = BTreeMap<String, Vec<&'a Task>>;

/// Tasks whose occurrence is visible for `window` and whose display
/// instant lies inside it, in input order.
pub fn visible_in_window<'a, I>(tasks: I, window: &DateWindow, tz: Tz) -> Vec<&'a Task>
where
    I: IntoIterator<Item = &'a Task>,
{
    tasks
        .into_iter()
        .filter(|task| {
            let occurrence = resolve(task, window.start, tz);
            occurrence.visible
                && occurrence
                    .display_instant
                    .is_some_and(|instant| window.contains(instant))
        })
        .collect()
}

/// Bucket the visible, in-window tasks under their local day key.
///
/// Within a bucket tasks keep their input order; sorting is the filter
/// pipeline's job.
pub fn materialize<'a, I>(tasks: I, window: &DateWindow, tz: Tz) -> DayBuckets<'a>
where
    I: IntoIterator<Item = &'a Task>,
{
    let mut buckets = DayBuckets::new();
    let mut placed = 0usize;
    for task in visible_in_window(tasks, window, tz) {
        // Visible tasks always carry an instant.
        if let Some(instant) = task.effective_instant() {
            buckets.entry(format_day(instant, tz)).or_default().push(task);
            placed += 1;
        }
    }
    tracing::debug!(
        days = buckets.len(),
        tasks = placed,
        start = %window.start,
        end = %window.end,
        "materialized window"
    );
    buckets
}

/// Materialized buckets plus the chip counts from the filter pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeQuery<'a> {
    pub window: DateWindow,
    pub buckets: DayBuckets<'a>,
    pub child_counts: BTreeMap<String, usize>,
}

impl RangeQuery<'_> {
    pub fn task_count(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }
}

/// Materialize `tasks` over `window` with filtering applied.
///
/// The filter pipeline runs over the visible in-window set (so child counts
/// describe this window), then the survivors are bucketed in pipeline order.
pub fn query_range<'a>(
    tasks: &'a [Task],
    window: &DateWindow,
    tz: Tz,
    options: &FilterOptions,
) -> RangeQuery<'a> {
    let in_window = visible_in_window(tasks, window, tz);
    let outcome = filter::apply(in_window, options);
    RangeQuery {
        window: *window,
        buckets: materialize(outcome.tasks, window, tz),
        child_counts: outcome.child_counts,
    }
}

//! # occurrence-engine
//!
//! Deterministic calendar computation for household task planning.
//!
//! Given already-fetched task records and a household timezone, the engine
//! decides where each task appears on a calendar, applies per-task
//! exceptions (skip, pause, shift), buckets occurrences into local days for
//! agenda/week/month/custom views, computes single-day timelines with free
//! slots, and filters/sorts the result. Every function is pure: no clock, no
//! I/O. The caller supplies "now" and the window.
//!
//! ## Modules
//!
//! - [`model`] — Typed `Task`/`Household`/`Child` records and the validating ingestion boundary
//! - [`temporal`] — Day keys, local-day boundaries, week and month arithmetic
//! - [`occurrence`] — Effective occurrence resolution and yearly recurrence advancement
//! - [`exceptions`] — Skip / pause / shift operations
//! - [`views`] — Agenda, week, month-grid and custom query windows
//! - [`materialize`] — Day-keyed bucketing of visible occurrences
//! - [`timeline`] — Single-day intervals, busy blocks and free slots
//! - [`filter`] — Tag, child and priority pipeline
//! - [`persist`] — Saved ranges and filters over an opaque blob store
//! - [`error`] — Error types

pub mod error;
pub mod exceptions;
pub mod filter;
pub mod materialize;
pub mod model;
pub mod occurrence;
pub mod persist;
pub mod temporal;
pub mod timeline;
pub mod views;

pub use error::{EngineError, Result};
pub use exceptions::{add_skip_date, remove_skip_date, set_paused_until, shift_by_minutes};
pub use filter::{apply, parse_tag_terms, FilterOptions, FilterOutcome, PrioritySort};
pub use materialize::{materialize, query_range, visible_in_window, DayBuckets, RangeQuery};
pub use model::{
    Child, Household, HouseholdSnapshot, Priority, Recurrence, Task, TaskRecord, TaskType,
};
pub use occurrence::{
    advance_all, advance_recurrence, next_anniversary, resolve, EffectiveOccurrence,
};
pub use persist::{BlobStore, MemoryBlobStore};
pub use temporal::WeekStartDay;
pub use timeline::{
    day_timeline, free_slots, merge_intervals, task_interval, DayTimeline, DisplayWindow,
    Interval, TimelineEntry,
};
pub use views::{AgendaCursor, DateWindow, GridCell, NamedRange};

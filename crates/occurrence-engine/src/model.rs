//! Strongly-typed household records and the ingestion boundary.
//!
//! Documents arrive from the store as loosely-typed [`TaskRecord`]s (string
//! instants, a recurrence rule string, an unchecked priority). They are
//! validated exactly once, in `Task::try_from`, so everything downstream of
//! the boundary works with [`Task`] and never re-parses.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use chrono_tz::Tz;
use rrule::{Frequency, RRule, Unvalidated};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::temporal::{parse_day_key, parse_instant, parse_timezone};

// ── Task type ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    #[default]
    Chore,
    Event,
    Deadline,
    Checklist,
}

impl FromStr for TaskType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "chore" => Ok(TaskType::Chore),
            "event" => Ok(TaskType::Event),
            "deadline" => Ok(TaskType::Deadline),
            "checklist" => Ok(TaskType::Checklist),
            _ => Err(EngineError::UnknownTaskType(format!("'{}'", s))),
        }
    }
}

// ── Priority ────────────────────────────────────────────────────────────────

/// Task priority, 1 (low) to 3 (high).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Priority(u8);

impl Priority {
    pub const LOW: Priority = Priority(1);
    pub const MEDIUM: Priority = Priority(2);
    pub const HIGH: Priority = Priority(3);

    pub fn new(value: i64) -> Result<Self> {
        match value {
            1..=3 => Ok(Priority(value as u8)),
            _ => Err(EngineError::InvalidPriority(format!(
                "{} is outside 1..=3",
                value
            ))),
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

// ── Recurrence ──────────────────────────────────────────────────────────────

/// The closed set of recurrence kinds a task can carry.
///
/// Only yearly anniversaries (birthdays) are in use. The anchor day may
/// exceed the length of some months (Feb 29, Apr 31); advancement clamps it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Recurrence {
    YearlyAnniversary { month: u32, day: u32 },
}

impl Recurrence {
    /// Build a yearly anniversary, rejecting impossible months and days.
    pub fn yearly(month: u32, day: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(EngineError::InvalidRecurrence(format!(
                "month {} is outside 1..=12",
                month
            )));
        }
        if !(1..=31).contains(&day) {
            return Err(EngineError::InvalidRecurrence(format!(
                "day {} is outside 1..=31",
                day
            )));
        }
        Ok(Recurrence::YearlyAnniversary { month, day })
    }

    /// Parse a stored rule string such as `FREQ=YEARLY;BYMONTH=2;BYMONTHDAY=29`.
    ///
    /// The rule must be yearly with interval 1, exactly one `BYMONTH` and
    /// exactly one positive `BYMONTHDAY`. Anything richer is rejected rather
    /// than silently approximated.
    pub fn parse_rule(rule: &str) -> Result<Self> {
        let trimmed = rule.trim();
        let body = trimmed.strip_prefix("RRULE:").unwrap_or(trimmed);
        let parsed: RRule<Unvalidated> = body
            .parse()
            .map_err(|e| EngineError::InvalidRecurrence(format!("'{}': {}", rule, e)))?;

        if parsed.get_freq() != Frequency::Yearly || parsed.get_interval() > 1 {
            return Err(EngineError::InvalidRecurrence(format!(
                "'{}': only FREQ=YEARLY with interval 1 is supported",
                rule
            )));
        }

        let extra_parts = parsed.get_count().is_some()
            || parsed.get_until().is_some()
            || !parsed.get_by_weekday().is_empty()
            || !parsed.get_by_set_pos().is_empty()
            || !parsed.get_by_year_day().is_empty()
            || !parsed.get_by_week_no().is_empty()
            || !parsed.get_by_hour().is_empty()
            || !parsed.get_by_minute().is_empty()
            || !parsed.get_by_second().is_empty();
        if extra_parts {
            return Err(EngineError::InvalidRecurrence(format!(
                "'{}': only BYMONTH and BYMONTHDAY parts are supported",
                rule
            )));
        }

        let months: &[u8] = parsed.get_by_month();
        let month_days: &[i8] = parsed.get_by_month_day();
        let (month, day) = match (months, month_days) {
            ([month], [day]) if *day > 0 => (u32::from(*month), *day as u32),
            _ => {
                return Err(EngineError::InvalidRecurrence(format!(
                    "'{}': expected exactly one BYMONTH and one positive BYMONTHDAY",
                    rule
                )));
            }
        };

        Recurrence::yearly(month, day)
    }

    /// Render back into the stored rule-string form.
    pub fn to_rule_string(&self) -> String {
        match self {
            Recurrence::YearlyAnniversary { month, day } => {
                format!("FREQ=YEARLY;BYMONTH={};BYMONTHDAY={}", month, day)
            }
        }
    }
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_rule_string())
    }
}

// ── Task ────────────────────────────────────────────────────────────────────

/// A validated household task.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub due_at: Option<DateTime<Utc>>,
    pub next_occurrence_at: Option<DateTime<Utc>>,
    /// Start of a timed interval ending at `due_at`.
    pub start_at: Option<DateTime<Utc>>,
    pub recurrence: Option<Recurrence>,
    pub paused_until: Option<DateTime<Utc>>,
    pub skip_dates: BTreeSet<NaiveDate>,
    pub priority: Option<Priority>,
    pub child_ids: BTreeSet<String>,
    pub context: Vec<String>,
}

impl Task {
    /// A task with no schedule, exceptions or associations.
    pub fn new(id: impl Into<String>, title: impl Into<String>, task_type: TaskType) -> Self {
        Task {
            id: id.into(),
            title: title.into(),
            task_type,
            due_at: None,
            next_occurrence_at: None,
            start_at: None,
            recurrence: None,
            paused_until: None,
            skip_dates: BTreeSet::new(),
            priority: None,
            child_ids: BTreeSet::new(),
            context: Vec::new(),
        }
    }

    /// The instant that places this task on a calendar: `next_occurrence_at`
    /// when set, otherwise `due_at`.
    pub fn effective_instant(&self) -> Option<DateTime<Utc>> {
        self.next_occurrence_at.or(self.due_at)
    }

    /// Priority as a sort key; missing priority sorts as 0.
    pub fn priority_rank(&self) -> u8 {
        self.priority.map_or(0, Priority::value)
    }
}

// ── Ingestion boundary ──────────────────────────────────────────────────────

/// A task document as stored, before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskRecord {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub task_type: Option<String>,
    pub due_at: Option<String>,
    pub next_occurrence_at: Option<String>,
    pub start_at: Option<String>,
    pub rrule: Option<String>,
    pub paused_until: Option<String>,
    pub skip_dates: Vec<String>,
    pub priority: Option<i64>,
    pub child_ids: Vec<String>,
    pub context: Vec<String>,
}

fn optional_instant(value: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => parse_instant(s).map(Some),
    }
}

impl TryFrom<TaskRecord> for Task {
    type Error = EngineError;

    fn try_from(record: TaskRecord) -> Result<Self> {
        if record.id.trim().is_empty() {
            return Err(EngineError::MissingField("id".to_string()));
        }
        let id = record.id.clone();
        validate_record(record).map_err(|source| EngineError::InvalidRecord {
            id,
            source: Box::new(source),
        })
    }
}

fn validate_record(record: TaskRecord) -> Result<Task> {
    let task_type = match record.task_type.as_deref() {
        Some(s) => s.parse()?,
        None => TaskType::default(),
    };

    let skip_dates = record
        .skip_dates
        .iter()
        .map(|s| parse_day_key(s))
        .collect::<Result<BTreeSet<_>>>()?;

    let recurrence = match record.rrule.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(rule) => Some(Recurrence::parse_rule(rule)?),
    };

    let priority = record.priority.map(Priority::new).transpose()?;

    let context = record
        .context
        .into_iter()
        .map(|tag| tag.trim().to_string())
        .filter(|tag| !tag.is_empty())
        .collect();

    Ok(Task {
        id: record.id,
        title: record.title,
        task_type,
        due_at: optional_instant(record.due_at.as_deref())?,
        next_occurrence_at: optional_instant(record.next_occurrence_at.as_deref())?,
        start_at: optional_instant(record.start_at.as_deref())?,
        recurrence,
        paused_until: optional_instant(record.paused_until.as_deref())?,
        skip_dates,
        priority,
        child_ids: record.child_ids.into_iter().collect(),
        context,
    })
}

// ── Household and children ──────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Household {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// IANA timezone name; unset means UTC.
    #[serde(default)]
    pub timezone: Option<String>,
}

impl Household {
    /// The household timezone, UTC when unset.
    pub fn tz(&self) -> Result<Tz> {
        match self.timezone.as_deref().map(str::trim) {
            None | Some("") => Ok(chrono_tz::UTC),
            Some(name) => parse_timezone(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Child {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub birthday: Option<NaiveDate>,
}

impl Child {
    pub fn birthday_recurrence(&self) -> Option<Recurrence> {
        self.birthday.map(|b| Recurrence::YearlyAnniversary {
            month: b.month(),
            day: b.day(),
        })
    }

    /// An unscheduled yearly birthday event for this child.
    ///
    /// The event has no instant until recurrence advancement places it.
    pub fn birthday_task(&self) -> Option<Task> {
        let recurrence = self.birthday_recurrence()?;
        let mut task = Task::new(
            format!("birthday:{}", self.id),
            format!("{}'s birthday", self.name),
            TaskType::Event,
        );
        task.recurrence = Some(recurrence);
        task.child_ids.insert(self.id.clone());
        task.context.push("birthday".to_string());
        Some(task)
    }
}

/// The already-fetched documents for one household.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HouseholdSnapshot {
    pub household: Household,
    #[serde(default)]
    pub children: Vec<Child>,
    #[serde(default)]
    pub tasks: Vec<TaskRecord>,
}

impl HouseholdSnapshot {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| EngineError::Malformed(e.to_string()))
    }

    /// Validate every task record, failing on the first invalid one.
    pub fn validated_tasks(&self) -> Result<Vec<Task>> {
        let tasks = self
            .tasks
            .iter()
            .cloned()
            .map(Task::try_from)
            .collect::<Result<Vec<_>>>()?;
        tracing::debug!(
            household = %self.household.id,
            count = tasks.len(),
            "validated task records"
        );
        Ok(tasks)
    }

    /// Validated tasks plus a birthday event for every child whose birthday
    /// is not already tracked by a recurring task associated with them.
    pub fn calendar_tasks(&self) -> Result<Vec<Task>> {
        let mut tasks = self.validated_tasks()?;
        for child in &self.children {
            let tracked = tasks
                .iter()
                .any(|t| t.recurrence.is_some() && t.child_ids.contains(&child.id));
            if tracked {
                continue;
            }
            if let Some(task) = child.birthday_task() {
                tracing::trace!(child = %child.id, "synthesized birthday event");
                tasks.push(task);
            }
        }
        Ok(tasks)
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

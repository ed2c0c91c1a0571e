//! Subcommands: load the snapshot, build the window, run the engine.

use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use chrono_tz::Tz;
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;

use occurrence_engine::persist;
use occurrence_engine::temporal::{first_of_month, local_date, parse_day_key, parse_instant};
use occurrence_engine::views::{self, AgendaCursor, DateWindow, GridCell, NamedRange};
use occurrence_engine::{
    advance_all, day_timeline, query_range, DayTimeline, FilterOptions, HouseholdSnapshot,
    PrioritySort, RangeQuery, Task,
};

use crate::config::{FamcalConfig, GlobalArgs, SortArg};
use crate::store::FileBlobStore;

#[derive(Parser, Debug)]
#[command(
    name = "famcal",
    version,
    about = "Render household task calendars from a document snapshot"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Rolling list of days from a start day.
    Agenda {
        /// First day (YYYY-MM-DD); defaults to today.
        #[arg(long)]
        from: Option<String>,
        /// Number of days; defaults to the configured agenda length.
        #[arg(long)]
        days: Option<u32>,
        /// Extra 14-day pages to append, as if scrolled to the end.
        #[arg(long, default_value_t = 0)]
        pages: u32,
    },
    /// The week containing a day.
    Week {
        #[arg(long)]
        date: Option<String>,
    },
    /// The 6-week grid for a month.
    Month {
        /// Month as YYYY-MM; defaults to the current month.
        #[arg(long)]
        month: Option<String>,
    },
    /// An arbitrary day range, or a saved one by name.
    Custom {
        #[arg(long, requires = "end", conflicts_with = "range")]
        start: Option<String>,
        #[arg(long, requires = "start")]
        end: Option<String>,
        #[arg(long)]
        range: Option<String>,
    },
    /// Busy blocks and free slots for one day.
    Timeline {
        #[arg(long)]
        date: Option<String>,
    },
    /// Recurring tasks with their next occurrence after now.
    Advance,
    /// Saved custom ranges.
    Ranges {
        #[command(subcommand)]
        action: RangesCommand,
    },
}

impl Command {
    /// The tab name filters are saved under.
    fn tab(&self) -> &'static str {
        match self {
            Command::Agenda { .. } => "agenda",
            Command::Week { .. } => "week",
            Command::Month { .. } => "month",
            Command::Custom { .. } => "custom",
            Command::Timeline { .. } => "timeline",
            Command::Advance => "advance",
            Command::Ranges { .. } => "ranges",
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum RangesCommand {
    /// Save (or replace) a named range.
    Save {
        name: String,
        start: String,
        end: String,
    },
    /// List saved ranges.
    List,
}

// ── Session ─────────────────────────────────────────────────────────────────

/// Everything a command needs, loaded once.
struct Session {
    household_id: String,
    timezone: String,
    tz: Tz,
    now: DateTime<Utc>,
    tasks: Vec<Task>,
    config: FamcalConfig,
    store: FileBlobStore,
}

impl Session {
    fn open(global: &GlobalArgs, config: FamcalConfig) -> Result<Self> {
        let path = global
            .input
            .as_deref()
            .context("no household snapshot given; pass --input or set FAMCAL_INPUT")?;
        let snapshot = read_snapshot(path)?;

        let timezone = config
            .timezone_override
            .clone()
            .or_else(|| snapshot.household.timezone.clone())
            .or_else(|| config.timezone_fallback.clone())
            .unwrap_or_else(|| "UTC".to_string());
        let tz = occurrence_engine::temporal::parse_timezone(&timezone)?;

        let now = match global.now.as_deref() {
            Some(s) => parse_instant(s).context("--now")?,
            None => Utc::now(),
        };

        let tasks = advance_all(&snapshot.calendar_tasks()?, now, tz)?;
        tracing::info!(
            household = %snapshot.household.id,
            %timezone,
            tasks = tasks.len(),
            "loaded household snapshot"
        );

        Ok(Session {
            household_id: snapshot.household.id,
            timezone,
            tz,
            now,
            tasks,
            store: FileBlobStore::new(&config.data_dir),
            config,
        })
    }

    fn today(&self) -> NaiveDate {
        local_date(self.now, self.tz)
    }

    fn day_or_today(&self, day: Option<&str>) -> Result<NaiveDate> {
        match day {
            Some(s) => Ok(parse_day_key(s)?),
            None => Ok(self.today()),
        }
    }

    /// Filters from the command line, or the ones saved for this tab.
    ///
    /// `--save-filters` alone saves the defaults, clearing what was saved.
    fn filters(&mut self, global: &GlobalArgs, tab: &str) -> Result<FilterOptions> {
        if !global.has_filter_flags() && !global.save_filters {
            return Ok(persist::load_filters(&self.store, &self.household_id, tab)?);
        }

        let options = FilterOptions {
            child_ids: global.children.iter().cloned().collect(),
            priority_sort: match global.sort {
                Some(SortArg::High) => PrioritySort::HighFirst,
                Some(SortArg::Low) => PrioritySort::LowFirst,
                Some(SortArg::None) | None => PrioritySort::None,
            },
            ..FilterOptions::default().with_tags(global.tags.as_deref().unwrap_or(""))
        };
        if global.save_filters {
            persist::save_filters(&mut self.store, &self.household_id, tab, &options)?;
        }
        Ok(options)
    }
}

fn read_snapshot(path: &Path) -> Result<HouseholdSnapshot> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read snapshot {}", path.display()))?;
    HouseholdSnapshot::from_json(&json)
        .with_context(|| format!("failed to parse snapshot {}", path.display()))
}

fn parse_month(s: &str) -> Result<(i32, u32)> {
    let Some((year, month)) = s.trim().split_once('-') else {
        bail!("invalid month '{s}': expected YYYY-MM");
    };
    let year: i32 = year
        .parse()
        .with_context(|| format!("invalid year in '{s}'"))?;
    let month: u32 = month
        .parse()
        .with_context(|| format!("invalid month in '{s}'"))?;
    first_of_month(year, month)?;
    Ok((year, month))
}

// ── Output ──────────────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ViewOutput<'a> {
    view: &'static str,
    household: &'a str,
    timezone: &'a str,
    #[serde(flatten)]
    query: RangeQuery<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    grid: Option<Vec<GridCell>>,
}

#[derive(Serialize)]
struct TimelineOutput<'a> {
    view: &'static str,
    household: &'a str,
    timezone: &'a str,
    timeline: DayTimeline<'a>,
}

#[derive(Serialize)]
struct AdvanceOutput<'a> {
    now: DateTime<Utc>,
    timezone: &'a str,
    tasks: Vec<&'a Task>,
}

// ── Dispatch ────────────────────────────────────────────────────────────────

/// Run `cli.command` and return its JSON output.
pub fn run(cli: &Cli, config: FamcalConfig) -> Result<Value> {
    let mut session = Session::open(&cli.global, config)?;
    let tab = cli.command.tab();

    match &cli.command {
        Command::Agenda { from, days, pages } => {
            let start = session.day_or_today(from.as_deref())?;
            let mut cursor = AgendaCursor::new(
                start,
                days.unwrap_or(session.config.agenda_days),
                session.tz,
            );
            let mut window = cursor.window()?;
            for _ in 0..*pages {
                window = cursor.extend()?;
            }
            render_range(&mut session, &cli.global, tab, window, None)
        }
        Command::Week { date } => {
            let day = session.day_or_today(date.as_deref())?;
            let window = views::week(day, session.tz, session.config.week_start)?;
            render_range(&mut session, &cli.global, tab, window, None)
        }
        Command::Month { month } => {
            let (year, month) = match month.as_deref() {
                Some(s) => parse_month(s)?,
                None => {
                    let today = session.today();
                    (today.year(), today.month())
                }
            };
            let week_start = session.config.week_start;
            let window = views::month(year, month, session.tz, week_start)?;
            let grid = views::month_grid(year, month, week_start)?;
            render_range(&mut session, &cli.global, tab, window, Some(grid))
        }
        Command::Custom { start, end, range } => {
            let window = match (start.as_deref(), end.as_deref(), range.as_deref()) {
                (Some(start), Some(end), _) => {
                    views::custom(parse_day_key(start)?, parse_day_key(end)?, session.tz)?
                }
                (_, _, Some(name)) => {
                    persist::find_range(&session.store, &session.household_id, name)?
                        .with_context(|| format!("no saved range named '{name}'"))?
                        .window(session.tz)?
                }
                _ => bail!("custom needs --start and --end, or --range"),
            };
            render_range(&mut session, &cli.global, tab, window, None)
        }
        Command::Timeline { date } => {
            let day = session.day_or_today(date.as_deref())?;
            let timeline =
                day_timeline(&session.tasks, day, session.tz, &session.config.display)?;
            Ok(serde_json::to_value(TimelineOutput {
                view: tab,
                household: &session.household_id,
                timezone: &session.timezone,
                timeline,
            })?)
        }
        Command::Advance => {
            let tasks: Vec<&Task> = session
                .tasks
                .iter()
                .filter(|t| t.recurrence.is_some())
                .collect();
            Ok(serde_json::to_value(AdvanceOutput {
                now: session.now,
                timezone: &session.timezone,
                tasks,
            })?)
        }
        Command::Ranges { action } => match action {
            RangesCommand::Save { name, start, end } => {
                let range =
                    NamedRange::new(name.as_str(), parse_day_key(start)?, parse_day_key(end)?)?;
                persist::save_range(&mut session.store, &session.household_id, range.clone())?;
                Ok(serde_json::to_value(range)?)
            }
            RangesCommand::List => {
                let ranges = persist::load_ranges(&session.store, &session.household_id)?;
                Ok(serde_json::to_value(ranges)?)
            }
        },
    }
}

fn render_range(
    session: &mut Session,
    global: &GlobalArgs,
    tab: &'static str,
    window: DateWindow,
    grid: Option<Vec<GridCell>>,
) -> Result<Value> {
    let options = session.filters(global, tab)?;
    let query = query_range(&session.tasks, &window, session.tz, &options);
    tracing::info!(view = tab, shown = query.task_count(), "rendered view");
    let output = ViewOutput {
        view: tab,
        household: &session.household_id,
        timezone: &session.timezone,
        query,
        grid,
    };
    Ok(serde_json::to_value(&output)?)
}

//! Configuration for the `famcal` CLI.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/famcal/config.toml`)
//! 4. Compiled defaults
//!
//! The timezone is special: an explicit `--timezone` wins, then the
//! household's own timezone from the snapshot, then the config file, then UTC.

use std::path::{Path, PathBuf};

use chrono::NaiveTime;
use occurrence_engine::views::DEFAULT_AGENDA_DAYS;
use occurrence_engine::{DisplayWindow, WeekStartDay};

/// Errors that can occur when loading CLI configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),

    /// A value parsed but is not usable.
    #[error("invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct FamcalConfigFile {
    calendar: CalendarFileConfig,
    storage: StorageFileConfig,
}

/// `[calendar]` section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct CalendarFileConfig {
    timezone: Option<String>,
    agenda_days: Option<u32>,
    week_start: Option<WeekStartDay>,
    day_start: Option<String>,
    day_end: Option<String>,
}

/// `[storage]` section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct StorageFileConfig {
    data_dir: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// CLI arguments
// ---------------------------------------------------------------------------

/// Sort order accepted on the command line.
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortArg {
    High,
    Low,
    None,
}

/// Arguments shared by every subcommand.
#[derive(clap::Args, Debug, Default, Clone)]
pub struct GlobalArgs {
    /// Household snapshot (JSON with `household`, `children`, `tasks`).
    #[arg(short, long, global = true, env = "FAMCAL_INPUT")]
    pub input: Option<PathBuf>,

    /// Path to config file (default: `~/.config/famcal/config.toml`).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// IANA timezone overriding the household's own.
    #[arg(long, global = true, env = "FAMCAL_TIMEZONE")]
    pub timezone: Option<String>,

    /// Reference instant (RFC 3339); defaults to the system clock.
    #[arg(long, global = true)]
    pub now: Option<String>,

    /// Comma-separated tag terms (OR).
    #[arg(long, global = true)]
    pub tags: Option<String>,

    /// Child id to filter by; repeat for several (OR).
    #[arg(long = "child", global = true)]
    pub children: Vec<String>,

    /// Priority ordering.
    #[arg(long, value_enum, global = true)]
    pub sort: Option<SortArg>,

    /// Persist the given filters for this household and view.
    #[arg(long, global = true)]
    pub save_filters: bool,

    /// Directory for saved ranges and filters.
    #[arg(long, global = true, env = "FAMCAL_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "warn", env = "FAMCAL_LOG")]
    pub log_level: String,
}

impl GlobalArgs {
    /// True when any filter flag was given on the command line.
    pub fn has_filter_flags(&self) -> bool {
        self.tags.is_some() || !self.children.is_empty() || self.sort.is_some()
    }
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Fully resolved CLI configuration.
#[derive(Debug, Clone)]
pub struct FamcalConfig {
    /// Explicit timezone from CLI/env; beats the household's timezone.
    pub timezone_override: Option<String>,
    /// Timezone from the config file; used when the household has none.
    pub timezone_fallback: Option<String>,
    pub agenda_days: u32,
    pub week_start: WeekStartDay,
    pub display: DisplayWindow,
    pub data_dir: PathBuf,
    pub log_level: String,
}

impl Default for FamcalConfig {
    fn default() -> Self {
        Self {
            timezone_override: None,
            timezone_fallback: None,
            agenda_days: DEFAULT_AGENDA_DAYS,
            week_start: WeekStartDay::Monday,
            display: DisplayWindow::default(),
            data_dir: default_data_dir(),
            log_level: "warn".to_string(),
        }
    }
}

impl FamcalConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// If `--config` is given and the file does not exist, returns an error.
    /// If no `--config` is given, the default path is tried and a missing
    /// file is treated as empty config.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the explicit config file cannot be read
    /// or parsed, or a value in it is unusable.
    pub fn load(cli: &GlobalArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Self::resolve(cli, &file)
    }

    /// Resolve from CLI args and a parsed config file.
    ///
    /// Priority: CLI > file > default.
    fn resolve(cli: &GlobalArgs, file: &FamcalConfigFile) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let agenda_days = file.calendar.agenda_days.unwrap_or(defaults.agenda_days);
        if agenda_days == 0 {
            return Err(ConfigError::InvalidValue {
                field: "calendar.agenda_days",
                reason: "must be at least 1".to_string(),
            });
        }

        let start = match file.calendar.day_start.as_deref() {
            Some(s) => parse_clock("calendar.day_start", s)?,
            None => defaults.display.start,
        };
        let end = match file.calendar.day_end.as_deref() {
            Some(s) => parse_clock("calendar.day_end", s)?,
            None => defaults.display.end,
        };
        let display = DisplayWindow::new(start, end).map_err(|e| ConfigError::InvalidValue {
            field: "calendar.day_start",
            reason: e.to_string(),
        })?;

        Ok(Self {
            timezone_override: cli.timezone.clone(),
            timezone_fallback: file.calendar.timezone.clone(),
            agenda_days,
            week_start: file.calendar.week_start.unwrap_or(defaults.week_start),
            display,
            data_dir: cli
                .data_dir
                .clone()
                .or_else(|| file.storage.data_dir.clone())
                .unwrap_or(defaults.data_dir),
            log_level: cli.log_level.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("famcal"))
        .unwrap_or_else(|| PathBuf::from(".famcal"))
}

fn parse_clock(field: &'static str, s: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M").map_err(|e| ConfigError::InvalidValue {
        field,
        reason: format!("'{}': {}", s, e),
    })
}

/// Load and parse a TOML config file.
fn load_config_file(explicit_path: Option<&Path>) -> Result<FamcalConfigFile, ConfigError> {
    if let Some(path) = explicit_path {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    }

    let Some(config_dir) = dirs::config_dir() else {
        return Ok(FamcalConfigFile::default());
    };
    load_optional_config_file(&config_dir.join("famcal").join("config.toml"))
}

/// Like an explicit load, but a missing file means empty config.
fn load_optional_config_file(path: &Path) -> Result<FamcalConfigFile, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(FamcalConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

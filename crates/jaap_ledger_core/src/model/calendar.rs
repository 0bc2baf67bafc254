//! Poornima (full-moon) calendar and note markers.
//!
//! # Responsibility
//! - Load the static full-moon calendar once at startup.
//! - Detect Poornima days from the calendar or from explicit note text.
//!
//! # Invariants
//! - A loaded calendar is immutable.
//! - Every calendar date passes `EntryDate` validation.

use crate::model::entry::{EntryDate, EntryValidationError, LedgerEntry};
use log::{error, info};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

static POORNIMA_MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)poornima|पूर्णिमा").expect("valid poornima marker regex"));

/// Startup error raised when the calendar resource cannot be used.
#[derive(Debug)]
pub enum CalendarError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    InvalidDate(EntryValidationError),
}

impl Display for CalendarError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read calendar `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "failed to parse calendar `{}`: {source}", path.display())
            }
            Self::InvalidDate(err) => write!(f, "invalid calendar entry: {err}"),
        }
    }
}

impl Error for CalendarError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::InvalidDate(err) => Some(err),
        }
    }
}

impl From<EntryValidationError> for CalendarError {
    fn from(value: EntryValidationError) -> Self {
        Self::InvalidDate(value)
    }
}

/// Static set of full-moon dates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MilestoneCalendar {
    dates: BTreeSet<EntryDate>,
}

impl MilestoneCalendar {
    /// Calendar with no dates; note markers still apply.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_dates(dates: impl IntoIterator<Item = EntryDate>) -> Self {
        Self {
            dates: dates.into_iter().collect(),
        }
    }

    /// Parses a JSON array of `YYYY-MM-DD` strings.
    pub fn from_json_str(raw: &str) -> Result<Self, CalendarError> {
        let values: Vec<String> =
            serde_json::from_str(raw).map_err(|source| CalendarError::Parse {
                path: PathBuf::new(),
                source,
            })?;
        let dates = values
            .iter()
            .map(|value| EntryDate::parse(value))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_dates(dates))
    }

    pub fn contains(&self, date: &EntryDate) -> bool {
        self.dates.contains(date)
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// Loads the calendar file. Any failure is fatal to startup.
///
/// # Side effects
/// - Emits `calendar_load` logging events.
pub fn load_calendar(path: impl AsRef<Path>) -> Result<MilestoneCalendar, CalendarError> {
    let path = path.as_ref();
    let result = std::fs::read_to_string(path)
        .map_err(|source| CalendarError::Io {
            path: path.to_path_buf(),
            source,
        })
        .and_then(|raw| {
            MilestoneCalendar::from_json_str(&raw).map_err(|err| match err {
                CalendarError::Parse { source, .. } => CalendarError::Parse {
                    path: path.to_path_buf(),
                    source,
                },
                other => other,
            })
        });

    match &result {
        Ok(calendar) => info!(
            "event=calendar_load module=calendar status=ok dates={}",
            calendar.len()
        ),
        Err(err) => error!(
            "event=calendar_load module=calendar status=error error_code=calendar_unavailable error={}",
            err
        ),
    }
    result
}

/// Returns whether note text explicitly marks the day as Poornima.
pub fn has_explicit_poornima(notes: &str) -> bool {
    !notes.is_empty() && POORNIMA_MARKER_RE.is_match(notes)
}

/// Calendar date or explicit note marker.
pub fn is_poornima(entry: &LedgerEntry, calendar: &MilestoneCalendar) -> bool {
    calendar.contains(&entry.date) || has_explicit_poornima(&entry.notes)
}

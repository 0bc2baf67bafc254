//! Ledger entry domain model.
//!
//! # Responsibility
//! - Define the canonical per-date record and the ledger collection.
//! - Normalize dates once at construction so ordering is always valid.
//!
//! # Invariants
//! - `EntryDate` always holds a zero-padded `YYYY-MM-DD` string.
//! - String order of `EntryDate` equals chronological order.
//! - A `Ledger` never holds two entries with the same date.
//! - Decoding a stored ledger keeps every readable row; one bad row never
//!   discards its neighbours.
//!
//! # See also
//! - DESIGN.md

use chrono::{Datelike, NaiveDate, Weekday};
use log::warn;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// Validation error for entry and ledger construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryValidationError {
    /// Input is not a real calendar date in zero-padded ISO form.
    InvalidDate(String),
    /// Two entries in one collection share a date.
    DuplicateDate(EntryDate),
}

impl Display for EntryValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidDate(value) => {
                write!(f, "invalid entry date `{value}`; expected YYYY-MM-DD")
            }
            Self::DuplicateDate(date) => write!(f, "duplicate ledger entry for {date}"),
        }
    }
}

impl Error for EntryValidationError {}

/// Calendar date key of a ledger entry.
///
/// Holds the canonical ISO rendering next to the parsed date. The derived
/// ordering compares `iso` first, so it is plain string order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryDate {
    iso: String,
    day: NaiveDate,
}

impl EntryDate {
    /// Parses and validates a date string.
    ///
    /// Surrounding whitespace is ignored. Anything that does not render back
    /// to the same zero-padded string is rejected (`2024-6-5`, `2024-02-30`).
    pub fn parse(value: &str) -> Result<Self, EntryValidationError> {
        let trimmed = value.trim();
        let parsed = NaiveDate::parse_from_str(trimmed, ISO_DATE_FORMAT)
            .map_err(|_| EntryValidationError::InvalidDate(value.to_string()))?;
        let canonical = parsed.format(ISO_DATE_FORMAT).to_string();
        if canonical != trimmed {
            return Err(EntryValidationError::InvalidDate(value.to_string()));
        }
        Ok(Self {
            iso: canonical,
            day: parsed,
        })
    }

    pub fn from_naive(day: NaiveDate) -> Self {
        Self {
            iso: day.format(ISO_DATE_FORMAT).to_string(),
            day,
        }
    }

    pub fn as_str(&self) -> &str {
        self.iso.as_str()
    }

    /// Four-character year prefix, e.g. `"2024"`.
    pub fn year(&self) -> &str {
        &self.iso[..4]
    }

    pub fn to_naive(&self) -> NaiveDate {
        self.day
    }

    pub fn is_sunday(&self) -> bool {
        self.day.weekday() == Weekday::Sun
    }
}

impl Display for EntryDate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.iso)
    }
}

impl Serialize for EntryDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.iso)
    }
}

impl<'de> Deserialize<'de> for EntryDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// One record per calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub date: EntryDate,
    /// `None` until the user records a value for the date.
    /// Serialized as `jaap` to match the stored payload naming.
    #[serde(rename = "jaap", default)]
    pub count: Option<u64>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub notes: String,
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Option::<String>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl LedgerEntry {
    pub fn new(date: EntryDate, count: Option<u64>, notes: impl Into<String>) -> Self {
        Self {
            date,
            count,
            notes: notes.into(),
        }
    }

    /// Unrecorded entry used for the in-memory "today" row.
    pub fn placeholder(date: EntryDate) -> Self {
        Self::new(date, None, String::new())
    }

    /// Count with absent treated as zero.
    pub fn count_or_zero(&self) -> u64 {
        self.count.unwrap_or(0)
    }
}

/// Insertion-ordered collection of entries with unique dates.
///
/// Persisted as a whole; serialized as a plain JSON array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Ledger {
    entries: Vec<LedgerEntry>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a ledger, rejecting duplicate dates.
    pub fn from_entries(entries: Vec<LedgerEntry>) -> Result<Self, EntryValidationError> {
        let mut seen = HashSet::with_capacity(entries.len());
        for entry in &entries {
            if !seen.insert(entry.date.as_str()) {
                return Err(EntryValidationError::DuplicateDate(entry.date.clone()));
            }
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, date: &EntryDate) -> Option<&LedgerEntry> {
        self.entries.iter().find(|entry| &entry.date == date)
    }

    pub fn contains(&self, date: &EntryDate) -> bool {
        self.get(date).is_some()
    }

    /// Appends a placeholder entry for `date` when none exists.
    ///
    /// Returns `true` when an entry was added.
    pub fn ensure_entry(&mut self, date: &EntryDate) -> bool {
        if self.contains(date) {
            return false;
        }
        self.entries.push(LedgerEntry::placeholder(date.clone()));
        true
    }

    /// Replaces count and notes for `date`, appending a new entry if needed.
    pub fn upsert(&mut self, date: &EntryDate, count: Option<u64>, notes: impl Into<String>) {
        let notes = notes.into();
        match self.entries.iter_mut().find(|entry| &entry.date == date) {
            Some(entry) => {
                entry.count = count;
                entry.notes = notes;
            }
            None => self.entries.push(LedgerEntry::new(date.clone(), count, notes)),
        }
    }

    /// Dates of all entries in ascending order.
    pub fn sorted_dates(&self) -> Vec<&EntryDate> {
        let mut dates = self
            .entries
            .iter()
            .map(|entry| &entry.date)
            .collect::<Vec<_>>();
        dates.sort();
        dates
    }

    /// Builds a ledger from stored rows.
    ///
    /// Rows that do not decode as an entry are dropped, and so is any later
    /// row repeating an earlier date. Row content is not logged.
    pub fn from_stored_rows(rows: Vec<serde_json::Value>) -> Self {
        let mut seen = HashSet::with_capacity(rows.len());
        let mut entries = Vec::with_capacity(rows.len());
        for (index, row) in rows.into_iter().enumerate() {
            match LedgerEntry::deserialize(row) {
                Ok(entry) if !seen.insert(entry.date.clone()) => warn!(
                    "event=ledger_decode module=model status=skipped index={} date={} error_code=duplicate_date",
                    index, entry.date
                ),
                Ok(entry) => entries.push(entry),
                Err(_) => warn!(
                    "event=ledger_decode module=model status=skipped index={} error_code=row_malformed",
                    index
                ),
            }
        }
        Self { entries }
    }
}

impl<'de> Deserialize<'de> for Ledger {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let rows = Vec::<serde_json::Value>::deserialize(deserializer)?;
        Ok(Self::from_stored_rows(rows))
    }
}

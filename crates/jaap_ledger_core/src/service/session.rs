//! Ledger session controller.
//!
//! # Responsibility
//! - Own the in-memory ledger for one process run.
//! - Expose the user-facing operations: snapshot, update, restore.
//! - Sequence every accepted edit as save -> backup -> recompute.
//!
//! # Invariants
//! - The synthesized "today" placeholder lives only in memory until the
//!   user records a value.
//! - Locked dates are never mutated; rejection is an outcome, not an error.
//! - A failed write keeps the in-memory edit and surfaces the error.

use crate::model::calendar::{is_poornima, MilestoneCalendar};
use crate::model::entry::{EntryDate, Ledger, LedgerEntry};
use crate::policy::editability::is_editable;
use crate::repo::ledger_repo::LedgerStore;
use crate::service::persistence::{LoadSource, PersistError, PersistenceGateway};
use crate::stats::totals::{
    cumulative_total, milestones_by_date, progress_for_total, yearly_totals, MilestoneProgress,
};
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Session-level failure. Only write I/O reaches callers.
#[derive(Debug)]
pub enum SessionError {
    Persist(PersistError),
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Persist(err) => write!(f, "ledger write failed: {err}"),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Persist(err) => Some(err),
        }
    }
}

impl From<PersistError> for SessionError {
    fn from(value: PersistError) -> Self {
        Self::Persist(value)
    }
}

/// Outcome of `update_entry`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Entry stored in primary and backup.
    Saved(LedgerEntry),
    /// Date is outside the edit window; nothing changed.
    Rejected,
}

/// Backup metadata shown to the user before confirming a restore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupSummary {
    pub backed_up_at: Option<DateTime<Utc>>,
    pub entry_count: usize,
}

/// Outcome of `restore_from_backup`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    NoBackup,
    Declined,
    Restored { entry_count: usize },
}

/// One display row of the ledger list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryView {
    pub date: EntryDate,
    pub count: Option<u64>,
    pub notes: String,
    /// Crore index completed on this date.
    pub milestone: Option<u64>,
    pub poornima: bool,
    pub sunday: bool,
    pub editable: bool,
}

/// Aggregate values shown above the ledger list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerSummary {
    pub total: u64,
    pub progress: MilestoneProgress,
    pub yearly_totals: BTreeMap<String, u64>,
}

/// Read-only view of the session state for presentation layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerSnapshot {
    pub today: EntryView,
    pub today_is_poornima: bool,
    /// Entries dated on or before today, newest first.
    pub rows: Vec<EntryView>,
    pub summary: LedgerSummary,
    pub load_source: LoadSource,
}

/// Explicit ledger context owned by the top-level controller.
pub struct LedgerSession<S: LedgerStore> {
    gateway: PersistenceGateway<S>,
    calendar: MilestoneCalendar,
    today: EntryDate,
    ledger: Ledger,
    load_source: LoadSource,
}

impl<S: LedgerStore> LedgerSession<S> {
    /// Loads the ledger and synthesizes the in-memory today entry.
    pub fn start(
        gateway: PersistenceGateway<S>,
        calendar: MilestoneCalendar,
        today: EntryDate,
    ) -> Self {
        let outcome = gateway.load();
        let mut ledger = outcome.ledger;
        ledger.ensure_entry(&today);
        info!(
            "event=session_start module=session status=ok source={} entries={} calendar_dates={}",
            outcome.source.as_str(),
            ledger.len(),
            calendar.len()
        );
        Self {
            gateway,
            calendar,
            today,
            ledger,
            load_source: outcome.source,
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn today(&self) -> &EntryDate {
        &self.today
    }

    pub fn load_source(&self) -> LoadSource {
        self.load_source
    }

    pub fn calendar(&self) -> &MilestoneCalendar {
        &self.calendar
    }

    pub fn gateway(&self) -> &PersistenceGateway<S> {
        &self.gateway
    }

    pub fn is_editable(&self, date: &EntryDate) -> bool {
        is_editable(date, &self.today)
    }

    /// Builds the derived view of the current ledger.
    pub fn snapshot(&self) -> LedgerSnapshot {
        let mut visible = self
            .ledger
            .entries()
            .iter()
            .filter(|entry| entry.date <= self.today)
            .collect::<Vec<_>>();
        visible.sort_by(|left, right| right.date.cmp(&left.date));

        let crossings = milestones_by_date(&self.ledger);
        let rows = visible
            .into_iter()
            .map(|entry| self.entry_view(entry, &crossings))
            .collect::<Vec<_>>();
        let today_entry = self
            .ledger
            .get(&self.today)
            .cloned()
            .unwrap_or_else(|| LedgerEntry::placeholder(self.today.clone()));
        let total = cumulative_total(&self.ledger);

        LedgerSnapshot {
            today: self.entry_view(&today_entry, &crossings),
            today_is_poornima: self.calendar.contains(&self.today),
            rows,
            summary: LedgerSummary {
                total,
                progress: progress_for_total(total),
                yearly_totals: yearly_totals(&self.ledger),
            },
            load_source: self.load_source,
        }
    }

    /// Records `count` and `notes` for an editable date.
    ///
    /// # Errors
    /// - Returns `SessionError::Persist` when the primary save or the backup
    ///   write fails. The in-memory edit is kept in both cases.
    pub fn update_entry(
        &mut self,
        date: &EntryDate,
        count: Option<u64>,
        notes: impl Into<String>,
    ) -> Result<UpdateOutcome, SessionError> {
        if !self.is_editable(date) {
            warn!(
                "event=entry_update module=session status=rejected date={} today={}",
                date, self.today
            );
            return Ok(UpdateOutcome::Rejected);
        }

        self.ledger.upsert(date, count, notes);
        self.gateway.save(&self.ledger)?;
        self.gateway.backup(&self.ledger)?;

        info!(
            "event=entry_update module=session status=ok date={} has_count={}",
            date,
            count.is_some()
        );
        let saved = self
            .ledger
            .get(date)
            .cloned()
            .unwrap_or_else(|| LedgerEntry::placeholder(date.clone()));
        Ok(UpdateOutcome::Saved(saved))
    }

    /// Replaces the ledger with the backup after `confirm` approves it.
    ///
    /// # Errors
    /// - Returns `SessionError::Persist` when writing the restored ledger to
    ///   the primary store fails; the in-memory ledger is already replaced.
    pub fn restore_from_backup(
        &mut self,
        confirm: impl FnOnce(&BackupSummary) -> bool,
    ) -> Result<RestoreOutcome, SessionError> {
        let Some(record) = self.gateway.latest_backup() else {
            warn!("event=ledger_restore module=session status=no_backup");
            return Ok(RestoreOutcome::NoBackup);
        };

        let summary = BackupSummary {
            backed_up_at: record.backed_up_at,
            entry_count: record.entries.len(),
        };
        if !confirm(&summary) {
            info!("event=ledger_restore module=session status=declined");
            return Ok(RestoreOutcome::Declined);
        }

        self.ledger = record.entries;
        let saved = self.gateway.save(&self.ledger);
        // Placeholder is added after the save so it stays memory-only.
        self.ledger.ensure_entry(&self.today);
        saved?;

        info!(
            "event=ledger_restore module=session status=ok entries={}",
            summary.entry_count
        );
        Ok(RestoreOutcome::Restored {
            entry_count: summary.entry_count,
        })
    }

    fn entry_view(
        &self,
        entry: &LedgerEntry,
        crossings: &HashMap<&EntryDate, u64>,
    ) -> EntryView {
        EntryView {
            date: entry.date.clone(),
            count: entry.count,
            notes: entry.notes.clone(),
            milestone: crossings.get(&entry.date).copied(),
            poornima: is_poornima(entry, &self.calendar),
            sunday: entry.date.is_sunday(),
            editable: self.is_editable(&entry.date),
        }
    }
}

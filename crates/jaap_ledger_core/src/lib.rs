//! Core domain logic for the jaap ledger.
//! This crate is the single source of truth for ledger invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod policy;
pub mod repo;
pub mod service;
pub mod stats;

pub use config::{ConfigError, LedgerConfig};
pub use logging::{
    default_log_level, init_logging, init_stderr_logging, logging_status, LogTarget,
};
pub use model::calendar::{
    has_explicit_poornima, is_poornima, load_calendar, CalendarError, MilestoneCalendar,
};
pub use model::entry::{EntryDate, EntryValidationError, Ledger, LedgerEntry};
pub use policy::editability::{is_editable, EDIT_WINDOW_DAYS};
pub use repo::ledger_repo::{LedgerStore, RepoError, RepoResult, SqliteLedgerStore};
pub use service::persistence::{
    BackupRecord, LoadOutcome, LoadSource, PersistError, PersistResult, PersistenceGateway,
};
pub use service::session::{
    BackupSummary, EntryView, LedgerSession, LedgerSnapshot, LedgerSummary, RestoreOutcome,
    SessionError, UpdateOutcome,
};
pub use stats::totals::{
    crossed_milestone, cumulative_total, cumulative_up_to, milestones_by_date,
    next_milestone_progress, progress_for_total, yearly_totals, MilestoneProgress, CRORE,
};

/// Returns the current local calendar date.
pub fn local_today() -> EntryDate {
    EntryDate::from_naive(chrono::Local::now().date_naive())
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

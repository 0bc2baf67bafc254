//! Persistence gateway: whole-ledger saves, rolling backup, recovery load.
//!
//! # Responsibility
//! - Encode/decode the ledger payloads stored by `LedgerStore`.
//! - Maintain the single-slot backup envelope.
//! - Run the primary -> backup -> empty recovery sequence on load.
//!
//! # Invariants
//! - Read failures and malformed payloads count as "absent".
//! - Write failures are logged and returned; nothing is retried.
//! - Recovery from backup only happens inside `load`.

use crate::model::entry::Ledger;
use crate::repo::ledger_repo::{LedgerStore, RepoError};
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub type PersistResult<T> = Result<T, PersistError>;

/// Failure while writing ledger state.
#[derive(Debug)]
pub enum PersistError {
    Encode(serde_json::Error),
    Repo(RepoError),
}

impl Display for PersistError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Encode(err) => write!(f, "failed to encode ledger payload: {err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PersistError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Encode(err) => Some(err),
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<RepoError> for PersistError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<serde_json::Error> for PersistError {
    fn from(value: serde_json::Error) -> Self {
        Self::Encode(value)
    }
}

/// Backup slot envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRecord {
    /// `None` only for legacy payloads written without a timestamp.
    #[serde(rename = "backedUpAt", default)]
    pub backed_up_at: Option<DateTime<Utc>>,
    pub entries: Ledger,
}

/// Which recovery step produced the loaded ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadSource {
    Primary,
    Backup,
    Empty,
}

impl LoadSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Backup => "backup",
            Self::Empty => "empty",
        }
    }
}

/// Result of the recovery load sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOutcome {
    pub source: LoadSource,
    pub ledger: Ledger,
}

/// Gateway over a `LedgerStore` implementation.
pub struct PersistenceGateway<S: LedgerStore> {
    store: S,
}

impl<S: LedgerStore> PersistenceGateway<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Overwrites the primary record with the whole ledger.
    pub fn save(&self, ledger: &Ledger) -> PersistResult<()> {
        let started_at = Instant::now();
        let result = serde_json::to_string(ledger)
            .map_err(PersistError::from)
            .and_then(|payload| Ok(self.store.write_primary(&payload)?));

        match &result {
            Ok(()) => info!(
                "event=ledger_save module=persistence status=ok entries={} duration_ms={}",
                ledger.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=ledger_save module=persistence status=error entries={} duration_ms={} error_code=primary_write_failed error={}",
                ledger.len(),
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }

    /// Writes the ledger into the backup slot stamped with the current time.
    pub fn backup(&self, ledger: &Ledger) -> PersistResult<BackupRecord> {
        self.backup_at(ledger, Utc::now())
    }

    /// Writes the ledger into the backup slot with an explicit timestamp.
    pub fn backup_at(&self, ledger: &Ledger, at: DateTime<Utc>) -> PersistResult<BackupRecord> {
        let record = BackupRecord {
            backed_up_at: Some(at),
            entries: ledger.clone(),
        };
        let result = serde_json::to_string(&record)
            .map_err(PersistError::from)
            .and_then(|payload| Ok(self.store.write_backup(&payload)?));

        match result {
            Ok(()) => {
                info!(
                    "event=ledger_backup module=persistence status=ok entries={}",
                    ledger.len()
                );
                Ok(record)
            }
            Err(err) => {
                error!(
                    "event=ledger_backup module=persistence status=error entries={} error_code=backup_write_failed error={}",
                    ledger.len(),
                    err
                );
                Err(err)
            }
        }
    }

    /// Reads the backup slot; unreadable or malformed backups are `None`.
    pub fn latest_backup(&self) -> Option<BackupRecord> {
        let payload = match self.store.read_backup() {
            Ok(Some(payload)) => payload,
            Ok(None) => return None,
            Err(err) => {
                warn!(
                    "event=backup_read module=persistence status=error error_code=backup_read_failed error={}",
                    err
                );
                return None;
            }
        };

        match serde_json::from_str::<BackupRecord>(&payload) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!(
                    "event=backup_read module=persistence status=error error_code=backup_malformed error={}",
                    err
                );
                None
            }
        }
    }

    /// Loads the ledger: primary, else backup (repairing primary), else empty.
    pub fn load(&self) -> LoadOutcome {
        if let Some(ledger) = self.read_primary_ledger() {
            info!(
                "event=ledger_load module=persistence status=ok source=primary entries={}",
                ledger.len()
            );
            return LoadOutcome {
                source: LoadSource::Primary,
                ledger,
            };
        }

        warn!("event=ledger_load module=persistence status=fallback source=backup");
        if let Some(record) = self.latest_backup() {
            // Repair failure leaves the primary empty; the next save fixes it.
            if let Err(err) = self.save(&record.entries) {
                warn!(
                    "event=ledger_repair module=persistence status=error error={}",
                    err
                );
            }
            info!(
                "event=ledger_load module=persistence status=ok source=backup entries={}",
                record.entries.len()
            );
            return LoadOutcome {
                source: LoadSource::Backup,
                ledger: record.entries,
            };
        }

        warn!("event=ledger_load module=persistence status=ok source=empty entries=0");
        LoadOutcome {
            source: LoadSource::Empty,
            ledger: Ledger::new(),
        }
    }

    fn read_primary_ledger(&self) -> Option<Ledger> {
        let payload = match self.store.read_primary() {
            Ok(payload) => payload?,
            Err(err) => {
                warn!(
                    "event=ledger_read module=persistence status=error error_code=primary_read_failed error={}",
                    err
                );
                return None;
            }
        };

        match serde_json::from_str::<Ledger>(&payload) {
            Ok(ledger) => Some(ledger),
            Err(err) => {
                warn!(
                    "event=ledger_read module=persistence status=error error_code=primary_malformed error={}",
                    err
                );
                None
            }
        }
    }
}

//! Ledger key/value store contracts and SQLite implementation.
//!
//! # Responsibility
//! - Read and overwrite the single primary ledger record.
//! - Read and overwrite the single backup slot.
//!
//! # Invariants
//! - Each store holds at most one row under its fixed key.
//! - Writes replace the whole value in one statement; no partial writes.
//! - This layer moves opaque JSON text and never interprets it.

use crate::db::DbError;
use rusqlite::{params, Connection, OptionalExtension};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Primary store table and key.
pub const PRIMARY_TABLE: &str = "ledger";
pub const PRIMARY_KEY: &str = "entries";
/// Backup store table and key.
pub const BACKUP_TABLE: &str = "ledger_backups";
pub const BACKUP_KEY: &str = "latest";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for ledger store access.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    MissingRequiredTable(&'static str),
    /// Non-SQLite backend failure (custom stores, test doubles).
    Backend(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::MissingRequiredTable(table) => {
                write!(f, "ledger storage is missing table `{table}`")
            }
            Self::Backend(message) => write!(f, "ledger store failure: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::MissingRequiredTable(_) | Self::Backend(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Two named records: the primary ledger and its single backup.
pub trait LedgerStore {
    /// Raw primary payload, `None` when never written or cleared.
    fn read_primary(&self) -> RepoResult<Option<String>>;
    /// Overwrites the primary payload.
    fn write_primary(&self, payload: &str) -> RepoResult<()>;
    /// Removes the primary payload.
    fn clear_primary(&self) -> RepoResult<()>;
    /// Raw backup payload, `None` when no backup exists.
    fn read_backup(&self) -> RepoResult<Option<String>>;
    /// Overwrites the backup slot.
    fn write_backup(&self, payload: &str) -> RepoResult<()>;
}

/// SQLite-backed ledger store.
pub struct SqliteLedgerStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteLedgerStore<'conn> {
    /// Constructs a store from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        for table in [PRIMARY_TABLE, BACKUP_TABLE] {
            if !table_exists(conn, table)? {
                return Err(RepoError::MissingRequiredTable(table));
            }
        }
        Ok(Self { conn })
    }

    fn read(&self, table: &str, key: &str) -> RepoResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                &format!("SELECT value FROM {table} WHERE key = ?1;"),
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn write(&self, table: &str, key: &str, payload: &str) -> RepoResult<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO {table} (key, value, updated_at)
                 VALUES (?1, ?2, (strftime('%s', 'now') * 1000))
                 ON CONFLICT(key) DO UPDATE SET
                    value = excluded.value,
                    updated_at = excluded.updated_at;"
            ),
            params![key, payload],
        )?;
        Ok(())
    }
}

impl LedgerStore for SqliteLedgerStore<'_> {
    fn read_primary(&self) -> RepoResult<Option<String>> {
        self.read(PRIMARY_TABLE, PRIMARY_KEY)
    }

    fn write_primary(&self, payload: &str) -> RepoResult<()> {
        self.write(PRIMARY_TABLE, PRIMARY_KEY, payload)
    }

    fn clear_primary(&self) -> RepoResult<()> {
        self.conn.execute(
            &format!("DELETE FROM {PRIMARY_TABLE} WHERE key = ?1;"),
            [PRIMARY_KEY],
        )?;
        Ok(())
    }

    fn read_backup(&self) -> RepoResult<Option<String>> {
        self.read(BACKUP_TABLE, BACKUP_KEY)
    }

    fn write_backup(&self, payload: &str) -> RepoResult<()> {
        self.write(BACKUP_TABLE, BACKUP_KEY, payload)
    }
}

impl<S: LedgerStore + ?Sized> LedgerStore for &S {
    fn read_primary(&self) -> RepoResult<Option<String>> {
        (**self).read_primary()
    }

    fn write_primary(&self, payload: &str) -> RepoResult<()> {
        (**self).write_primary(payload)
    }

    fn clear_primary(&self) -> RepoResult<()> {
        (**self).clear_primary()
    }

    fn read_backup(&self) -> RepoResult<Option<String>> {
        (**self).read_backup()
    }

    fn write_backup(&self, payload: &str) -> RepoResult<()> {
        (**self).write_backup(payload)
    }
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

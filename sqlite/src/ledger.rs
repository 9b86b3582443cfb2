//! The `schema_migrations` ledger.
//!
//! One row per applied migration, keyed by version. Rows are appended when a
//! migration is applied and removed one at a time, newest first, when it is
//! rolled back. Writers take the caller's transaction so the ledger and the
//! schema change commit together.

use chrono::{DateTime, Utc};
use quarterly_core::MigrationVersion;
use quarterly_db::MigrationFile;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::error::Result;
use crate::schema::{LEDGER_TABLE, ledger_table_sql, table_exists};

/// Fixed-width UTC timestamp format, so text ordering matches time ordering.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// One applied migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub version: MigrationVersion,
    pub name: String,
    pub applied_at: DateTime<Utc>,
    /// SHA-256 of the up script at the time it was applied.
    pub checksum: String,
}

/// Creates the ledger table if it does not exist.
pub fn ensure_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(&ledger_table_sql())?;
    Ok(())
}

/// Returns all ledger entries in ascending version order.
///
/// A database without a ledger table has an empty ledger.
pub fn entries(conn: &Connection) -> Result<Vec<LedgerEntry>> {
    if !table_exists(conn, LEDGER_TABLE)? {
        return Ok(Vec::new());
    }
    let mut stmt = conn.prepare(&format!(
        "SELECT version, name, applied_at, checksum FROM {LEDGER_TABLE} ORDER BY version"
    ))?;
    let entries = stmt
        .query_map([], entry_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(entries)
}

/// Returns the most recently applied entry.
///
/// Entries applied within the same instant are ordered by version.
pub fn latest(conn: &Connection) -> Result<Option<LedgerEntry>> {
    if !table_exists(conn, LEDGER_TABLE)? {
        return Ok(None);
    }
    let entry = conn
        .query_row(
            &format!(
                "SELECT version, name, applied_at, checksum FROM {LEDGER_TABLE} \
                 ORDER BY applied_at DESC, version DESC LIMIT 1"
            ),
            [],
            entry_from_row,
        )
        .optional()?;
    Ok(entry)
}

/// Appends an entry for `file`.
pub(crate) fn record(
    conn: &Connection,
    file: &MigrationFile,
    applied_at: DateTime<Utc>,
) -> rusqlite::Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO {LEDGER_TABLE} (version, name, applied_at, checksum) VALUES (?1, ?2, ?3, ?4)"
        ),
        params![
            file.version.get(),
            file.slug,
            applied_at.format(TIMESTAMP_FORMAT).to_string(),
            file.checksum(),
        ],
    )?;
    Ok(())
}

/// Deletes the entry with exactly this version. Returns the number of rows
/// removed.
pub(crate) fn remove(conn: &Connection, version: MigrationVersion) -> rusqlite::Result<usize> {
    conn.execute(
        &format!("DELETE FROM {LEDGER_TABLE} WHERE version = ?1"),
        params![version.get()],
    )
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<LedgerEntry> {
    let raw_version: u32 = row.get(0)?;
    let version = MigrationVersion::new(raw_version).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            Type::Integer,
            "ledger version must be greater than zero".into(),
        )
    })?;
    let raw_applied: String = row.get(2)?;
    let applied_at = DateTime::parse_from_rfc3339(&raw_applied)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?
        .with_timezone(&Utc);
    Ok(LedgerEntry {
        version,
        name: row.get(1)?,
        applied_at,
        checksum: row.get(3)?,
    })
}

//! Table names, ledger DDL, and connection setup.
//!
//! The content tables themselves are created by migration files; this module
//! only knows their names and can check that the cascade rules the
//! maintenance operations depend on are declared.
//!
//! # Table structure
//!
//! - `schema_migrations`: one row per applied migration
//! - `quarterly`: top-level study guides
//! - `lesson`: weekly lessons, `quarterly_id` cascades from `quarterly`
//! - `lesson_day`: daily readings, `lesson_id` cascades from `lesson`

use std::path::Path;
use std::time::Duration;

use rusqlite::{Connection, OpenFlags, params};

use crate::error::{Result, SqliteError};

pub const LEDGER_TABLE: &str = "schema_migrations";
pub const QUARTERLY_TABLE: &str = "quarterly";
pub const LESSON_TABLE: &str = "lesson";
pub const LESSON_DAY_TABLE: &str = "lesson_day";

/// Foreign keys that must cascade: `(child table, column, parent table)`.
pub const CASCADE_RULES: [(&str, &str, &str); 2] = [
    (LESSON_TABLE, "quarterly_id", QUARTERLY_TABLE),
    (LESSON_DAY_TABLE, "lesson_id", LESSON_TABLE),
];

/// Generates the ledger table DDL.
pub fn ledger_table_sql() -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS {LEDGER_TABLE} (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TEXT NOT NULL,
    checksum TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_{LEDGER_TABLE}_applied_at ON {LEDGER_TABLE}(applied_at);
"#
    )
}

/// Opens (or creates) a database file and configures it.
///
/// The connection enforces foreign keys and waits up to `busy_timeout` for
/// locks held by other connections.
///
/// # Errors
///
/// Returns [`SqliteError::ConnectionError`] if the file cannot be opened.
pub fn open_database(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Connection> {
    let path = path.as_ref();
    let connection_error = |source| SqliteError::ConnectionError {
        path: path.to_path_buf(),
        source,
    };
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
    )
    .map_err(connection_error)?;
    conn.busy_timeout(busy_timeout).map_err(connection_error)?;
    configure(&conn).map_err(connection_error)?;
    Ok(conn)
}

/// Enables foreign key enforcement. Has no effect inside a transaction.
pub(crate) fn configure(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")
}

/// Checks whether a table exists.
pub fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let mut stmt =
        conn.prepare("SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1")?;
    let count: i64 = stmt.query_row([table], |row| row.get(0))?;
    Ok(count > 0)
}

/// Returns `true` if `child.column` references `parent` with
/// `ON DELETE CASCADE`.
pub fn cascade_declared(conn: &Connection, child: &str, column: &str, parent: &str) -> Result<bool> {
    let mut stmt = conn.prepare(
        r#"SELECT COUNT(*) FROM pragma_foreign_key_list(?1)
           WHERE "table" = ?2 AND "from" = ?3 AND on_delete = 'CASCADE'"#,
    )?;
    let count: i64 = stmt.query_row(params![child, parent, column], |row| row.get(0))?;
    Ok(count > 0)
}

/// Fails unless every rule in [`CASCADE_RULES`] is declared in the schema.
pub fn verify_cascade(conn: &Connection) -> Result<()> {
    for (child, column, parent) in CASCADE_RULES {
        if !cascade_declared(conn, child, column, parent)? {
            return Err(SqliteError::CascadeNotDeclared {
                table: child.to_string(),
                column: column.to_string(),
            });
        }
    }
    Ok(())
}

/// Counts rows in a table.
pub(crate) fn count_rows(conn: &Connection, table: &str) -> Result<usize> {
    let mut stmt = conn.prepare(&format!("SELECT COUNT(*) FROM {table}"))?;
    let count: i64 = stmt.query_row([], |row| row.get(0))?;
    Ok(count as usize)
}

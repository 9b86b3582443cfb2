//! Error types for SQLite ledger and content operations.
//!
//! Provides a unified error type covering database access, migration
//! execution, cascade integrity, and validation failures.

use std::path::PathBuf;

use quarterly_core::{HierarchyCounts, MigrationVersion, ValidationError};
use thiserror::Error;

/// Errors that can occur during SQLite operations.
#[derive(Debug, Error)]
pub enum SqliteError {
    /// SQLite database operation failure.
    #[error("database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    /// The database could not be opened or configured.
    #[error("cannot open database '{}': {source}", .path.display())]
    ConnectionError {
        path: PathBuf,
        source: rusqlite::Error,
    },

    /// A migration's up script or ledger insert failed.
    ///
    /// Versions listed in `applied` were committed before the failure and
    /// remain applied.
    #[error("migration {version}_{name} failed: {source}")]
    MigrationExecution {
        version: MigrationVersion,
        name: String,
        applied: Vec<MigrationVersion>,
        source: rusqlite::Error,
    },

    /// A migration's down script failed; the ledger is unchanged.
    #[error("rollback of migration {version}_{name} failed: {source}")]
    RollbackExecution {
        version: MigrationVersion,
        name: String,
        source: rusqlite::Error,
    },

    /// The ledger row to remove was not found inside the rollback transaction.
    #[error("ledger entry for version {0} disappeared during rollback")]
    LedgerChanged(MigrationVersion),

    /// Migration file or configuration failure.
    #[error("migration store error: {0}")]
    StoreError(#[from] quarterly_db::StoreError),

    /// A foreign key the maintenance operations rely on is not
    /// `ON DELETE CASCADE`.
    #[error("{table}.{column} is not declared ON DELETE CASCADE; apply the content migrations first")]
    CascadeNotDeclared { table: String, column: String },

    /// Dependent rows survived a cascading delete; the transaction was
    /// rolled back.
    #[error("cascade left rows behind {0}; transaction rolled back")]
    IncompleteCascade(HierarchyCounts),

    /// Requested row does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// Content failed validation before it was written.
    #[error("validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Convenience alias for results with [`SqliteError`].
pub type Result<T> = std::result::Result<T, SqliteError>;

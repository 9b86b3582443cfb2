//! SQLite storage for the quarterly content hierarchy and its migrations.
//!
//! This crate applies versioned migration files to a SQLite database while
//! keeping a `schema_migrations` ledger, and provides access to the
//! quarterly → lesson → lesson-day tree those migrations create.
//!
//! # Architecture
//!
//! The crate is organized into five modules:
//!
//! - **`schema`**: table names, ledger DDL, connection setup, cascade checks
//! - **`ledger`**: reading and writing `schema_migrations`
//! - **`migrator`**: apply pending / roll back latest / status
//! - **`content`**: content CRUD, import, cascading delete, field cleanup
//! - **`maintenance`**: bulk clear with dry-run and before/after counts
//!
//! # Quick start: migrations
//!
//! ```no_run
//! use std::time::Duration;
//! use quarterly_db::MigrationDir;
//! use quarterly_sqlite::{Migrator, open_database};
//!
//! let conn = open_database("content.db", Duration::from_secs(5)).unwrap();
//! let mut migrator = Migrator::new(conn, MigrationDir::open("migrations").unwrap()).unwrap();
//! let summary = migrator.apply_pending().unwrap();
//! println!("applied {} migration(s)", summary.applied.len());
//! ```
//!
//! # Quick start: maintenance
//!
//! ```no_run
//! use quarterly_sqlite::{ClearMode, Maintenance};
//! use rusqlite::Connection;
//!
//! let conn = Connection::open("content.db").unwrap();
//! let summary = Maintenance::new(&conn)
//!     .unwrap()
//!     .clear_quarterlies(ClearMode::DryRun)
//!     .unwrap();
//! println!("would remove {}", summary.removed());
//! ```

mod content;
mod error;
mod ledger;
mod maintenance;
mod migrator;
mod schema;

pub use content::{CascadeReport, ContentStore, ImportReport};
pub use error::{Result, SqliteError};
pub use ledger::LedgerEntry;
pub use maintenance::{ClearMode, ClearSummary, Maintenance};
pub use migrator::{
    AppliedMigration, ApplySummary, ManualReason, MigrationReport, MigrationState,
    MigrationStatusLine, Migrator, RollbackOutcome,
};
pub use schema::{
    CASCADE_RULES, LEDGER_TABLE, LESSON_DAY_TABLE, LESSON_TABLE, QUARTERLY_TABLE,
    cascade_declared, ledger_table_sql, open_database, table_exists, verify_cascade,
};

//! Migration lifecycle: apply pending, roll back the latest, report status.
//!
//! Provides [`Migrator`], which pairs a database connection with a
//! [`MigrationDir`]. Every migration is its own `BEGIN IMMEDIATE`
//! transaction covering both the script and the ledger row, so a failure
//! never leaves a script applied without its ledger entry or the reverse.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use quarterly_db::MigrationDir;
//! use quarterly_sqlite::{Migrator, RollbackOutcome, open_database};
//!
//! let conn = open_database("content.db", Duration::from_secs(5)).unwrap();
//! let dir = MigrationDir::open("migrations").unwrap();
//! let mut migrator = Migrator::new(conn, dir).unwrap();
//!
//! let summary = migrator.apply_pending().unwrap();
//! println!("applied {} migration(s)", summary.applied.len());
//!
//! match migrator.rollback_last().unwrap() {
//!     RollbackOutcome::RolledBack { entry } => println!("rolled back {}", entry.version),
//!     other => println!("{other:?}"),
//! }
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use quarterly_core::MigrationVersion;
use quarterly_db::{MigrationDir, MigrationEntry, MigrationFile};
use rusqlite::{Connection, TransactionBehavior};
use tracing::{debug, info, warn};

use crate::error::{Result, SqliteError};
use crate::ledger::{self, LedgerEntry};
use crate::schema::configure;

/// Applies and rolls back migrations from a directory against a database.
///
/// Owns its connection; use [`into_connection`](Self::into_connection) to
/// get it back.
pub struct Migrator {
    conn: Connection,
    dir: MigrationDir,
}

impl Migrator {
    /// Creates a migrator. Enables foreign key enforcement on `conn`.
    pub fn new(conn: Connection, dir: MigrationDir) -> Result<Self> {
        configure(&conn)?;
        Ok(Self { conn, dir })
    }

    /// Returns migrations present on disk but absent from the ledger, in
    /// ascending version order. Executes nothing.
    pub fn pending(&self) -> Result<Vec<MigrationEntry>> {
        let applied: BTreeSet<MigrationVersion> = ledger::entries(&self.conn)?
            .into_iter()
            .map(|e| e.version)
            .collect();
        let scan = self.dir.scan()?;

        let on_disk: BTreeSet<MigrationVersion> = scan.entries.iter().map(|e| e.version).collect();
        for orphan in applied.difference(&on_disk) {
            warn!(version = %orphan, "Ledger entry has no migration file");
        }

        Ok(scan
            .entries
            .into_iter()
            .filter(|e| !applied.contains(&e.version))
            .collect())
    }

    /// Applies every pending migration in ascending version order.
    ///
    /// All pending files are read and parsed before anything executes. Each
    /// migration then runs in its own transaction together with its ledger
    /// insert. The run stops at the first failure; migrations after it are
    /// not attempted.
    ///
    /// # Errors
    ///
    /// - [`SqliteError::StoreError`] if a pending file cannot be read or
    ///   parsed. Nothing has executed.
    /// - [`SqliteError::MigrationExecution`] if a script fails. Its
    ///   `applied` field lists the versions committed earlier in this run.
    pub fn apply_pending(&mut self) -> Result<ApplySummary> {
        let pending = self.pending()?;
        let mut summary = ApplySummary {
            applied: Vec::new(),
            already_applied: ledger::entries(&self.conn)?.len(),
        };
        if pending.is_empty() {
            debug!("No pending migrations");
            return Ok(summary);
        }

        let files = pending
            .iter()
            .map(MigrationEntry::load)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        ledger::ensure_table(&self.conn)?;

        for file in files {
            if let Err(source) = self.apply_one(&file) {
                return Err(SqliteError::MigrationExecution {
                    version: file.version,
                    name: file.slug,
                    applied: summary.applied.iter().map(|m| m.version).collect(),
                    source,
                });
            }
            info!(version = %file.version, name = %file.slug, "Applied migration");
            summary.applied.push(AppliedMigration {
                version: file.version,
                name: file.slug.clone(),
                checksum: file.checksum(),
            });
        }

        Ok(summary)
    }

    fn apply_one(&mut self, file: &MigrationFile) -> rusqlite::Result<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        debug!(version = %file.version, "Executing up script");
        tx.execute_batch(&file.up_script)?;
        ledger::record(&tx, file, Utc::now())?;
        tx.commit()
    }

    /// Reverts the most recently applied migration.
    ///
    /// Only reports success after a down script has actually run. When the
    /// latest migration has no down script, or its file is gone, nothing
    /// executes and the ledger is left as is.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError::RollbackExecution`] if the down script fails;
    /// the transaction is rolled back and the ledger entry kept.
    pub fn rollback_last(&mut self) -> Result<RollbackOutcome> {
        let Some(entry) = ledger::latest(&self.conn)? else {
            return Ok(RollbackOutcome::NothingToRollBack);
        };

        let Some(file) = self.dir.load(entry.version)? else {
            warn!(version = %entry.version, "Migration file missing, cannot roll back");
            return Ok(RollbackOutcome::ManualInterventionRequired {
                entry,
                reason: ManualReason::MissingFile,
            });
        };
        let Some(down_script) = file.down_script.as_deref() else {
            warn!(version = %entry.version, "Migration has no down script");
            return Ok(RollbackOutcome::ManualInterventionRequired {
                entry,
                reason: ManualReason::MissingDownScript,
            });
        };

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute_batch(down_script)
            .map_err(|source| SqliteError::RollbackExecution {
                version: entry.version,
                name: entry.name.clone(),
                source,
            })?;
        if ledger::remove(&tx, entry.version)? != 1 {
            return Err(SqliteError::LedgerChanged(entry.version));
        }
        tx.commit()?;

        info!(version = %entry.version, name = %entry.name, "Rolled back migration");
        Ok(RollbackOutcome::RolledBack { entry })
    }

    /// Returns the ledger in ascending version order.
    pub fn applied(&self) -> Result<Vec<LedgerEntry>> {
        ledger::entries(&self.conn)
    }

    /// Compares the ledger with the directory.
    ///
    /// Applied migrations whose up script no longer matches the recorded
    /// checksum are reported as [`MigrationState::Drifted`]; ledger entries
    /// without a file are [`MigrationState::Orphaned`].
    pub fn status(&self) -> Result<MigrationReport> {
        let scan = self.dir.scan()?;
        let mut ledger: BTreeMap<MigrationVersion, LedgerEntry> = ledger::entries(&self.conn)?
            .into_iter()
            .map(|e| (e.version, e))
            .collect();

        let mut migrations = Vec::with_capacity(scan.entries.len());
        for entry in &scan.entries {
            let state = match ledger.remove(&entry.version) {
                None => MigrationState::Pending,
                Some(applied) => {
                    let file = entry.load()?;
                    if file.checksum() == applied.checksum {
                        MigrationState::Applied {
                            applied_at: applied.applied_at,
                        }
                    } else {
                        MigrationState::Drifted {
                            applied_at: applied.applied_at,
                        }
                    }
                }
            };
            migrations.push(MigrationStatusLine {
                version: entry.version,
                name: entry.slug.clone(),
                state,
            });
        }

        for (version, orphan) in ledger {
            migrations.push(MigrationStatusLine {
                version,
                name: orphan.name,
                state: MigrationState::Orphaned {
                    applied_at: orphan.applied_at,
                },
            });
        }
        migrations.sort_by_key(|m| m.version);

        Ok(MigrationReport {
            migrations,
            rejected: scan.rejected,
        })
    }

    pub fn directory(&self) -> &MigrationDir {
        &self.dir
    }

    /// Returns a reference to the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Consumes the migrator and returns the underlying connection.
    pub fn into_connection(self) -> Connection {
        self.conn
    }
}

/// A migration committed by [`Migrator::apply_pending`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMigration {
    pub version: MigrationVersion,
    pub name: String,
    pub checksum: String,
}

/// Result of [`Migrator::apply_pending`].
#[derive(Debug, Clone, Default)]
pub struct ApplySummary {
    /// Migrations applied by this run, in order.
    pub applied: Vec<AppliedMigration>,
    /// Ledger size before this run.
    pub already_applied: usize,
}

/// Why a rollback needs a human.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManualReason {
    /// The migration file has no down section with statements.
    MissingDownScript,
    /// The ledger names a version with no file in the directory.
    MissingFile,
}

impl fmt::Display for ManualReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingDownScript => f.write_str("migration has no down script"),
            Self::MissingFile => f.write_str("migration file is missing"),
        }
    }
}

/// Result of [`Migrator::rollback_last`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RollbackOutcome {
    /// The ledger is empty.
    NothingToRollBack,
    /// Nothing was executed; the ledger is unchanged.
    ManualInterventionRequired {
        entry: LedgerEntry,
        reason: ManualReason,
    },
    /// The down script ran and the ledger entry was removed.
    RolledBack { entry: LedgerEntry },
}

/// State of one version in a [`MigrationReport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationState {
    Pending,
    Applied { applied_at: DateTime<Utc> },
    /// Applied, but the file's up script changed afterwards.
    Drifted { applied_at: DateTime<Utc> },
    /// In the ledger with no file on disk.
    Orphaned { applied_at: DateTime<Utc> },
}

impl MigrationState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Applied { .. } => "applied",
            Self::Drifted { .. } => "drifted",
            Self::Orphaned { .. } => "orphaned",
        }
    }

    pub fn applied_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Pending => None,
            Self::Applied { applied_at }
            | Self::Drifted { applied_at }
            | Self::Orphaned { applied_at } => Some(*applied_at),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatusLine {
    pub version: MigrationVersion,
    pub name: String,
    pub state: MigrationState,
}

/// Result of [`Migrator::status`].
#[derive(Debug, Clone, Default)]
pub struct MigrationReport {
    /// Every known version in ascending order.
    pub migrations: Vec<MigrationStatusLine>,
    /// `.sql` files excluded for lacking a usable version.
    pub rejected: Vec<PathBuf>,
}

impl MigrationReport {
    pub fn count(&self, label: &str) -> usize {
        self.migrations
            .iter()
            .filter(|m| m.state.label() == label)
            .count()
    }

    /// Returns `true` if any applied migration drifted or lost its file.
    pub fn has_problems(&self) -> bool {
        self.migrations.iter().any(|m| {
            matches!(
                m.state,
                MigrationState::Drifted { .. } | MigrationState::Orphaned { .. }
            )
        })
    }
}

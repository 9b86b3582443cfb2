//! Destructive bulk operations on the content hierarchy.
//!
//! Every operation reports row counts before and after so the outcome can
//! be checked without querying the database separately. A dry run reports
//! what would be removed and writes nothing.

use std::fmt;

use quarterly_core::HierarchyCounts;
use rusqlite::Connection;
use tracing::{info, warn};

use crate::content::hierarchy_counts;
use crate::error::{Result, SqliteError};
use crate::schema::{QUARTERLY_TABLE, configure, verify_cascade};

/// Whether a destructive operation commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearMode {
    /// Count what would be removed; change nothing.
    DryRun,
    /// Delete and commit.
    Commit,
}

/// Result of [`Maintenance::clear_quarterlies`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearSummary {
    pub mode: ClearMode,
    pub before: HierarchyCounts,
    /// Counts after the operation. Equal to `before` for dry runs and
    /// skipped runs.
    pub after: HierarchyCounts,
    /// `true` when there was nothing to delete and no statement ran.
    pub skipped: bool,
}

impl ClearSummary {
    /// Rows that were (or, for a dry run, would be) removed.
    pub fn removed(&self) -> HierarchyCounts {
        match (self.mode, self.skipped) {
            (_, true) => HierarchyCounts::default(),
            (ClearMode::DryRun, false) => self.before,
            (ClearMode::Commit, false) => HierarchyCounts {
                quarterlies: self.before.quarterlies - self.after.quarterlies,
                lessons: self.before.lessons - self.after.lessons,
                lesson_days: self.before.lesson_days - self.after.lesson_days,
            },
        }
    }
}

impl fmt::Display for ClearSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "before {} after {}", self.before, self.after)
    }
}

/// Bulk maintenance over a connection.
pub struct Maintenance<'a> {
    conn: &'a Connection,
}

impl<'a> Maintenance<'a> {
    /// Creates a maintenance handle and enables foreign key enforcement.
    pub fn new(conn: &'a Connection) -> Result<Self> {
        configure(conn)?;
        Ok(Self { conn })
    }

    /// Deletes every quarterly, and through the cascade every lesson and
    /// lesson day.
    ///
    /// Returns without executing any delete when there are no quarterlies.
    /// Otherwise the delete runs as a single statement in a single
    /// transaction, which commits only if all three tables end up empty.
    ///
    /// # Errors
    ///
    /// - [`SqliteError::CascadeNotDeclared`] if the schema does not cascade
    ///   from quarterly to lesson to lesson day.
    /// - [`SqliteError::IncompleteCascade`] if rows remain after the delete
    ///   (for example lessons orphaned while foreign keys were off). The
    ///   transaction is rolled back.
    pub fn clear_quarterlies(&self, mode: ClearMode) -> Result<ClearSummary> {
        let before = hierarchy_counts(self.conn)?;
        if before.quarterlies == 0 {
            info!(counts = %before, "No quarterlies to clear");
            return Ok(ClearSummary {
                mode,
                before,
                after: before,
                skipped: true,
            });
        }

        verify_cascade(self.conn)?;

        if mode == ClearMode::DryRun {
            return Ok(ClearSummary {
                mode,
                before,
                after: before,
                skipped: false,
            });
        }

        let tx = self.conn.unchecked_transaction()?;
        // Recount inside the transaction so the report matches what is deleted.
        let before = hierarchy_counts(&tx)?;
        tx.execute(&format!("DELETE FROM {QUARTERLY_TABLE}"), [])?;
        let after = hierarchy_counts(&tx)?;
        if !after.is_empty() {
            warn!(counts = %after, "Rows survived clearing quarterlies, rolling back");
            return Err(SqliteError::IncompleteCascade(after));
        }
        tx.commit()?;

        info!(before = %before, "Cleared all quarterlies");
        Ok(ClearSummary {
            mode,
            before,
            after,
            skipped: false,
        })
    }
}

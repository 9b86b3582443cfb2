//! Quarterly / lesson / lesson-day storage.
//!
//! Provides [`ContentStore`] for reading and writing the content hierarchy.
//! Writes are validated first and run in transactions. Deleting a quarterly
//! relies on the `ON DELETE CASCADE` foreign keys declared by the content
//! migrations to remove its lessons and their days in the same statement.
//!
//! # Example
//!
//! ```no_run
//! use quarterly_core::{NewLesson, NewQuarterly, QuarterlyKind};
//! use quarterly_sqlite::ContentStore;
//! use rusqlite::Connection;
//!
//! let conn = Connection::open("content.db").unwrap();
//! let store = ContentStore::new(&conn).unwrap();
//!
//! let id = store
//!     .insert_quarterly(&NewQuarterly::new("Lessons on Faith", QuarterlyKind::Adult, 1, 2025))
//!     .unwrap();
//! store.insert_lesson(id, &NewLesson::new("By Faith Abel")).unwrap();
//!
//! let report = store.delete_quarterly(id).unwrap();
//! println!("removed {} lesson(s)", report.lessons_removed);
//! ```

use std::str::FromStr;

use quarterly_core::{
    HierarchyCounts, Lesson, LessonDay, LessonFields, NewLesson, NewLessonDay, NewQuarterly,
    Quarterly, QuarterlyImport, validate_import, validate_lesson, validate_quarterly,
};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::{debug, info};

use crate::error::{Result, SqliteError};
use crate::schema::{
    LESSON_DAY_TABLE, LESSON_TABLE, QUARTERLY_TABLE, configure, count_rows, verify_cascade,
};

const QUARTERLY_COLUMNS: &str = "id, title, kind, quarter, year, description, cover_url";
const LESSON_COLUMNS: &str = "id, quarterly_id, title, memory_verse, study_helps, study_aim";
const LESSON_DAY_COLUMNS: &str = "id, lesson_id, day_name, content";

/// Read/write access to the content hierarchy.
pub struct ContentStore<'a> {
    conn: &'a Connection,
}

impl<'a> ContentStore<'a> {
    /// Creates a store over `conn` and enables foreign key enforcement.
    pub fn new(conn: &'a Connection) -> Result<Self> {
        configure(conn)?;
        Ok(Self { conn })
    }

    /// Inserts a quarterly and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError::Validation`] if the quarterly is invalid.
    pub fn insert_quarterly(&self, quarterly: &NewQuarterly) -> Result<i64> {
        let errors = validate_quarterly(quarterly);
        if !errors.is_empty() {
            return Err(SqliteError::Validation(errors));
        }
        insert_quarterly_row(self.conn, quarterly)
    }

    /// Inserts a lesson under `quarterly_id` and returns its id.
    ///
    /// Free-text fields are trimmed at their stop words before writing.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError::NotFound`] if the quarterly does not exist, or
    /// [`SqliteError::Validation`] if the lesson is invalid.
    pub fn insert_lesson(&self, quarterly_id: i64, lesson: &NewLesson) -> Result<i64> {
        let errors = validate_lesson(lesson);
        if !errors.is_empty() {
            return Err(SqliteError::Validation(errors));
        }
        if !self.exists(QUARTERLY_TABLE, quarterly_id)? {
            return Err(SqliteError::NotFound {
                entity: "quarterly",
                id: quarterly_id,
            });
        }
        insert_lesson_row(self.conn, quarterly_id, &lesson.normalized())
    }

    /// Inserts a daily reading under `lesson_id` and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError::NotFound`] if the lesson does not exist.
    pub fn insert_lesson_day(&self, lesson_id: i64, day: &NewLessonDay) -> Result<i64> {
        if !self.exists(LESSON_TABLE, lesson_id)? {
            return Err(SqliteError::NotFound {
                entity: "lesson",
                id: lesson_id,
            });
        }
        insert_lesson_day_row(self.conn, lesson_id, day)
    }

    /// Inserts a whole quarterly document in one transaction.
    ///
    /// The document is validated before anything is written; lesson fields
    /// are normalized on the way in.
    pub fn import_quarterly(&self, doc: &QuarterlyImport) -> Result<ImportReport> {
        let errors = validate_import(doc);
        if !errors.is_empty() {
            return Err(SqliteError::Validation(errors));
        }

        let tx = self.conn.unchecked_transaction()?;
        let quarterly_id = insert_quarterly_row(&tx, &doc.quarterly)?;
        let mut report = ImportReport {
            quarterly_id,
            lessons_inserted: 0,
            days_inserted: 0,
        };
        for entry in &doc.lessons {
            let lesson_id = insert_lesson_row(&tx, quarterly_id, &entry.lesson.normalized())?;
            report.lessons_inserted += 1;
            for day in &entry.days {
                insert_lesson_day_row(&tx, lesson_id, day)?;
                report.days_inserted += 1;
            }
        }
        tx.commit()?;

        info!(
            quarterly_id,
            lessons = report.lessons_inserted,
            days = report.days_inserted,
            "Imported quarterly"
        );
        Ok(report)
    }

    /// Loads a quarterly by id.
    pub fn get_quarterly(&self, id: i64) -> Result<Option<Quarterly>> {
        let quarterly = self
            .conn
            .query_row(
                &format!("SELECT {QUARTERLY_COLUMNS} FROM {QUARTERLY_TABLE} WHERE id = ?1"),
                params![id],
                quarterly_from_row,
            )
            .optional()?;
        Ok(quarterly)
    }

    /// Lists all quarterlies, newest period first.
    pub fn list_quarterlies(&self) -> Result<Vec<Quarterly>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {QUARTERLY_COLUMNS} FROM {QUARTERLY_TABLE} ORDER BY year DESC, quarter DESC, id"
        ))?;
        let rows = stmt
            .query_map([], quarterly_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Lists the lessons of a quarterly in insertion order.
    pub fn lessons(&self, quarterly_id: i64) -> Result<Vec<Lesson>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {LESSON_COLUMNS} FROM {LESSON_TABLE} WHERE quarterly_id = ?1 ORDER BY id"
        ))?;
        let rows = stmt
            .query_map(params![quarterly_id], lesson_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Lists the readings of a lesson, Sabbath first.
    pub fn lesson_days(&self, lesson_id: i64) -> Result<Vec<LessonDay>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {LESSON_DAY_COLUMNS} FROM {LESSON_DAY_TABLE} WHERE lesson_id = ?1"
        ))?;
        let mut rows = stmt
            .query_map(params![lesson_id], lesson_day_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.sort_by_key(|day| (day.day_name, day.id));
        Ok(rows)
    }

    /// Counts rows in each hierarchy table.
    pub fn counts(&self) -> Result<HierarchyCounts> {
        hierarchy_counts(self.conn)
    }

    /// Deletes a quarterly and, through the schema's cascade rules, its
    /// lessons and their days.
    ///
    /// The dependent row counts are taken and re-checked inside the same
    /// transaction as the delete.
    ///
    /// # Errors
    ///
    /// - [`SqliteError::CascadeNotDeclared`] if the schema lacks the cascade
    ///   rules.
    /// - [`SqliteError::NotFound`] if no quarterly has this id.
    /// - [`SqliteError::IncompleteCascade`] if dependents survived; nothing
    ///   is deleted.
    pub fn delete_quarterly(&self, id: i64) -> Result<CascadeReport> {
        verify_cascade(self.conn)?;

        let tx = self.conn.unchecked_transaction()?;
        let (lessons, days) = dependent_counts(&tx, id)?;
        let deleted = tx.execute(
            &format!("DELETE FROM {QUARTERLY_TABLE} WHERE id = ?1"),
            params![id],
        )?;
        if deleted == 0 {
            return Err(SqliteError::NotFound {
                entity: "quarterly",
                id,
            });
        }

        let (lessons_left, days_left) = dependent_counts(&tx, id)?;
        if lessons_left != 0 || days_left != 0 {
            return Err(SqliteError::IncompleteCascade(HierarchyCounts {
                quarterlies: 0,
                lessons: lessons_left,
                lesson_days: days_left,
            }));
        }
        tx.commit()?;

        info!(quarterly_id = id, lessons, days, "Deleted quarterly");
        Ok(CascadeReport {
            quarterly_id: id,
            lessons_removed: lessons,
            days_removed: days,
        })
    }

    /// Rewrites lesson fields that still carry extraction boilerplate.
    ///
    /// Returns the number of lessons updated. Runs in one transaction.
    pub fn normalize_lesson_fields(&self) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let lessons = {
            let mut stmt = tx.prepare(&format!(
                "SELECT {LESSON_COLUMNS} FROM {LESSON_TABLE} ORDER BY id"
            ))?;
            stmt.query_map([], lesson_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?
        };

        let mut updated = 0;
        for lesson in &lessons {
            let fields = lesson.fields();
            if !fields.needs_normalization() {
                continue;
            }
            let LessonFields {
                memory_verse,
                study_helps,
                study_aim,
            } = fields.normalized();
            tx.execute(
                &format!(
                    "UPDATE {LESSON_TABLE} SET memory_verse = ?1, study_helps = ?2, study_aim = ?3 WHERE id = ?4"
                ),
                params![memory_verse, study_helps, study_aim, lesson.id],
            )?;
            debug!(lesson_id = lesson.id, "Normalized lesson fields");
            updated += 1;
        }
        tx.commit()?;
        Ok(updated)
    }

    fn exists(&self, table: &str, id: i64) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                &format!("SELECT id FROM {table} WHERE id = ?1"),
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }
}

/// Rows removed by [`ContentStore::delete_quarterly`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CascadeReport {
    pub quarterly_id: i64,
    pub lessons_removed: usize,
    pub days_removed: usize,
}

/// Rows written by [`ContentStore::import_quarterly`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportReport {
    pub quarterly_id: i64,
    pub lessons_inserted: usize,
    pub days_inserted: usize,
}

/// Counts rows in each hierarchy table.
pub(crate) fn hierarchy_counts(conn: &Connection) -> Result<HierarchyCounts> {
    Ok(HierarchyCounts {
        quarterlies: count_rows(conn, QUARTERLY_TABLE)?,
        lessons: count_rows(conn, LESSON_TABLE)?,
        lesson_days: count_rows(conn, LESSON_DAY_TABLE)?,
    })
}

/// Counts lessons and lesson days that reference a quarterly.
fn dependent_counts(conn: &Connection, quarterly_id: i64) -> Result<(usize, usize)> {
    let lessons: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM {LESSON_TABLE} WHERE quarterly_id = ?1"),
        params![quarterly_id],
        |row| row.get(0),
    )?;
    let days: i64 = conn.query_row(
        &format!(
            "SELECT COUNT(*) FROM {LESSON_DAY_TABLE} d JOIN {LESSON_TABLE} l ON d.lesson_id = l.id \
             WHERE l.quarterly_id = ?1"
        ),
        params![quarterly_id],
        |row| row.get(0),
    )?;
    Ok((lessons as usize, days as usize))
}

fn insert_quarterly_row(conn: &Connection, q: &NewQuarterly) -> Result<i64> {
    conn.execute(
        &format!(
            "INSERT INTO {QUARTERLY_TABLE} (title, kind, quarter, year, description, cover_url) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
        ),
        params![
            q.title.trim(),
            q.kind.as_str(),
            q.quarter,
            q.year,
            q.description,
            q.cover_url
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn insert_lesson_row(conn: &Connection, quarterly_id: i64, lesson: &NewLesson) -> Result<i64> {
    conn.execute(
        &format!(
            "INSERT INTO {LESSON_TABLE} (quarterly_id, title, memory_verse, study_helps, study_aim) \
             VALUES (?1, ?2, ?3, ?4, ?5)"
        ),
        params![
            quarterly_id,
            lesson.title,
            lesson.memory_verse,
            lesson.study_helps,
            lesson.study_aim
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn insert_lesson_day_row(conn: &Connection, lesson_id: i64, day: &NewLessonDay) -> Result<i64> {
    conn.execute(
        &format!(
            "INSERT INTO {LESSON_DAY_TABLE} (lesson_id, day_name, content) VALUES (?1, ?2, ?3)"
        ),
        params![lesson_id, day.day_name.as_str(), day.content],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Reads a text column through the type's `FromStr`.
fn parse_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn quarterly_from_row(row: &Row<'_>) -> rusqlite::Result<Quarterly> {
    Ok(Quarterly {
        id: row.get(0)?,
        title: row.get(1)?,
        kind: parse_column(row, 2)?,
        quarter: row.get(3)?,
        year: row.get(4)?,
        description: row.get(5)?,
        cover_url: row.get(6)?,
    })
}

fn lesson_from_row(row: &Row<'_>) -> rusqlite::Result<Lesson> {
    Ok(Lesson {
        id: row.get(0)?,
        quarterly_id: row.get(1)?,
        title: row.get(2)?,
        memory_verse: row.get(3)?,
        study_helps: row.get(4)?,
        study_aim: row.get(5)?,
    })
}

fn lesson_day_from_row(row: &Row<'_>) -> rusqlite::Result<LessonDay> {
    Ok(LessonDay {
        id: row.get(0)?,
        lesson_id: row.get(1)?,
        day_name: parse_column(row, 2)?,
        content: row.get(3)?,
    })
}

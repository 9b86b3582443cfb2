//! Integration tests for the quarterly-sqlite crate.

use std::fs;
use std::path::Path;
use std::time::Duration;

use quarterly_core::{
    DayName, HierarchyCounts, NewLesson, NewLessonDay, NewQuarterly, QuarterlyImport,
    QuarterlyKind,
};
use quarterly_db::MigrationDir;
use quarterly_sqlite::{
    ClearMode, ContentStore, Maintenance, ManualReason, MigrationState, Migrator, RollbackOutcome,
    SqliteError, open_database, table_exists,
};
use rusqlite::Connection;
use tempfile::TempDir;

const REPO_MIGRATIONS: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../migrations");

/// Copies the repository migrations into a fresh directory.
fn repo_migrations() -> TempDir {
    let tmp = tempfile::tempdir().unwrap();
    for entry in fs::read_dir(REPO_MIGRATIONS).unwrap() {
        let path = entry.unwrap().path();
        if path.extension().is_some_and(|ext| ext == "sql") {
            fs::copy(&path, tmp.path().join(path.file_name().unwrap())).unwrap();
        }
    }
    tmp
}

fn write(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

fn migrator(dir: &Path) -> Migrator {
    let conn = Connection::open_in_memory().unwrap();
    Migrator::new(conn, MigrationDir::open(dir).unwrap()).unwrap()
}

/// In-memory database with the content schema applied.
fn content_db() -> Connection {
    let mut m = migrator(Path::new(REPO_MIGRATIONS));
    m.apply_pending().unwrap();
    m.into_connection()
}

fn applied_versions(m: &Migrator) -> Vec<u32> {
    m.applied().unwrap().iter().map(|e| e.version.get()).collect()
}

/// Inserts `quarterlies` quarterlies, each with `lessons` lessons of a full week.
fn seed(store: &ContentStore<'_>, quarterlies: usize, lessons: usize) -> Vec<i64> {
    (0..quarterlies)
        .map(|q| {
            let id = store
                .insert_quarterly(&NewQuarterly::new(
                    format!("Quarterly {q}"),
                    QuarterlyKind::Adult,
                    (q % 4 + 1) as u8,
                    2020 + q as i32,
                ))
                .unwrap();
            for l in 0..lessons {
                let lesson_id = store
                    .insert_lesson(id, &NewLesson::new(format!("Lesson {l}")))
                    .unwrap();
                for day in DayName::WEEK {
                    store
                        .insert_lesson_day(lesson_id, &NewLessonDay::new(day, "reading"))
                        .unwrap();
                }
            }
            id
        })
        .collect()
}

// =============================================================================
// Apply Tests
// =============================================================================

#[test]
fn test_repo_migrations_apply_cleanly() {
    let mut m = migrator(Path::new(REPO_MIGRATIONS));
    let summary = m.apply_pending().unwrap();

    assert_eq!(summary.already_applied, 0);
    let names: Vec<&str> = summary.applied.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["create_content_hierarchy", "index_quarterly_period"]);
    for table in ["quarterly", "lesson", "lesson_day", "schema_migrations"] {
        assert!(table_exists(m.connection(), table).unwrap(), "{table}");
    }
}

#[test]
fn test_apply_in_version_order_regardless_of_creation_order() {
    let tmp = tempfile::tempdir().unwrap();
    // Each script depends on the previous one.
    write(tmp.path(), "010_c.sql", "ALTER TABLE a ADD COLUMN c TEXT;");
    write(tmp.path(), "002_b.sql", "ALTER TABLE a ADD COLUMN b TEXT;");
    write(tmp.path(), "001_a.sql", "CREATE TABLE a (id INTEGER PRIMARY KEY);");

    let mut m = migrator(tmp.path());
    let summary = m.apply_pending().unwrap();

    let order: Vec<u32> = summary.applied.iter().map(|a| a.version.get()).collect();
    assert_eq!(order, vec![1, 2, 10]);
    assert_eq!(applied_versions(&m), vec![1, 2, 10]);
}

#[test]
fn test_apply_is_idempotent() {
    let tmp = repo_migrations();
    let mut m = migrator(tmp.path());
    m.apply_pending().unwrap();
    let before = m.applied().unwrap();

    let summary = m.apply_pending().unwrap();
    assert!(summary.applied.is_empty());
    assert_eq!(summary.already_applied, 2);
    assert_eq!(m.applied().unwrap(), before);
}

#[test]
fn test_apply_only_new_files() {
    let tmp = repo_migrations();
    let mut m = migrator(tmp.path());
    m.apply_pending().unwrap();

    write(
        tmp.path(),
        "003_add_cover_index.sql",
        "CREATE INDEX idx_quarterly_cover ON quarterly(cover_url);",
    );
    let summary = m.apply_pending().unwrap();
    assert_eq!(summary.applied.len(), 1);
    assert_eq!(summary.applied[0].version.get(), 3);
    assert_eq!(applied_versions(&m), vec![1, 2, 3]);
}

#[test]
fn test_failure_stops_run_and_keeps_earlier_migrations() {
    let tmp = tempfile::tempdir().unwrap();
    write(tmp.path(), "001_a.sql", "CREATE TABLE a (id INTEGER);");
    write(
        tmp.path(),
        "002_broken.sql",
        "CREATE TABLE b (id INTEGER);\nTHIS IS NOT SQL;",
    );
    write(tmp.path(), "003_c.sql", "CREATE TABLE c (id INTEGER);");

    let mut m = migrator(tmp.path());
    match m.apply_pending().unwrap_err() {
        SqliteError::MigrationExecution {
            version,
            name,
            applied,
            ..
        } => {
            assert_eq!(version.get(), 2);
            assert_eq!(name, "broken");
            assert_eq!(applied.iter().map(|v| v.get()).collect::<Vec<_>>(), vec![1]);
        }
        other => panic!("unexpected error: {other}"),
    }

    let conn = m.connection();
    assert!(table_exists(conn, "a").unwrap());
    assert!(!table_exists(conn, "b").unwrap());
    assert!(!table_exists(conn, "c").unwrap());
    assert_eq!(applied_versions(&m), vec![1]);
}

#[test]
fn test_apply_blocked_by_concurrent_writer() {
    let tmp = tempfile::tempdir().unwrap();
    write(tmp.path(), "001_a.sql", "CREATE TABLE a (id INTEGER);");
    let db = tmp.path().join("content.db");

    let mut first = Migrator::new(
        open_database(&db, Duration::from_millis(50)).unwrap(),
        MigrationDir::open(tmp.path()).unwrap(),
    )
    .unwrap();
    first.apply_pending().unwrap();

    write(tmp.path(), "002_b.sql", "CREATE TABLE b (id INTEGER);");
    let holder = open_database(&db, Duration::from_millis(50)).unwrap();
    holder.execute_batch("BEGIN IMMEDIATE;").unwrap();

    assert!(first.apply_pending().is_err());
    assert_eq!(applied_versions(&first), vec![1]);

    holder.execute_batch("ROLLBACK;").unwrap();
    let summary = first.apply_pending().unwrap();
    assert_eq!(summary.applied.len(), 1);
    assert_eq!(applied_versions(&first), vec![1, 2]);
}

// =============================================================================
// Rollback Tests
// =============================================================================

#[test]
fn test_rollback_walks_back_newest_first() {
    let tmp = repo_migrations();
    let mut m = migrator(tmp.path());
    m.apply_pending().unwrap();

    match m.rollback_last().unwrap() {
        RollbackOutcome::RolledBack { entry } => assert_eq!(entry.version.get(), 2),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(applied_versions(&m), vec![1]);
    assert!(table_exists(m.connection(), "quarterly").unwrap());

    match m.rollback_last().unwrap() {
        RollbackOutcome::RolledBack { entry } => {
            assert_eq!(entry.name, "create_content_hierarchy")
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(applied_versions(&m).is_empty());
    assert!(!table_exists(m.connection(), "quarterly").unwrap());

    assert_eq!(m.rollback_last().unwrap(), RollbackOutcome::NothingToRollBack);
}

#[test]
fn test_rollback_then_reapply() {
    let tmp = repo_migrations();
    let mut m = migrator(tmp.path());
    m.apply_pending().unwrap();
    m.rollback_last().unwrap();

    let summary = m.apply_pending().unwrap();
    assert_eq!(summary.applied.len(), 1);
    assert_eq!(summary.applied[0].name, "index_quarterly_period");
}

#[test]
fn test_rollback_without_down_script_changes_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    write(tmp.path(), "001_a.sql", "CREATE TABLE a (id INTEGER);");
    write(
        tmp.path(),
        "002_b.sql",
        "-- migrate:up\nCREATE TABLE b (id INTEGER);\n-- migrate:down\n-- DROP TABLE b;\n",
    );
    let mut m = migrator(tmp.path());
    m.apply_pending().unwrap();
    let changes = m.connection().total_changes();

    match m.rollback_last().unwrap() {
        RollbackOutcome::ManualInterventionRequired { entry, reason } => {
            assert_eq!(entry.version.get(), 2);
            assert_eq!(reason, ManualReason::MissingDownScript);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(applied_versions(&m), vec![1, 2]);
    assert!(table_exists(m.connection(), "b").unwrap());
    assert_eq!(m.connection().total_changes(), changes);
}

#[test]
fn test_rollback_with_missing_file() {
    let tmp = repo_migrations();
    let mut m = migrator(tmp.path());
    m.apply_pending().unwrap();
    fs::remove_file(tmp.path().join("002_index_quarterly_period.sql")).unwrap();

    match m.rollback_last().unwrap() {
        RollbackOutcome::ManualInterventionRequired { entry, reason } => {
            assert_eq!(entry.version.get(), 2);
            assert_eq!(reason, ManualReason::MissingFile);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(applied_versions(&m), vec![1, 2]);
}

#[test]
fn test_failed_down_script_keeps_ledger_entry() {
    let tmp = tempfile::tempdir().unwrap();
    write(
        tmp.path(),
        "001_a.sql",
        "CREATE TABLE a (id INTEGER);\n-- migrate:down\nDROP TABLE does_not_exist;\n",
    );
    let mut m = migrator(tmp.path());
    m.apply_pending().unwrap();

    let err = m.rollback_last().unwrap_err();
    assert!(matches!(err, SqliteError::RollbackExecution { .. }));
    assert_eq!(applied_versions(&m), vec![1]);
}

// =============================================================================
// Status Tests
// =============================================================================

#[test]
fn test_status_reports_pending_applied_drifted_orphaned() {
    let tmp = tempfile::tempdir().unwrap();
    write(tmp.path(), "001_a.sql", "CREATE TABLE a (id INTEGER);");
    write(tmp.path(), "002_b.sql", "CREATE TABLE b (id INTEGER);");
    write(tmp.path(), "003_c.sql", "CREATE TABLE c (id INTEGER);");
    let mut m = migrator(tmp.path());
    m.apply_pending().unwrap();

    write(tmp.path(), "002_b.sql", "CREATE TABLE b (id INTEGER, extra TEXT);");
    fs::remove_file(tmp.path().join("003_c.sql")).unwrap();
    write(tmp.path(), "004_d.sql", "CREATE TABLE d (id INTEGER);");
    write(tmp.path(), "notes.sql", "-- scratch");

    let report = m.status().unwrap();
    let labels: Vec<(u32, &str)> = report
        .migrations
        .iter()
        .map(|line| (line.version.get(), line.state.label()))
        .collect();
    assert_eq!(
        labels,
        vec![(1, "applied"), (2, "drifted"), (3, "orphaned"), (4, "pending")]
    );
    assert!(report.has_problems());
    assert_eq!(report.count("applied"), 1);
    assert_eq!(report.rejected.len(), 1);
    assert!(matches!(
        report.migrations[2].state,
        MigrationState::Orphaned { .. }
    ));
}

#[test]
fn test_status_on_fresh_database() {
    let m = migrator(Path::new(REPO_MIGRATIONS));
    let report = m.status().unwrap();
    assert_eq!(report.count("pending"), 2);
    assert!(!report.has_problems());
    assert!(!table_exists(m.connection(), "schema_migrations").unwrap());
}

// =============================================================================
// Content Store Tests
// =============================================================================

#[test]
fn test_insert_and_read_hierarchy() {
    let conn = content_db();
    let store = ContentStore::new(&conn).unwrap();
    let id = store
        .insert_quarterly(
            &NewQuarterly::new("  Lessons on Faith ", QuarterlyKind::Youth, 2, 2025)
                .with_description("Hebrews 11"),
        )
        .unwrap();
    let lesson_id = store
        .insert_lesson(
            id,
            &NewLesson::new("By Faith Abel")
                .with_memory_verse("Hebrews 11:4 STUDY HELPS Genesis 4"),
        )
        .unwrap();
    store
        .insert_lesson_day(lesson_id, &NewLessonDay::new(DayName::Friday, "Review"))
        .unwrap();
    store
        .insert_lesson_day(lesson_id, &NewLessonDay::new(DayName::Sabbath, "Intro"))
        .unwrap();

    let quarterly = store.get_quarterly(id).unwrap().unwrap();
    assert_eq!(quarterly.title, "Lessons on Faith");
    assert_eq!(quarterly.kind, QuarterlyKind::Youth);

    let lessons = store.lessons(id).unwrap();
    assert_eq!(lessons[0].memory_verse.as_deref(), Some("Hebrews 11:4"));

    let days: Vec<DayName> = store
        .lesson_days(lesson_id)
        .unwrap()
        .iter()
        .map(|d| d.day_name)
        .collect();
    assert_eq!(days, vec![DayName::Sabbath, DayName::Friday]);
}

#[test]
fn test_insert_lesson_requires_quarterly() {
    let conn = content_db();
    let store = ContentStore::new(&conn).unwrap();
    let err = store.insert_lesson(42, &NewLesson::new("Orphan")).unwrap_err();
    assert!(matches!(
        err,
        SqliteError::NotFound {
            entity: "quarterly",
            id: 42
        }
    ));
}

#[test]
fn test_insert_quarterly_rejects_invalid() {
    let conn = content_db();
    let store = ContentStore::new(&conn).unwrap();
    let err = store
        .insert_quarterly(&NewQuarterly::new("", QuarterlyKind::Adult, 5, 2025))
        .unwrap_err();
    match err {
        SqliteError::Validation(errors) => assert_eq!(errors.len(), 2),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(store.counts().unwrap(), HierarchyCounts::default());
}

#[test]
fn test_list_quarterlies_newest_first() {
    let conn = content_db();
    let store = ContentStore::new(&conn).unwrap();
    seed(&store, 3, 0);
    let years: Vec<i32> = store
        .list_quarterlies()
        .unwrap()
        .iter()
        .map(|q| q.year)
        .collect();
    assert_eq!(years, vec![2022, 2021, 2020]);
}

#[test]
fn test_delete_quarterly_cascades_only_its_children() {
    for (quarterlies, lessons) in [(1, 1), (2, 3), (3, 13)] {
        let conn = content_db();
        let store = ContentStore::new(&conn).unwrap();
        let ids = seed(&store, quarterlies, lessons);

        let report = store.delete_quarterly(ids[0]).unwrap();
        assert_eq!(report.lessons_removed, lessons);
        assert_eq!(report.days_removed, lessons * 7);

        let remaining = quarterlies - 1;
        assert_eq!(
            store.counts().unwrap(),
            HierarchyCounts {
                quarterlies: remaining,
                lessons: remaining * lessons,
                lesson_days: remaining * lessons * 7,
            }
        );
        assert!(store.get_quarterly(ids[0]).unwrap().is_none());
    }
}

#[test]
fn test_delete_missing_quarterly() {
    let conn = content_db();
    let store = ContentStore::new(&conn).unwrap();
    let err = store.delete_quarterly(7).unwrap_err();
    assert!(matches!(err, SqliteError::NotFound { id: 7, .. }));
}

#[test]
fn test_import_quarterly_document() {
    let conn = content_db();
    let store = ContentStore::new(&conn).unwrap();
    let doc: QuarterlyImport = serde_json::from_str(
        r#"{
            "title": "Lessons on Faith",
            "kind": "adult",
            "quarter": 1,
            "year": 2025,
            "lessons": [
                {
                    "title": "By Faith Abel",
                    "memory_verse": "Hebrews 11:4 STUDY HELPS Gen 4",
                    "study_aim": "To learn. INTRODUCTION Abel offered",
                    "days": [
                        { "day_name": "Sabbath", "content": "Read Hebrews 11" },
                        { "day_name": "Sunday", "content": "Genesis 4" }
                    ]
                },
                { "title": "By Faith Enoch" }
            ]
        }"#,
    )
    .unwrap();

    let report = store.import_quarterly(&doc).unwrap();
    assert_eq!(report.lessons_inserted, 2);
    assert_eq!(report.days_inserted, 2);

    let lessons = store.lessons(report.quarterly_id).unwrap();
    assert_eq!(lessons[0].memory_verse.as_deref(), Some("Hebrews 11:4"));
    assert_eq!(lessons[0].study_aim.as_deref(), Some("To learn."));
    assert!(lessons[1].memory_verse.is_none());
}

#[test]
fn test_import_rejects_duplicate_days_without_writing() {
    let conn = content_db();
    let store = ContentStore::new(&conn).unwrap();
    let doc: QuarterlyImport = serde_json::from_str(
        r#"{
            "title": "Q",
            "quarter": 1,
            "year": 2025,
            "lessons": [{
                "title": "L",
                "days": [
                    { "day_name": "Monday" },
                    { "day_name": "Monday" }
                ]
            }]
        }"#,
    )
    .unwrap();

    let err = store.import_quarterly(&doc).unwrap_err();
    assert!(matches!(err, SqliteError::Validation(_)));
    assert_eq!(store.counts().unwrap(), HierarchyCounts::default());
}

#[test]
fn test_normalize_lesson_fields() {
    let conn = content_db();
    let store = ContentStore::new(&conn).unwrap();
    let id = seed(&store, 1, 1)[0];
    conn.execute(
        "INSERT INTO lesson (quarterly_id, title, memory_verse, study_helps, study_aim) \
         VALUES (?1, 'Raw', '  Verse STUDY HELPS x', 'Helps STUDY AIM: y', 'Aim')",
        [id],
    )
    .unwrap();

    assert_eq!(store.normalize_lesson_fields().unwrap(), 1);
    let raw = store
        .lessons(id)
        .unwrap()
        .into_iter()
        .find(|l| l.title == "Raw")
        .unwrap();
    assert_eq!(raw.memory_verse.as_deref(), Some("Verse"));
    assert_eq!(raw.study_helps.as_deref(), Some("Helps"));
    assert_eq!(raw.study_aim.as_deref(), Some("Aim"));

    assert_eq!(store.normalize_lesson_fields().unwrap(), 0);
}

// =============================================================================
// Maintenance Tests
// =============================================================================

#[test]
fn test_clear_empty_database_runs_no_delete() {
    let conn = content_db();
    let maintenance = Maintenance::new(&conn).unwrap();
    let changes = conn.total_changes();

    let summary = maintenance.clear_quarterlies(ClearMode::Commit).unwrap();
    assert!(summary.skipped);
    assert!(summary.before.is_empty());
    assert!(summary.after.is_empty());
    assert_eq!(conn.total_changes(), changes);
}

#[test]
fn test_clear_dry_run_then_commit() {
    let conn = content_db();
    let store = ContentStore::new(&conn).unwrap();
    seed(&store, 2, 13);
    let full = HierarchyCounts {
        quarterlies: 2,
        lessons: 26,
        lesson_days: 182,
    };

    let maintenance = Maintenance::new(&conn).unwrap();
    let dry = maintenance.clear_quarterlies(ClearMode::DryRun).unwrap();
    assert_eq!(dry.before, full);
    assert_eq!(dry.after, full);
    assert_eq!(store.counts().unwrap(), full);

    let done = maintenance.clear_quarterlies(ClearMode::Commit).unwrap();
    assert_eq!(done.before, full);
    assert!(done.after.is_empty());
    assert!(store.counts().unwrap().is_empty());
}

#[test]
fn test_clear_refuses_schema_without_cascade() {
    let tmp = tempfile::tempdir().unwrap();
    write(
        tmp.path(),
        "001_plain.sql",
        r#"
CREATE TABLE quarterly (id INTEGER PRIMARY KEY);
CREATE TABLE lesson (id INTEGER PRIMARY KEY, quarterly_id INTEGER REFERENCES quarterly(id));
CREATE TABLE lesson_day (id INTEGER PRIMARY KEY, lesson_id INTEGER REFERENCES lesson(id));
INSERT INTO quarterly (id) VALUES (1);
"#,
    );
    let mut m = migrator(tmp.path());
    m.apply_pending().unwrap();
    let conn = m.into_connection();

    let err = Maintenance::new(&conn)
        .unwrap()
        .clear_quarterlies(ClearMode::Commit)
        .unwrap_err();
    match err {
        SqliteError::CascadeNotDeclared { table, column } => {
            assert_eq!(table, "lesson");
            assert_eq!(column, "quarterly_id");
        }
        other => panic!("unexpected error: {other}"),
    }
    let left: i64 = conn
        .query_row("SELECT COUNT(*) FROM quarterly", [], |row| row.get(0))
        .unwrap();
    assert_eq!(left, 1);
}

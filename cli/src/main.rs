use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use quarterly_db::{
    MigrationDir, MigrationGenerator, QuarterlyConfig, feed_documents, load_document,
};
use quarterly_sqlite::{
    ClearMode, ContentStore, Maintenance, MigrationState, Migrator, RollbackOutcome, SqliteError,
    open_database,
};
use rusqlite::Connection;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "quarterly")]
#[command(about = "Quarterly content store: schema migrations and content maintenance")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    /// Configuration file (default: quarterly.yml if present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Database file path, overriding the configuration.
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Migrations directory, overriding the configuration.
    #[arg(long, global = true)]
    migrations_dir: Option<PathBuf>,
    /// Log progress to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Versioned schema migrations.
    Migrate(MigrateArgs),
    /// Quarterly / lesson / lesson-day content.
    Content(ContentArgs),
}

#[derive(Debug, Args)]
struct MigrateArgs {
    #[command(subcommand)]
    operation: MigrateOperation,
}

#[derive(Debug, Subcommand)]
enum MigrateOperation {
    /// Create the next numbered migration file from a template.
    Create(MigrateCreateArgs),
    /// Apply every pending migration in version order.
    Up(MigrateUpArgs),
    /// Roll back the most recently applied migration.
    Down,
    /// Show applied, pending, drifted, and orphaned migrations.
    Status,
}

#[derive(Debug, Args)]
struct MigrateCreateArgs {
    /// Migration name, e.g. "add cover index".
    name: Option<String>,
}

#[derive(Debug, Args)]
struct MigrateUpArgs {
    /// List pending migrations without applying them.
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Args)]
struct ContentArgs {
    #[command(subcommand)]
    operation: ContentOperation,
}

#[derive(Debug, Subcommand)]
enum ContentOperation {
    /// Delete every quarterly together with its lessons and days.
    Clear(ContentClearArgs),
    /// Import quarterly JSON documents from a directory.
    Import(ContentImportArgs),
    /// Trim lesson fields at their stop words.
    Normalize,
    /// Show row counts and the stored quarterlies.
    Stats,
}

#[derive(Debug, Args)]
struct ContentClearArgs {
    /// Confirm the deletion.
    #[arg(long)]
    yes: bool,
    /// Report what would be deleted without deleting.
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Args)]
struct ContentImportArgs {
    /// Directory with one JSON document per quarterly.
    #[arg(long)]
    source: PathBuf,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);

    let result = load_config(&cli.global).and_then(|config| match cli.command {
        Command::Migrate(args) => run_migrate(args, &config),
        Command::Content(args) => run_content(args, &config),
    });

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

/// Logs go to stderr. `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(global: &GlobalArgs) -> Result<QuarterlyConfig, String> {
    let mut config = QuarterlyConfig::discover(global.config.as_deref())
        .map_err(|e| format!("Failed to load configuration: {e}"))?;
    if let Some(db) = &global.db {
        config.database = db.clone();
    }
    if let Some(dir) = &global.migrations_dir {
        config.migrations_dir = dir.clone();
    }
    debug!(
        database = %config.database.display(),
        migrations_dir = %config.migrations_dir.display(),
        "Resolved configuration"
    );
    Ok(config)
}

fn open(config: &QuarterlyConfig) -> Result<Connection, String> {
    open_database(&config.database, config.busy_timeout()).map_err(|e| e.to_string())
}

fn open_migrator(config: &QuarterlyConfig) -> Result<Migrator, String> {
    let dir = MigrationDir::open(&config.migrations_dir).map_err(|e| e.to_string())?;
    Migrator::new(open(config)?, dir).map_err(|e| format!("Failed to initialize migrator: {e}"))
}

// ---------------------------------------------------------------------------
// migrate command
// ---------------------------------------------------------------------------

fn run_migrate(args: MigrateArgs, config: &QuarterlyConfig) -> Result<(), String> {
    match args.operation {
        MigrateOperation::Create(a) => run_migrate_create(a, config),
        MigrateOperation::Up(a) => run_migrate_up(a, config),
        MigrateOperation::Down => run_migrate_down(config),
        MigrateOperation::Status => run_migrate_status(config),
    }
}

fn run_migrate_create(args: MigrateCreateArgs, config: &QuarterlyConfig) -> Result<(), String> {
    let Some(name) = args.name else {
        return Err(
            "A migration name is required, e.g. `quarterly migrate create add_index`".to_string(),
        );
    };
    let dir = MigrationDir::create(&config.migrations_dir).map_err(|e| e.to_string())?;
    let file = MigrationGenerator::new(&dir)
        .create_migration(&name)
        .map_err(|e| format!("Failed to create migration: {e}"))?;
    println!("Created migration {}", file.path.display());
    Ok(())
}

fn run_migrate_up(args: MigrateUpArgs, config: &QuarterlyConfig) -> Result<(), String> {
    let mut migrator = open_migrator(config)?;

    if args.dry_run {
        let pending = migrator
            .pending()
            .map_err(|e| format!("Failed to list pending migrations: {e}"))?;
        if pending.is_empty() {
            println!("No pending migrations.");
        } else {
            println!("Pending migrations ({}):", pending.len());
            for entry in &pending {
                println!("  {entry}");
            }
        }
        return Ok(());
    }

    match migrator.apply_pending() {
        Ok(summary) => {
            for applied in &summary.applied {
                println!("Applied {}_{}", applied.version, applied.name);
            }
            println!(
                "Migration up complete: {} applied, {} already applied.",
                summary.applied.len(),
                summary.already_applied
            );
            Ok(())
        }
        Err(err) => {
            if let SqliteError::MigrationExecution { applied, .. } = &err {
                for version in applied {
                    println!("Applied {version}");
                }
            }
            Err(format!("Migration up failed: {err}"))
        }
    }
}

fn run_migrate_down(config: &QuarterlyConfig) -> Result<(), String> {
    let mut migrator = open_migrator(config)?;
    let outcome = migrator
        .rollback_last()
        .map_err(|e| format!("Migration down failed: {e}"))?;

    match outcome {
        RollbackOutcome::NothingToRollBack => println!("No migrations to roll back."),
        RollbackOutcome::RolledBack { entry } => {
            println!("Rolled back {}_{}", entry.version, entry.name);
        }
        RollbackOutcome::ManualInterventionRequired { entry, reason } => {
            println!(
                "Manual intervention required for {}_{}: {reason}. The ledger was not changed.",
                entry.version, entry.name
            );
        }
    }
    Ok(())
}

fn run_migrate_status(config: &QuarterlyConfig) -> Result<(), String> {
    let migrator = open_migrator(config)?;
    let report = migrator
        .status()
        .map_err(|e| format!("Failed to get migration status: {e}"))?;

    println!("Migration Status ({}):", config.database.display());
    if report.migrations.is_empty() {
        println!("  No migrations found in '{}'.", config.migrations_dir.display());
    }
    for line in &report.migrations {
        match &line.state {
            MigrationState::Pending => {
                println!("  {}_{:<40} pending", line.version, line.name);
            }
            state => {
                let applied_at = state
                    .applied_at()
                    .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_default();
                println!(
                    "  {}_{:<40} {:<8} {applied_at}",
                    line.version,
                    line.name,
                    state.label()
                );
            }
        }
    }
    for path in &report.rejected {
        println!("  ignored: {} (no version prefix)", path.display());
    }
    println!(
        "  Applied: {}  Pending: {}  Drifted: {}  Orphaned: {}",
        report.count("applied"),
        report.count("pending"),
        report.count("drifted"),
        report.count("orphaned")
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// content command
// ---------------------------------------------------------------------------

fn run_content(args: ContentArgs, config: &QuarterlyConfig) -> Result<(), String> {
    match args.operation {
        ContentOperation::Clear(a) => run_content_clear(a, config),
        ContentOperation::Import(a) => run_content_import(a, config),
        ContentOperation::Normalize => run_content_normalize(config),
        ContentOperation::Stats => run_content_stats(config),
    }
}

fn run_content_clear(args: ContentClearArgs, config: &QuarterlyConfig) -> Result<(), String> {
    let mode = if args.dry_run {
        ClearMode::DryRun
    } else if args.yes {
        ClearMode::Commit
    } else {
        return Err(
            "Refusing to delete all quarterlies without --yes (use --dry-run to preview)"
                .to_string(),
        );
    };

    let conn = open(config)?;
    let summary = Maintenance::new(&conn)
        .and_then(|m| m.clear_quarterlies(mode))
        .map_err(|e| format!("Clear failed: {e}"))?;

    println!("Before: {}", summary.before);
    if summary.skipped {
        println!("No quarterlies to delete.");
    } else if mode == ClearMode::DryRun {
        println!("Dry run, would delete: {}", summary.removed());
    } else {
        println!("Deleted: {}", summary.removed());
    }
    println!("After: {}", summary.after);
    Ok(())
}

fn run_content_import(args: ContentImportArgs, config: &QuarterlyConfig) -> Result<(), String> {
    let files = feed_documents(&args.source).map_err(|e| e.to_string())?;
    if files.is_empty() {
        return Err(format!("No .json files found in '{}'", args.source.display()));
    }

    let conn = open(config)?;
    let store = ContentStore::new(&conn).map_err(|e| e.to_string())?;
    let (mut lessons, mut days) = (0usize, 0usize);
    for path in &files {
        let doc = load_document(path)
            .map_err(|e| format!("Failed to read '{}': {e}", path.display()))?;
        let report = store
            .import_quarterly(&doc)
            .map_err(|e| format!("Failed to import '{}': {e}", path.display()))?;
        println!(
            "Imported '{}' as quarterly {} ({} lessons, {} days)",
            doc.quarterly.title, report.quarterly_id, report.lessons_inserted, report.days_inserted
        );
        lessons += report.lessons_inserted;
        days += report.days_inserted;
    }

    println!("Import complete:");
    println!("  Quarterlies inserted: {}", files.len());
    println!("  Lessons inserted: {lessons}");
    println!("  Lesson days inserted: {days}");
    Ok(())
}

fn run_content_normalize(config: &QuarterlyConfig) -> Result<(), String> {
    let conn = open(config)?;
    let updated = ContentStore::new(&conn)
        .and_then(|store| store.normalize_lesson_fields())
        .map_err(|e| format!("Normalize failed: {e}"))?;
    println!("Normalized {updated} lesson(s).");
    Ok(())
}

fn run_content_stats(config: &QuarterlyConfig) -> Result<(), String> {
    let conn = open(config)?;
    let store = ContentStore::new(&conn).map_err(|e| e.to_string())?;
    let counts = store.counts().map_err(|e| e.to_string())?;
    println!("Content Stats:");
    println!("  Quarterlies: {}", counts.quarterlies);
    println!("  Lessons: {}", counts.lessons);
    println!("  Lesson days: {}", counts.lesson_days);

    for quarterly in store.list_quarterlies().map_err(|e| e.to_string())? {
        println!(
            "  [{}] {} Q{} {} ({})",
            quarterly.id, quarterly.year, quarterly.quarter, quarterly.title, quarterly.kind
        );
    }
    Ok(())
}

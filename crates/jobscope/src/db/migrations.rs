//! Versioned schema for the jobs store.
//!
//! Applied versions are recorded in `_migrations`. Column additions are conditional so a database
//! created by an older build that already carries the column still opens.

use rusqlite::Connection;

use super::error::DatabaseError;

struct Migration {
    version: u32,
    description: &'static str,
    sql: &'static str,
    kind: MigrationKind,
}

enum MigrationKind {
    /// Execute the SQL directly.
    Standard,
    /// ALTER TABLE ADD COLUMN, skipped if the column already exists.
    AddColumn {
        table: &'static str,
        column: &'static str,
    },
}

/// All migrations in order. Each is applied at most once.
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "create_jobs_table",
        sql: include_str!("sql/001_create_jobs.sql"),
        kind: MigrationKind::Standard,
    },
    Migration {
        version: 2,
        description: "create_job_skills_table",
        sql: include_str!("sql/002_create_job_skills.sql"),
        kind: MigrationKind::Standard,
    },
    Migration {
        version: 3,
        description: "create_indexes",
        sql: include_str!("sql/003_create_indexes.sql"),
        kind: MigrationKind::Standard,
    },
    Migration {
        version: 4,
        description: "add_applied_at_to_jobs",
        sql: include_str!("sql/004_add_applied_at.sql"),
        kind: MigrationKind::AddColumn {
            table: "jobs",
            column: "applied_at",
        },
    },
];

/// Brings the schema up to the latest version. Each step commits together
/// with its `_migrations` row, so an interrupted upgrade resumes cleanly.
pub fn run_all(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    let from = schema_version(conn)?;
    let pending: Vec<&Migration> = MIGRATIONS.iter().filter(|m| m.version > from).collect();
    if pending.is_empty() {
        return Ok(());
    }

    for migration in pending {
        apply(conn, migration)?;
    }
    log::info!("Jobs schema upgraded from v{} to v{}", from, schema_version(conn)?);
    Ok(())
}

/// Highest applied migration, 0 on a fresh store.
pub fn schema_version(conn: &Connection) -> Result<u32, DatabaseError> {
    let version = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM _migrations",
        [],
        |r| r.get(0),
    )?;
    Ok(version)
}

fn apply(conn: &Connection, migration: &Migration) -> Result<(), DatabaseError> {
    let failed = |e: rusqlite::Error| DatabaseError::Migration {
        version: migration.version,
        reason: e.to_string(),
    };

    let tx = conn.unchecked_transaction()?;
    let needed = match &migration.kind {
        MigrationKind::Standard => true,
        MigrationKind::AddColumn { table, column } => !column_exists(&tx, table, column)?,
    };

    if needed {
        log::debug!("Applying migration v{}: {}", migration.version, migration.description);
        tx.execute_batch(migration.sql).map_err(failed)?;
    } else {
        log::debug!("Migration v{} already reflected in schema", migration.version);
    }

    tx.execute(
        "INSERT INTO _migrations (version, description) VALUES (?1, ?2)",
        rusqlite::params![migration.version, migration.description],
    )?;
    tx.commit().map_err(failed)
}

/// Checks whether a column exists on a table using `PRAGMA table_info`.
fn column_exists(conn: &Connection, table: &str, column: &str) -> Result<bool, DatabaseError> {
    if !table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(DatabaseError::Migration {
            version: 0,
            reason: format!("Invalid table name: {}", table),
        });
    }
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let exists = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .any(|r| r.map(|name| name == column).unwrap_or(false));
    Ok(exists)
}

//! Schema migrations for the Giraf store.
//!
//! # Responsibility
//! - List the numbered scripts and the tables each one introduces.
//! - Upgrade a connection in one transaction and verify the result.
//!
//! # Invariants
//! - Versions start at 1 and increase by exactly one.
//! - `PRAGMA user_version` equals the last applied version.
//! - Applied scripts never change; schema changes ship as new files.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;
use std::time::Instant;

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
    /// Tables that must exist once this version is applied.
    tables: &'static [&'static str],
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "accounts_and_resources",
        sql: include_str!("0001_init.sql"),
        tables: &[
            "departments",
            "users",
            "guardian_relations",
            "user_settings",
            "resources",
            "choice_options",
            "user_resources",
            "department_resources",
        ],
    },
    Migration {
        version: 2,
        name: "week_schedules",
        sql: include_str!("0002_week_schedules.sql"),
        tables: &["weeks", "weekdays", "activities", "timers"],
    },
];

/// Schema version a fully migrated connection reports.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Brings `conn` up to [`latest_version`].
///
/// Refuses files written by a newer build. Pending scripts run in one
/// transaction; a failing script or a missing table leaves the file at its
/// previous version.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    apply(conn, MIGRATIONS)
}

fn apply(conn: &mut Connection, migrations: &[Migration]) -> DbResult<()> {
    let from_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    let latest = migrations.last().map_or(0, |migration| migration.version);
    if from_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from_version,
            latest_supported: latest,
        });
    }

    let pending: Vec<&Migration> = migrations
        .iter()
        .filter(|migration| migration.version > from_version)
        .collect();
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for migration in pending {
        let started_at = Instant::now();
        tx.execute_batch(migration.sql)
            .map_err(|source| DbError::MigrationFailed {
                version: migration.version,
                name: migration.name,
                source,
            })?;
        for &table in migration.tables {
            if !table_exists(&tx, table)? {
                return Err(DbError::MissingSchemaTable {
                    version: migration.version,
                    table,
                });
            }
        }
        tx.pragma_update(None, "user_version", migration.version)?;
        info!(
            "event=db_migrate module=db status=ok version={} name={} duration_ms={}",
            migration.version,
            migration.name,
            started_at.elapsed().as_millis()
        );
    }
    tx.commit()?;
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> DbResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1);",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

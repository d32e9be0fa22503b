//! Ordered schema scripts tracked through `PRAGMA user_version`.

use rusqlite::Connection;

use crate::pessoas::repository::RepositoryError;

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    sql: include_str!("0001_pessoas.sql"),
}];

pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Applies pending migrations in a single transaction.
pub fn apply_migrations(conn: &mut Connection) -> Result<(), RepositoryError> {
    let current = current_user_version(conn)?;
    let latest = latest_version();

    if current > latest {
        return Err(RepositoryError::Schema {
            db_version: current,
            latest_supported: latest,
        });
    }

    if current == latest {
        return Ok(());
    }

    let tx = conn.transaction().map_err(super::unavailable)?;
    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        tx.execute_batch(migration.sql).map_err(super::unavailable)?;
        tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))
            .map_err(super::unavailable)?;
        tracing::debug!(version = migration.version, "applied schema migration");
    }
    tx.commit().map_err(super::unavailable)?;

    Ok(())
}

pub(crate) fn current_user_version(conn: &Connection) -> Result<u32, RepositoryError> {
    conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))
        .map_err(super::unavailable)
}

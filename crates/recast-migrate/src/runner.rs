//! Versioned migration runner.
//!
//! The imperative counterpart to reconciliation: a single-row
//! `version(version INTEGER)` table names the schema version, and a map
//! of per-version SQL scripts moves it forward one step at a time. Each
//! step runs with the same foreign-key discipline as plan execution and
//! bumps the version inside its transaction.

use std::collections::BTreeMap;

use sqlx::sqlite::{SqliteConnection, SqlitePool};
use sqlx::Connection;
use tracing::info;

use crate::batch;
use crate::error::MigrateError;
use crate::executor;

/// SQL to create the version table, for callers bootstrapping a fresh
/// database.
pub const CREATE_VERSION_TABLE_SQL: &str =
    "CREATE TABLE IF NOT EXISTS version (version INTEGER NOT NULL)";

/// Applies versioned scripts until no script matches the current
/// version. `versions[n]` migrates the schema from version `n` to
/// `n + 1`.
///
/// # Errors
///
/// Returns [`MigrateError::NoVersion`] when the version table is missing
/// or empty; otherwise the first failing step's error after rollback.
pub async fn run_versioned(
    pool: &SqlitePool,
    versions: &BTreeMap<i64, String>,
) -> Result<(), MigrateError> {
    let mut conn = pool.acquire().await?;
    loop {
        let version = current_version(&mut conn).await?;
        let Some(script) = versions.get(&version) else {
            return Ok(());
        };
        info!(from = version, to = version + 1, "applying versioned migration");
        apply_version(&mut conn, script).await?;
    }
}

/// Reads the current schema version.
pub async fn current_version(conn: &mut SqliteConnection) -> Result<i64, MigrateError> {
    match sqlx::query_scalar::<_, i64>("SELECT version FROM version LIMIT 1")
        .fetch_optional(&mut *conn)
        .await
    {
        Ok(Some(version)) => Ok(version),
        Ok(None) => Err(MigrateError::NoVersion),
        Err(err) if err.to_string().contains("no such table: version") => {
            Err(MigrateError::NoVersion)
        }
        Err(err) => Err(err.into()),
    }
}

async fn apply_version(conn: &mut SqliteConnection, script: &str) -> Result<(), MigrateError> {
    executor::set_foreign_keys(conn, false).await?;
    let outcome = apply_version_tx(conn, script).await;
    let restore = executor::set_foreign_keys(conn, true).await;
    match (outcome, restore) {
        (Ok(()), Ok(())) => Ok(()),
        (Ok(()), Err(err)) => Err(MigrateError::ForeignKeysNotRestored(err)),
        (Err(err), _) => Err(err),
    }
}

async fn apply_version_tx(conn: &mut SqliteConnection, script: &str) -> Result<(), MigrateError> {
    let mut tx = conn.begin().await?;
    if let Err(err) = batch::exec_script_statements(&mut *tx, script).await {
        let _ = tx.rollback().await;
        return Err(err);
    }
    if let Err(err) = executor::check_foreign_keys(&mut *tx).await {
        let _ = tx.rollback().await;
        return Err(err);
    }
    if let Err(source) = sqlx::query("UPDATE version SET version = version + 1")
        .execute(&mut *tx)
        .await
    {
        let _ = tx.rollback().await;
        return Err(source.into());
    }
    tx.commit().await?;
    Ok(())
}

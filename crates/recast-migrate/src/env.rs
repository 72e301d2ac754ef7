//! Environment-driven entry points.
//!
//! `DATABASE_URL` names the database, `DATABASE_SCHEMA` a file holding
//! the target DDL. There is no process-wide cached handle: callers own
//! the pool and pass it around.

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::error::MigrateError;
use crate::planner::MigratePolicy;

/// Environment variable naming the database.
pub const DATABASE_URL: &str = "DATABASE_URL";

/// Environment variable naming the target schema file.
pub const DATABASE_SCHEMA: &str = "DATABASE_SCHEMA";

/// Opens a pool from `DATABASE_URL`.
///
/// # Errors
///
/// Fails when the variable is unset or the database cannot be opened.
pub async fn connect_from_env() -> Result<SqlitePool, MigrateError> {
    let url =
        std::env::var(DATABASE_URL).map_err(|_| MigrateError::MissingEnv { name: DATABASE_URL })?;
    let pool = SqlitePoolOptions::new().connect(&url).await?;
    Ok(pool)
}

/// Reads the target DDL from the file named by `DATABASE_SCHEMA`.
///
/// # Errors
///
/// Fails when the variable is unset or the file cannot be read.
pub fn schema_from_env() -> Result<String, MigrateError> {
    let path = std::env::var(DATABASE_SCHEMA)
        .map_err(|_| MigrateError::MissingEnv { name: DATABASE_SCHEMA })?;
    std::fs::read_to_string(&path).map_err(|source| MigrateError::SchemaFile { path, source })
}

/// Reconciles the database against the schema file named by
/// `DATABASE_SCHEMA`.
///
/// # Errors
///
/// Same contract as [`crate::auto_migrate`], plus the environment and
/// file errors above.
pub async fn auto_migrate_from_env(
    pool: &SqlitePool,
    policy: &MigratePolicy,
) -> Result<(), MigrateError> {
    let schema = schema_from_env()?;
    crate::auto_migrate(pool, &schema, policy).await
}

/// Verifies the database against the schema file named by
/// `DATABASE_SCHEMA`.
///
/// # Errors
///
/// Same contract as [`crate::verify`], plus the environment and file
/// errors above.
pub async fn verify_from_env(pool: &SqlitePool) -> Result<(), MigrateError> {
    let schema = schema_from_env()?;
    crate::verify(pool, &schema).await
}

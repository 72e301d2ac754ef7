//! # recast-migrate
//!
//! Declarative schema reconciliation for SQLite (and SQLite-compatible
//! backends such as libSQL/Turso). Feed [`auto_migrate`] the DDL you
//! want and a live database; it computes and applies the minimal DDL to
//! make the database match, in one transaction, or refuses with a
//! structured conflict and leaves the database untouched.
//!
//! The pipeline: ingest both sides into a normalized
//! [`Schema`](recast_core::Schema), diff them, plan an ordered operation
//! list (drops dependents-first, creates bases-first, reorder rebuilds
//! in between), and execute the plan with foreign-key discipline and a
//! pre-commit `foreign_key_check`.
//!
//! # Example
//!
//! ```rust,ignore
//! use recast_migrate::prelude::*;
//!
//! let pool = connect_from_env().await?;
//! let target = "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT);";
//!
//! match auto_migrate(&pool, target, &MigratePolicy::new()).await {
//!     Ok(()) => {}
//!     Err(MigrateError::Conflicts(set)) => eprintln!("manual migration needed: {set}"),
//!     Err(err) => return Err(err.into()),
//! }
//! verify(&pool, target).await?;
//! ```
//!
//! Conflicts ([`ConflictSet`]) and the table-deletion policy gate never
//! mutate the database; execution errors roll the transaction back.
//!
//! Alongside reconciliation the crate carries the traditional
//! collaborators: a numeric [`runner`](crate::runner) over a
//! `version(version INTEGER)` table, a [`batch`](crate::batch) script
//! executor, a streaming [`RowSeq`](crate::rows::RowSeq) cursor, and
//! [`env`](crate::env) entry points driven by `DATABASE_URL` /
//! `DATABASE_SCHEMA`.

pub mod batch;
mod catalog;
pub mod env;
pub mod error;
mod executor;
pub mod planner;
pub mod rows;
pub mod runner;
mod verifier;

use sqlx::sqlite::SqlitePool;
use tracing::{debug, info};

pub use recast_core::{
    ConflictKind, Schema, SchemaConflict, SchemaError, Statement, Table,
};

pub use catalog::fetch_db_schema;
pub use error::{ConflictSet, MigrateError};
pub use planner::{plan_migration, MigratePolicy, Plan, PlanOp};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::env::{auto_migrate_from_env, connect_from_env, verify_from_env};
    pub use crate::error::{ConflictSet, MigrateError};
    pub use crate::planner::{MigratePolicy, Plan, PlanOp};
    pub use crate::{auto_migrate, fetch_db_schema, parse_schema, verify};
    pub use recast_core::{ConflictKind, Schema, SchemaConflict};
}

/// Builds a [`Schema`] from a DDL stream. DML statements are skipped;
/// duplicate definitions are fatal.
///
/// # Errors
///
/// Returns a [`SchemaError`] on parse failure or duplicate objects.
pub fn parse_schema(sql: &str) -> Result<Schema, SchemaError> {
    Schema::from_sql(sql)
}

/// Reconciles the database with the target DDL stream.
///
/// All-or-nothing: on success the whole difference is committed in one
/// transaction; conflicts and policy violations return before any write;
/// execution failures roll back.
///
/// # Errors
///
/// - [`MigrateError::Conflicts`]: a table differs structurally in a way
///   that needs a manual migration. Database untouched.
/// - [`MigrateError::TableDeletionNotAllowed`]: the plan would drop
///   tables and `policy.allow_table_deletes` is false. Database
///   untouched.
/// - [`MigrateError::ForeignKeysNotRestored`]: the migration committed
///   but enforcement could not be re-enabled; treat the schema change as
///   done and the connection as suspect.
/// - Any other variant: the transaction was rolled back.
pub async fn auto_migrate(
    pool: &SqlitePool,
    schema_sql: &str,
    policy: &MigratePolicy,
) -> Result<(), MigrateError> {
    let desired = parse_schema(schema_sql)?;
    let mut conn = pool.acquire().await?;
    let current = catalog::schema_on(&mut conn).await?;
    let plan = plan_migration(&desired, &current, policy)?;
    if plan.is_empty() {
        debug!("database already matches target schema");
        return Ok(());
    }
    info!(operations = plan.ops.len(), "applying schema migration");
    executor::apply_plan(&mut conn, &plan).await
}

/// Checks that the database schema exactly matches the target DDL
/// stream, without writing anything.
///
/// # Errors
///
/// Returns the first mismatch: a missing object, a canonical-SQL
/// difference, or an object present in the database but absent from the
/// stream.
pub async fn verify(pool: &SqlitePool, schema_sql: &str) -> Result<(), MigrateError> {
    let mut conn = pool.acquire().await?;
    verifier::verify_on(&mut conn, schema_sql).await
}

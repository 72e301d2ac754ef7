//! Plan execution.
//!
//! A plan runs on one connection: foreign key enforcement is switched off
//! at the connection level (the pragma is a no-op inside a transaction),
//! every operation executes inside a single transaction, a
//! `foreign_key_check` gates the commit, and enforcement is restored on
//! every exit path. A restore failure after a successful commit surfaces
//! as [`MigrateError::ForeignKeysNotRestored`] while the migration itself
//! stays committed.

use sqlx::sqlite::SqliteConnection;
use sqlx::{Connection, Row};
use tracing::{debug, warn};

use recast_core::ObjectKind;

use crate::error::MigrateError;
use crate::planner::{Plan, PlanOp};

/// Double-quotes an identifier for generated SQL, doubling inner quotes.
/// Applied to every identifier the engine emits; schemas with hyphenated
/// names depend on it.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Switches connection-level foreign key enforcement.
pub(crate) async fn set_foreign_keys(
    conn: &mut SqliteConnection,
    enabled: bool,
) -> Result<(), sqlx::Error> {
    let pragma = if enabled {
        "PRAGMA foreign_keys = ON"
    } else {
        "PRAGMA foreign_keys = OFF"
    };
    sqlx::query(pragma).execute(&mut *conn).await?;
    Ok(())
}

/// Runs `PRAGMA foreign_key_check`; any reported row fails the
/// migration.
pub(crate) async fn check_foreign_keys(conn: &mut SqliteConnection) -> Result<(), MigrateError> {
    let rows = sqlx::query("PRAGMA foreign_key_check")
        .fetch_all(&mut *conn)
        .await?;
    if rows.is_empty() {
        return Ok(());
    }
    let detail: Vec<String> = rows
        .iter()
        .take(5)
        .map(|row| {
            let table = row.try_get::<String, _>("table").unwrap_or_default();
            let parent = row.try_get::<String, _>("parent").unwrap_or_default();
            format!("{table} -> {parent}")
        })
        .collect();
    Err(MigrateError::ForeignKeyViolations {
        count: rows.len(),
        detail: detail.join(", "),
    })
}

/// Applies a plan with full foreign-key discipline.
pub(crate) async fn apply_plan(
    conn: &mut SqliteConnection,
    plan: &Plan,
) -> Result<(), MigrateError> {
    set_foreign_keys(conn, false).await?;
    let outcome = run_in_transaction(conn, plan).await;
    let restore = set_foreign_keys(conn, true).await;
    match (outcome, restore) {
        (Ok(()), Ok(())) => Ok(()),
        (Ok(()), Err(err)) => {
            warn!(error = %err, "migration committed but foreign keys were not restored");
            Err(MigrateError::ForeignKeysNotRestored(err))
        }
        (Err(err), restore_result) => {
            if let Err(restore_err) = restore_result {
                warn!(error = %restore_err, "could not restore foreign keys after failed migration");
            }
            Err(err)
        }
    }
}

async fn run_in_transaction(conn: &mut SqliteConnection, plan: &Plan) -> Result<(), MigrateError> {
    let mut tx = conn.begin().await?;
    for op in &plan.ops {
        if let Err(err) = exec_op(&mut *tx, op).await {
            let _ = tx.rollback().await;
            return Err(err);
        }
    }
    if let Err(err) = check_foreign_keys(&mut *tx).await {
        let _ = tx.rollback().await;
        return Err(err);
    }
    tx.commit().await?;
    Ok(())
}

async fn exec_op(conn: &mut SqliteConnection, op: &PlanOp) -> Result<(), MigrateError> {
    match op {
        PlanOp::Create { sql, .. } => exec_sql(conn, sql).await,
        PlanOp::Drop { kind, name } => drop_object(conn, *kind, name).await,
        PlanOp::ForcedRecreate { kind, name, sql } => {
            drop_object(conn, *kind, name).await?;
            exec_sql(conn, sql).await
        }
        PlanOp::RebuildTable { name, sql, columns } => {
            rebuild_table(conn, name, sql, columns).await
        }
    }
}

async fn exec_sql(conn: &mut SqliteConnection, sql: &str) -> Result<(), MigrateError> {
    debug!(sql = %sql, "executing");
    sqlx::query(sql)
        .execute(&mut *conn)
        .await
        .map_err(|source| MigrateError::Execution {
            statement: sql.to_string(),
            source,
        })?;
    Ok(())
}

/// Drops an object, tolerating "no such ..." so that a drop made
/// redundant by an earlier operation (a table rebuild taking its indexes
/// with it) stays idempotent.
async fn drop_object(
    conn: &mut SqliteConnection,
    kind: ObjectKind,
    name: &str,
) -> Result<(), MigrateError> {
    let sql = format!("DROP {} {}", kind.as_str(), quote_ident(name));
    debug!(sql = %sql, "executing");
    match sqlx::query(&sql).execute(&mut *conn).await {
        Ok(_) => Ok(()),
        Err(err) if is_missing_object(&err) => {
            warn!(object = name, kind = kind.as_str(), "drop target already absent");
            Ok(())
        }
        Err(source) => Err(MigrateError::Execution {
            statement: sql,
            source,
        }),
    }
}

fn is_missing_object(err: &sqlx::Error) -> bool {
    err.to_string().to_lowercase().contains("no such")
}

/// The rename-copy-drop sequence that changes declared column order while
/// preserving rows.
async fn rebuild_table(
    conn: &mut SqliteConnection,
    name: &str,
    sql: &str,
    columns: &[String],
) -> Result<(), MigrateError> {
    let temp = format!("{name}_temp_reorder");
    exec_sql(
        conn,
        &format!(
            "ALTER TABLE {} RENAME TO {}",
            quote_ident(name),
            quote_ident(&temp)
        ),
    )
    .await?;
    exec_sql(conn, sql).await?;
    let column_list: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
    let column_list = column_list.join(", ");
    exec_sql(
        conn,
        &format!(
            "INSERT INTO {} ({}) SELECT {} FROM {}",
            quote_ident(name),
            column_list,
            column_list,
            quote_ident(&temp)
        ),
    )
    .await?;
    exec_sql(conn, &format!("DROP TABLE {}", quote_ident(&temp))).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_ident_doubles_quotes() {
        assert_eq!(quote_ident("users"), "\"users\"");
        assert_eq!(quote_ident("my-table"), "\"my-table\"");
        assert_eq!(quote_ident("odd\"name"), "\"odd\"\"name\"");
    }
}

//! Catalog ingest.
//!
//! Reads `sqlite_master` and rebuilds a [`Schema`] by parsing each row's
//! stored SQL through the core parser, so the database side goes through
//! exactly the same normalization as the desired DDL stream.

use sqlx::sqlite::{SqliteConnection, SqlitePool};

use recast_core::{Parser, Schema};

use crate::error::MigrateError;

/// One user object from `sqlite_master`: `(type, name, tbl_name, sql)`.
pub(crate) type MasterRow = (String, String, String, String);

/// Fetches every user object, skipping internal `sqlite_` entries and
/// rows without stored SQL (auto-indexes).
pub(crate) async fn master_rows(
    conn: &mut SqliteConnection,
) -> Result<Vec<MasterRow>, MigrateError> {
    let rows: Vec<MasterRow> = sqlx::query_as(
        "SELECT type, name, tbl_name, sql FROM sqlite_master \
         WHERE sql IS NOT NULL AND name NOT LIKE 'sqlite_%'",
    )
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

/// Builds a schema from the catalog of the given connection.
pub(crate) async fn schema_on(conn: &mut SqliteConnection) -> Result<Schema, MigrateError> {
    let rows = master_rows(conn).await?;
    let mut schema = Schema::new();
    for (kind, name, _table, sql) in rows {
        let mut parser = Parser::new(&sql);
        match parser.next_statement() {
            Ok(Some(statement)) => schema.insert(&statement)?,
            Ok(None) => {}
            Err(source) => {
                // The sequence counter's row is not real DDL; anything
                // else unparsable aborts ingest.
                if name.contains("sqlite_sequence") {
                    continue;
                }
                return Err(MigrateError::CatalogParse { kind, name, source });
            }
        }
    }
    Ok(schema)
}

/// Fetches and normalizes the live database schema.
///
/// # Errors
///
/// Fails when the catalog cannot be read or a stored definition does not
/// parse.
pub async fn fetch_db_schema(pool: &SqlitePool) -> Result<Schema, MigrateError> {
    let mut conn = pool.acquire().await?;
    schema_on(&mut conn).await
}

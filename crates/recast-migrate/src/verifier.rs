//! Read-only schema verification.
//!
//! Succeeds iff every object of the target stream exists in the database
//! with canonically equal SQL and the database holds no user object the
//! stream lacks. Reports the first mismatch; it does not enumerate all
//! differences.

use std::collections::BTreeMap;

use sqlx::sqlite::SqliteConnection;

use recast_core::Parser;

use crate::catalog;
use crate::error::MigrateError;

struct Entry {
    sql: String,
    name: String,
    seen: bool,
}

pub(crate) async fn verify_on(
    conn: &mut SqliteConnection,
    schema_sql: &str,
) -> Result<(), MigrateError> {
    let rows = catalog::master_rows(conn).await?;
    let mut expected: BTreeMap<String, Entry> = BTreeMap::new();
    for (kind, name, _table, sql) in rows {
        let mut parser = Parser::new(&sql);
        match parser.next_statement() {
            Ok(Some(statement)) => {
                let display_name = statement.name().unwrap_or(&name).to_string();
                expected.insert(
                    display_name.to_lowercase(),
                    Entry {
                        sql: statement.to_string(),
                        name: display_name,
                        seen: false,
                    },
                );
            }
            Ok(None) => {}
            Err(source) => {
                if name.contains("sqlite_sequence") {
                    continue;
                }
                return Err(MigrateError::CatalogParse { kind, name, source });
            }
        }
    }

    let mut parser = Parser::new(schema_sql);
    while let Some(statement) = parser
        .next_statement()
        .map_err(recast_core::SchemaError::from)?
    {
        let Some(name) = statement.name() else {
            continue; // DML and other unmodeled statements
        };
        let canonical = statement.to_string();
        match expected.get_mut(&name.to_lowercase()) {
            None => {
                return Err(MigrateError::MissingObject {
                    name: name.to_string(),
                });
            }
            Some(entry) => {
                if entry.sql != canonical {
                    return Err(MigrateError::DefinitionMismatch {
                        name: name.to_string(),
                        expected: canonical,
                        actual: entry.sql.clone(),
                    });
                }
                entry.seen = true;
            }
        }
    }

    for entry in expected.values() {
        if !entry.seen {
            return Err(MigrateError::UnexpectedObject {
                name: entry.name.clone(),
            });
        }
    }
    Ok(())
}

//! Batch script execution.
//!
//! Splits a multi-statement SQL script on `;`, strips `--` end-of-line
//! comments, and keeps `CREATE TRIGGER ... BEGIN ... END;` together as a
//! single statement (detected by the `END;` suffix). Used by the
//! versioned runner and exposed for seeding and fixtures.

use sqlx::sqlite::SqliteConnection;
use sqlx::Connection;

use crate::error::MigrateError;

/// Splits a script into executable statements.
#[must_use]
pub fn split_script(script: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut buf = String::new();

    for chunk in script.split_inclusive(';') {
        buf.push_str(chunk);
        if !chunk.ends_with(';') {
            break; // trailing text handled below
        }
        let upper = buf.to_uppercase();
        if upper.contains("CREATE TRIGGER") && !upper.trim_end().ends_with("END;") {
            continue; // trigger body: keep reading past inner semicolons
        }
        push_statement(&mut statements, &buf);
        buf.clear();
    }
    push_statement(&mut statements, &buf);

    statements
}

fn push_statement(statements: &mut Vec<String>, raw: &str) {
    let stripped = strip_line_comments(raw);
    let trimmed = stripped.trim().trim_end_matches(';').trim();
    if !trimmed.is_empty() {
        statements.push(trimmed.to_string());
    }
}

fn strip_line_comments(raw: &str) -> String {
    raw.lines()
        .map(|line| match line.find("--") {
            Some(i) => &line[..i],
            None => line,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Executes every statement of the script on the given connection, with
/// no transaction of its own. Callers supply the ambient transaction.
pub(crate) async fn exec_script_statements(
    conn: &mut SqliteConnection,
    script: &str,
) -> Result<(), MigrateError> {
    for statement in split_script(script) {
        if let Err(source) = sqlx::query(&statement).execute(&mut *conn).await {
            return Err(MigrateError::Execution { statement, source });
        }
    }
    Ok(())
}

/// Executes a script inside one transaction.
///
/// # Errors
///
/// The first failing statement rolls the whole batch back.
pub async fn exec_batch(conn: &mut SqliteConnection, script: &str) -> Result<(), MigrateError> {
    let mut tx = conn.begin().await?;
    if let Err(err) = exec_script_statements(&mut *tx, script).await {
        let _ = tx.rollback().await;
        return Err(err);
    }
    tx.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_semicolons() {
        let stmts = split_script("CREATE TABLE a (x INTEGER); CREATE TABLE b (y INTEGER);");
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[0], "CREATE TABLE a (x INTEGER)");
    }

    #[test]
    fn strips_line_comments() {
        let stmts = split_script(
            "-- schema\nCREATE TABLE a (x INTEGER); -- trailing\nCREATE TABLE b (y INTEGER);",
        );
        assert_eq!(stmts.len(), 2);
        assert!(!stmts[0].contains("--"));
    }

    #[test]
    fn trigger_body_is_one_statement() {
        let stmts = split_script(
            "CREATE TABLE t (a INTEGER);\n\
             CREATE TRIGGER trg AFTER INSERT ON t BEGIN\n\
               UPDATE t SET a = 1;\n\
               DELETE FROM t WHERE a < 0;\n\
             END;\n\
             CREATE TABLE u (b INTEGER);",
        );
        assert_eq!(stmts.len(), 3);
        assert!(stmts[1].starts_with("CREATE TRIGGER"));
        assert!(stmts[1].trim_end().ends_with("END"));
    }

    #[test]
    fn trailing_statement_without_semicolon_is_kept() {
        let stmts = split_script("CREATE TABLE a (x INTEGER); DROP TABLE a");
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[1], "DROP TABLE a");
    }

    #[test]
    fn comment_only_script_is_empty() {
        assert!(split_script("-- nothing here\n-- at all\n").is_empty());
    }
}

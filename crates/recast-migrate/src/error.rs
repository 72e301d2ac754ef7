//! Error types for the reconciliation engine.

use core::fmt;

use recast_core::{ParseError, SchemaConflict, SchemaError};

/// One or more structural table conflicts, aggregated.
///
/// Returned when the desired and current definitions of a table differ in
/// a way the engine will not resolve automatically (type change, primary
/// key change, ...). The database has not been touched.
#[derive(Debug, Clone)]
pub struct ConflictSet {
    /// The individual conflicts, in deterministic table order.
    pub conflicts: Vec<SchemaConflict>,
}

impl fmt::Display for ConflictSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.conflicts.as_slice() {
            [] => f.write_str("no schema conflicts"),
            [single] => write!(f, "{single}"),
            [first, ..] => write!(
                f,
                "{} schema conflicts found; first: {first}",
                self.conflicts.len()
            ),
        }
    }
}

impl std::error::Error for ConflictSet {}

/// Errors returned by the reconciliation engine.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// The desired DDL stream failed to ingest.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// A catalog row's SQL failed to parse.
    #[error("could not parse catalog SQL for {kind} '{name}': {source}")]
    CatalogParse {
        /// Object type as reported by the catalog.
        kind: String,
        /// Object name as reported by the catalog.
        name: String,
        /// The parse failure.
        source: ParseError,
    },

    /// Structural table conflicts; nothing was written.
    #[error(transparent)]
    Conflicts(ConflictSet),

    /// The plan would drop tables and the policy forbids it; nothing was
    /// written.
    #[error("table deletion not allowed for: {}", tables.join(", "))]
    TableDeletionNotAllowed {
        /// The tables that would have been dropped.
        tables: Vec<String>,
    },

    /// A DDL/DML statement failed during plan execution. The transaction
    /// was rolled back.
    #[error("error executing `{statement}`: {source}")]
    Execution {
        /// The failing statement.
        statement: String,
        /// The driver error.
        source: sqlx::Error,
    },

    /// The post-plan foreign key check reported violations. The
    /// transaction was rolled back.
    #[error("{count} foreign key violation(s) after migration: {detail}")]
    ForeignKeyViolations {
        /// Number of reported violations.
        count: usize,
        /// A short `table -> parent` summary of the first few.
        detail: String,
    },

    /// The migration committed, but foreign key enforcement could not be
    /// re-enabled on the connection afterwards.
    #[error("migration committed but foreign key enforcement was not restored: {0}")]
    ForeignKeysNotRestored(#[source] sqlx::Error),

    /// Verification: an object from the schema stream is absent.
    #[error("object '{name}' not found in the database")]
    MissingObject {
        /// The missing object's name.
        name: String,
    },

    /// Verification: an object exists with a different definition.
    #[error("definition of '{name}' does not match\nexpected: {expected}\nfound:    {actual}")]
    DefinitionMismatch {
        /// The object's name.
        name: String,
        /// Canonical SQL from the schema stream.
        expected: String,
        /// Canonical SQL from the database.
        actual: String,
    },

    /// Verification: the database holds an object the stream does not.
    #[error("database contains object '{name}' not present in the schema")]
    UnexpectedObject {
        /// The extra object's name.
        name: String,
    },

    /// The `version` table is missing or empty.
    #[error("no version found in database")]
    NoVersion,

    /// A required environment variable is not set.
    #[error("{name} environment variable not set")]
    MissingEnv {
        /// The variable name.
        name: &'static str,
    },

    /// The schema file named by the environment could not be read.
    #[error("could not read schema file '{path}': {source}")]
    SchemaFile {
        /// The file path.
        path: String,
        /// The IO failure.
        source: std::io::Error,
    },

    /// Any other driver error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

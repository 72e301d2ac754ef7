//! Typed schema model and ingest normalization.
//!
//! A [`Schema`] holds every object of one database (or one desired-state
//! DDL stream) keyed by lowercased name, type-scoped. Values are built
//! once at ingest and never mutated downstream. All normalization
//! (upper-cased types, `INT` to `INTEGER`, sorted unique-constraint
//! columns, the INTEGER-primary-key nullability rule) happens here so the
//! differ can compare fields directly.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ast::{
    ColumnConstraint, ColumnDef, CreateIndex, CreateTable, CreateTrigger, CreateView, Statement,
    TableConstraint, TypeName,
};
use crate::parser::{ParseError, Parser};

/// The kind of a schema object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    Table,
    Index,
    View,
    Trigger,
}

impl ObjectKind {
    /// The SQL spelling, as used in `DROP <kind>` statements.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Table => "TABLE",
            Self::Index => "INDEX",
            Self::View => "VIEW",
            Self::Trigger => "TRIGGER",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while building a schema.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// A statement failed to parse.
    #[error("failed to parse statement: {0}")]
    Parse(#[from] ParseError),

    /// The same name defined twice for one object kind.
    #[error("duplicate {kind} '{name}' in schema definition")]
    DuplicateObject {
        /// The object kind.
        kind: ObjectKind,
        /// The offending name as written.
        name: String,
    },
}

/// A foreign key on a single column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    /// The referenced table.
    pub target_table: String,
    /// The referenced columns in declared order; empty means the
    /// target's primary key.
    pub target_columns: Vec<String>,
    /// `ON UPDATE` action (canonical spelling), if declared.
    pub on_update: Option<String>,
    /// `ON DELETE` action (canonical spelling), if declared.
    pub on_delete: Option<String>,
}

/// A normalized column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name as written.
    pub name: String,
    /// Normalized type: upper-cased, `INT` mapped to `INTEGER`, argument
    /// list preserved (`VARCHAR(255)`). Empty for typeless columns.
    pub ty: String,
    /// Whether NULLs are admitted. Defaults to true; a NOT NULL
    /// constraint or being the sole INTEGER primary key clears it
    /// (SQLite rowid-alias semantics).
    pub nullable: bool,
    /// Canonical default expression; `None` for no explicit default.
    pub default: Option<String>,
    /// Whether the column is part of the primary key.
    pub primary_key: bool,
    /// Whether the column carries a UNIQUE constraint, column-level or
    /// through a table-level constraint. Informational: uniqueness is
    /// compared via [`Table::unique_constraints`].
    pub unique: bool,
    /// Column-level foreign key, if any.
    pub foreign_key: Option<ForeignKey>,
}

/// A normalized table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Table name as written.
    pub name: String,
    /// Canonical `CREATE TABLE` text.
    pub sql: String,
    /// Columns in declared order. Order is semantic: reorder detection
    /// depends on it.
    pub columns: Vec<Column>,
    /// Primary key columns in declared order, deduplicated.
    pub primary_key: Vec<String>,
    /// Unique constraints by name; column lists sorted for set
    /// comparison. Unnamed constraints get a `unique_<cols>` name.
    pub unique_constraints: BTreeMap<String, Vec<String>>,
    /// Table-level FOREIGN KEY / CHECK constraints as canonical text.
    /// Multi-column foreign keys are not lowered into per-column values;
    /// they compare as text only.
    pub table_constraints: Vec<String>,
}

/// A normalized index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    /// Index name as written.
    pub name: String,
    /// The table the index covers.
    pub table_name: String,
    /// Canonical `CREATE INDEX` text.
    pub sql: String,
    /// Indexed column names in declared order.
    pub columns: Vec<String>,
    /// Whether the index enforces uniqueness.
    pub unique: bool,
}

/// A view; compared by canonical SQL only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct View {
    /// View name as written.
    pub name: String,
    /// Canonical `CREATE VIEW` text.
    pub sql: String,
}

/// A trigger; compared by canonical SQL only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    /// Trigger name as written.
    pub name: String,
    /// The table the trigger fires on.
    pub table_name: String,
    /// Canonical `CREATE TRIGGER` text.
    pub sql: String,
}

/// All objects of one database or one DDL stream, keyed by lowercased
/// name. SQLite matches names case-insensitively; the original spelling
/// lives inside each value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub tables: BTreeMap<String, Table>,
    pub indexes: BTreeMap<String, Index>,
    pub views: BTreeMap<String, View>,
    pub triggers: BTreeMap<String, Trigger>,
}

impl Schema {
    /// Creates an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a schema from a DDL stream. DML statements are skipped
    /// silently; a duplicate definition is fatal.
    pub fn from_sql(sql: &str) -> Result<Self, SchemaError> {
        let mut schema = Self::new();
        let mut parser = Parser::new(sql);
        while let Some(statement) = parser.next_statement()? {
            schema.insert(&statement)?;
        }
        Ok(schema)
    }

    /// Ingests one parsed statement. `Other` statements are ignored.
    pub fn insert(&mut self, statement: &Statement) -> Result<(), SchemaError> {
        match statement {
            Statement::CreateTable(stmt) => {
                let table = Table::from_ast(stmt);
                let key = stmt.name.key();
                if self.tables.contains_key(&key) {
                    return Err(SchemaError::DuplicateObject {
                        kind: ObjectKind::Table,
                        name: table.name,
                    });
                }
                self.tables.insert(key, table);
            }
            Statement::CreateIndex(stmt) => {
                let index = Index::from_ast(stmt);
                let key = stmt.name.key();
                if self.indexes.contains_key(&key) {
                    return Err(SchemaError::DuplicateObject {
                        kind: ObjectKind::Index,
                        name: index.name,
                    });
                }
                self.indexes.insert(key, index);
            }
            Statement::CreateView(stmt) => {
                let view = View::from_ast(stmt);
                let key = stmt.name.key();
                if self.views.contains_key(&key) {
                    return Err(SchemaError::DuplicateObject {
                        kind: ObjectKind::View,
                        name: view.name,
                    });
                }
                self.views.insert(key, view);
            }
            Statement::CreateTrigger(stmt) => {
                let trigger = Trigger::from_ast(stmt);
                let key = stmt.name.key();
                if self.triggers.contains_key(&key) {
                    return Err(SchemaError::DuplicateObject {
                        kind: ObjectKind::Trigger,
                        name: trigger.name,
                    });
                }
                self.triggers.insert(key, trigger);
            }
            Statement::Other(_) => {}
        }
        Ok(())
    }

    /// True if the schema holds no objects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
            && self.indexes.is_empty()
            && self.views.is_empty()
            && self.triggers.is_empty()
    }
}

impl Table {
    /// Builds a normalized table from its AST.
    #[must_use]
    pub fn from_ast(stmt: &CreateTable) -> Self {
        let sql = stmt.to_string();
        let mut columns: Vec<Column> = stmt.columns.iter().map(Column::from_ast).collect();

        let mut primary_key: Vec<String> = columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.clone())
            .collect();
        let mut unique_constraints = BTreeMap::new();
        let mut table_constraints = Vec::new();

        for constraint in &stmt.constraints {
            match constraint {
                TableConstraint::PrimaryKey { columns: names, .. } => {
                    for name in names {
                        let raw = name.as_str();
                        if !primary_key.iter().any(|p| eq_name(p, raw)) {
                            primary_key.push(raw.to_string());
                        }
                        if let Some(column) = find_column(&mut columns, raw) {
                            column.primary_key = true;
                        }
                    }
                }
                TableConstraint::Unique { name, columns: names } => {
                    let declared: Vec<String> =
                        names.iter().map(|n| n.as_str().to_string()).collect();
                    // Unnamed constraints get a name derived from the
                    // declared column order, before set-sorting.
                    let constraint_name = name
                        .as_ref()
                        .map(|n| n.as_str().to_string())
                        .unwrap_or_else(|| format!("unique_{}", declared.join("_")));
                    for raw in &declared {
                        if let Some(column) = find_column(&mut columns, raw) {
                            column.unique = true;
                        }
                    }
                    let mut sorted = declared;
                    sorted.sort();
                    unique_constraints.insert(constraint_name, sorted);
                }
                TableConstraint::ForeignKey { .. } | TableConstraint::Check { .. } => {
                    table_constraints.push(constraint.to_string());
                }
            }
        }

        // Sole INTEGER primary key aliases the rowid and cannot be NULL
        // even without an explicit NOT NULL.
        if primary_key.len() == 1 {
            let pk = primary_key[0].clone();
            if let Some(column) = find_column(&mut columns, &pk) {
                if column.ty == "INTEGER" {
                    column.nullable = false;
                }
            }
        }

        Self {
            name: stmt.name.as_str().to_string(),
            sql,
            columns,
            primary_key,
            unique_constraints,
            table_constraints,
        }
    }

    /// Looks up a column by name, case-insensitively.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| eq_name(&c.name, name))
    }
}

impl Column {
    fn from_ast(def: &ColumnDef) -> Self {
        let mut column = Self {
            name: def.name.as_str().to_string(),
            ty: normalize_type(def.type_name.as_ref()),
            nullable: true,
            default: None,
            primary_key: false,
            unique: false,
            foreign_key: None,
        };
        for constraint in &def.constraints {
            column.apply(constraint);
        }
        column
    }

    fn apply(&mut self, constraint: &ColumnConstraint) {
        match constraint {
            ColumnConstraint::PrimaryKey { .. } => self.primary_key = true,
            ColumnConstraint::NotNull => self.nullable = false,
            ColumnConstraint::Null => {}
            ColumnConstraint::Unique => self.unique = true,
            ColumnConstraint::Default(expr) => self.default = Some(expr.to_string()),
            ColumnConstraint::ForeignKey(clause) => {
                self.foreign_key = Some(ForeignKey {
                    target_table: clause.table.as_str().to_string(),
                    target_columns: clause
                        .columns
                        .iter()
                        .map(|n| n.as_str().to_string())
                        .collect(),
                    on_update: clause.on_update.map(|a| a.as_str().to_string()),
                    on_delete: clause.on_delete.map(|a| a.as_str().to_string()),
                });
            }
            // CHECK and COLLATE do not participate in structural
            // comparison; they survive through the canonical SQL.
            ColumnConstraint::Check(_) | ColumnConstraint::Collate(_) => {}
            ColumnConstraint::Named { constraint, .. } => self.apply(constraint),
        }
    }
}

impl Index {
    /// Builds a normalized index from its AST.
    #[must_use]
    pub fn from_ast(stmt: &CreateIndex) -> Self {
        Self {
            name: stmt.name.as_str().to_string(),
            table_name: stmt.table.as_str().to_string(),
            sql: stmt.to_string(),
            columns: stmt
                .columns
                .iter()
                .map(|c| c.name.as_str().to_string())
                .collect(),
            unique: stmt.unique,
        }
    }
}

impl View {
    /// Builds a view from its AST.
    #[must_use]
    pub fn from_ast(stmt: &CreateView) -> Self {
        Self {
            name: stmt.name.as_str().to_string(),
            sql: stmt.to_string(),
        }
    }
}

impl Trigger {
    /// Builds a trigger from its AST.
    #[must_use]
    pub fn from_ast(stmt: &CreateTrigger) -> Self {
        Self {
            name: stmt.name.as_str().to_string(),
            table_name: stmt.table.as_str().to_string(),
            sql: stmt.to_string(),
        }
    }
}

fn eq_name(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

fn find_column<'a>(columns: &'a mut [Column], name: &str) -> Option<&'a mut Column> {
    columns.iter_mut().find(|c| eq_name(&c.name, name))
}

fn normalize_type(type_name: Option<&TypeName>) -> String {
    let Some(ty) = type_name else {
        return String::new();
    };
    let base = if ty.name == "INT" { "INTEGER" } else { &ty.name };
    if ty.args.is_empty() {
        base.to_string()
    } else {
        format!("{}({})", base, ty.args.join(", "))
    }
}

//! Schema differ.
//!
//! [`diff_schemas`] splits two schemas into type-scoped create / drop /
//! compare buckets. [`compare_tables`] is the structural comparator: its
//! checks run in a fixed order and the first mismatch wins, so a given
//! pair of tables always reports the same conflict.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::schema::{Column, Schema, Table};

/// The category of a structural table conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictKind {
    ColumnCountMismatch,
    /// A column exists in the database but not in the desired schema.
    ExtraDbColumn,
    /// A column exists in the desired schema but not in the database.
    MissingSchemaColumn,
    ColumnTypeMismatch,
    ColumnNullabilityMismatch,
    ColumnDefaultValueMismatch,
    ColumnPrimaryKeyMismatch,
    ForeignKeyPresenceMismatch,
    ForeignKeyMismatch,
    PrimaryKeyMismatch,
    UniqueConstraintCountMismatch,
    MissingUniqueConstraint,
    ExtraUniqueConstraint,
    UniqueConstraintMismatch,
    TableConstraintMismatch,
}

impl ConflictKind {
    /// The conflict-type label used in messages.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ColumnCountMismatch => "ColumnCountMismatch",
            Self::ExtraDbColumn => "ExtraDBColumn",
            Self::MissingSchemaColumn => "MissingSchemaColumn",
            Self::ColumnTypeMismatch => "ColumnTypeMismatch",
            Self::ColumnNullabilityMismatch => "ColumnNullabilityMismatch",
            Self::ColumnDefaultValueMismatch => "ColumnDefaultValueMismatch",
            Self::ColumnPrimaryKeyMismatch => "ColumnPrimaryKeyMismatch",
            Self::ForeignKeyPresenceMismatch => "ForeignKeyPresenceMismatch",
            Self::ForeignKeyMismatch => "ForeignKeyMismatch",
            Self::PrimaryKeyMismatch => "PrimaryKeyMismatch",
            Self::UniqueConstraintCountMismatch => "UniqueConstraintCountMismatch",
            Self::MissingUniqueConstraint => "MissingUniqueConstraint",
            Self::ExtraUniqueConstraint => "ExtraUniqueConstraint",
            Self::UniqueConstraintMismatch => "UniqueConstraintMismatch",
            Self::TableConstraintMismatch => "TableConstraintMismatch",
        }
    }
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unresolvable structural difference between a desired table and its
/// database counterpart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaConflict {
    /// The table the conflict was found on.
    pub element: String,
    /// The conflict category.
    pub kind: ConflictKind,
    /// The specific property, e.g. `column 'price' type`.
    pub property: String,
    /// What the desired schema declares.
    pub expected: String,
    /// What the database holds.
    pub actual: String,
}

impl SchemaConflict {
    fn new(
        table: &Table,
        kind: ConflictKind,
        property: impl Into<String>,
        expected: impl fmt::Display,
        actual: impl fmt::Display,
    ) -> Self {
        Self {
            element: table.name.clone(),
            kind,
            property: property.into(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

impl fmt::Display for SchemaConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "schema conflict for {} ({}): property '{}', expected '{}', got '{}'",
            self.element, self.kind, self.property, self.expected, self.actual
        )
    }
}

impl std::error::Error for SchemaConflict {}

/// The comparator's verdict on a table present in both schemas.
#[derive(Debug, Clone, PartialEq)]
pub enum TableVerdict {
    /// Structurally equivalent; no action.
    Match,
    /// Same column set and attributes, different declared order. Fixable
    /// by a rebuild.
    ReorderOnly,
    /// An unresolvable structural difference.
    Conflict(SchemaConflict),
}

/// A desired/current pair for one table present in both schemas.
#[derive(Debug, Clone, PartialEq)]
pub struct TablePair {
    pub desired: Table,
    pub current: Table,
}

/// A desired/current canonical-SQL pair for a non-table object.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlPair {
    pub name: String,
    pub desired_sql: String,
    pub current_sql: String,
}

/// Type-scoped difference buckets between a desired and a current schema.
#[derive(Debug, Clone, Default)]
pub struct SchemaDiff {
    /// Objects present only in the desired schema.
    pub to_create: Schema,
    /// Objects present only in the current schema.
    pub to_drop: Schema,
    /// Tables present in both, keyed by lowercased name.
    pub tables_in_both: BTreeMap<String, TablePair>,
    /// Indexes present in both.
    pub indexes_in_both: BTreeMap<String, SqlPair>,
    /// Views present in both.
    pub views_in_both: BTreeMap<String, SqlPair>,
    /// Triggers present in both.
    pub triggers_in_both: BTreeMap<String, SqlPair>,
}

/// Splits `desired` vs `current` into create / drop / compare buckets.
///
/// Buckets are type-scoped: a table named like a current index lands in
/// `to_create.tables` and `to_drop.indexes`, which is how cross-type name
/// collisions become a drop followed by a create.
#[must_use]
pub fn diff_schemas(desired: &Schema, current: &Schema) -> SchemaDiff {
    let mut diff = SchemaDiff::default();

    for (key, desired_table) in &desired.tables {
        match current.tables.get(key) {
            Some(current_table) => {
                diff.tables_in_both.insert(
                    key.clone(),
                    TablePair {
                        desired: desired_table.clone(),
                        current: current_table.clone(),
                    },
                );
            }
            None => {
                diff.to_create.tables.insert(key.clone(), desired_table.clone());
            }
        }
    }
    for (key, current_table) in &current.tables {
        if !desired.tables.contains_key(key) {
            diff.to_drop.tables.insert(key.clone(), current_table.clone());
        }
    }

    for (key, desired_index) in &desired.indexes {
        match current.indexes.get(key) {
            Some(current_index) => {
                diff.indexes_in_both.insert(
                    key.clone(),
                    SqlPair {
                        name: desired_index.name.clone(),
                        desired_sql: desired_index.sql.clone(),
                        current_sql: current_index.sql.clone(),
                    },
                );
            }
            None => {
                diff.to_create.indexes.insert(key.clone(), desired_index.clone());
            }
        }
    }
    for (key, current_index) in &current.indexes {
        if !desired.indexes.contains_key(key) {
            diff.to_drop.indexes.insert(key.clone(), current_index.clone());
        }
    }

    for (key, desired_view) in &desired.views {
        match current.views.get(key) {
            Some(current_view) => {
                diff.views_in_both.insert(
                    key.clone(),
                    SqlPair {
                        name: desired_view.name.clone(),
                        desired_sql: desired_view.sql.clone(),
                        current_sql: current_view.sql.clone(),
                    },
                );
            }
            None => {
                diff.to_create.views.insert(key.clone(), desired_view.clone());
            }
        }
    }
    for (key, current_view) in &current.views {
        if !desired.views.contains_key(key) {
            diff.to_drop.views.insert(key.clone(), current_view.clone());
        }
    }

    for (key, desired_trigger) in &desired.triggers {
        match current.triggers.get(key) {
            Some(current_trigger) => {
                diff.triggers_in_both.insert(
                    key.clone(),
                    SqlPair {
                        name: desired_trigger.name.clone(),
                        desired_sql: desired_trigger.sql.clone(),
                        current_sql: current_trigger.sql.clone(),
                    },
                );
            }
            None => {
                diff.to_create
                    .triggers
                    .insert(key.clone(), desired_trigger.clone());
            }
        }
    }
    for (key, current_trigger) in &current.triggers {
        if !desired.triggers.contains_key(key) {
            diff.to_drop
                .triggers
                .insert(key.clone(), current_trigger.clone());
        }
    }

    diff
}

/// Structurally compares a desired table against its database
/// counterpart.
///
/// Check order (first mismatch wins): column count, per-column pairing by
/// name with attribute comparison, table-level primary key set, unique
/// constraint set, opaque table constraints, then declared column order.
#[must_use]
pub fn compare_tables(desired: &Table, current: &Table) -> TableVerdict {
    if desired.columns.len() != current.columns.len() {
        return TableVerdict::Conflict(SchemaConflict::new(
            desired,
            ConflictKind::ColumnCountMismatch,
            "table columns",
            desired.columns.len(),
            current.columns.len(),
        ));
    }

    for desired_column in &desired.columns {
        let Some(current_column) = current.column(&desired_column.name) else {
            return TableVerdict::Conflict(SchemaConflict::new(
                desired,
                ConflictKind::MissingSchemaColumn,
                format!("column '{}'", desired_column.name),
                "present",
                "missing",
            ));
        };
        if let Some(conflict) = compare_columns(desired, desired_column, current_column) {
            return TableVerdict::Conflict(conflict);
        }
    }
    for current_column in &current.columns {
        if desired.column(&current_column.name).is_none() {
            return TableVerdict::Conflict(SchemaConflict::new(
                desired,
                ConflictKind::ExtraDbColumn,
                format!("column '{}'", current_column.name),
                "missing",
                "present",
            ));
        }
    }

    if !same_name_set(&desired.primary_key, &current.primary_key) {
        return TableVerdict::Conflict(SchemaConflict::new(
            desired,
            ConflictKind::PrimaryKeyMismatch,
            "primary key columns",
            desired.primary_key.join(", "),
            current.primary_key.join(", "),
        ));
    }

    if desired.unique_constraints.len() != current.unique_constraints.len() {
        return TableVerdict::Conflict(SchemaConflict::new(
            desired,
            ConflictKind::UniqueConstraintCountMismatch,
            "unique constraint count",
            desired.unique_constraints.len(),
            current.unique_constraints.len(),
        ));
    }
    for (name, desired_columns) in &desired.unique_constraints {
        let Some(current_columns) = current.unique_constraints.get(name) else {
            return TableVerdict::Conflict(SchemaConflict::new(
                desired,
                ConflictKind::MissingUniqueConstraint,
                format!("unique constraint '{name}'"),
                "exists",
                "not found",
            ));
        };
        // Column lists are sorted at ingest; equality is set equality.
        if desired_columns != current_columns {
            return TableVerdict::Conflict(SchemaConflict::new(
                desired,
                ConflictKind::UniqueConstraintMismatch,
                format!("unique constraint '{name}' columns"),
                desired_columns.join(", "),
                current_columns.join(", "),
            ));
        }
    }
    for name in current.unique_constraints.keys() {
        if !desired.unique_constraints.contains_key(name) {
            return TableVerdict::Conflict(SchemaConflict::new(
                desired,
                ConflictKind::ExtraUniqueConstraint,
                format!("unique constraint '{name}'"),
                "not found",
                "exists",
            ));
        }
    }

    {
        let mut desired_opaque = desired.table_constraints.clone();
        let mut current_opaque = current.table_constraints.clone();
        desired_opaque.sort();
        current_opaque.sort();
        if desired_opaque != current_opaque {
            return TableVerdict::Conflict(SchemaConflict::new(
                desired,
                ConflictKind::TableConstraintMismatch,
                "table constraints",
                desired_opaque.join("; "),
                current_opaque.join("; "),
            ));
        }
    }

    let desired_order: Vec<String> = desired.columns.iter().map(|c| c.name.to_lowercase()).collect();
    let current_order: Vec<String> = current.columns.iter().map(|c| c.name.to_lowercase()).collect();
    if desired_order != current_order {
        return TableVerdict::ReorderOnly;
    }

    TableVerdict::Match
}

fn compare_columns(table: &Table, desired: &Column, current: &Column) -> Option<SchemaConflict> {
    if desired.ty != current.ty {
        return Some(SchemaConflict::new(
            table,
            ConflictKind::ColumnTypeMismatch,
            format!("column '{}' type", desired.name),
            &desired.ty,
            &current.ty,
        ));
    }
    if desired.nullable != current.nullable {
        return Some(SchemaConflict::new(
            table,
            ConflictKind::ColumnNullabilityMismatch,
            format!("column '{}' nullable", desired.name),
            desired.nullable,
            current.nullable,
        ));
    }
    if desired.default != current.default {
        // Absence reads as the NULL sentinel in the report.
        let show = |v: &Option<String>| v.clone().unwrap_or_else(|| "NULL".to_string());
        return Some(SchemaConflict::new(
            table,
            ConflictKind::ColumnDefaultValueMismatch,
            format!("column '{}' default", desired.name),
            show(&desired.default),
            show(&current.default),
        ));
    }
    if desired.primary_key != current.primary_key {
        return Some(SchemaConflict::new(
            table,
            ConflictKind::ColumnPrimaryKeyMismatch,
            format!("column '{}' primary key", desired.name),
            desired.primary_key,
            current.primary_key,
        ));
    }
    // Column-level `unique` is informational; uniqueness is compared via
    // the table-level unique-constraint set, so table-level noise cannot
    // surface as a column conflict.

    match (&desired.foreign_key, &current.foreign_key) {
        (None, None) => {}
        (Some(_), None) | (None, Some(_)) => {
            return Some(SchemaConflict::new(
                table,
                ConflictKind::ForeignKeyPresenceMismatch,
                format!("column '{}' foreign key", desired.name),
                desired.foreign_key.is_some(),
                current.foreign_key.is_some(),
            ));
        }
        (Some(desired_fk), Some(current_fk)) => {
            if !eq_ignore_case(&desired_fk.target_table, &current_fk.target_table) {
                return Some(SchemaConflict::new(
                    table,
                    ConflictKind::ForeignKeyMismatch,
                    format!("column '{}' foreign key target table", desired.name),
                    &desired_fk.target_table,
                    &current_fk.target_table,
                ));
            }
            if desired_fk.target_columns != current_fk.target_columns {
                return Some(SchemaConflict::new(
                    table,
                    ConflictKind::ForeignKeyMismatch,
                    format!("column '{}' foreign key target columns", desired.name),
                    desired_fk.target_columns.join(", "),
                    current_fk.target_columns.join(", "),
                ));
            }
            if desired_fk.on_update != current_fk.on_update {
                return Some(SchemaConflict::new(
                    table,
                    ConflictKind::ForeignKeyMismatch,
                    format!("column '{}' foreign key ON UPDATE", desired.name),
                    desired_fk.on_update.clone().unwrap_or_default(),
                    current_fk.on_update.clone().unwrap_or_default(),
                ));
            }
            if desired_fk.on_delete != current_fk.on_delete {
                return Some(SchemaConflict::new(
                    table,
                    ConflictKind::ForeignKeyMismatch,
                    format!("column '{}' foreign key ON DELETE", desired.name),
                    desired_fk.on_delete.clone().unwrap_or_default(),
                    current_fk.on_delete.clone().unwrap_or_default(),
                ));
            }
        }
    }

    None
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

fn same_name_set(a: &[String], b: &[String]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut left: Vec<String> = a.iter().map(|s| s.to_lowercase()).collect();
    let mut right: Vec<String> = b.iter().map(|s| s.to_lowercase()).collect();
    left.sort();
    right.sort();
    left == right
}

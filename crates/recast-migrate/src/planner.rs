//! Plan construction.
//!
//! Turns differ buckets into an ordered operation list. Ordering rules:
//! drops run dependents-first (triggers, views, indexes, then tables) so
//! dropping a base table cannot orphan catalog entries mid-plan; creates
//! run bases-first (tables, indexes, views, then triggers) so dependents
//! always find their base. Reorder rebuilds sit between the two phases.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use recast_core::diff::{diff_schemas, SqlPair};
use recast_core::{compare_tables, ObjectKind, Schema, Table, TableVerdict};

use crate::error::{ConflictSet, MigrateError};

/// Knobs governing what a migration may do.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MigratePolicy {
    /// Whether the plan may drop tables. A reorder rebuild is not a
    /// deletion and is always permitted; a table replaced by a same-named
    /// non-table counts as a deletion.
    pub allow_table_deletes: bool,
}

impl MigratePolicy {
    /// Creates the default policy: table deletes disallowed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether tables may be dropped.
    #[must_use]
    pub fn allow_table_deletes(mut self, allow: bool) -> Self {
        self.allow_table_deletes = allow;
        self
    }
}

/// One operation of a migration plan.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanOp {
    /// Drop an object. Execution tolerates the object already being
    /// gone.
    Drop { kind: ObjectKind, name: String },
    /// Create an object from its canonical SQL.
    Create {
        kind: ObjectKind,
        name: String,
        sql: String,
    },
    /// Rebuild a table to change its declared column order: rename away,
    /// create the new shape, copy the named columns across, drop the old
    /// table.
    RebuildTable {
        name: String,
        sql: String,
        /// Column names in the desired order; drives the copy.
        columns: Vec<String>,
    },
    /// Drop-and-recreate an unchanged dependent whose base table is
    /// rebuilt in the same plan. The drop tolerates absence: the rebuild
    /// may already have taken the dependent with it.
    ForcedRecreate {
        kind: ObjectKind,
        name: String,
        sql: String,
    },
}

impl fmt::Display for PlanOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Drop { kind, name } => write!(f, "DROP {kind} {name}"),
            Self::Create { kind, name, .. } => write!(f, "CREATE {kind} {name}"),
            Self::RebuildTable { name, .. } => write!(f, "REBUILD TABLE {name} (column reorder)"),
            Self::ForcedRecreate { kind, name, .. } => write!(f, "RECREATE {kind} {name}"),
        }
    }
}

/// An ordered migration plan, consumed left-to-right by the executor.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    /// Operations in execution order.
    pub ops: Vec<PlanOp>,
}

impl Plan {
    /// True when the database already matches the target.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Computes the plan that makes `current` match `desired`.
///
/// # Errors
///
/// Returns [`MigrateError::Conflicts`] when any table pair has an
/// unresolvable structural difference, and
/// [`MigrateError::TableDeletionNotAllowed`] when the plan would drop
/// tables the policy protects. Both short-circuit before any operation
/// list is produced; conflicts win over the policy gate.
pub fn plan_migration(
    desired: &Schema,
    current: &Schema,
    policy: &MigratePolicy,
) -> Result<Plan, MigrateError> {
    let diff = diff_schemas(desired, current);

    let mut conflicts = Vec::new();
    let mut rebuilds: Vec<&Table> = Vec::new();
    for pair in diff.tables_in_both.values() {
        match compare_tables(&pair.desired, &pair.current) {
            TableVerdict::Match => {}
            TableVerdict::ReorderOnly => rebuilds.push(&pair.desired),
            TableVerdict::Conflict(conflict) => conflicts.push(conflict),
        }
    }
    if !conflicts.is_empty() {
        return Err(MigrateError::Conflicts(ConflictSet { conflicts }));
    }

    if !policy.allow_table_deletes && !diff.to_drop.tables.is_empty() {
        let tables = diff
            .to_drop
            .tables
            .values()
            .map(|t| t.name.clone())
            .collect();
        return Err(MigrateError::TableDeletionNotAllowed { tables });
    }

    let changed = |pair: &&SqlPair| pair.desired_sql != pair.current_sql;
    let changed_indexes: Vec<&SqlPair> = diff.indexes_in_both.values().filter(changed).collect();
    let changed_views: Vec<&SqlPair> = diff.views_in_both.values().filter(changed).collect();
    let changed_triggers: Vec<&SqlPair> = diff.triggers_in_both.values().filter(changed).collect();

    // Tables that will exist in a freshly created form once the plan has
    // run; their unchanged dependents must be forced through a recreate
    // because SQLite's rename handling of dependents is incomplete.
    let mut rebuilt: BTreeSet<String> = rebuilds.iter().map(|t| t.name.to_lowercase()).collect();
    rebuilt.extend(diff.to_create.tables.keys().cloned());

    let mut ops = Vec::new();

    for trigger in diff.to_drop.triggers.values() {
        ops.push(PlanOp::Drop {
            kind: ObjectKind::Trigger,
            name: trigger.name.clone(),
        });
    }
    for pair in &changed_triggers {
        ops.push(PlanOp::Drop {
            kind: ObjectKind::Trigger,
            name: pair.name.clone(),
        });
    }
    for view in diff.to_drop.views.values() {
        ops.push(PlanOp::Drop {
            kind: ObjectKind::View,
            name: view.name.clone(),
        });
    }
    for pair in &changed_views {
        ops.push(PlanOp::Drop {
            kind: ObjectKind::View,
            name: pair.name.clone(),
        });
    }
    for index in diff.to_drop.indexes.values() {
        ops.push(PlanOp::Drop {
            kind: ObjectKind::Index,
            name: index.name.clone(),
        });
    }
    for pair in &changed_indexes {
        ops.push(PlanOp::Drop {
            kind: ObjectKind::Index,
            name: pair.name.clone(),
        });
    }
    for table in diff.to_drop.tables.values() {
        ops.push(PlanOp::Drop {
            kind: ObjectKind::Table,
            name: table.name.clone(),
        });
    }

    for table in &rebuilds {
        ops.push(PlanOp::RebuildTable {
            name: table.name.clone(),
            sql: table.sql.clone(),
            columns: table.columns.iter().map(|c| c.name.clone()).collect(),
        });
    }

    for table in diff.to_create.tables.values() {
        ops.push(PlanOp::Create {
            kind: ObjectKind::Table,
            name: table.name.clone(),
            sql: table.sql.clone(),
        });
    }

    for index in diff.to_create.indexes.values() {
        ops.push(PlanOp::Create {
            kind: ObjectKind::Index,
            name: index.name.clone(),
            sql: index.sql.clone(),
        });
    }
    for pair in &changed_indexes {
        ops.push(PlanOp::Create {
            kind: ObjectKind::Index,
            name: pair.name.clone(),
            sql: pair.desired_sql.clone(),
        });
    }
    for (key, pair) in &diff.indexes_in_both {
        if pair.desired_sql == pair.current_sql {
            let base = desired.indexes[key].table_name.to_lowercase();
            if rebuilt.contains(&base) {
                ops.push(PlanOp::ForcedRecreate {
                    kind: ObjectKind::Index,
                    name: pair.name.clone(),
                    sql: pair.desired_sql.clone(),
                });
            }
        }
    }

    for view in diff.to_create.views.values() {
        ops.push(PlanOp::Create {
            kind: ObjectKind::View,
            name: view.name.clone(),
            sql: view.sql.clone(),
        });
    }
    for pair in &changed_views {
        ops.push(PlanOp::Create {
            kind: ObjectKind::View,
            name: pair.name.clone(),
            sql: pair.desired_sql.clone(),
        });
    }

    for trigger in diff.to_create.triggers.values() {
        ops.push(PlanOp::Create {
            kind: ObjectKind::Trigger,
            name: trigger.name.clone(),
            sql: trigger.sql.clone(),
        });
    }
    for pair in &changed_triggers {
        ops.push(PlanOp::Create {
            kind: ObjectKind::Trigger,
            name: pair.name.clone(),
            sql: pair.desired_sql.clone(),
        });
    }
    for (key, pair) in &diff.triggers_in_both {
        if pair.desired_sql == pair.current_sql {
            let base = desired.triggers[key].table_name.to_lowercase();
            if rebuilt.contains(&base) {
                ops.push(PlanOp::ForcedRecreate {
                    kind: ObjectKind::Trigger,
                    name: pair.name.clone(),
                    sql: pair.desired_sql.clone(),
                });
            }
        }
    }

    Ok(Plan { ops })
}

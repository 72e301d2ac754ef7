//! AST types for SQLite DDL, with canonical serialization via `Display`.

mod fragment;
mod statement;

pub use fragment::SqlFragment;
pub use statement::{
    ColumnConstraint, ColumnDef, CreateIndex, CreateTable, CreateTrigger, CreateView, FkAction,
    ForeignKeyClause, IndexedColumn, Name, SortOrder, Statement, TableConstraint, TriggerEvent,
    TriggerTiming, TypeName,
};

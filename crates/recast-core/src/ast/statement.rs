//! DDL statement AST types.
//!
//! [`Statement`] is a closed tagged variant over the four schema object
//! kinds plus `Other` for anything the reconciler does not model (DML,
//! PRAGMAs, virtual tables). The `Display` impl of each node is the
//! canonical serializer: object names come out double-quoted, keywords
//! upper-cased, whitespace and comments gone. Canonical text is the
//! equality relation used by the differ and the verifier.

use core::fmt;

use super::fragment::SqlFragment;

/// An object name as written in the source. Canonical output always
/// double-quotes it (with inner `"` doubled), so names containing hyphens
/// or spaces survive every generated statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name(String);

impl Name {
    /// Creates a name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The raw (unquoted) name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The lowercased form used as a map key. SQLite identifiers match
    /// case-insensitively but display case-preserved.
    #[must_use]
    pub fn key(&self) -> String {
        self.0.to_lowercase()
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.0.replace('"', "\"\""))
    }
}

/// A column type as declared: upper-cased words plus optional arguments,
/// e.g. `VARCHAR(255)` or `DOUBLE PRECISION`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeName {
    /// Upper-cased, space-joined type words.
    pub name: String,
    /// Raw argument texts, e.g. `["10", "2"]` for `DECIMAL(10, 2)`.
    pub args: Vec<String>,
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.args.is_empty() {
            write!(f, "({})", self.args.join(", "))?;
        }
        Ok(())
    }
}

/// A referential action on a foreign key clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FkAction {
    SetNull,
    SetDefault,
    Cascade,
    Restrict,
    NoAction,
}

impl FkAction {
    /// Returns the SQL spelling.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
            Self::Cascade => "CASCADE",
            Self::Restrict => "RESTRICT",
            Self::NoAction => "NO ACTION",
        }
    }
}

impl fmt::Display for FkAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The tail of a `REFERENCES` clause, shared by column-level and
/// table-level foreign keys.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKeyClause {
    /// The referenced table.
    pub table: Name,
    /// The referenced columns; empty means the target's primary key.
    pub columns: Vec<Name>,
    /// `ON UPDATE` action, if declared.
    pub on_update: Option<FkAction>,
    /// `ON DELETE` action, if declared.
    pub on_delete: Option<FkAction>,
}

impl fmt::Display for ForeignKeyClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "REFERENCES {}", self.table)?;
        if !self.columns.is_empty() {
            f.write_str(" (")?;
            write_names(f, &self.columns)?;
            f.write_str(")")?;
        }
        // Fixed clause order: declaration order is not semantic, so the
        // canonical form does not preserve it.
        if let Some(action) = self.on_update {
            write!(f, " ON UPDATE {action}")?;
        }
        if let Some(action) = self.on_delete {
            write!(f, " ON DELETE {action}")?;
        }
        Ok(())
    }
}

/// A constraint attached to a single column definition.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnConstraint {
    PrimaryKey { autoincrement: bool },
    NotNull,
    /// An explicit bare `NULL`.
    Null,
    Unique,
    Default(SqlFragment),
    Check(SqlFragment),
    Collate(Name),
    ForeignKey(ForeignKeyClause),
    /// `CONSTRAINT <name> <constraint>`.
    Named {
        name: Name,
        constraint: Box<ColumnConstraint>,
    },
}

impl fmt::Display for ColumnConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PrimaryKey { autoincrement } => {
                f.write_str("PRIMARY KEY")?;
                if *autoincrement {
                    f.write_str(" AUTOINCREMENT")?;
                }
                Ok(())
            }
            Self::NotNull => f.write_str("NOT NULL"),
            Self::Null => f.write_str("NULL"),
            Self::Unique => f.write_str("UNIQUE"),
            Self::Default(expr) => write!(f, "DEFAULT {expr}"),
            Self::Check(expr) => write!(f, "CHECK {expr}"),
            Self::Collate(name) => write!(f, "COLLATE {name}"),
            Self::ForeignKey(clause) => write!(f, "{clause}"),
            Self::Named { name, constraint } => write!(f, "CONSTRAINT {name} {constraint}"),
        }
    }
}

/// A single column definition inside `CREATE TABLE`.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    /// Column name.
    pub name: Name,
    /// Declared type; SQLite permits typeless columns.
    pub type_name: Option<TypeName>,
    /// Constraints in declared order.
    pub constraints: Vec<ColumnConstraint>,
}

impl fmt::Display for ColumnDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(ty) = &self.type_name {
            write!(f, " {ty}")?;
        }
        for constraint in &self.constraints {
            write!(f, " {constraint}")?;
        }
        Ok(())
    }
}

/// A table-level constraint.
#[derive(Debug, Clone, PartialEq)]
pub enum TableConstraint {
    PrimaryKey {
        name: Option<Name>,
        columns: Vec<Name>,
    },
    Unique {
        name: Option<Name>,
        columns: Vec<Name>,
    },
    ForeignKey {
        name: Option<Name>,
        columns: Vec<Name>,
        clause: ForeignKeyClause,
    },
    Check {
        name: Option<Name>,
        expr: SqlFragment,
    },
}

impl fmt::Display for TableConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PrimaryKey { name, .. }
            | Self::Unique { name, .. }
            | Self::ForeignKey { name, .. }
            | Self::Check { name, .. } => name,
        };
        if let Some(name) = name {
            write!(f, "CONSTRAINT {name} ")?;
        }
        match self {
            Self::PrimaryKey { columns, .. } => {
                f.write_str("PRIMARY KEY (")?;
                write_names(f, columns)?;
                f.write_str(")")
            }
            Self::Unique { columns, .. } => {
                f.write_str("UNIQUE (")?;
                write_names(f, columns)?;
                f.write_str(")")
            }
            Self::ForeignKey {
                columns, clause, ..
            } => {
                f.write_str("FOREIGN KEY (")?;
                write_names(f, columns)?;
                write!(f, ") {clause}")
            }
            Self::Check { expr, .. } => write!(f, "CHECK {expr}"),
        }
    }
}

/// A `CREATE TABLE` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTable {
    pub name: Name,
    pub if_not_exists: bool,
    /// Columns in declared order; order is semantic in SQLite.
    pub columns: Vec<ColumnDef>,
    /// Table-level constraints in declared order.
    pub constraints: Vec<TableConstraint>,
    pub without_rowid: bool,
    pub strict: bool,
}

impl fmt::Display for CreateTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CREATE TABLE ")?;
        if self.if_not_exists {
            f.write_str("IF NOT EXISTS ")?;
        }
        write!(f, "{} (", self.name)?;
        for (i, column) in self.columns.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{column}")?;
        }
        for constraint in &self.constraints {
            write!(f, ", {constraint}")?;
        }
        f.write_str(")")?;
        if self.without_rowid {
            f.write_str(" WITHOUT ROWID")?;
        }
        if self.strict {
            f.write_str(" STRICT")?;
        }
        Ok(())
    }
}

/// Sort order on an indexed column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        })
    }
}

/// A column reference inside `CREATE INDEX`.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedColumn {
    pub name: Name,
    pub collate: Option<Name>,
    pub order: Option<SortOrder>,
}

impl fmt::Display for IndexedColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(collation) = &self.collate {
            write!(f, " COLLATE {collation}")?;
        }
        if let Some(order) = self.order {
            write!(f, " {order}")?;
        }
        Ok(())
    }
}

/// A `CREATE INDEX` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateIndex {
    pub name: Name,
    pub unique: bool,
    pub if_not_exists: bool,
    pub table: Name,
    /// Indexed columns in declared order; composite order is semantic.
    pub columns: Vec<IndexedColumn>,
    /// Partial-index predicate, kept opaque.
    pub where_clause: Option<SqlFragment>,
}

impl fmt::Display for CreateIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CREATE ")?;
        if self.unique {
            f.write_str("UNIQUE ")?;
        }
        f.write_str("INDEX ")?;
        if self.if_not_exists {
            f.write_str("IF NOT EXISTS ")?;
        }
        write!(f, "{} ON {} (", self.name, self.table)?;
        for (i, column) in self.columns.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{column}")?;
        }
        f.write_str(")")?;
        if let Some(predicate) = &self.where_clause {
            write!(f, " WHERE {predicate}")?;
        }
        Ok(())
    }
}

/// A `CREATE VIEW` statement. The SELECT body is opaque.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateView {
    pub name: Name,
    pub if_not_exists: bool,
    /// Explicit view column names, if declared.
    pub columns: Vec<Name>,
    pub select: SqlFragment,
}

impl fmt::Display for CreateView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CREATE VIEW ")?;
        if self.if_not_exists {
            f.write_str("IF NOT EXISTS ")?;
        }
        write!(f, "{}", self.name)?;
        if !self.columns.is_empty() {
            f.write_str(" (")?;
            write_names(f, &self.columns)?;
            f.write_str(")")?;
        }
        write!(f, " AS {}", self.select)
    }
}

/// When a trigger fires relative to its event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerTiming {
    Before,
    After,
    InsteadOf,
}

impl fmt::Display for TriggerTiming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Before => "BEFORE",
            Self::After => "AFTER",
            Self::InsteadOf => "INSTEAD OF",
        })
    }
}

/// The event a trigger fires on.
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerEvent {
    Delete,
    Insert,
    /// `UPDATE` or `UPDATE OF <columns>`.
    Update(Vec<Name>),
}

impl fmt::Display for TriggerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delete => f.write_str("DELETE"),
            Self::Insert => f.write_str("INSERT"),
            Self::Update(columns) => {
                f.write_str("UPDATE")?;
                if !columns.is_empty() {
                    f.write_str(" OF ")?;
                    write_names(f, columns)?;
                }
                Ok(())
            }
        }
    }
}

/// A `CREATE TRIGGER` statement. The body between BEGIN and END is an
/// opaque fragment with its internal semicolons preserved.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTrigger {
    pub name: Name,
    pub if_not_exists: bool,
    pub timing: Option<TriggerTiming>,
    pub event: TriggerEvent,
    pub table: Name,
    pub for_each_row: bool,
    pub when: Option<SqlFragment>,
    pub body: SqlFragment,
}

impl fmt::Display for CreateTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CREATE TRIGGER ")?;
        if self.if_not_exists {
            f.write_str("IF NOT EXISTS ")?;
        }
        write!(f, "{}", self.name)?;
        if let Some(timing) = self.timing {
            write!(f, " {timing}")?;
        }
        write!(f, " {} ON {}", self.event, self.table)?;
        if self.for_each_row {
            f.write_str(" FOR EACH ROW")?;
        }
        if let Some(condition) = &self.when {
            write!(f, " WHEN {condition}")?;
        }
        write!(f, " BEGIN {} END", self.body)
    }
}

/// A parsed SQL statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    CreateTable(CreateTable),
    CreateIndex(CreateIndex),
    CreateView(CreateView),
    CreateTrigger(CreateTrigger),
    /// Any statement the reconciler does not model (DML, PRAGMA, ...).
    Other(SqlFragment),
}

impl Statement {
    /// The unqualified object name, if this statement defines one.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::CreateTable(stmt) => Some(stmt.name.as_str()),
            Self::CreateIndex(stmt) => Some(stmt.name.as_str()),
            Self::CreateView(stmt) => Some(stmt.name.as_str()),
            Self::CreateTrigger(stmt) => Some(stmt.name.as_str()),
            Self::Other(_) => None,
        }
    }

    /// The table this object depends on. Defined for indexes and
    /// triggers; views do not declare their base tables.
    #[must_use]
    pub fn base_table(&self) -> Option<&str> {
        match self {
            Self::CreateIndex(stmt) => Some(stmt.table.as_str()),
            Self::CreateTrigger(stmt) => Some(stmt.table.as_str()),
            _ => None,
        }
    }

    /// True for the statements the schema model ingests.
    #[must_use]
    pub fn is_ddl(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateTable(stmt) => write!(f, "{stmt}"),
            Self::CreateIndex(stmt) => write!(f, "{stmt}"),
            Self::CreateView(stmt) => write!(f, "{stmt}"),
            Self::CreateTrigger(stmt) => write!(f, "{stmt}"),
            Self::Other(fragment) => write!(f, "{fragment}"),
        }
    }
}

fn write_names(f: &mut fmt::Formatter<'_>, names: &[Name]) -> fmt::Result {
    for (i, name) in names.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{name}")?;
    }
    Ok(())
}

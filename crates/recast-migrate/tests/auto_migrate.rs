//! End-to-end reconciliation tests over in-memory databases.

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use recast_migrate::prelude::*;

async fn test_pool() -> SqlitePool {
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await
        .expect("failed to create in-memory SQLite pool")
}

async fn exec(pool: &SqlitePool, sql: &str) {
    sqlx::raw_sql(sql)
        .execute(pool)
        .await
        .expect("fixture SQL should execute");
}

async fn object_exists(pool: &SqlitePool, kind: &str, name: &str) -> bool {
    let row: Option<(i64,)> =
        sqlx::query_as("SELECT 1 FROM sqlite_master WHERE type = ? AND name = ?")
            .bind(kind)
            .bind(name)
            .fetch_optional(pool)
            .await
            .expect("sqlite_master query should work");
    row.is_some()
}

async fn schema_snapshot(pool: &SqlitePool) -> Vec<(String, String)> {
    sqlx::query_as(
        "SELECT name, sql FROM sqlite_master \
         WHERE sql IS NOT NULL AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )
    .fetch_all(pool)
    .await
    .expect("sqlite_master query should work")
}

fn allow_deletes() -> MigratePolicy {
    MigratePolicy::new().allow_table_deletes(true)
}

#[tokio::test]
async fn create_from_empty() {
    let pool = test_pool().await;
    let target = "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT); \
                  CREATE INDEX idx_users_name ON users (name);";

    auto_migrate(&pool, target, &allow_deletes()).await.unwrap();

    assert!(object_exists(&pool, "table", "users").await);
    assert!(object_exists(&pool, "index", "idx_users_name").await);
    verify(&pool, target).await.unwrap();
}

#[tokio::test]
async fn perfect_match_is_noop() {
    let pool = test_pool().await;
    let schema = "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT); \
                  CREATE INDEX idx_users_name ON users (name);";
    exec(&pool, schema).await;

    auto_migrate(&pool, schema, &allow_deletes()).await.unwrap();
    verify(&pool, schema).await.unwrap();
}

#[tokio::test]
async fn second_run_plans_zero_operations() {
    let pool = test_pool().await;
    let target = "CREATE TABLE t (a INTEGER, b TEXT); CREATE INDEX i ON t (b);";

    auto_migrate(&pool, target, &allow_deletes()).await.unwrap();

    let desired = parse_schema(target).unwrap();
    let current = fetch_db_schema(&pool).await.unwrap();
    let plan = recast_migrate::plan_migration(&desired, &current, &allow_deletes()).unwrap();
    assert!(plan.is_empty());
}

#[tokio::test]
async fn column_reorder_preserves_data() {
    let pool = test_pool().await;
    exec(
        &pool,
        "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT, email TEXT); \
         INSERT INTO users (id, name, email) VALUES (1, 'Alice', 'a@x'); \
         INSERT INTO users (id, name, email) VALUES (2, 'Bob', 'b@x');",
    )
    .await;

    let target = "CREATE TABLE users (name TEXT, id INTEGER PRIMARY KEY, email TEXT);";
    // A reorder rebuild is not a table deletion; the default policy
    // must permit it.
    auto_migrate(&pool, target, &MigratePolicy::new()).await.unwrap();
    verify(&pool, target).await.unwrap();

    let rows: Vec<(i64, String, String)> =
        sqlx::query_as("SELECT id, name, email FROM users ORDER BY id")
            .fetch_all(&pool)
            .await
            .unwrap();
    assert_eq!(
        rows,
        vec![
            (1, "Alice".to_string(), "a@x".to_string()),
            (2, "Bob".to_string(), "b@x".to_string()),
        ]
    );
}

#[tokio::test]
async fn type_change_is_rejected() {
    let pool = test_pool().await;
    exec(&pool, "CREATE TABLE items (id INTEGER PRIMARY KEY, price REAL);").await;
    let before = schema_snapshot(&pool).await;

    let target = "CREATE TABLE items (id INTEGER PRIMARY KEY, price TEXT);";
    let err = auto_migrate(&pool, target, &allow_deletes()).await.unwrap_err();

    let MigrateError::Conflicts(set) = err else {
        panic!("expected ConflictSet, got {err}");
    };
    assert_eq!(set.conflicts.len(), 1);
    let conflict = &set.conflicts[0];
    assert_eq!(conflict.element, "items");
    assert_eq!(conflict.kind, ConflictKind::ColumnTypeMismatch);
    assert!(conflict.property.contains("price"));
    assert_eq!(conflict.expected, "TEXT");
    assert_eq!(conflict.actual, "REAL");

    assert_eq!(schema_snapshot(&pool).await, before);
}

#[tokio::test]
async fn disallowed_deletion_lists_all_tables() {
    let pool = test_pool().await;
    exec(
        &pool,
        "CREATE TABLE users (id INTEGER); \
         CREATE TABLE items_to_drop (id INTEGER); \
         CREATE TABLE orders_to_drop (id INTEGER);",
    )
    .await;

    let target = "CREATE TABLE users (id INTEGER);";
    let err = auto_migrate(&pool, target, &MigratePolicy::new()).await.unwrap_err();

    let MigrateError::TableDeletionNotAllowed { mut tables } = err else {
        panic!("expected TableDeletionNotAllowed, got {err}");
    };
    tables.sort();
    assert_eq!(tables, vec!["items_to_drop", "orders_to_drop"]);

    assert!(object_exists(&pool, "table", "users").await);
    assert!(object_exists(&pool, "table", "items_to_drop").await);
    assert!(object_exists(&pool, "table", "orders_to_drop").await);
}

#[tokio::test]
async fn allowed_deletion_drops_tables() {
    let pool = test_pool().await;
    exec(
        &pool,
        "CREATE TABLE users (id INTEGER); CREATE TABLE stale (id INTEGER);",
    )
    .await;

    let target = "CREATE TABLE users (id INTEGER);";
    auto_migrate(&pool, target, &allow_deletes()).await.unwrap();

    assert!(object_exists(&pool, "table", "users").await);
    assert!(!object_exists(&pool, "table", "stale").await);
    verify(&pool, target).await.unwrap();
}

#[tokio::test]
async fn index_recreated_after_reorder() {
    let pool = test_pool().await;
    exec(
        &pool,
        "CREATE TABLE t (a INTEGER, b TEXT); CREATE INDEX idx_t_b ON t (b); \
         INSERT INTO t (a, b) VALUES (7, 'seven');",
    )
    .await;

    let target = "CREATE TABLE t (b TEXT, a INTEGER); CREATE INDEX idx_t_b ON t (b);";
    auto_migrate(&pool, target, &MigratePolicy::new()).await.unwrap();

    assert!(object_exists(&pool, "index", "idx_t_b").await);
    let db_schema = fetch_db_schema(&pool).await.unwrap();
    let desired = parse_schema(target).unwrap();
    assert_eq!(
        db_schema.indexes["idx_t_b"].sql,
        desired.indexes["idx_t_b"].sql
    );
    verify(&pool, target).await.unwrap();

    let rows: Vec<(i64, String)> = sqlx::query_as("SELECT a, b FROM t")
        .fetch_all(&pool)
        .await
        .unwrap();
    assert_eq!(rows, vec![(7, "seven".to_string())]);
}

#[tokio::test]
async fn view_drop_allowed_under_disallow_table_deletes() {
    let pool = test_pool().await;
    exec(
        &pool,
        "CREATE TABLE users (id INTEGER); CREATE VIEW uv AS SELECT id FROM users;",
    )
    .await;

    let target = "CREATE TABLE users (id INTEGER);";
    auto_migrate(&pool, target, &MigratePolicy::new()).await.unwrap();

    assert!(object_exists(&pool, "table", "users").await);
    assert!(!object_exists(&pool, "view", "uv").await);
}

#[tokio::test]
async fn index_changed_is_recreated() {
    let pool = test_pool().await;
    exec(
        &pool,
        "CREATE TABLE logs (message TEXT, level TEXT); \
         CREATE INDEX idx_logs ON logs (message);",
    )
    .await;

    let target = "CREATE TABLE logs (message TEXT, level TEXT); \
                  CREATE INDEX idx_logs ON logs (level);";
    auto_migrate(&pool, target, &MigratePolicy::new()).await.unwrap();

    let db_schema = fetch_db_schema(&pool).await.unwrap();
    let desired = parse_schema(target).unwrap();
    assert_eq!(db_schema.indexes["idx_logs"].sql, desired.indexes["idx_logs"].sql);
    verify(&pool, target).await.unwrap();
}

#[tokio::test]
async fn view_changed_is_recreated() {
    let pool = test_pool().await;
    exec(
        &pool,
        "CREATE TABLE users (id INTEGER, name TEXT); \
         CREATE VIEW uv AS SELECT id FROM users;",
    )
    .await;

    let target = "CREATE TABLE users (id INTEGER, name TEXT); \
                  CREATE VIEW uv AS SELECT id, name FROM users;";
    auto_migrate(&pool, target, &MigratePolicy::new()).await.unwrap();
    verify(&pool, target).await.unwrap();
}

#[tokio::test]
async fn trigger_lifecycle() {
    let pool = test_pool().await;
    let base = "CREATE TABLE audit (msg TEXT); CREATE TABLE users (id INTEGER, name TEXT);";
    exec(&pool, base).await;

    // Create.
    let with_trigger = format!(
        "{base} CREATE TRIGGER user_audit AFTER INSERT ON users BEGIN \
         INSERT INTO audit (msg) VALUES ('added'); END;"
    );
    auto_migrate(&pool, &with_trigger, &MigratePolicy::new()).await.unwrap();
    assert!(object_exists(&pool, "trigger", "user_audit").await);
    verify(&pool, &with_trigger).await.unwrap();

    // The trigger actually fires.
    exec(&pool, "INSERT INTO users (id, name) VALUES (1, 'a');").await;
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM audit")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);

    // Changed body: drop and recreate.
    let changed = format!(
        "{base} CREATE TRIGGER user_audit AFTER INSERT ON users BEGIN \
         INSERT INTO audit (msg) VALUES ('created'); END;"
    );
    auto_migrate(&pool, &changed, &MigratePolicy::new()).await.unwrap();
    verify(&pool, &changed).await.unwrap();

    // Drop.
    auto_migrate(&pool, base, &MigratePolicy::new()).await.unwrap();
    assert!(!object_exists(&pool, "trigger", "user_audit").await);
}

#[tokio::test]
async fn trigger_recreated_after_base_table_reorder() {
    let pool = test_pool().await;
    exec(
        &pool,
        "CREATE TABLE audit (msg TEXT); \
         CREATE TABLE users (id INTEGER, name TEXT); \
         CREATE TRIGGER user_audit AFTER INSERT ON users BEGIN \
         INSERT INTO audit (msg) VALUES ('added'); END;",
    )
    .await;

    let target = "CREATE TABLE audit (msg TEXT); \
                  CREATE TABLE users (name TEXT, id INTEGER); \
                  CREATE TRIGGER user_audit AFTER INSERT ON users BEGIN \
                  INSERT INTO audit (msg) VALUES ('added'); END;";
    auto_migrate(&pool, target, &MigratePolicy::new()).await.unwrap();

    assert!(object_exists(&pool, "trigger", "user_audit").await);
    verify(&pool, target).await.unwrap();

    exec(&pool, "INSERT INTO users (name, id) VALUES ('a', 1);").await;
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM audit")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn duplicate_object_in_stream_is_fatal() {
    let pool = test_pool().await;
    let target = "CREATE TABLE t (a INTEGER); CREATE TABLE t (b INTEGER);";
    let err = auto_migrate(&pool, target, &allow_deletes()).await.unwrap_err();
    assert!(matches!(err, MigrateError::Schema(_)));
}

#[tokio::test]
async fn quoted_identifiers_with_hyphens() {
    let pool = test_pool().await;
    let target = r#"CREATE TABLE "user-data" ("col-1" INTEGER PRIMARY KEY, "col-2" TEXT);"#;
    auto_migrate(&pool, target, &MigratePolicy::new()).await.unwrap();
    assert!(object_exists(&pool, "table", "user-data").await);
    verify(&pool, target).await.unwrap();

    // Reorder a hyphenated table: every generated identifier must be
    // quoted for this to survive.
    exec(&pool, r#"INSERT INTO "user-data" ("col-1", "col-2") VALUES (1, 'x');"#).await;
    let reordered = r#"CREATE TABLE "user-data" ("col-2" TEXT, "col-1" INTEGER PRIMARY KEY);"#;
    auto_migrate(&pool, reordered, &MigratePolicy::new()).await.unwrap();
    verify(&pool, reordered).await.unwrap();
    let (count,): (i64,) = sqlx::query_as(r#"SELECT COUNT(*) FROM "user-data""#)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn missing_column_conflict() {
    let pool = test_pool().await;
    exec(&pool, "CREATE TABLE products (id INTEGER, name TEXT, description TEXT);").await;

    let target = "CREATE TABLE products (id INTEGER, name TEXT);";
    let err = auto_migrate(&pool, target, &allow_deletes()).await.unwrap_err();
    let MigrateError::Conflicts(set) = err else {
        panic!("expected conflicts");
    };
    assert_eq!(set.conflicts[0].kind, ConflictKind::ColumnCountMismatch);
}

#[tokio::test]
async fn extra_schema_column_conflict() {
    let pool = test_pool().await;
    exec(&pool, "CREATE TABLE products (id INTEGER, name TEXT);").await;

    let target = "CREATE TABLE products (id INTEGER, name TEXT, description TEXT);";
    let err = auto_migrate(&pool, target, &allow_deletes()).await.unwrap_err();
    let MigrateError::Conflicts(set) = err else {
        panic!("expected conflicts");
    };
    assert_eq!(set.conflicts[0].kind, ConflictKind::ColumnCountMismatch);
}

#[tokio::test]
async fn primary_key_change_conflict() {
    let pool = test_pool().await;
    exec(&pool, "CREATE TABLE t (a INTEGER PRIMARY KEY, b TEXT);").await;

    let target = "CREATE TABLE t (a INTEGER, b TEXT PRIMARY KEY);";
    let err = auto_migrate(&pool, target, &allow_deletes()).await.unwrap_err();
    let MigrateError::Conflicts(set) = err else {
        panic!("expected conflicts");
    };
    assert!(matches!(
        set.conflicts[0].kind,
        ConflictKind::ColumnPrimaryKeyMismatch | ConflictKind::PrimaryKeyMismatch
    ));
}

#[tokio::test]
async fn table_replaced_by_index_needs_delete_policy() {
    let pool = test_pool().await;
    exec(
        &pool,
        "CREATE TABLE t (a INTEGER); CREATE TABLE x (a INTEGER);",
    )
    .await;
    let target = "CREATE TABLE t (a INTEGER); CREATE INDEX x ON t (a);";

    let err = auto_migrate(&pool, target, &MigratePolicy::new()).await.unwrap_err();
    assert!(matches!(err, MigrateError::TableDeletionNotAllowed { .. }));
    assert!(object_exists(&pool, "table", "x").await);

    auto_migrate(&pool, target, &allow_deletes()).await.unwrap();
    assert!(!object_exists(&pool, "table", "x").await);
    assert!(object_exists(&pool, "index", "x").await);
    verify(&pool, target).await.unwrap();
}

#[tokio::test]
async fn execution_failure_rolls_everything_back() {
    let pool = test_pool().await;
    exec(&pool, "CREATE TABLE t (a INTEGER);").await;

    // The index references a column that does not exist, so the plan
    // fails after the new table was already created.
    let target = "CREATE TABLE t (a INTEGER); \
                  CREATE TABLE u (b INTEGER); \
                  CREATE INDEX ix_u ON u (missing_col);";
    let err = auto_migrate(&pool, target, &MigratePolicy::new()).await.unwrap_err();
    assert!(matches!(err, MigrateError::Execution { .. }));

    assert!(!object_exists(&pool, "table", "u").await);
    assert!(!object_exists(&pool, "index", "ix_u").await);
    assert!(object_exists(&pool, "table", "t").await);
}

#[tokio::test]
async fn foreign_key_violation_rolls_back() {
    let pool = test_pool().await;
    exec(
        &pool,
        "CREATE TABLE parent (id INTEGER PRIMARY KEY); \
         CREATE TABLE child (id INTEGER PRIMARY KEY, pid INTEGER REFERENCES parent (id)); \
         INSERT INTO parent (id) VALUES (1); \
         INSERT INTO child (id, pid) VALUES (1, 1);",
    )
    .await;

    // Dropping parent would orphan child rows; the post-plan
    // foreign_key_check must fail the transaction.
    let target = "CREATE TABLE child (id INTEGER PRIMARY KEY, pid INTEGER REFERENCES parent (id));";
    let err = auto_migrate(&pool, target, &allow_deletes()).await.unwrap_err();
    assert!(matches!(err, MigrateError::ForeignKeyViolations { .. }));
    assert!(object_exists(&pool, "table", "parent").await);
}

#[tokio::test]
async fn reorder_table_with_foreign_key() {
    let pool = test_pool().await;
    exec(
        &pool,
        "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT); \
         CREATE TABLE orders (id INTEGER PRIMARY KEY, uid INTEGER REFERENCES users (id)); \
         INSERT INTO users (id, name) VALUES (1, 'a'); \
         INSERT INTO orders (id, uid) VALUES (10, 1);",
    )
    .await;

    let target = "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT); \
                  CREATE TABLE orders (uid INTEGER REFERENCES users (id), id INTEGER PRIMARY KEY);";
    auto_migrate(&pool, target, &MigratePolicy::new()).await.unwrap();
    verify(&pool, target).await.unwrap();

    let rows: Vec<(i64, i64)> = sqlx::query_as("SELECT id, uid FROM orders")
        .fetch_all(&pool)
        .await
        .unwrap();
    assert_eq!(rows, vec![(10, 1)]);
}

#[tokio::test]
async fn empty_target_deletes_everything_when_allowed() {
    let pool = test_pool().await;
    exec(
        &pool,
        "CREATE TABLE a (x INTEGER); CREATE INDEX i ON a (x); \
         CREATE VIEW v AS SELECT x FROM a;",
    )
    .await;

    auto_migrate(&pool, "", &allow_deletes()).await.unwrap();
    let schema = fetch_db_schema(&pool).await.unwrap();
    assert!(schema.is_empty());
}

#[tokio::test]
async fn comments_and_dml_only_schema_is_noop() {
    let pool = test_pool().await;
    let target = "-- nothing but comments\n-- and a stray select\nSELECT 1;";
    auto_migrate(&pool, target, &MigratePolicy::new()).await.unwrap();
    assert!(fetch_db_schema(&pool).await.unwrap().is_empty());
}

#[tokio::test]
async fn verify_reports_first_mismatch() {
    let pool = test_pool().await;
    exec(&pool, "CREATE TABLE users (id INTEGER, name TEXT);").await;

    // Missing from the database.
    let err = verify(&pool, "CREATE TABLE absent (id INTEGER);").await.unwrap_err();
    assert!(matches!(err, MigrateError::MissingObject { name } if name == "absent"));

    // Present with a different definition.
    let err = verify(&pool, "CREATE TABLE users (id INTEGER);").await.unwrap_err();
    assert!(matches!(err, MigrateError::DefinitionMismatch { name, .. } if name == "users"));

    // Database object absent from the stream.
    let err = verify(&pool, "").await.unwrap_err();
    assert!(matches!(err, MigrateError::UnexpectedObject { name } if name == "users"));
}

#[tokio::test]
async fn verify_accepts_cosmetic_differences() {
    let pool = test_pool().await;
    exec(&pool, "create table users(\n  id integer primary key, -- pk\n  name text\n);").await;
    verify(
        &pool,
        "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT);",
    )
    .await
    .unwrap();
}

//! Tests for the collaborators around the reconciliation core: the
//! versioned runner, the batch executor, and the streaming row cursor.

use std::collections::BTreeMap;

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;

use recast_migrate::error::MigrateError;
use recast_migrate::rows::RowSeq;
use recast_migrate::runner::{self, CREATE_VERSION_TABLE_SQL};
use recast_migrate::batch;

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

async fn version(pool: &SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT version FROM version")
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn table_exists(pool: &SqlitePool, name: &str) -> bool {
    let row: Option<(i64,)> =
        sqlx::query_as("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?")
            .bind(name)
            .fetch_optional(pool)
            .await
            .unwrap();
    row.is_some()
}

#[tokio::test]
async fn versioned_runner_applies_pending_steps() {
    let pool = test_pool().await;
    exec(&pool, CREATE_VERSION_TABLE_SQL).await;
    exec(&pool, "INSERT INTO version (version) VALUES (0);").await;

    let mut versions = BTreeMap::new();
    versions.insert(0, "CREATE TABLE a (x INTEGER PRIMARY KEY);".to_string());
    versions.insert(1, "CREATE TABLE b (y INTEGER REFERENCES a (x));".to_string());

    runner::run_versioned(&pool, &versions).await.unwrap();

    assert_eq!(version(&pool).await, 2);
    assert!(table_exists(&pool, "a").await);
    assert!(table_exists(&pool, "b").await);

    // Running again is a no-op: no script maps version 2.
    runner::run_versioned(&pool, &versions).await.unwrap();
    assert_eq!(version(&pool).await, 2);
}

#[tokio::test]
async fn versioned_runner_stops_at_unmapped_version() {
    let pool = test_pool().await;
    exec(&pool, CREATE_VERSION_TABLE_SQL).await;
    exec(&pool, "INSERT INTO version (version) VALUES (5);").await;

    let mut versions = BTreeMap::new();
    versions.insert(0, "CREATE TABLE never (x INTEGER);".to_string());

    runner::run_versioned(&pool, &versions).await.unwrap();
    assert_eq!(version(&pool).await, 5);
    assert!(!table_exists(&pool, "never").await);
}

#[tokio::test]
async fn missing_version_table_is_distinct_error() {
    let pool = test_pool().await;
    let err = runner::run_versioned(&pool, &BTreeMap::new()).await.unwrap_err();
    assert!(matches!(err, MigrateError::NoVersion));

    // Present but empty reads the same way.
    exec(&pool, CREATE_VERSION_TABLE_SQL).await;
    let err = runner::run_versioned(&pool, &BTreeMap::new()).await.unwrap_err();
    assert!(matches!(err, MigrateError::NoVersion));
}

#[tokio::test]
async fn failed_step_rolls_back_and_keeps_version() {
    let pool = test_pool().await;
    exec(&pool, CREATE_VERSION_TABLE_SQL).await;
    exec(&pool, "INSERT INTO version (version) VALUES (0);").await;

    let mut versions = BTreeMap::new();
    versions.insert(
        0,
        "CREATE TABLE a (x INTEGER); CREATE TABLE a (x INTEGER);".to_string(),
    );

    let err = runner::run_versioned(&pool, &versions).await.unwrap_err();
    assert!(matches!(err, MigrateError::Execution { .. }));
    assert_eq!(version(&pool).await, 0);
    assert!(!table_exists(&pool, "a").await);
}

#[tokio::test]
async fn batch_executes_triggers_as_one_statement() {
    let pool = test_pool().await;
    let mut conn = pool.acquire().await.unwrap();
    batch::exec_batch(
        &mut conn,
        "-- fixture\n\
         CREATE TABLE t (a INTEGER);\n\
         CREATE TRIGGER trg AFTER INSERT ON t BEGIN\n\
           UPDATE t SET a = a + 1; -- bump\n\
         END;\n\
         INSERT INTO t (a) VALUES (1);",
    )
    .await
    .unwrap();
    drop(conn);

    assert!(table_exists(&pool, "t").await);
    let (a,): (i64,) = sqlx::query_as("SELECT a FROM t").fetch_one(&pool).await.unwrap();
    // The trigger fired on the insert.
    assert_eq!(a, 2);
}

#[tokio::test]
async fn batch_failure_rolls_back_whole_script() {
    let pool = test_pool().await;
    let mut conn = pool.acquire().await.unwrap();
    let err = batch::exec_batch(
        &mut conn,
        "CREATE TABLE good (a INTEGER); CREATE TABLE good (a INTEGER);",
    )
    .await
    .unwrap_err();
    assert!(matches!(err, MigrateError::Execution { .. }));
    drop(conn);

    assert!(!table_exists(&pool, "good").await);
}

#[tokio::test]
async fn row_seq_iterates_and_exhausts() {
    let pool = test_pool().await;
    exec(
        &pool,
        "CREATE TABLE n (v INTEGER); \
         INSERT INTO n (v) VALUES (1); \
         INSERT INTO n (v) VALUES (2); \
         INSERT INTO n (v) VALUES (3);",
    )
    .await;

    let mut conn = pool.acquire().await.unwrap();
    let mut seq = RowSeq::fetch(&mut conn, "SELECT v FROM n ORDER BY v");
    let mut values = Vec::new();
    while let Some(row) = seq.next().await {
        values.push(row.get::<i64, _>(0));
    }
    assert_eq!(values, vec![1, 2, 3]);
    assert!(seq.err().is_none());
    // Exhausted: further calls keep yielding nothing.
    assert!(seq.next().await.is_none());
    seq.finish().unwrap();
}

#[tokio::test]
async fn row_seq_early_close_is_idempotent() {
    let pool = test_pool().await;
    exec(
        &pool,
        "CREATE TABLE n (v INTEGER); \
         INSERT INTO n (v) VALUES (1); \
         INSERT INTO n (v) VALUES (2);",
    )
    .await;

    let mut conn = pool.acquire().await.unwrap();
    let mut seq = RowSeq::fetch(&mut conn, "SELECT v FROM n");
    assert!(seq.next().await.is_some());
    seq.close();
    seq.close();
    assert!(seq.next().await.is_none());
    assert!(seq.err().is_none());
}

#[tokio::test]
async fn row_seq_surfaces_error_and_stops() {
    let pool = test_pool().await;
    let mut conn = pool.acquire().await.unwrap();
    let mut seq = RowSeq::fetch(&mut conn, "SELECT v FROM does_not_exist");
    assert!(seq.next().await.is_none());
    assert!(seq.err().is_some());
    assert!(seq.next().await.is_none());
    assert!(seq.finish().is_err());
}

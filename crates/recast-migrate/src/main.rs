//! recast-migrate CLI
//!
//! Reconcile, verify, or inspect a SQLite database against a DDL file.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sqlx::sqlite::SqlitePoolOptions;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use recast_migrate::prelude::*;

/// Declarative schema reconciliation for SQLite.
#[derive(Parser)]
#[command(name = "recast-migrate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database URL (SQLite path or connection string).
    #[arg(short, long, env = "DATABASE_URL")]
    database: String,

    /// Path to the target schema DDL file.
    #[arg(short, long, env = "DATABASE_SCHEMA")]
    schema: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile the database with the schema file.
    Migrate {
        /// Permit the plan to drop tables.
        #[arg(long)]
        allow_table_deletes: bool,
    },

    /// Check that the database matches the schema file exactly.
    Verify,

    /// Show the operations a migration would run, without executing.
    Plan,

    /// List user tables and their SQL.
    ShowTables,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let pool = SqlitePoolOptions::new().connect(&cli.database).await?;
    let schema_path = cli.schema.clone();

    match cli.command {
        Commands::Migrate {
            allow_table_deletes,
        } => {
            let target = read_schema(schema_path.as_deref())?;
            let policy = MigratePolicy::new().allow_table_deletes(allow_table_deletes);
            match auto_migrate(&pool, &target, &policy).await {
                Ok(()) => println!("database matches target schema"),
                Err(MigrateError::Conflicts(set)) => {
                    eprintln!("unresolvable schema conflicts:");
                    for conflict in &set.conflicts {
                        eprintln!("  {conflict}");
                    }
                    std::process::exit(1);
                }
                Err(MigrateError::TableDeletionNotAllowed { tables }) => {
                    eprintln!(
                        "refusing to drop tables (re-run with --allow-table-deletes): {}",
                        tables.join(", ")
                    );
                    std::process::exit(1);
                }
                Err(err) => return Err(err.into()),
            }
        }

        Commands::Verify => {
            let target = read_schema(schema_path.as_deref())?;
            verify(&pool, &target).await?;
            println!("schema verified");
        }

        Commands::Plan => {
            let target = read_schema(schema_path.as_deref())?;
            let desired = parse_schema(&target)?;
            let current = fetch_db_schema(&pool).await?;
            let policy = MigratePolicy::new().allow_table_deletes(true);
            let plan = recast_migrate::plan_migration(&desired, &current, &policy)?;
            if plan.is_empty() {
                println!("no changes");
            } else {
                for op in &plan.ops {
                    println!("{op}");
                }
            }
        }

        Commands::ShowTables => {
            let rows: Vec<(String, String)> = sqlx::query_as(
                "SELECT name, sql FROM sqlite_master \
                 WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
            )
            .fetch_all(&pool)
            .await?;
            if rows.is_empty() {
                println!("no tables found");
            }
            for (name, sql) in rows {
                println!("{name} - {sql}");
            }
        }
    }

    Ok(())
}

fn read_schema(path: Option<&std::path::Path>) -> Result<String, Box<dyn std::error::Error>> {
    let path = path.ok_or("schema file required (--schema or DATABASE_SCHEMA)")?;
    Ok(std::fs::read_to_string(path)?)
}

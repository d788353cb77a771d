//! Database connection and initialization.

use anyhow::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Database connection wrapper.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Get the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Initialize the SQLite database.
///
/// Creates the database file if it doesn't exist, runs migrations,
/// and returns a connection pool.
pub async fn init_database(db_path: &str, max_connections: u32) -> Result<Database> {
    if let Some(parent) = Path::new(db_path).parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path);
    info!("Connecting to database: {}", db_path);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .connect(&db_url)
        .await?;

    run_migrations(&pool).await?;

    Ok(Database { pool })
}

async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let migration_sql = include_str!("../../migrations/001_init.sql");

    info!("Running database migrations...");
    apply_migration(pool, migration_sql).await?;
    info!("Database migrations complete");
    Ok(())
}

/// Run every statement of `sql`. Any failure other than an existing object
/// aborts, so a broken schema stops startup.
async fn apply_migration(pool: &SqlitePool, sql: &str) -> Result<()> {
    for statement in migration_statements(sql) {
        if let Err(e) = sqlx::query(&statement).execute(pool).await {
            // "already exists" is expected on re-runs
            if e.to_string().contains("already exists") {
                continue;
            }
            anyhow::bail!("Migration statement failed: {}\n{}", e, statement);
        }
    }
    Ok(())
}

/// Statements of a migration script. Comment lines are dropped before
/// splitting, so a `;` inside a comment never cuts a statement.
fn migration_statements(sql: &str) -> Vec<String> {
    let without_comments: String = sql
        .lines()
        .filter(|line| !line.trim_start().starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n");
    without_comments
        .split(';')
        .map(str::trim)
        .filter(|statement| !statement.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_init_database() {
        let db = init_database(":memory:", 1).await.unwrap();

        let result: (i32,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN ('routes', 'hazard_records')",
        )
        .fetch_one(db.pool())
        .await
        .unwrap();

        assert_eq!(result.0, 2);
    }

    #[test]
    fn comment_semicolons_do_not_split_statements() {
        let statements = migration_statements(
            "-- first; with a semicolon\nCREATE TABLE a (x INTEGER);\n\n-- second\nCREATE INDEX i ON a(x);\n",
        );
        assert_eq!(
            statements,
            vec!["CREATE TABLE a (x INTEGER)".to_string(), "CREATE INDEX i ON a(x)".to_string()]
        );
    }

    #[tokio::test]
    async fn failed_statements_stop_startup() {
        let db = init_database(":memory:", 1).await.unwrap();
        // the shipped schema is safe to re-apply
        run_migrations(db.pool()).await.unwrap();

        let err = apply_migration(db.pool(), "CREATE TABLE extra (x INTEGER); INSERT INTO missing VALUES (1);")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no such table"));
    }
}

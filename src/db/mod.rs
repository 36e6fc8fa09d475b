pub mod models;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use std::path::Path;

use crate::state::DbPool;

pub const MIGRATIONS: &[(&str, &str)] = &[(
    "001_initial",
    include_str!("../../migrations/001_initial.sql"),
)];

/// The fixed category vocabulary posts are filed under.
pub const SEED_CATEGORIES: &[&str] = &[
    "Autobiography",
    "Comedy",
    "Science Fiction",
    "Fantasy",
    "Mystery",
    "Other",
];

/// Any failure talking to the relational store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),
}

const PRAGMAS: &str = "
    PRAGMA journal_mode = WAL;
    PRAGMA synchronous = NORMAL;
    PRAGMA foreign_keys = ON;
    PRAGMA busy_timeout = 5000;
";

pub fn create_pool(db_path: &Path) -> anyhow::Result<DbPool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // foreign_keys is per-connection, so every pooled connection gets the pragmas
    let manager =
        SqliteConnectionManager::file(db_path).with_init(|conn| conn.execute_batch(PRAGMAS));
    let pool = Pool::builder().max_size(8).build(manager)?;

    Ok(pool)
}

/// Single-connection in-memory pool. Each `:memory:` connection is its own
/// database, so the pool must never hand out a second one.
pub fn memory_pool() -> anyhow::Result<DbPool> {
    let manager = SqliteConnectionManager::memory()
        .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
    let pool = Pool::builder().max_size(1).build(manager)?;
    Ok(pool)
}

pub fn run_migrations(pool: &DbPool) -> anyhow::Result<()> {
    let conn = pool.get()?;

    // Create migrations tracking table
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            name TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    for (name, sql) in MIGRATIONS {
        let already_applied: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM schema_version WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )?;

        if !already_applied {
            tracing::info!("Applying migration: {}", name);
            conn.execute_batch(sql)?;
            conn.execute(
                "INSERT INTO schema_version (name) VALUES (?1)",
                params![name],
            )?;
        }
    }

    for name in SEED_CATEGORIES {
        conn.execute(
            "INSERT OR IGNORE INTO categories (id, name) VALUES (?1, ?2)",
            params![uuid::Uuid::now_v7().to_string(), name],
        )?;
    }

    tracing::info!("Database migrations complete");
    Ok(())
}

/// Migrated in-memory pool for unit tests.
#[cfg(test)]
pub(crate) fn test_pool() -> DbPool {
    let pool = memory_pool().unwrap();
    run_migrations(&pool).unwrap();
    pool
}

// ABOUTME: Database connection management and shared storage errors
// ABOUTME: Provides the SQLite pool, migrations, and id generation for all packages

use std::path::Path;
use std::time::Duration;

use sqlx::migrate::MigrateDatabase;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use thiserror::Error;
use tracing::{debug, info};

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("Sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Record not found")]
    NotFound,
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Embedded schema migrations, applied on startup and in tests.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Maximum pool connections; SQLite in WAL mode handles this comfortably.
const MAX_CONNECTIONS: u32 = 10;
const ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// Open (creating if necessary) the database at `path` and run migrations.
pub async fn connect(path: &Path) -> StorageResult<SqlitePool> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(StorageError::Io)?;
    }

    let database_url = format!("sqlite:{}", path.display());

    if !sqlx::Sqlite::database_exists(&database_url)
        .await
        .map_err(StorageError::Sqlx)?
    {
        debug!("Creating database at: {}", database_url);
        sqlx::Sqlite::create_database(&database_url)
            .await
            .map_err(StorageError::Sqlx)?;
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .acquire_timeout(Duration::from_secs(ACQUIRE_TIMEOUT_SECS))
        .connect(&database_url)
        .await
        .map_err(StorageError::Sqlx)?;

    configure_pragmas(&pool).await?;
    run_migrations(&pool).await?;

    info!("Database connection established");
    Ok(pool)
}

/// Apply the embedded migrations to an already-open pool.
///
/// Exposed separately so package tests can set up an in-memory or tempfile
/// database without going through `connect`.
pub async fn run_migrations(pool: &SqlitePool) -> StorageResult<()> {
    MIGRATOR.run(pool).await.map_err(StorageError::Migration)?;
    debug!("Database migrations completed");
    Ok(())
}

async fn configure_pragmas(pool: &SqlitePool) -> StorageResult<()> {
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(pool)
        .await
        .map_err(StorageError::Sqlx)?;

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(pool)
        .await
        .map_err(StorageError::Sqlx)?;

    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(pool)
        .await
        .map_err(StorageError::Sqlx)?;

    Ok(())
}

/// Generate a unique record ID
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

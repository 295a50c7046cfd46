// ABOUTME: Database connection management and shared storage errors
// ABOUTME: SQLite pool bootstrap with PRAGMAs and embedded migrations

use sqlx::sqlite::{SqlitePoolOptions, SqlitePool};
use sqlx::migrate::MigrateDatabase;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info};

pub mod attachments;

pub use attachments::{AttachmentStore, LocalAttachmentStore};

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
    #[error("Row not found")]
    NotFound,
    #[error("Duplicate designation: {0}")]
    DuplicateDesignation(String),
    #[error("Invalid attachment token: {0}")]
    InvalidAttachmentToken(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub database_path: PathBuf,
    pub enable_wal: bool,
    pub max_connections: u32,
    pub busy_timeout_seconds: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: guichet_core::database_file(),
            enable_wal: true,
            max_connections: 10,
            busy_timeout_seconds: 30,
        }
    }
}

impl StorageConfig {
    /// In-memory database, single connection so every query sees the same db.
    pub fn in_memory() -> Self {
        Self {
            database_path: PathBuf::from(":memory:"),
            enable_wal: false,
            max_connections: 1,
            busy_timeout_seconds: 10,
        }
    }
}

/// Open the connection pool, apply PRAGMAs, and run embedded migrations.
pub async fn connect(config: &StorageConfig) -> StorageResult<SqlitePool> {
    // Ensure parent directory exists for on-disk databases
    if let Some(parent) = config.database_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(StorageError::Io)?;
        }
    }

    let database_url = format!("sqlite:{}", config.database_path.display());

    // Create database if it doesn't exist
    if !sqlx::Sqlite::database_exists(&database_url)
        .await
        .map_err(StorageError::Sqlx)?
    {
        debug!("Creating database at: {}", database_url);
        sqlx::Sqlite::create_database(&database_url)
            .await
            .map_err(StorageError::Sqlx)?;
    }

    // Configure connection pool
    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(std::time::Duration::from_secs(config.busy_timeout_seconds))
        .connect(&database_url)
        .await
        .map_err(StorageError::Sqlx)?;

    // Configure SQLite settings (after pool creation, before migrations)
    if config.enable_wal {
        sqlx::query("PRAGMA journal_mode = WAL")
            .execute(&pool)
            .await
            .map_err(StorageError::Sqlx)?;
    }

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await
        .map_err(StorageError::Sqlx)?;

    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&pool)
        .await
        .map_err(StorageError::Sqlx)?;

    info!("Database connection established");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(StorageError::Migration)?;

    debug!("Database migrations completed");

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_in_memory_runs_migrations() {
        let pool = connect(&StorageConfig::in_memory()).await.unwrap();

        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'tickets'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_connect_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            database_path: dir.path().join("guichet.db"),
            enable_wal: false,
            max_connections: 2,
            busy_timeout_seconds: 10,
        };

        let pool = connect(&config).await.unwrap();
        sqlx::query("SELECT 1").execute(&pool).await.unwrap();
        assert!(config.database_path.exists());
    }
}

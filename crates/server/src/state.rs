//! Application state for the sealdesk API

use anyhow::Result;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::config::AppConfig;
use crate::store::DocumentStore;

pub struct AppState {
    pub store: DocumentStore,
    pub config: AppConfig,
}

impl AppState {
    /// Connect to `config.database_url` and prepare storage
    pub async fn new(config: AppConfig) -> Result<Self> {
        tracing::info!("Connecting to database: {}", config.database_url);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&config.database_url)
            .await?;

        Self::with_pool(pool, config).await
    }

    /// Use an existing pool (migrations are applied)
    pub async fn with_pool(pool: SqlitePool, config: AppConfig) -> Result<Self> {
        Self::run_migrations(&pool).await?;
        tokio::fs::create_dir_all(&config.upload_dir).await?;

        Ok(Self {
            store: DocumentStore::new(pool, config.upload_dir.clone()),
            config,
        })
    }

    async fn run_migrations(pool: &SqlitePool) -> Result<()> {
        tracing::info!("Running database migrations...");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                original_url TEXT NOT NULL,
                signed_url TEXT,
                original_content BLOB,
                signed_content BLOB,
                status TEXT NOT NULL DEFAULT 'PENDING',
                deletion_requested BOOLEAN NOT NULL DEFAULT 0,
                is_deleted BOOLEAN NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_documents_original_url ON documents(original_url)
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_documents_signed_url ON documents(signed_url)
            "#,
        )
        .execute(pool)
        .await?;

        tracing::info!("Migrations complete");
        Ok(())
    }
}

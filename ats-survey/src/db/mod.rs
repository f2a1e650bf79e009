//! Database access for ats-survey
//!
//! One SQLite file in the data directory holds runtime settings and the
//! primary response store.

pub mod responses;
pub mod settings;

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use std::path::Path;

/// Open (or create) the service database and its tables
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // mode=rwc: read, write, create
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    init_tables(&pool).await?;

    Ok(pool)
}

/// Create the settings and survey_responses tables if missing
pub async fn init_tables(pool: &SqlitePool) -> ats_common::Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // One JSON document per participant, keyed by participant id
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS survey_responses (
            participant_id TEXT PRIMARY KEY,
            submitted_at TEXT NOT NULL,
            mother_tongue TEXT NOT NULL,
            document TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (settings, survey_responses)");

    Ok(())
}

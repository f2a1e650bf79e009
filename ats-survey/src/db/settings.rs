//! Settings database operations
//!
//! Key-value accessors for the `settings` table. Selection limits stored here
//! override the TOML values at startup and are rewritten by the settings API.

use ats_common::config::SelectionLimits;
use ats_common::{Error, Result};
use sqlx::{Pool, Sqlite};

const N_RANDOM_CLIPS_KEY: &str = "n_random_clips";
const M_LANGUAGE_CLIPS_KEY: &str = "m_language_clips";

/// Load selection limits, taking missing keys from `fallback`
pub async fn load_selection_limits(
    db: &Pool<Sqlite>,
    fallback: SelectionLimits,
) -> Result<SelectionLimits> {
    let n_random_clips = get_setting::<i64>(db, N_RANDOM_CLIPS_KEY)
        .await?
        .unwrap_or(fallback.n_random_clips);
    let m_language_clips = get_setting::<i64>(db, M_LANGUAGE_CLIPS_KEY)
        .await?
        .unwrap_or(fallback.m_language_clips);

    Ok(SelectionLimits {
        n_random_clips,
        m_language_clips,
    })
}

/// Persist both selection limits in one transaction
pub async fn save_selection_limits(db: &Pool<Sqlite>, limits: SelectionLimits) -> Result<()> {
    let mut tx = db.begin().await?;
    for (key, value) in [
        (N_RANDOM_CLIPS_KEY, limits.n_random_clips),
        (M_LANGUAGE_CLIPS_KEY, limits.m_language_clips),
    ] {
        sqlx::query(
            "INSERT INTO settings (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value.to_string())
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}

/// Generic setting getter (internal)
async fn get_setting<T>(db: &Pool<Sqlite>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let row: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await?;

    row.map(|(value,)| {
        value
            .parse::<T>()
            .map_err(|e| Error::Config(format!("Parse setting '{}' failed: {}", key, e)))
    })
    .transpose()
}

//! Primary response store
//!
//! Each completed participant is one JSON document in `survey_responses`,
//! keyed by participant id. Rows are only ever inserted.

use ats_common::{Error, Result};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::SurveyResponse;

/// Insert one response document
///
/// A participant id that is already stored yields [`Error::Conflict`].
pub async fn insert_response(pool: &SqlitePool, response: &SurveyResponse) -> Result<()> {
    // Serialize before touching the database
    let document = serde_json::to_string(response)?;

    sqlx::query(
        r#"
        INSERT INTO survey_responses (participant_id, submitted_at, mother_tongue, document)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(response.participant_id.to_string())
    .bind(response.timestamp.to_rfc3339())
    .bind(&response.mother_tongue)
    .bind(&document)
    .execute(pool)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => Error::Conflict(
            format!("response for participant {} already stored", response.participant_id),
        ),
        other => Error::Database(other),
    })?;

    Ok(())
}

/// True if a response for `participant_id` is stored
pub async fn response_exists(pool: &SqlitePool, participant_id: Uuid) -> Result<bool> {
    let found: Option<i64> =
        sqlx::query_scalar("SELECT 1 FROM survey_responses WHERE participant_id = ?")
            .bind(participant_id.to_string())
            .fetch_optional(pool)
            .await?;
    Ok(found.is_some())
}

/// Load one response document
pub async fn load_response(pool: &SqlitePool, participant_id: Uuid) -> Result<Option<SurveyResponse>> {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT document FROM survey_responses WHERE participant_id = ?")
            .bind(participant_id.to_string())
            .fetch_optional(pool)
            .await?;

    match row {
        Some((document,)) => Ok(Some(serde_json::from_str(&document)?)),
        None => Ok(None),
    }
}

pub async fn count_responses(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM survey_responses")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::collections::BTreeMap;

    async fn test_db() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::db::init_tables(&pool).await.unwrap();
        pool
    }

    fn response() -> SurveyResponse {
        SurveyResponse {
            participant_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            age: 27,
            mother_tongue: "Tamil".to_string(),
            n_general_clips: 2,
            n_language_clips: 1,
            audio_responses: BTreeMap::new(),
            feature_rankings: BTreeMap::new(),
            followup_responses: BTreeMap::new(),
            clip_sources: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn test_second_insert_for_participant_is_conflict() {
        let db = test_db().await;
        let record = response();

        insert_response(&db, &record).await.unwrap();
        let again = insert_response(&db, &record).await;

        assert!(matches!(again, Err(Error::Conflict(_))));
        assert_eq!(count_responses(&db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_response_exists() {
        let db = test_db().await;
        let record = response();

        assert!(!response_exists(&db, record.participant_id).await.unwrap());
        insert_response(&db, &record).await.unwrap();
        assert!(response_exists(&db, record.participant_id).await.unwrap());
    }
}

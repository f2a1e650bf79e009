//! Response persistence with local fallback
//!
//! Responses go to the primary document store (SQLite `survey_responses`).
//! When the primary is disabled or a write fails, the record is appended to a
//! JSON Lines file instead and the caller gets a notice. A save fails if both
//! targets fail, or with [`Error::Conflict`] if the participant already has a
//! stored response in either target.

use ats_common::{Error, Result};
use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::db;
use crate::models::SurveyResponse;

/// Where a response ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageTarget {
    Primary,
    LocalFallback,
}

/// Outcome of a successful save
#[derive(Debug, Clone, Serialize)]
pub struct SaveReceipt {
    pub storage: StorageTarget,
    /// Non-blocking notice for the participant when the fallback was used
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

/// Append-only JSON Lines file
///
/// Appends are serialized through one async mutex so concurrent records never
/// interleave.
#[derive(Clone)]
pub struct LocalFileStore {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl LocalFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn append(&self, response: &SurveyResponse) -> Result<()> {
        let mut line = serde_json::to_string(response)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        Ok(())
    }

    /// All records in the file; empty if it does not exist yet
    pub async fn load_all(&self) -> Result<Vec<SurveyResponse>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::Io(e)),
        };

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(Error::from))
            .collect()
    }

    pub async fn count(&self) -> Result<usize> {
        Ok(self.load_all().await?.len())
    }

    pub async fn contains(&self, participant_id: Uuid) -> Result<bool> {
        Ok(self
            .load_all()
            .await?
            .iter()
            .any(|r| r.participant_id == participant_id))
    }
}

/// Primary store with local fallback
#[derive(Clone)]
pub struct ResponseSink {
    primary: Option<SqlitePool>,
    fallback: LocalFileStore,
}

impl ResponseSink {
    /// `primary = None` sends everything to the fallback file
    pub fn new(primary: Option<SqlitePool>, fallback: LocalFileStore) -> Self {
        Self { primary, fallback }
    }

    pub fn fallback(&self) -> &LocalFileStore {
        &self.fallback
    }

    /// True if either target already holds a response for the participant
    ///
    /// An unreachable primary is logged and only the fallback is consulted.
    pub async fn is_recorded(&self, participant_id: Uuid) -> Result<bool> {
        if let Some(db) = &self.primary {
            match db::responses::response_exists(db, participant_id).await {
                Ok(true) => return Ok(true),
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(
                        participant_id = %participant_id,
                        error = %e,
                        "Primary store lookup failed, checking local fallback only"
                    );
                }
            }
        }
        self.fallback.contains(participant_id).await
    }

    pub async fn save(&self, response: &SurveyResponse) -> Result<SaveReceipt> {
        if self.fallback.contains(response.participant_id).await? {
            return Err(already_stored(response.participant_id));
        }

        if let Some(db) = &self.primary {
            match db::responses::insert_response(db, response).await {
                Ok(()) => {
                    tracing::info!(
                        participant_id = %response.participant_id,
                        "Response saved to primary store"
                    );
                    return Ok(SaveReceipt {
                        storage: StorageTarget::Primary,
                        notice: None,
                    });
                }
                Err(Error::Conflict(_)) => {
                    tracing::warn!(
                        participant_id = %response.participant_id,
                        "Duplicate response rejected"
                    );
                    return Err(already_stored(response.participant_id));
                }
                Err(e) => {
                    tracing::warn!(
                        participant_id = %response.participant_id,
                        error = %e,
                        "Primary store write failed, falling back to local file"
                    );
                }
            }
        }

        self.fallback.append(response).await.map_err(|e| {
            tracing::error!(
                participant_id = %response.participant_id,
                path = %self.fallback.path().display(),
                error = %e,
                "Local fallback write failed"
            );
            e
        })?;

        tracing::info!(
            participant_id = %response.participant_id,
            path = %self.fallback.path().display(),
            "Response saved to local fallback"
        );

        Ok(SaveReceipt {
            storage: StorageTarget::LocalFallback,
            notice: Some(
                "Your response was saved locally; the primary store is unavailable.".to_string(),
            ),
        })
    }

    /// Response counts as (primary, fallback)
    pub async fn counts(&self) -> Result<(i64, usize)> {
        let primary = match &self.primary {
            Some(db) => db::responses::count_responses(db).await?,
            None => 0,
        };
        let fallback = self.fallback.count().await?;
        Ok((primary, fallback))
    }
}

fn already_stored(participant_id: Uuid) -> Error {
    Error::Conflict(format!(
        "Participant {} already completed the survey",
        participant_id
    ))
}

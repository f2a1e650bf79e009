//! Participant session store
//!
//! Holds each participant's assignment from demographic submission until the
//! response is saved. An assignment is created at most once per participant
//! id; later lookups return the stored one. Whether a participant already
//! finished is answered by the response store, not here.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::clip_selector::ClipAssignment;
use crate::models::Demographics;

/// Session store errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    /// No active session for the participant
    #[error("No active session for participant {0}")]
    NotFound(Uuid),
}

/// One participant's live session
#[derive(Debug)]
pub struct ParticipantSession {
    pub participant_id: Uuid,
    pub demographics: Demographics,
    pub assignment: Arc<ClipAssignment>,
    pub created_at: DateTime<Utc>,
}


/// Shared, cloneable handle to all sessions
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<Uuid, Arc<ParticipantSession>>>>,
    ttl: Duration,
}

impl SessionStore {
    /// Sessions older than `ttl` are dropped by [`purge_expired`](Self::purge_expired)
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Return the participant's session, creating it with `assign` if absent
    ///
    /// `assign` runs at most once per participant id. The boolean is true when
    /// a new session was created.
    pub async fn get_or_assign<F>(
        &self,
        participant_id: Uuid,
        demographics: Demographics,
        assign: F,
    ) -> (Arc<ParticipantSession>, bool)
    where
        F: FnOnce() -> ClipAssignment,
    {
        let mut sessions = self.inner.write().await;

        if let Some(existing) = sessions.get(&participant_id) {
            return (Arc::clone(existing), false);
        }

        let session = Arc::new(ParticipantSession {
            participant_id,
            demographics,
            assignment: Arc::new(assign()),
            created_at: Utc::now(),
        });
        sessions.insert(participant_id, Arc::clone(&session));

        (session, true)
    }

    pub async fn get(&self, participant_id: Uuid) -> Option<Arc<ParticipantSession>> {
        self.inner.read().await.get(&participant_id).cloned()
    }

    /// Remove the session so exactly one submission can proceed
    ///
    /// A successful submission never puts it back; the session is over.
    pub async fn take(&self, participant_id: Uuid) -> Result<Arc<ParticipantSession>, SessionError> {
        self.inner
            .write()
            .await
            .remove(&participant_id)
            .ok_or(SessionError::NotFound(participant_id))
    }

    /// Put a taken session back after a failed submission
    pub async fn restore(&self, session: Arc<ParticipantSession>) {
        let mut sessions = self.inner.write().await;
        sessions.insert(session.participant_id, session);
    }

    /// Drop sessions created more than the TTL before `now`
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let cutoff = now - self.ttl;
        let mut sessions = self.inner.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.created_at >= cutoff);
        let purged = before - sessions.len();
        if purged > 0 {
            tracing::info!(purged, "Expired participant sessions purged");
        }
        purged
    }

    pub async fn active_count(&self) -> usize {
        self.inner.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::clip_selector::ClipSelector;
    use crate::services::pool_scanner::{AudioFile, GENERAL_GROUP};
    use ats_common::config::SelectionLimits;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn demographics() -> Demographics {
        Demographics {
            age: 30,
            mother_tongue: "English".to_string(),
        }
    }

    fn assignment(seed: u64) -> ClipAssignment {
        let pool: Vec<_> = ["a.mp3", "b.mp3", "c.mp3", "d.mp3"]
            .iter()
            .map(|n| AudioFile::new(PathBuf::from(n), GENERAL_GROUP, "_spedup").unwrap())
            .collect();
        ClipSelector::default().assign(
            "English",
            &pool,
            &BTreeMap::new(),
            SelectionLimits {
                n_random_clips: 2,
                m_language_clips: 0,
            },
            &mut StdRng::seed_from_u64(seed),
        )
    }

    #[tokio::test]
    async fn test_assignment_created_once() {
        let store = SessionStore::new(Duration::hours(1));
        let id = Uuid::new_v4();
        let calls = AtomicUsize::new(0);

        let (first, created) = store
            .get_or_assign(id, demographics(), || {
                calls.fetch_add(1, Ordering::SeqCst);
                assignment(1)
            })
            .await;
        assert!(created);

        let (second, created) = store
            .get_or_assign(id, demographics(), || {
                calls.fetch_add(1, Ordering::SeqCst);
                assignment(2)
            })
            .await;
        assert!(!created);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.assignment, second.assignment);
    }

    #[tokio::test]
    async fn test_take_and_restore() {
        let store = SessionStore::new(Duration::hours(1));
        let id = Uuid::new_v4();
        store
            .get_or_assign(id, demographics(), || assignment(3))
            .await;

        let session = store.take(id).await.unwrap();
        assert_eq!(store.take(id).await.unwrap_err(), SessionError::NotFound(id));

        store.restore(session).await;
        assert!(store.get(id).await.is_some());
    }

    #[tokio::test]
    async fn test_finished_sessions_hold_no_memory() {
        let store = SessionStore::new(Duration::hours(1));
        for seed in 0..50 {
            let id = Uuid::new_v4();
            store
                .get_or_assign(id, demographics(), || assignment(seed))
                .await;
            store.take(id).await.unwrap();
        }

        assert_eq!(store.active_count().await, 0);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let store = SessionStore::new(Duration::hours(2));
        store
            .get_or_assign(Uuid::new_v4(), demographics(), || assignment(5))
            .await;

        assert_eq!(store.purge_expired(Utc::now()).await, 0);
        assert_eq!(store.active_count().await, 1);

        let later = Utc::now() + Duration::hours(3);
        assert_eq!(store.purge_expired(later).await, 1);
        assert_eq!(store.active_count().await, 0);
    }
}

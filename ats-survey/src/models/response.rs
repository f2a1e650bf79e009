//! Survey response submission and the persisted response record
//!
//! All per-clip answers are keyed by display label ("Audio Clip 3"). The
//! only place file identity appears is `clip_sources`, which stays server-side.

use ats_common::questions::{is_complete_ranking, is_valid_likert, LinguisticFeature};
use ats_common::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::services::session_store::ParticipantSession;
use crate::services::ClipPool;

/// Likert answers for one clip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipRating {
    pub naturalness: u8,
    pub trustworthiness: u8,
}

/// Body of `POST /api/participants/:id/responses`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseSubmission {
    /// Required for every assigned clip
    pub audio_responses: BTreeMap<String, ClipRating>,
    /// Optional per clip; when present must rank every feature once
    #[serde(default)]
    pub feature_rankings: BTreeMap<String, Vec<LinguisticFeature>>,
    /// Optional per clip: question id -> answer
    #[serde(default)]
    pub followup_responses: BTreeMap<String, BTreeMap<String, String>>,
}

/// One completed participant, as written to the persistence sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyResponse {
    pub participant_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub age: u8,
    pub mother_tongue: String,
    pub n_general_clips: usize,
    pub n_language_clips: usize,
    pub audio_responses: BTreeMap<String, ClipRating>,
    pub feature_rankings: BTreeMap<String, Vec<LinguisticFeature>>,
    pub followup_responses: BTreeMap<String, BTreeMap<String, String>>,
    /// Display label -> pool-relative path
    pub clip_sources: BTreeMap<String, String>,
}

impl SurveyResponse {
    /// Validate a submission against the session's assignment and build the record
    pub fn from_submission(
        session: &ParticipantSession,
        submission: ResponseSubmission,
        pool: &ClipPool,
        timestamp: DateTime<Utc>,
    ) -> Result<Self> {
        let assignment = &session.assignment;

        let unknown = submission
            .audio_responses
            .keys()
            .chain(submission.feature_rankings.keys())
            .chain(submission.followup_responses.keys())
            .find(|label| assignment.by_label(label).is_none());
        if let Some(label) = unknown {
            return Err(Error::InvalidInput(format!(
                "'{}' is not one of the participant's clips",
                label
            )));
        }

        for clip in assignment.clips() {
            let rating = submission.audio_responses.get(&clip.label).ok_or_else(|| {
                Error::InvalidInput(format!("missing ratings for '{}'", clip.label))
            })?;
            if !is_valid_likert(rating.naturalness) || !is_valid_likert(rating.trustworthiness) {
                return Err(Error::InvalidInput(format!(
                    "ratings for '{}' must be between 1 and 5",
                    clip.label
                )));
            }
        }

        if let Some((label, _)) = submission
            .feature_rankings
            .iter()
            .find(|(_, ranking)| !is_complete_ranking(ranking))
        {
            return Err(Error::InvalidInput(format!(
                "ranking for '{}' must order every feature exactly once",
                label
            )));
        }

        let clip_sources = assignment
            .clips()
            .iter()
            .map(|clip| (clip.label.clone(), pool.relative_path(&clip.file)))
            .collect();

        Ok(Self {
            participant_id: session.participant_id,
            timestamp,
            age: session.demographics.age,
            mother_tongue: session.demographics.mother_tongue.clone(),
            n_general_clips: assignment.n_general(),
            n_language_clips: assignment.n_language(),
            audio_responses: submission.audio_responses,
            feature_rankings: submission.feature_rankings,
            followup_responses: submission.followup_responses,
            clip_sources,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Demographics;
    use crate::services::clip_selector::ClipSelector;
    use crate::services::pool_scanner::{AudioFile, GENERAL_GROUP};
    use ats_common::config::SelectionLimits;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn session() -> (ParticipantSession, ClipPool) {
        let pool = ClipPool::empty("/srv/audio");
        let files: Vec<_> = ["a.mp3", "b.mp3"]
            .iter()
            .map(|n| {
                AudioFile::new(PathBuf::from("/srv/audio").join(n), GENERAL_GROUP, "_spedup")
                    .unwrap()
            })
            .collect();
        let assignment = ClipSelector::default().assign(
            "English",
            &files,
            &BTreeMap::new(),
            SelectionLimits {
                n_random_clips: 2,
                m_language_clips: 0,
            },
            &mut StdRng::seed_from_u64(1),
        );

        let session = ParticipantSession {
            participant_id: Uuid::new_v4(),
            demographics: Demographics {
                age: 40,
                mother_tongue: "English".to_string(),
            },
            assignment: Arc::new(assignment),
            created_at: Utc::now(),
        };
        (session, pool)
    }

    fn rating(n: u8, t: u8) -> ClipRating {
        ClipRating {
            naturalness: n,
            trustworthiness: t,
        }
    }

    fn full_submission() -> ResponseSubmission {
        let mut submission = ResponseSubmission::default();
        submission
            .audio_responses
            .insert("Audio Clip 1".to_string(), rating(4, 5));
        submission
            .audio_responses
            .insert("Audio Clip 2".to_string(), rating(2, 3));
        submission
            .feature_rankings
            .insert("Audio Clip 1".to_string(), LinguisticFeature::ALL.to_vec());
        submission
    }

    #[test]
    fn test_builds_record_keyed_by_label() {
        let (session, pool) = session();
        let record =
            SurveyResponse::from_submission(&session, full_submission(), &pool, Utc::now())
                .unwrap();

        assert_eq!(record.participant_id, session.participant_id);
        assert_eq!(record.n_general_clips, 2);
        assert_eq!(record.n_language_clips, 0);
        assert_eq!(record.audio_responses.len(), 2);

        let mut sources: Vec<_> = record.clip_sources.values().cloned().collect();
        sources.sort();
        assert_eq!(sources, vec!["a.mp3", "b.mp3"]);
        assert!(record.clip_sources.contains_key("Audio Clip 1"));
    }

    #[test]
    fn test_rejects_missing_rating() {
        let (session, pool) = session();
        let mut submission = full_submission();
        submission.audio_responses.remove("Audio Clip 2");

        let result = SurveyResponse::from_submission(&session, submission, &pool, Utc::now());
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_rejects_unknown_label() {
        let (session, pool) = session();
        let mut submission = full_submission();
        submission
            .followup_responses
            .insert("a.mp3".to_string(), BTreeMap::new());

        let result = SurveyResponse::from_submission(&session, submission, &pool, Utc::now());
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_rejects_out_of_range_rating() {
        let (session, pool) = session();
        let mut submission = full_submission();
        submission
            .audio_responses
            .insert("Audio Clip 1".to_string(), rating(6, 1));

        let result = SurveyResponse::from_submission(&session, submission, &pool, Utc::now());
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_partial_ranking() {
        let (session, pool) = session();
        let mut submission = full_submission();
        submission.feature_rankings.insert(
            "Audio Clip 2".to_string(),
            vec![LinguisticFeature::Tone, LinguisticFeature::Stress],
        );

        let result = SurveyResponse::from_submission(&session, submission, &pool, Utc::now());
        assert!(result.is_err());
    }
}

//! Participant flow: demographics, clip assignment, audio, responses
//!
//! Participants only ever see clip positions and display labels. File paths
//! and pool groups never leave the server.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{Demographics, ResponseSubmission, SurveyResponse};
use crate::services::session_store::ParticipantSession;
use crate::services::{ClipAssignment, StorageTarget};
use crate::{ApiError, ApiResult, AppState};

/// Body of `POST /api/participants`
#[derive(Debug, Deserialize)]
pub struct CreateParticipantRequest {
    pub age: i64,
    pub mother_tongue: String,
    /// Resume an existing session; a new id is generated when absent
    #[serde(default)]
    pub participant_id: Option<Uuid>,
}

/// One clip as shown to the participant
#[derive(Debug, Serialize)]
pub struct ClipView {
    pub index: usize,
    pub label: String,
}

/// A participant's assignment, without file identity
#[derive(Debug, Serialize)]
pub struct AssignmentView {
    pub participant_id: Uuid,
    pub clips: Vec<ClipView>,
    pub n_general_clips: usize,
    pub n_language_clips: usize,
}

impl AssignmentView {
    fn new(participant_id: Uuid, assignment: &ClipAssignment) -> Self {
        Self {
            participant_id,
            clips: assignment
                .clips()
                .iter()
                .map(|clip| ClipView {
                    index: clip.index,
                    label: clip.label.clone(),
                })
                .collect(),
            n_general_clips: assignment.n_general(),
            n_language_clips: assignment.n_language(),
        }
    }
}

/// Outcome of `POST /api/participants/:id/responses`
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub participant_id: Uuid,
    pub storage: StorageTarget,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

/// Response counts across both stores
#[derive(Debug, Serialize)]
pub struct ResponseCount {
    pub primary: i64,
    pub local_fallback: usize,
    pub total: i64,
}

/// POST /api/participants
///
/// Validates demographics and draws the participant's clips. Repeating the
/// call with the same `participant_id` returns the stored assignment.
///
/// **Errors:**
/// - 400 Bad Request: age outside 13..=100 or empty mother tongue
/// - 409 Conflict: participant already submitted
pub async fn create_participant(
    State(state): State<AppState>,
    Json(request): Json<CreateParticipantRequest>,
) -> ApiResult<(StatusCode, Json<AssignmentView>)> {
    let age = u8::try_from(request.age).map_err(|_| {
        ApiError::BadRequest(format!("age must be between 13 and 100, got {}", request.age))
    })?;
    let demographics = Demographics {
        age,
        mother_tongue: request.mother_tongue.trim().to_string(),
    };
    demographics.validate()?;

    state.sessions.purge_expired(Utc::now()).await;

    let participant_id = match request.participant_id {
        Some(id) => {
            ensure_not_recorded(&state, id).await?;
            id
        }
        None => Uuid::new_v4(),
    };
    let pool = state.pool_snapshot().await;
    let limits = *state.limits.read().await;
    let selector = state.selector;
    let mother_tongue = demographics.mother_tongue.clone();

    let (session, created) = state
        .sessions
        .get_or_assign(participant_id, demographics, move || {
            let mut rng = rand::thread_rng();
            selector.assign_from_pool(&mother_tongue, &pool, limits, &mut rng)
        })
        .await;

    let assignment = &session.assignment;
    if created {
        info!(
            participant_id = %participant_id,
            n_general = assignment.n_general(),
            n_language = assignment.n_language(),
            matched_language = assignment.matched_language().unwrap_or("-"),
            "Clips assigned"
        );
    } else {
        debug!(participant_id = %participant_id, "Returning existing assignment");
    }

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(AssignmentView::new(participant_id, assignment))))
}

/// GET /api/participants/:id/clips
pub async fn get_clips(
    State(state): State<AppState>,
    Path(participant_id): Path<Uuid>,
) -> ApiResult<Json<AssignmentView>> {
    let session = active_session(&state, participant_id).await?;
    Ok(Json(AssignmentView::new(participant_id, &session.assignment)))
}

/// GET /api/participants/:id/clips/:index/audio
///
/// Streams the audio bytes for one position of the assignment.
pub async fn get_clip_audio(
    State(state): State<AppState>,
    Path((participant_id, index)): Path<(Uuid, usize)>,
) -> ApiResult<Response> {
    let session = active_session(&state, participant_id).await?;
    let clip = session.assignment.clip(index).ok_or_else(|| {
        ApiError::NotFound(format!(
            "Clip {} (participant has {} clips)",
            index,
            session.assignment.len()
        ))
    })?;

    let bytes = tokio::fs::read(&clip.file.path).await.map_err(|e| {
        ApiError::Internal(format!("Failed to read audio for clip {}: {}", index, e))
    })?;

    Ok((
        [(header::CONTENT_TYPE, clip.file.content_type())],
        Body::from(bytes),
    )
        .into_response())
}

/// POST /api/participants/:id/responses
///
/// Accepts exactly one submission per participant. A failed submission
/// leaves the session in place so the participant can retry.
///
/// **Errors:**
/// - 400 Bad Request: unknown label, missing or out-of-range rating
/// - 404 Not Found: no active session
/// - 409 Conflict: already submitted
/// - 500 Internal Server Error: both stores failed
pub async fn submit_responses(
    State(state): State<AppState>,
    Path(participant_id): Path<Uuid>,
    Json(submission): Json<ResponseSubmission>,
) -> ApiResult<Json<SubmitResponse>> {
    let session = match state.sessions.take(participant_id).await {
        Ok(session) => session,
        Err(e) => {
            ensure_not_recorded(&state, participant_id).await?;
            return Err(e.into());
        }
    };

    match save_submission(&state, &session, submission).await {
        Ok(receipt) => Ok(Json(SubmitResponse {
            participant_id,
            storage: receipt.storage,
            notice: receipt.notice,
        })),
        // Already stored elsewhere; the session is over
        Err(e @ ApiError::Common(ats_common::Error::Conflict(_))) => Err(e),
        Err(e) => {
            state.sessions.restore(session).await;
            Err(e)
        }
    }
}

/// GET /api/responses/count
pub async fn count_responses(State(state): State<AppState>) -> ApiResult<Json<ResponseCount>> {
    let (primary, local_fallback) = state.sink.counts().await?;
    Ok(Json(ResponseCount {
        primary,
        local_fallback,
        total: primary + local_fallback as i64,
    }))
}

async fn active_session(
    state: &AppState,
    participant_id: Uuid,
) -> ApiResult<std::sync::Arc<ParticipantSession>> {
    state
        .sessions
        .get(participant_id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Participant {}", participant_id)))
}

/// 409 if the participant already has a stored response
async fn ensure_not_recorded(state: &AppState, participant_id: Uuid) -> ApiResult<()> {
    if state.sink.is_recorded(participant_id).await? {
        return Err(ApiError::Conflict(format!(
            "Participant {} already completed the survey",
            participant_id
        )));
    }
    Ok(())
}

async fn save_submission(
    state: &AppState,
    session: &ParticipantSession,
    submission: ResponseSubmission,
) -> ApiResult<crate::services::SaveReceipt> {
    let pool = state.pool_snapshot().await;
    let response = SurveyResponse::from_submission(session, submission, &pool, Utc::now())?;
    Ok(state.sink.save(&response).await?)
}

/// Build participant routes
pub fn participant_routes() -> Router<AppState> {
    Router::new()
        .route("/api/participants", post(create_participant))
        .route("/api/participants/:id/clips", get(get_clips))
        .route("/api/participants/:id/clips/:index/audio", get(get_clip_audio))
        .route("/api/participants/:id/responses", post(submit_responses))
        .route("/api/responses/count", get(count_responses))
}

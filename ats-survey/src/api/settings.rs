//! Selection limit settings
//!
//! Limits live in the database and override the TOML values at startup.
//! A change applies to the next assignment; existing sessions keep theirs.

use ats_common::config::SelectionLimits;
use axum::{extract::State, routing::get, Json, Router};
use tracing::info;

use crate::{ApiError, ApiResult, AppState};

/// Largest accepted limit; anything above is almost certainly a typo
const MAX_LIMIT: i64 = 1000;

/// GET /api/settings/limits
pub async fn get_limits(State(state): State<AppState>) -> Json<SelectionLimits> {
    Json(*state.limits.read().await)
}

/// PUT /api/settings/limits
///
/// **Request:** `{"n_random_clips": 5, "m_language_clips": 2}`
///
/// Zero or negative values are accepted and mean "no clips from that pool".
pub async fn put_limits(
    State(state): State<AppState>,
    Json(limits): Json<SelectionLimits>,
) -> ApiResult<Json<SelectionLimits>> {
    if limits.n_random_clips > MAX_LIMIT || limits.m_language_clips > MAX_LIMIT {
        return Err(ApiError::BadRequest(format!(
            "limits must not exceed {}",
            MAX_LIMIT
        )));
    }

    crate::db::settings::save_selection_limits(&state.db, limits).await?;
    *state.limits.write().await = limits;

    info!(
        n_random_clips = limits.n_random_clips,
        m_language_clips = limits.m_language_clips,
        "Selection limits updated"
    );

    Ok(Json(limits))
}

/// Build settings routes
pub fn settings_routes() -> Router<AppState> {
    Router::new().route("/api/settings/limits", get(get_limits).put(put_limits))
}

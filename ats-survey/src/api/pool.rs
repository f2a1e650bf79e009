//! Audio pool inspection and rescan

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tracing::info;

use crate::services::pool_scanner::PoolSummary;
use crate::{ApiError, ApiResult, AppState};

/// GET /api/pool
///
/// File counts per group; filenames are never listed.
pub async fn get_pool(State(state): State<AppState>) -> Json<PoolSummary> {
    Json(state.pool_snapshot().await.summary())
}

/// POST /api/pool/rescan
///
/// Rescans the current root and swaps in the new snapshot. Sessions keep the
/// assignment they already have. A failed scan leaves the old snapshot active.
pub async fn rescan_pool(State(state): State<AppState>) -> ApiResult<Json<PoolSummary>> {
    let root = state.pool_snapshot().await.root().to_path_buf();
    let scanner = state.scanner.clone();

    let pool = tokio::task::spawn_blocking(move || scanner.scan(&root))
        .await
        .map_err(|e| ApiError::Internal(format!("Pool scan task failed: {}", e)))??;

    let summary = pool.summary();
    *state.pool.write().await = Arc::new(pool);

    info!(
        general = summary.general_files,
        languages = summary.languages.len(),
        total = summary.total_files,
        "Audio pool rescanned"
    );

    Ok(Json(summary))
}

/// Build pool routes
pub fn pool_routes() -> Router<AppState> {
    Router::new()
        .route("/api/pool", get(get_pool))
        .route("/api/pool/rescan", post(rescan_pool))
}

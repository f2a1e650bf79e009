//! ats-survey library interface
//!
//! Participant-facing survey service: assigns each participant a randomized
//! set of audio clips, serves them by position, and persists ratings.

pub mod api;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use ats_common::config::{SelectionLimits, SurveyConfig};
use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::services::response_sink::LocalFileStore;
use crate::services::{ClipPool, ClipSelector, PoolScanner, ResponseSink, SessionStore};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Settings and primary response store
    pub db: SqlitePool,
    /// Current pool snapshot; replaced wholesale on rescan
    pub pool: Arc<RwLock<Arc<ClipPool>>>,
    pub scanner: PoolScanner,
    pub selector: ClipSelector,
    /// Applied to the next assignment only
    pub limits: Arc<RwLock<SelectionLimits>>,
    pub sessions: SessionStore,
    pub sink: ResponseSink,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// Assemble state from resolved configuration and an initial pool scan
    pub fn new(
        db: SqlitePool,
        config: &SurveyConfig,
        pool: ClipPool,
        limits: SelectionLimits,
    ) -> Self {
        let primary = config.primary_store_enabled.then(|| db.clone());
        // Capped at a year
        let ttl_hours = config.session_ttl_hours.min(24 * 365) as i64;

        Self {
            db,
            pool: Arc::new(RwLock::new(Arc::new(pool))),
            scanner: PoolScanner::new(config.speed_variant_marker.clone()),
            selector: ClipSelector::new(config.title_strategy),
            limits: Arc::new(RwLock::new(limits)),
            sessions: SessionStore::new(chrono::Duration::hours(ttl_hours)),
            sink: ResponseSink::new(primary, LocalFileStore::new(config.fallback_path())),
            startup_time: Utc::now(),
        }
    }

    /// Current pool snapshot
    pub async fn pool_snapshot(&self) -> Arc<ClipPool> {
        Arc::clone(&*self.pool.read().await)
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::participant_routes())
        .merge(api::pool_routes())
        .merge(api::settings_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        // Survey pages may be served from another origin
        .layer(CorsLayer::permissive())
        .with_state(state)
}

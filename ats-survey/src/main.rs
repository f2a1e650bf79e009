//! ats-survey - audio trustworthiness survey service
//!
//! Scans the audio pool, assigns each participant a randomized set of clips
//! and collects their ratings over HTTP.

use anyhow::{Context, Result};
use ats_common::config::{default_config_path, load_toml_config, ConfigOverrides, SurveyConfig};
use ats_survey::services::PoolScanner;
use ats_survey::{build_router, db, AppState};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Command line arguments; each may also come from the environment
#[derive(Debug, Parser)]
#[command(name = "ats-survey", version, about = "Audio trustworthiness survey service")]
struct Args {
    /// TOML config file (default: ~/.config/ats/config.toml, then /etc/ats/config.toml)
    #[arg(long, env = "ATS_CONFIG")]
    config: Option<PathBuf>,

    /// Audio pool root (general clips, plus one subfolder per language)
    #[arg(long, env = "ATS_AUDIO_ROOT")]
    audio_root: Option<PathBuf>,

    /// Directory for the database and the local fallback file
    #[arg(long, env = "ATS_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// HTTP port
    #[arg(long, env = "ATS_PORT")]
    port: Option<u16>,

    /// Bind address
    #[arg(long, env = "ATS_BIND")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config is needed before tracing for the log level
    let config_path = args.config.clone();
    let toml_config = load_toml_config(config_path.as_deref())?;
    let overrides = ConfigOverrides {
        audio_root: args.audio_root,
        data_dir: args.data_dir,
        bind: args.bind,
        port: args.port,
    };
    let config = SurveyConfig::resolve(&overrides, &toml_config);

    // RUST_LOG wins over the configured level
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    info!(
        "Starting ats-survey v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    match loaded_config_path(config_path.as_deref()) {
        Some(path) => info!("Config file: {}", path.display()),
        None => warn!("No config file found, using compiled defaults"),
    }

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(e.into());
    }
    config.ensure_data_dir()?;
    info!("Audio root: {}", config.audio_root.display());
    info!("Data directory: {}", config.data_dir.display());

    let db_path = config.database_path();
    let pool = db::init_database_pool(&db_path).await?;
    info!("Database: {}", db_path.display());

    let limits = db::settings::load_selection_limits(&pool, config.limits).await?;
    info!(
        n_random_clips = limits.n_random_clips,
        m_language_clips = limits.m_language_clips,
        "Selection limits loaded"
    );
    if !config.primary_store_enabled {
        warn!(
            "Primary response store disabled; responses go to {}",
            config.fallback_path().display()
        );
    }

    let scanner = PoolScanner::new(config.speed_variant_marker.clone());
    let clip_pool = match scanner.scan(&config.audio_root) {
        Ok(clip_pool) => clip_pool,
        Err(e) => {
            error!("Audio pool scan failed: {}", e);
            return Err(e).context("Cannot start without an audio pool");
        }
    };
    let summary = clip_pool.summary();
    info!(
        general = summary.general_files,
        languages = summary.languages.len(),
        total = summary.total_files,
        "Audio pool scanned"
    );
    if summary.total_files == 0 {
        warn!("Audio pool is empty; participants will be assigned no clips");
    }

    let state = AppState::new(pool, &config, clip_pool, limits);
    let app = build_router(state);

    let addr = format!("{}:{}", config.bind, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("ats-survey listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("ats-survey stopped");
    Ok(())
}

/// The TOML file that was loaded, if any
fn loaded_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    explicit.map(Path::to_path_buf).or_else(default_config_path)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

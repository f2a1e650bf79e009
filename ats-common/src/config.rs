//! Configuration loading and resolution
//!
//! Resolution priority (highest first):
//! 1. Command-line arguments / environment variables (collected by the binary
//!    into [`ConfigOverrides`])
//! 2. TOML config file
//! 3. Compiled defaults ([`CompiledDefaults`])
//!
//! Selection limits have one more tier above TOML: the `settings` table of the
//! service database. That tier is applied by the service at startup.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Default HTTP port for the survey service
pub const DEFAULT_PORT: u16 = 5780;

/// Database file name inside the data directory
pub const DATABASE_FILE_NAME: &str = "ats.db";

/// How participant-facing clip titles are generated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TitleStrategy {
    /// "Audio Clip 1", "Audio Clip 2", ...
    #[default]
    Sequential,
    /// Legacy titles built from the file stem. Reveals clip identity.
    FilenameDerived,
}

/// Upper bounds for a single participant's assignment
///
/// Values <= 0 mean "no clips from that pool".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionLimits {
    /// Clips drawn from the general pool (N_RANDOM_CLIPS)
    pub n_random_clips: i64,
    /// Clips drawn from the matching language pool (M_LANGUAGE_CLIPS)
    pub m_language_clips: i64,
}

impl Default for SelectionLimits {
    fn default() -> Self {
        Self {
            n_random_clips: 5,
            m_language_clips: 2,
        }
    }
}

/// `[survey]` section of the TOML file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurveySection {
    pub n_random_clips: Option<i64>,
    pub m_language_clips: Option<i64>,
    pub speed_variant_marker: Option<String>,
    pub title_strategy: Option<TitleStrategy>,
    pub session_ttl_hours: Option<u64>,
}

/// `[storage]` section of the TOML file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// Disable to send every response straight to the local fallback file
    pub primary_enabled: Option<bool>,
    /// File name of the JSON Lines fallback inside the data directory
    pub fallback_file: Option<String>,
}

/// `[logging]` section of the TOML file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// On-disk TOML configuration. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub audio_root: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub bind: Option<String>,
    pub port: Option<u16>,
    pub survey: SurveySection,
    pub storage: StorageSection,
    pub logging: LoggingConfig,
}

/// Values supplied on the command line or through environment variables
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub audio_root: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub bind: Option<String>,
    pub port: Option<u16>,
}

/// Compiled-in fallback values
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub audio_root: PathBuf,
    pub data_dir: PathBuf,
    pub bind: String,
    pub port: u16,
    pub limits: SelectionLimits,
    pub speed_variant_marker: String,
    pub title_strategy: TitleStrategy,
    pub session_ttl_hours: u64,
    pub primary_store_enabled: bool,
    pub fallback_file: String,
    pub log_level: String,
}

impl CompiledDefaults {
    /// Defaults for the platform we were compiled for
    pub fn for_current_platform() -> Self {
        let data_dir = dirs::data_local_dir()
            .map(|d| d.join("ats"))
            .unwrap_or_else(|| PathBuf::from("./ats_data"));

        Self {
            audio_root: PathBuf::from("./audio"),
            data_dir,
            bind: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            limits: SelectionLimits::default(),
            speed_variant_marker: "_spedup".to_string(),
            title_strategy: TitleStrategy::Sequential,
            session_ttl_hours: 24,
            primary_store_enabled: true,
            fallback_file: "survey_responses.jsonl".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct SurveyConfig {
    pub audio_root: PathBuf,
    pub data_dir: PathBuf,
    pub bind: String,
    pub port: u16,
    pub limits: SelectionLimits,
    pub speed_variant_marker: String,
    pub title_strategy: TitleStrategy,
    pub session_ttl_hours: u64,
    pub primary_store_enabled: bool,
    pub fallback_file: String,
    pub log_level: String,
}

impl SurveyConfig {
    /// Merge overrides, TOML values and compiled defaults
    pub fn resolve(overrides: &ConfigOverrides, toml: &TomlConfig) -> Self {
        let defaults = CompiledDefaults::for_current_platform();

        let limits = SelectionLimits {
            n_random_clips: toml
                .survey
                .n_random_clips
                .unwrap_or(defaults.limits.n_random_clips),
            m_language_clips: toml
                .survey
                .m_language_clips
                .unwrap_or(defaults.limits.m_language_clips),
        };

        Self {
            audio_root: overrides
                .audio_root
                .clone()
                .or_else(|| toml.audio_root.clone())
                .unwrap_or(defaults.audio_root),
            data_dir: overrides
                .data_dir
                .clone()
                .or_else(|| toml.data_dir.clone())
                .unwrap_or(defaults.data_dir),
            bind: overrides
                .bind
                .clone()
                .or_else(|| toml.bind.clone())
                .unwrap_or(defaults.bind),
            port: overrides.port.or(toml.port).unwrap_or(defaults.port),
            limits,
            speed_variant_marker: toml
                .survey
                .speed_variant_marker
                .clone()
                .unwrap_or(defaults.speed_variant_marker),
            title_strategy: toml
                .survey
                .title_strategy
                .unwrap_or(defaults.title_strategy),
            session_ttl_hours: toml
                .survey
                .session_ttl_hours
                .unwrap_or(defaults.session_ttl_hours),
            primary_store_enabled: toml
                .storage
                .primary_enabled
                .unwrap_or(defaults.primary_store_enabled),
            fallback_file: toml
                .storage
                .fallback_file
                .clone()
                .unwrap_or(defaults.fallback_file),
            log_level: toml.logging.level.clone(),
        }
    }

    /// Reject values the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.speed_variant_marker.is_empty() {
            return Err(Error::Config(
                "speed_variant_marker must not be empty".to_string(),
            ));
        }
        if self.fallback_file.trim().is_empty() {
            return Err(Error::Config("fallback_file must not be empty".to_string()));
        }
        if self.session_ttl_hours == 0 {
            return Err(Error::Config(
                "session_ttl_hours must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// SQLite database holding settings and the primary response store
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE_NAME)
    }

    /// JSON Lines file used when the primary store is unavailable
    pub fn fallback_path(&self) -> PathBuf {
        self.data_dir.join(&self.fallback_file)
    }

    /// Create the data directory if missing
    pub fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)?;
            info!("Created data directory: {}", self.data_dir.display());
        }
        Ok(())
    }
}

/// Default TOML location: `~/.config/ats/config.toml`, then `/etc/ats/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("ats").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    let system_config = PathBuf::from("/etc/ats/config.toml");
    if cfg!(unix) && system_config.exists() {
        return Some(system_config);
    }

    None
}

/// Load the TOML configuration
///
/// An explicitly requested file must exist and parse. Without an explicit
/// path, a missing default file yields defaults. The caller reports which
/// file was used.
pub fn load_toml_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            path.to_path_buf()
        }
        None => match default_config_path() {
            Some(path) => path,
            None => return Ok(TomlConfig::default()),
        },
    };

    let content = std::fs::read_to_string(&path)?;
    let config = toml::from_str::<TomlConfig>(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

    Ok(config)
}

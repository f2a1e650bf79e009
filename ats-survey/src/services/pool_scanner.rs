//! Audio pool discovery
//!
//! Layout of the pool root:
//!
//! ```text
//! audio/
//!   a.mp3            -> group "general"
//!   b_spedup.mp3     -> group "general", base_key "b", speed variant
//!   Spanish/
//!     c.wav          -> group "spanish"
//!     deeper/x.mp3   -> ignored (only one level of subfolders)
//! ```
//!
//! Only files with one of [`AUDIO_EXTENSIONS`] are kept. Hidden entries
//! (leading `.`) are skipped.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Group name of files placed directly in the pool root
pub const GENERAL_GROUP: &str = "general";

/// Recognized audio extensions (compared case-insensitively)
pub const AUDIO_EXTENSIONS: [&str; 4] = ["mp3", "wav", "ogg", "m4a"];

/// Pool scanner errors
///
/// All of these are configuration errors: the pool root itself is unusable.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Specified path does not exist
    #[error("Audio root not found: {0}")]
    PathNotFound(PathBuf),

    /// Path exists but is not a directory
    #[error("Audio root is not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Directory exists but cannot be listed
    #[error("Audio root unreadable {0}: {1}")]
    Unreadable(PathBuf, String),
}

/// One leaf file of the pool
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AudioFile {
    /// Location on disk
    pub path: PathBuf,
    /// "general" or the lowercased language subfolder name
    pub group: String,
    /// File stem with the speed-variant marker stripped
    pub base_key: String,
    /// True if the stem carried the speed-variant marker
    pub is_speed_variant: bool,
}

impl AudioFile {
    /// Classify `path` into `group`
    ///
    /// Returns None when the path has no usable UTF-8 stem.
    pub fn new(path: PathBuf, group: &str, speed_variant_marker: &str) -> Option<Self> {
        let stem = path.file_stem()?.to_str()?.to_string();

        let (base_key, is_speed_variant) = match stem.strip_suffix(speed_variant_marker) {
            Some(base) if !speed_variant_marker.is_empty() && !base.is_empty() => {
                (base.to_string(), true)
            }
            _ => (stem, false),
        };

        Some(Self {
            path,
            group: group.to_string(),
            base_key,
            is_speed_variant,
        })
    }

    /// Lowercased file extension
    pub fn extension(&self) -> String {
        self.path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default()
    }

    /// MIME type used when streaming the file
    pub fn content_type(&self) -> &'static str {
        match self.extension().as_str() {
            "mp3" => "audio/mpeg",
            "wav" => "audio/wav",
            "ogg" => "audio/ogg",
            "m4a" => "audio/mp4",
            _ => "application/octet-stream",
        }
    }
}

/// True if `path` has one of the recognized audio extensions
pub fn is_audio_path(path: &Path) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .map(|ext| AUDIO_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Per-group file counts (no filenames)
#[derive(Debug, Clone, Serialize)]
pub struct PoolSummary {
    pub general_files: usize,
    pub languages: BTreeMap<String, usize>,
    pub total_files: usize,
    pub scanned_at: DateTime<Utc>,
}

/// Read-only snapshot of the audio pool
#[derive(Debug, Clone)]
pub struct ClipPool {
    root: PathBuf,
    general: Vec<AudioFile>,
    languages: BTreeMap<String, Vec<AudioFile>>,
    scanned_at: DateTime<Utc>,
}

impl ClipPool {
    /// Pool with no files, rooted at `root`
    pub fn empty(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            general: Vec::new(),
            languages: BTreeMap::new(),
            scanned_at: Utc::now(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Files directly under the root
    pub fn general(&self) -> &[AudioFile] {
        &self.general
    }

    /// All language pools, keyed by lowercased subfolder name
    pub fn languages(&self) -> &BTreeMap<String, Vec<AudioFile>> {
        &self.languages
    }

    /// Files of one language pool; None if no such subfolder
    pub fn language(&self, key: &str) -> Option<&[AudioFile]> {
        self.languages.get(key).map(Vec::as_slice)
    }

    pub fn total_files(&self) -> usize {
        self.general.len() + self.languages.values().map(Vec::len).sum::<usize>()
    }

    pub fn summary(&self) -> PoolSummary {
        PoolSummary {
            general_files: self.general.len(),
            languages: self
                .languages
                .iter()
                .map(|(name, files)| (name.clone(), files.len()))
                .collect(),
            total_files: self.total_files(),
            scanned_at: self.scanned_at,
        }
    }

    /// Path of `file` relative to the pool root, with `/` separators
    pub fn relative_path(&self, file: &AudioFile) -> String {
        let relative = file.path.strip_prefix(&self.root).unwrap_or(&file.path);
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Scans a pool root into a [`ClipPool`]
#[derive(Debug, Clone)]
pub struct PoolScanner {
    speed_variant_marker: String,
}

impl PoolScanner {
    pub fn new(speed_variant_marker: impl Into<String>) -> Self {
        Self {
            speed_variant_marker: speed_variant_marker.into(),
        }
    }

    pub fn speed_variant_marker(&self) -> &str {
        &self.speed_variant_marker
    }

    /// Scan the root and its immediate subfolders
    ///
    /// Fails only if the root itself is missing or unreadable. Unreadable
    /// entries below the root are logged and skipped.
    pub fn scan(&self, root: &Path) -> Result<ClipPool, ScanError> {
        if !root.exists() {
            return Err(ScanError::PathNotFound(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(ScanError::NotADirectory(root.to_path_buf()));
        }
        std::fs::read_dir(root)
            .map_err(|e| ScanError::Unreadable(root.to_path_buf(), e.to_string()))?;

        let mut general = Vec::new();
        let mut languages: BTreeMap<String, Vec<AudioFile>> = BTreeMap::new();

        let walker = WalkDir::new(root)
            .min_depth(1)
            .max_depth(2)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name().to_string_lossy().as_ref()));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Error accessing pool entry: {}", e);
                    continue;
                }
            };

            if entry.file_type().is_dir() {
                if entry.depth() == 1 {
                    // Subfolder exists even if it ends up holding no audio
                    languages.entry(folder_group(entry.path())).or_default();
                }
                continue;
            }

            if !is_audio_path(entry.path()) {
                continue;
            }

            let group = match entry.depth() {
                1 => GENERAL_GROUP.to_string(),
                _ => match entry.path().parent() {
                    Some(parent) => folder_group(parent),
                    None => continue,
                },
            };

            let Some(file) =
                AudioFile::new(entry.path().to_path_buf(), &group, &self.speed_variant_marker)
            else {
                tracing::warn!("Skipping file without usable name: {}", entry.path().display());
                continue;
            };

            if entry.depth() == 1 {
                general.push(file);
            } else {
                languages.entry(group).or_default().push(file);
            }
        }

        let pool = ClipPool {
            root: root.to_path_buf(),
            general,
            languages,
            scanned_at: Utc::now(),
        };

        tracing::info!(
            root = %root.display(),
            general_files = pool.general.len(),
            language_pools = pool.languages.len(),
            total_files = pool.total_files(),
            "Audio pool scanned"
        );

        Ok(pool)
    }
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

fn folder_group(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, b"not really audio").unwrap();
    }

    #[test]
    fn test_audio_extension_detection() {
        assert!(is_audio_path(Path::new("a.mp3")));
        assert!(is_audio_path(Path::new("a.WAV")));
        assert!(is_audio_path(Path::new("dir/a.ogg")));
        assert!(is_audio_path(Path::new("a.m4a")));
        assert!(!is_audio_path(Path::new("a.flac")));
        assert!(!is_audio_path(Path::new("notes.txt")));
        assert!(!is_audio_path(Path::new("mp3")));
    }

    #[test]
    fn test_speed_variant_marker_is_stripped() {
        let normal = AudioFile::new(PathBuf::from("b.mp3"), GENERAL_GROUP, "_spedup").unwrap();
        let fast = AudioFile::new(PathBuf::from("b_spedup.mp3"), GENERAL_GROUP, "_spedup").unwrap();

        assert_eq!(normal.base_key, "b");
        assert!(!normal.is_speed_variant);
        assert_eq!(fast.base_key, "b");
        assert!(fast.is_speed_variant);
    }

    #[test]
    fn test_marker_alone_is_not_a_variant() {
        let file = AudioFile::new(PathBuf::from("_spedup.mp3"), GENERAL_GROUP, "_spedup").unwrap();
        assert_eq!(file.base_key, "_spedup");
        assert!(!file.is_speed_variant);
    }

    #[test]
    fn test_scan_nonexistent_path() {
        let scanner = PoolScanner::new("_spedup");
        let result = scanner.scan(Path::new("/nonexistent/ats/audio"));
        assert!(matches!(result, Err(ScanError::PathNotFound(_))));
    }

    #[test]
    fn test_scan_file_as_root() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a.mp3");

        let scanner = PoolScanner::new("_spedup");
        let result = scanner.scan(&dir.path().join("a.mp3"));
        assert!(matches!(result, Err(ScanError::NotADirectory(_))));
    }

    #[test]
    fn test_scan_empty_directory() {
        let dir = TempDir::new().unwrap();
        let pool = PoolScanner::new("_spedup").scan(dir.path()).unwrap();
        assert_eq!(pool.total_files(), 0);
        assert!(pool.languages().is_empty());
    }

    #[test]
    fn test_scan_classifies_groups() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a.mp3");
        touch(dir.path(), "b.mp3");
        touch(dir.path(), "b_spedup.mp3");
        touch(dir.path(), "readme.txt");
        touch(dir.path(), ".hidden.mp3");
        touch(dir.path(), "Spanish/uno.wav");
        touch(dir.path(), "Spanish/dos.OGG");
        touch(dir.path(), "Spanish/deeper/tres.mp3");
        touch(dir.path(), "english/one.m4a");
        fs::create_dir_all(dir.path().join("french")).unwrap();

        let pool = PoolScanner::new("_spedup").scan(dir.path()).unwrap();

        let general: Vec<_> = pool.general().iter().map(|f| f.base_key.as_str()).collect();
        assert_eq!(general, vec!["a", "b", "b"]);
        assert!(pool.general().iter().all(|f| f.group == GENERAL_GROUP));

        let spanish = pool.language("spanish").unwrap();
        assert_eq!(spanish.len(), 2);
        assert!(spanish.iter().all(|f| f.group == "spanish"));

        assert_eq!(pool.language("english").unwrap().len(), 1);
        assert_eq!(pool.language("french").unwrap().len(), 0);
        assert!(pool.language("Spanish").is_none());
        assert_eq!(pool.total_files(), 6);
    }

    #[test]
    fn test_relative_path_and_summary() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a.mp3");
        touch(dir.path(), "spanish/uno.wav");

        let pool = PoolScanner::new("_spedup").scan(dir.path()).unwrap();
        let uno = &pool.language("spanish").unwrap()[0];

        assert_eq!(pool.relative_path(uno), "spanish/uno.wav");
        assert_eq!(uno.content_type(), "audio/wav");

        let summary = pool.summary();
        assert_eq!(summary.general_files, 1);
        assert_eq!(summary.languages.get("spanish"), Some(&1));
        assert_eq!(summary.total_files, 2);
    }
}

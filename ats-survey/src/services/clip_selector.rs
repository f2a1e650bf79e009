//! Per-participant clip selection
//!
//! Selection runs once per participant:
//! 1. Collapse speed variants in the general pool, draw up to N clips.
//! 2. If the mother tongue names a language pool, collapse that pool and draw
//!    up to M clips.
//! 3. General clips come first, then language clips. Every clip gets a
//!    display label from the configured [`TitleStrategy`].
//!
//! Selection never fails. Short pools shrink the assignment, an unmatched
//! tongue yields no language clips. The random source is always passed in.

use ats_common::config::{SelectionLimits, TitleStrategy};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::BTreeMap;

use super::pool_scanner::{AudioFile, ClipPool};

/// Which pool a clip was drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipOrigin {
    General,
    Language,
}

/// One entry of an assignment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignedClip {
    /// 1-based presentation position
    pub index: usize,
    /// Participant-facing title
    pub label: String,
    pub origin: ClipOrigin,
    pub file: AudioFile,
}

/// Immutable outcome of selection for one participant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipAssignment {
    clips: Vec<AssignedClip>,
    n_general: usize,
    n_language: usize,
    matched_language: Option<String>,
}

impl ClipAssignment {
    /// Clips in presentation order
    pub fn clips(&self) -> &[AssignedClip] {
        &self.clips
    }

    pub fn n_general(&self) -> usize {
        self.n_general
    }

    pub fn n_language(&self) -> usize {
        self.n_language
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Language pool the tongue matched, if any
    pub fn matched_language(&self) -> Option<&str> {
        self.matched_language.as_deref()
    }

    /// Clip at 1-based `index`
    pub fn clip(&self, index: usize) -> Option<&AssignedClip> {
        index.checked_sub(1).and_then(|i| self.clips.get(i))
    }

    pub fn by_label(&self, label: &str) -> Option<&AssignedClip> {
        self.clips.iter().find(|c| c.label == label)
    }
}

/// Keep one file per `(group, base_key)`
///
/// Partitions with several members (normal + speed variants) keep one member
/// chosen uniformly at random. Output is ordered by `(group, base_key)`, so a
/// fixed random source gives a fixed result.
pub fn collapse_variants<R: Rng + ?Sized>(files: &[AudioFile], rng: &mut R) -> Vec<AudioFile> {
    let mut partitions: BTreeMap<(&str, &str), Vec<&AudioFile>> = BTreeMap::new();
    for file in files {
        partitions
            .entry((file.group.as_str(), file.base_key.as_str()))
            .or_default()
            .push(file);
    }

    partitions
        .into_values()
        .filter_map(|members| match members.as_slice() {
            [only] => Some((*only).clone()),
            _ => members.choose(rng).map(|f| (*f).clone()),
        })
        .collect()
}

/// Trim and case-fold a mother tongue into a language pool key
pub fn normalize_language(mother_tongue: &str) -> String {
    mother_tongue.trim().to_lowercase()
}

/// Draw `min(limit, |pool|)` distinct files after collapsing variants
fn draw<R: Rng + ?Sized>(pool: &[AudioFile], limit: i64, rng: &mut R) -> Vec<AudioFile> {
    let wanted = usize::try_from(limit).unwrap_or(0);
    if wanted == 0 || pool.is_empty() {
        return Vec::new();
    }

    let collapsed = collapse_variants(pool, rng);
    if collapsed.len() < wanted {
        tracing::debug!(
            requested = wanted,
            available = collapsed.len(),
            "Pool smaller than requested, taking all clips"
        );
    }

    let amount = wanted.min(collapsed.len());
    collapsed.choose_multiple(rng, amount).cloned().collect()
}

/// Participant-facing title for the clip at 1-based `index`
pub fn clip_title(strategy: TitleStrategy, index: usize, file: &AudioFile) -> String {
    match strategy {
        TitleStrategy::Sequential => format!("Audio Clip {}", index),
        TitleStrategy::FilenameDerived => file
            .base_key
            .split(['_', '-', ' '])
            .filter(|word| !word.is_empty())
            .map(capitalize)
            .collect::<Vec<_>>()
            .join(" "),
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Draws assignments from pool snapshots
#[derive(Debug, Clone, Copy, Default)]
pub struct ClipSelector {
    titles: TitleStrategy,
}

impl ClipSelector {
    pub fn new(titles: TitleStrategy) -> Self {
        Self { titles }
    }

    pub fn title_strategy(&self) -> TitleStrategy {
        self.titles
    }

    /// Build one participant's assignment
    ///
    /// General and language pools are collapsed independently.
    pub fn assign<R: Rng + ?Sized>(
        &self,
        mother_tongue: &str,
        general_pool: &[AudioFile],
        language_pools: &BTreeMap<String, Vec<AudioFile>>,
        limits: SelectionLimits,
        rng: &mut R,
    ) -> ClipAssignment {
        let general = draw(general_pool, limits.n_random_clips, rng);

        let key = normalize_language(mother_tongue);
        let (language, matched_language) = match language_pools.get(&key) {
            Some(pool) => (draw(pool, limits.m_language_clips, rng), Some(key)),
            None => {
                tracing::debug!(mother_tongue = %key, "No language pool matches mother tongue");
                (Vec::new(), None)
            }
        };

        let n_general = general.len();
        let n_language = language.len();

        let clips = general
            .into_iter()
            .map(|file| (ClipOrigin::General, file))
            .chain(language.into_iter().map(|file| (ClipOrigin::Language, file)))
            .enumerate()
            .map(|(i, (origin, file))| AssignedClip {
                index: i + 1,
                label: clip_title(self.titles, i + 1, &file),
                origin,
                file,
            })
            .collect();

        ClipAssignment {
            clips,
            n_general,
            n_language,
            matched_language,
        }
    }

    /// [`assign`](Self::assign) against a scanned pool snapshot
    pub fn assign_from_pool<R: Rng + ?Sized>(
        &self,
        mother_tongue: &str,
        pool: &ClipPool,
        limits: SelectionLimits,
        rng: &mut R,
    ) -> ClipAssignment {
        self.assign(mother_tongue, pool.general(), pool.languages(), limits, rng)
    }
}

//! Survey question catalog
//!
//! Every clip is rated on two Likert scales and its linguistic features are
//! ranked by how much they influenced the participant's judgement.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Lowest accepted Likert score
pub const LIKERT_MIN: u8 = 1;
/// Highest accepted Likert score
pub const LIKERT_MAX: u8 = 5;

/// Linguistic features a participant ranks per clip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinguisticFeature {
    RateOfSpeech,
    Tone,
    Inflection,
    Intonation,
    Stress,
}

impl LinguisticFeature {
    /// All features, in the order they are first presented
    pub const ALL: [LinguisticFeature; 5] = [
        LinguisticFeature::RateOfSpeech,
        LinguisticFeature::Tone,
        LinguisticFeature::Inflection,
        LinguisticFeature::Intonation,
        LinguisticFeature::Stress,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LinguisticFeature::RateOfSpeech => "rate_of_speech",
            LinguisticFeature::Tone => "tone",
            LinguisticFeature::Inflection => "inflection",
            LinguisticFeature::Intonation => "intonation",
            LinguisticFeature::Stress => "stress",
        }
    }
}

impl fmt::Display for LinguisticFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// True if `score` lies on the 1-5 scale
pub fn is_valid_likert(score: u8) -> bool {
    (LIKERT_MIN..=LIKERT_MAX).contains(&score)
}

/// True if `ranking` names every feature exactly once
pub fn is_complete_ranking(ranking: &[LinguisticFeature]) -> bool {
    if ranking.len() != LinguisticFeature::ALL.len() {
        return false;
    }
    let unique: HashSet<_> = ranking.iter().collect();
    unique.len() == LinguisticFeature::ALL.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_likert_bounds() {
        assert!(!is_valid_likert(0));
        assert!(is_valid_likert(1));
        assert!(is_valid_likert(5));
        assert!(!is_valid_likert(6));
    }

    #[test]
    fn test_complete_ranking() {
        assert!(is_complete_ranking(&LinguisticFeature::ALL));

        let mut reversed = LinguisticFeature::ALL;
        reversed.reverse();
        assert!(is_complete_ranking(&reversed));
    }

    #[test]
    fn test_incomplete_or_duplicate_ranking() {
        use LinguisticFeature::*;
        assert!(!is_complete_ranking(&[Tone, Stress]));
        assert!(!is_complete_ranking(&[Tone, Tone, Stress, Inflection, Intonation]));
    }

    #[test]
    fn test_feature_serializes_snake_case() {
        let json = serde_json::to_string(&LinguisticFeature::RateOfSpeech).unwrap();
        assert_eq!(json, "\"rate_of_speech\"");
        assert_eq!(LinguisticFeature::Intonation.to_string(), "intonation");
    }
}

//! Score Fusion: collapses similarity and skill overlap into one bounded score.
//!
//! Two policies, each paired with one skill strategy:
//! - `Weighted`: `round(100 * (0.7 * similarity + 0.3 * overlap))`, integral.
//!   "Well aligned" above 75, otherwise "Needs improvement".
//! - `SimilarityOnly`: `round(100 * similarity, 2)`. The recommendation
//!   thresholds (0.75 / 0.5) apply to the unscaled similarity.
//!
//! Rounding is half-to-even, and scores are clamped into `[0, 100]` after
//! rounding, so a negative cosine never produces a negative score.

use crate::config::ScoringVariant;

pub const SIMILARITY_WEIGHT: f64 = 0.7;
pub const SKILL_WEIGHT: f64 = 0.3;

const WELL_ALIGNED_ABOVE: f64 = 75.0;
const STRONG_MATCH_ABOVE: f64 = 0.75;
const MODERATE_MATCH_ABOVE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FusionPolicy {
    Weighted,
    SimilarityOnly,
}

/// A fused score and its recommendation category.
#[derive(Debug, Clone, PartialEq)]
pub struct Fused {
    pub score: f64,
    pub recommendation: &'static str,
}

impl FusionPolicy {
    pub fn for_variant(variant: ScoringVariant) -> Self {
        match variant {
            ScoringVariant::Keyword => FusionPolicy::Weighted,
            ScoringVariant::Model => FusionPolicy::SimilarityOnly,
        }
    }

    /// `skill_overlap_ratio` is ignored by `SimilarityOnly`.
    pub fn fuse(&self, similarity: f64, skill_overlap_ratio: f64) -> Fused {
        match self {
            FusionPolicy::Weighted => {
                let raw = 100.0 * (SIMILARITY_WEIGHT * similarity + SKILL_WEIGHT * skill_overlap_ratio);
                let score = raw.round_ties_even().clamp(0.0, 100.0);
                let recommendation = if score > WELL_ALIGNED_ABOVE {
                    "Well aligned"
                } else {
                    "Needs improvement"
                };
                Fused {
                    score,
                    recommendation,
                }
            }
            FusionPolicy::SimilarityOnly => {
                let score = round_to_hundredths(100.0 * similarity).clamp(0.0, 100.0);
                let recommendation = if similarity > STRONG_MATCH_ABOVE {
                    "Strong Match"
                } else if similarity > MODERATE_MATCH_ABOVE {
                    "Moderate Match"
                } else {
                    "Weak Match"
                };
                Fused {
                    score,
                    recommendation,
                }
            }
        }
    }
}

fn round_to_hundredths(x: f64) -> f64 {
    (x * 100.0).round_ties_even() / 100.0
}

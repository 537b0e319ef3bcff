//! Score fusion and deterministic ranking.

use std::cmp::Ordering;

use crate::config::FusionWeights;

/// Component scores for one candidate. `None` means the component does not
/// apply (no colour filter in the query, no plate on the object) and must
/// not dilute the weighted sum.
#[derive(Debug, Clone, Copy)]
pub struct ComponentScores {
    pub clip: f64,
    pub color: Option<f64>,
    pub plate: Option<f64>,
}

/// Weighted combination of the applicable components, with the weights of
/// omitted components renormalized away. With only the clip component
/// applicable this reduces to the clip score exactly.
pub fn fuse(weights: &FusionWeights, scores: &ComponentScores) -> f64 {
    let mut numerator = weights.clip * scores.clip;
    let mut denominator = weights.clip;

    if let Some(color) = scores.color {
        numerator += weights.color * color;
        denominator += weights.color;
    }
    if let Some(plate) = scores.plate {
        numerator += weights.plate * plate;
        denominator += weights.plate;
    }

    if denominator <= 0.0 {
        return scores.clip;
    }
    numerator / denominator
}

/// A fully scored candidate, ready for ranking. Inapplicable components are
/// persisted as 0.0 per the results schema.
#[derive(Debug, Clone)]
pub struct ScoredHit {
    pub frame_id: String,
    pub object_id: Option<String>,
    pub at: String,
    pub track_id: Option<i64>,
    pub final_score: f64,
    pub clip_score: f64,
    pub color_score: f64,
    pub plate_score: f64,
}

/// Rank order: `final_score` descending, ties by `clip_score` descending,
/// then frame timestamp ascending, then ids. Identical inputs always
/// produce the same sequence.
pub fn rank_hits(hits: &mut [ScoredHit]) {
    hits.sort_by(compare_hits);
}

fn compare_hits(a: &ScoredHit, b: &ScoredHit) -> Ordering {
    b.final_score
        .partial_cmp(&a.final_score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| {
            b.clip_score
                .partial_cmp(&a.clip_score)
                .unwrap_or(Ordering::Equal)
        })
        .then_with(|| a.at.cmp(&b.at))
        .then_with(|| a.frame_id.cmp(&b.frame_id))
        .then_with(|| a.object_id.cmp(&b.object_id))
}

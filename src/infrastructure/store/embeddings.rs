//! Similarity-ranked candidate lookup.
//!
//! The ranked lookup is a brute-force scan over the embeddings of one source
//! restricted to the requested time window: fetch the slice, score by cosine
//! similarity, keep the top K. The window bound keeps the scan proportional
//! to the queried span rather than the whole corpus.

use sea_orm::{
    ColumnTrait, EntityTrait, FromQueryResult, JoinType, QueryFilter, QuerySelect, RelationTrait,
};
use tracing::warn;

use super::{Store, StoreError};
use crate::domain::{EmbeddingEntityType, ObjectType, TimeRange};
use crate::infrastructure::database::entities::{
    embeddings, frames, objects, person_attrs, transport_attrs,
};

#[derive(Debug, FromQueryResult)]
struct FrameCandidateRow {
    frame_id: String,
    timestamp_sec: f64,
    at: String,
    vector: String,
}

#[derive(Debug, FromQueryResult)]
struct ObjectCandidateRow {
    object_id: String,
    frame_id: String,
    timestamp_sec: f64,
    at: String,
    object_type: String,
    track_id: Option<i64>,
    vector: String,
    transport_color_hsv: Option<String>,
    transport_plate: Option<String>,
    person_upper_hsv: Option<String>,
    person_lower_hsv: Option<String>,
}

/// A frame-level candidate with its similarity to the query vector.
#[derive(Debug, Clone)]
pub struct ScoredFrameCandidate {
    pub frame_id: String,
    pub timestamp_sec: f64,
    pub at: String,
    pub clip_score: f64,
}

/// An object-level candidate with its similarity and stored signals.
#[derive(Debug, Clone)]
pub struct ScoredObjectCandidate {
    pub object_id: String,
    pub frame_id: String,
    pub timestamp_sec: f64,
    pub at: String,
    pub object_type: ObjectType,
    pub track_id: Option<i64>,
    pub clip_score: f64,
    pub transport_color_hsv: Option<String>,
    pub transport_plate: Option<String>,
    pub person_upper_hsv: Option<String>,
    pub person_lower_hsv: Option<String>,
}

impl Store {
    /// Top-K frame embeddings of `source_id` within `range`, ranked by
    /// cosine similarity to `query` (descending).
    pub async fn rank_frame_candidates(
        &self,
        source_id: &str,
        range: &TimeRange,
        query: &[f32],
        limit: u64,
    ) -> Result<Vec<ScoredFrameCandidate>, StoreError> {
        let rows = embeddings::Entity::find()
            .select_only()
            .column_as(embeddings::Column::FrameId, "frame_id")
            .column_as(embeddings::Column::Vector, "vector")
            .column_as(frames::Column::TimestampSec, "timestamp_sec")
            .column_as(frames::Column::At, "at")
            .join(JoinType::InnerJoin, embeddings::Relation::Frames.def())
            .filter(embeddings::Column::EntityType.eq(EmbeddingEntityType::Frame.to_string()))
            .filter(frames::Column::SourceId.eq(source_id))
            .filter(frames::Column::At.gte(range.start_at.as_str()))
            .filter(frames::Column::At.lt(range.end_at.as_str()))
            .into_model::<FrameCandidateRow>()
            .all(&self.conn)
            .await?;

        let mut scored: Vec<ScoredFrameCandidate> = rows
            .into_iter()
            .filter_map(|row| {
                let clip_score = score_stored_vector(&row.vector, query, &row.frame_id)?;
                Some(ScoredFrameCandidate {
                    frame_id: row.frame_id,
                    timestamp_sec: row.timestamp_sec,
                    at: row.at,
                    clip_score,
                })
            })
            .collect();

        rank_and_truncate(&mut scored, limit, |c| (c.clip_score, c.at.clone()));
        Ok(scored)
    }

    /// Top-K object embeddings of `source_id` within `range`, optionally
    /// restricted to one object type, ranked by cosine similarity.
    pub async fn rank_object_candidates(
        &self,
        source_id: &str,
        range: &TimeRange,
        type_filter: Option<ObjectType>,
        query: &[f32],
        limit: u64,
    ) -> Result<Vec<ScoredObjectCandidate>, StoreError> {
        let mut select = embeddings::Entity::find()
            .select_only()
            .column_as(embeddings::Column::ObjectId, "object_id")
            .column_as(embeddings::Column::Vector, "vector")
            .column_as(objects::Column::FrameId, "frame_id")
            .column_as(objects::Column::ObjectType, "object_type")
            .column_as(objects::Column::TrackId, "track_id")
            .column_as(frames::Column::TimestampSec, "timestamp_sec")
            .column_as(frames::Column::At, "at")
            .column_as(transport_attrs::Column::ColorHsv, "transport_color_hsv")
            .column_as(transport_attrs::Column::LicensePlate, "transport_plate")
            .column_as(person_attrs::Column::UpperColorHsv, "person_upper_hsv")
            .column_as(person_attrs::Column::LowerColorHsv, "person_lower_hsv")
            .join(JoinType::InnerJoin, embeddings::Relation::Objects.def())
            .join(JoinType::InnerJoin, objects::Relation::Frames.def())
            .join(JoinType::LeftJoin, objects::Relation::TransportAttrs.def())
            .join(JoinType::LeftJoin, objects::Relation::PersonAttrs.def())
            .filter(embeddings::Column::EntityType.eq(EmbeddingEntityType::Object.to_string()))
            .filter(frames::Column::SourceId.eq(source_id))
            .filter(frames::Column::At.gte(range.start_at.as_str()))
            .filter(frames::Column::At.lt(range.end_at.as_str()));

        if let Some(object_type) = type_filter {
            select = select.filter(objects::Column::ObjectType.eq(object_type.to_string()));
        }

        let rows = select
            .into_model::<ObjectCandidateRow>()
            .all(&self.conn)
            .await?;

        let mut scored: Vec<ScoredObjectCandidate> = rows
            .into_iter()
            .filter_map(|row| {
                let clip_score = score_stored_vector(&row.vector, query, &row.object_id)?;
                let object_type = match row.object_type.parse::<ObjectType>() {
                    Ok(t) => t,
                    Err(_) => {
                        warn!(object_id = %row.object_id, raw = %row.object_type, "unknown object type, skipping candidate");
                        return None;
                    }
                };
                Some(ScoredObjectCandidate {
                    object_id: row.object_id,
                    frame_id: row.frame_id,
                    timestamp_sec: row.timestamp_sec,
                    at: row.at,
                    object_type,
                    track_id: row.track_id,
                    clip_score,
                    transport_color_hsv: row.transport_color_hsv,
                    transport_plate: row.transport_plate,
                    person_upper_hsv: row.person_upper_hsv,
                    person_lower_hsv: row.person_lower_hsv,
                })
            })
            .collect();

        rank_and_truncate(&mut scored, limit, |c| (c.clip_score, c.at.clone()));
        Ok(scored)
    }
}

fn score_stored_vector(raw: &str, query: &[f32], entity_id: &str) -> Option<f64> {
    let vector: Vec<f32> = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(err) => {
            warn!(entity_id, error = %err, "corrupt stored vector, skipping candidate");
            return None;
        }
    };
    if vector.len() != query.len() {
        warn!(
            entity_id,
            stored = vector.len(),
            expected = query.len(),
            "vector dimension mismatch, skipping candidate"
        );
        return None;
    }
    Some(cosine_similarity(query, &vector))
}

/// Sort by similarity descending (timestamp ascending on ties, so equal
/// scores rank reproducibly) and keep the first `limit`.
fn rank_and_truncate<T>(candidates: &mut Vec<T>, limit: u64, key: impl Fn(&T) -> (f64, String)) {
    candidates.sort_by(|a, b| {
        let (score_a, at_a) = key(a);
        let (score_b, at_b) = key(b);
        score_b
            .partial_cmp(&score_a)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| at_a.cmp(&at_b))
    });
    candidates.truncate(limit as usize);
}

/// Cosine similarity of two equal-length vectors; 0 when either has zero
/// norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += f64::from(*x) * f64::from(*y);
        norm_a += f64::from(*x) * f64::from(*x);
        norm_b += f64::from(*y) * f64::from(*y);
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_of_identical_vectors_is_one() {
        let v = vec![0.5f32, -0.25, 0.1];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn cosine_of_orthogonal_vectors_is_zero() {
        let a = vec![1.0f32, 0.0];
        let b = vec![0.0f32, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-9);
    }

    #[test]
    fn cosine_with_zero_norm_is_zero() {
        let a = vec![0.0f32, 0.0];
        let b = vec![1.0f32, 1.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }
}

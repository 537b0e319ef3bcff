//! Search job engine.
//!
//! A query is parsed, embedded, matched against the stored embeddings of
//! the requested source/time window, and fused with the auxiliary colour
//! and plate signals. Track events stream out while scoring is underway;
//! the final ranked result set is swapped in atomically at the end.

pub mod color;
pub mod plate;
pub mod scoring;
pub mod tracking;

pub use scoring::{fuse, rank_hits, ComponentScores, ScoredHit};
pub use tracking::TrackAggregator;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::SearchConfig;
use crate::domain::{parse_query, HsvColor, ObjectType, ParsedQuery, TimeRange};
use crate::extract::Extractors;
use crate::infrastructure::jobs::error::{JobError, JobResult};
use crate::infrastructure::jobs::types::JobId;
use crate::infrastructure::store::{
    NewSearchResult, ScoredFrameCandidate, ScoredObjectCandidate, Store,
};
use color::color_score;
use plate::plate_score;

pub struct SearchEngine {
    store: Store,
    extractors: Extractors,
    config: SearchConfig,
}

impl SearchEngine {
    pub fn new(store: Store, extractors: Extractors, config: SearchConfig) -> Self {
        Self {
            store,
            extractors,
            config,
        }
    }

    /// Execute the body of a search job. The caller owns the status
    /// lifecycle; `Ok` means COMPLETED, `JobError::Cancelled` means
    /// CANCELLED, anything else FAILED.
    pub async fn run(&self, job_id: &JobId, cancel: &CancellationToken) -> JobResult<()> {
        let id = job_id.to_string();
        let job = self
            .store
            .search_job(&id)
            .await?
            .ok_or_else(|| JobError::NotFound(id.clone()))?;

        let range = TimeRange::new(job.start_at.clone(), job.end_at.clone());
        let parsed = parse_query(&job.text_query);
        debug!(job_id = %id, ?parsed, "parsed search query");

        // The query embedding is the one extraction this job cannot work
        // without; failure here is fatal and leaves no partial results.
        let embed_input = if parsed.cleaned_text.is_empty() {
            job.text_query.clone()
        } else {
            parsed.cleaned_text.clone()
        };
        let query_vector = self
            .extractors
            .gate
            .run(self.extractors.embedder.embed_text(&embed_input))
            .await?;

        let mut hits = match parsed.object_type {
            Some(object_type) => {
                let candidates = self
                    .store
                    .rank_object_candidates(
                        &job.source_id,
                        &range,
                        Some(object_type),
                        &query_vector,
                        self.config.max_candidates,
                    )
                    .await?;
                self.score_object_candidates(&id, &parsed, candidates, cancel)
                    .await?
            }
            None => {
                let candidates = self
                    .store
                    .rank_frame_candidates(
                        &job.source_id,
                        &range,
                        &query_vector,
                        self.config.max_candidates,
                    )
                    .await?;
                self.score_frame_candidates(&id, candidates, cancel).await?
            }
        };

        rank_hits(&mut hits);
        hits.truncate(self.config.max_results);

        let rows: Vec<NewSearchResult> = hits
            .iter()
            .enumerate()
            .map(|(index, hit)| NewSearchResult {
                frame_id: hit.frame_id.clone(),
                object_id: hit.object_id.clone(),
                rank: index as i32 + 1,
                final_score: hit.final_score,
                clip_score: hit.clip_score,
                color_score: hit.color_score,
                plate_score: hit.plate_score,
            })
            .collect();

        self.store.replace_search_results(&id, &rows).await?;
        self.store.advance_search_progress(&id, 1.0).await?;

        info!(job_id = %id, results = rows.len(), "search job finished scoring");
        Ok(())
    }

    async fn score_object_candidates(
        &self,
        job_id: &str,
        parsed: &ParsedQuery,
        candidates: Vec<ScoredObjectCandidate>,
        cancel: &CancellationToken,
    ) -> JobResult<Vec<ScoredHit>> {
        let total = candidates.len();
        let mut aggregator = TrackAggregator::new();
        let mut hits = Vec::with_capacity(total);
        let mut scored = 0usize;

        for batch in candidates.chunks(self.config.batch_size.max(1)) {
            if cancel.is_cancelled() {
                info!(job_id, scored, total, "cancellation observed between candidate batches");
                return Err(JobError::Cancelled);
            }

            for candidate in batch {
                let hit = self.score_object(parsed, candidate);
                if let Some(new_max) = aggregator.observe(&hit) {
                    self.store
                        .upsert_track_event(
                            job_id,
                            hit.track_id,
                            hit.object_id.as_deref(),
                            new_max,
                        )
                        .await?;
                }
                hits.push(hit);
                scored += 1;
            }

            self.store
                .advance_search_progress(job_id, scored as f64 / total.max(1) as f64)
                .await?;
        }

        Ok(hits)
    }

    async fn score_frame_candidates(
        &self,
        job_id: &str,
        candidates: Vec<ScoredFrameCandidate>,
        cancel: &CancellationToken,
    ) -> JobResult<Vec<ScoredHit>> {
        let total = candidates.len();
        let mut hits = Vec::with_capacity(total);
        let mut scored = 0usize;

        for batch in candidates.chunks(self.config.batch_size.max(1)) {
            if cancel.is_cancelled() {
                info!(job_id, scored, total, "cancellation observed between candidate batches");
                return Err(JobError::Cancelled);
            }

            for candidate in batch {
                hits.push(ScoredHit {
                    frame_id: candidate.frame_id.clone(),
                    object_id: None,
                    at: candidate.at.clone(),
                    track_id: None,
                    final_score: candidate.clip_score,
                    clip_score: candidate.clip_score,
                    color_score: 0.0,
                    plate_score: 0.0,
                });
                scored += 1;
            }

            self.store
                .advance_search_progress(job_id, scored as f64 / total.max(1) as f64)
                .await?;
        }

        Ok(hits)
    }

    fn score_object(&self, parsed: &ParsedQuery, candidate: &ScoredObjectCandidate) -> ScoredHit {
        let color = self.color_component(parsed, candidate);
        let plate = self.plate_component(parsed, candidate);

        let final_score = fuse(
            &self.config.weights,
            &ComponentScores {
                clip: candidate.clip_score,
                color,
                plate,
            },
        );

        ScoredHit {
            frame_id: candidate.frame_id.clone(),
            object_id: Some(candidate.object_id.clone()),
            at: candidate.at.clone(),
            track_id: candidate.track_id,
            final_score,
            clip_score: candidate.clip_score,
            color_score: color.unwrap_or(0.0),
            plate_score: plate.unwrap_or(0.0),
        }
    }

    /// The colour component applies when the query carries a colour filter
    /// and the object a usable signature; otherwise it is omitted from the
    /// fusion entirely.
    fn color_component(
        &self,
        parsed: &ParsedQuery,
        candidate: &ScoredObjectCandidate,
    ) -> Option<f64> {
        if !parsed.has_color_filter() {
            return None;
        }

        match candidate.object_type {
            ObjectType::Transport => {
                let query_color = parsed.color.as_deref()?;
                let hsv = candidate
                    .transport_color_hsv
                    .as_deref()
                    .and_then(HsvColor::decode)?;
                Some(color_score(query_color, hsv))
            }
            ObjectType::Person => {
                let upper = candidate
                    .person_upper_hsv
                    .as_deref()
                    .and_then(HsvColor::decode);
                let lower = candidate
                    .person_lower_hsv
                    .as_deref()
                    .and_then(HsvColor::decode);

                let mut region_scores = Vec::new();
                if let (Some(query_color), Some(hsv)) = (parsed.upper_color.as_deref(), upper) {
                    region_scores.push(color_score(query_color, hsv));
                }
                if let (Some(query_color), Some(hsv)) = (parsed.lower_color.as_deref(), lower) {
                    region_scores.push(color_score(query_color, hsv));
                }

                if !region_scores.is_empty() {
                    return Some(
                        region_scores.iter().sum::<f64>() / region_scores.len() as f64,
                    );
                }

                // A generic colour filter matches either clothing region.
                let query_color = parsed.color.as_deref()?;
                let best = [upper, lower]
                    .into_iter()
                    .flatten()
                    .map(|hsv| color_score(query_color, hsv))
                    .fold(None, |acc: Option<f64>, s| {
                        Some(acc.map_or(s, |a| a.max(s)))
                    });
                best
            }
        }
    }

    fn plate_component(
        &self,
        parsed: &ParsedQuery,
        candidate: &ScoredObjectCandidate,
    ) -> Option<f64> {
        let query_plate = parsed.plate.as_deref()?;
        let stored_plate = candidate.transport_plate.as_deref()?;
        Some(plate_score(
            query_plate,
            stored_plate,
            self.config.min_plate_similarity,
        ))
    }
}

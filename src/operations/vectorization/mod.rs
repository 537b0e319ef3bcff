//! Vectorization job engine.
//!
//! Turns the still-missing sub-ranges of a request into persisted frames,
//! objects, attributes and embeddings. Work already recorded by a previous
//! run is never reprocessed: the engine resolves missing ranges on start and
//! re-resolves each sub-range under the source's advisory lock, so a retry
//! after a mid-way failure picks up exactly where coverage ends.

pub mod coverage;
pub mod period_tracker;

pub use coverage::{check_coverage, CoverageReport, CoverageStatus};
pub use period_tracker::PeriodTracker;

use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::{Frame, SceneObject, TimeMapper, TimeRange};
use crate::extract::{Detection, Extractors, SampledFrame};
use crate::infrastructure::jobs::error::{JobError, JobResult};
use crate::infrastructure::jobs::types::JobId;
use crate::infrastructure::store::{
    FrameBundle, ObjectAttributes, ObjectBundle, Store, StoreError,
};
use crate::operations::search::plate::normalize_plate;

pub struct VectorizationEngine {
    store: Store,
    extractors: Extractors,
    tracker: PeriodTracker,
}

impl VectorizationEngine {
    pub fn new(store: Store, extractors: Extractors) -> Self {
        let tracker = PeriodTracker::new(store.clone());
        Self {
            store,
            extractors,
            tracker,
        }
    }

    pub fn tracker(&self) -> &PeriodTracker {
        &self.tracker
    }

    /// Execute the body of a vectorization job. The caller owns the status
    /// lifecycle; this returns `Ok` for COMPLETED, `JobError::Cancelled`
    /// for CANCELLED and any other error for FAILED.
    pub async fn run(
        &self,
        job_id: &JobId,
        cancel: &CancellationToken,
        source_lock: Arc<Mutex<()>>,
    ) -> JobResult<()> {
        let id = job_id.to_string();
        let job = self
            .store
            .vectorization_job(&id)
            .await?
            .ok_or_else(|| JobError::NotFound(id.clone()))?;

        let ranges: Vec<TimeRange> = serde_json::from_str(&job.ranges)
            .map_err(|err| StoreError::Corrupt(format!("job {id} ranges: {err}")))?;

        let mut total_secs = 0.0;
        for range in &ranges {
            total_secs += range.duration_secs()?;
        }
        if total_secs <= 0.0 {
            self.store.advance_vectorization_progress(&id, 1.0).await?;
            return Ok(());
        }

        // Initial resolution; only a progress baseline, each sub-range is
        // re-resolved under the source lock before processing.
        let mut pending = Vec::new();
        for range in &ranges {
            pending.extend(self.tracker.missing_ranges(&job.source_id, range).await?);
        }
        pending.sort_by(|a, b| a.start_at.cmp(&b.start_at));

        let mut missing_secs = 0.0;
        for range in &pending {
            missing_secs += range.duration_secs()?;
        }
        let mut processed_secs = (total_secs - missing_secs).max(0.0);

        if pending.is_empty() {
            info!(job_id = %id, source_id = %job.source_id, "requested ranges already vectorized");
            self.store.advance_vectorization_progress(&id, 1.0).await?;
            return Ok(());
        }

        self.store
            .advance_vectorization_progress(&id, processed_secs / total_secs)
            .await?;

        for sub_range in pending {
            if cancel.is_cancelled() {
                info!(job_id = %id, "cancellation observed between sub-ranges");
                return Err(JobError::Cancelled);
            }

            {
                let _guard = source_lock.lock().await;
                // A concurrent job on the same source may have covered parts
                // of this sub-range since the initial resolution.
                let pieces = self
                    .tracker
                    .missing_ranges(&job.source_id, &sub_range)
                    .await?;
                for piece in pieces {
                    debug!(job_id = %id, start = %piece.start_at, end = %piece.end_at, "processing sub-range");
                    self.process_range(&job.source_id, &piece).await?;
                    self.tracker.record_completed(&job.source_id, &piece).await?;
                }
            }

            processed_secs += sub_range.duration_secs()?;
            self.store
                .advance_vectorization_progress(&id, (processed_secs / total_secs).min(1.0))
                .await?;
        }

        Ok(())
    }

    /// Process one fully-missing sub-range. A frame provider failure fails
    /// the sub-range (and with it the job); extraction failures inside a
    /// frame only degrade that frame.
    async fn process_range(&self, source_id: &str, range: &TimeRange) -> JobResult<()> {
        let mapper = TimeMapper::new(std::slice::from_ref(range))?;

        let frames = self
            .extractors
            .gate
            .run(self.extractors.frames.frames(source_id, range))
            .await?;

        for sampled in frames {
            self.process_frame(source_id, &mapper, &sampled).await?;
        }

        Ok(())
    }

    async fn process_frame(
        &self,
        source_id: &str,
        mapper: &TimeMapper,
        sampled: &SampledFrame,
    ) -> JobResult<()> {
        let frame = Frame {
            id: Uuid::new_v4(),
            source_id: source_id.to_string(),
            timestamp_sec: sampled.timestamp_sec,
            at: mapper.map(sampled.timestamp_sec)?,
        };

        let frame_embedding = match self
            .extractors
            .gate
            .run(self.extractors.embedder.embed_image(&sampled.image))
            .await
        {
            Ok(vector) => Some(vector),
            Err(err) => {
                warn!(frame_id = %frame.id, error = %err, "frame embedding failed");
                None
            }
        };

        let detections = match self
            .extractors
            .gate
            .run(self.extractors.detector.detect(&sampled.image))
            .await
        {
            Ok(detections) => detections,
            Err(err) => {
                warn!(frame_id = %frame.id, error = %err, "object detection failed, storing frame without objects");
                Vec::new()
            }
        };

        let mut objects = Vec::with_capacity(detections.len());
        for detection in detections {
            objects.push(self.process_detection(&frame, detection).await);
        }

        let bundle = FrameBundle {
            frame,
            frame_embedding,
            objects,
        };
        self.store.insert_frame_bundle(&bundle).await?;
        Ok(())
    }

    async fn process_detection(&self, frame: &Frame, detection: Detection) -> ObjectBundle {
        let object = SceneObject {
            id: Uuid::new_v4(),
            frame_id: frame.id,
            object_type: detection.object_type,
            bbox: detection.bbox,
            track_id: detection.track_id,
        };

        let attributes = match detection.object_type {
            crate::domain::ObjectType::Transport => {
                let signature = match self
                    .extractors
                    .gate
                    .run(self.extractors.attributes.transport_attributes(&detection.crop))
                    .await
                {
                    Ok(signature) => signature,
                    Err(err) => {
                        warn!(object_id = %object.id, error = %err, "transport attribute extraction failed");
                        Default::default()
                    }
                };
                ObjectAttributes::Transport {
                    color_hsv: signature
                        .color
                        .map(|c| c.encode())
                        .unwrap_or_default(),
                    license_plate: signature
                        .plate_text
                        .as_deref()
                        .and_then(normalize_plate),
                }
            }
            crate::domain::ObjectType::Person => {
                let signature = match self
                    .extractors
                    .gate
                    .run(self.extractors.attributes.person_attributes(&detection.crop))
                    .await
                {
                    Ok(signature) => signature,
                    Err(err) => {
                        warn!(object_id = %object.id, error = %err, "person attribute extraction failed");
                        Default::default()
                    }
                };
                ObjectAttributes::Person {
                    upper_color_hsv: signature.upper.map(|c| c.encode()),
                    lower_color_hsv: signature.lower.map(|c| c.encode()),
                }
            }
        };

        let embedding = match self
            .extractors
            .gate
            .run(self.extractors.embedder.embed_image(&detection.crop))
            .await
        {
            Ok(vector) => Some(vector),
            Err(err) => {
                warn!(object_id = %object.id, error = %err, "object embedding failed");
                None
            }
        };

        ObjectBundle {
            object,
            attributes,
            embedding,
        }
    }
}

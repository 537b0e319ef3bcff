//! Shared fixtures: deterministic fake extractors and an in-memory core.
#![allow(dead_code)]

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

use uuid::Uuid;

use sightline_core::config::AppConfig;
use sightline_core::domain::{BBox, Frame, ObjectType, SceneObject, TimeRange, Timestamp};
use sightline_core::infrastructure::store::{FrameBundle, ObjectAttributes, ObjectBundle, Store};
use sightline_core::extract::{
    AttributeExtractor, Detection, EmbeddingExtractor, ExtractorError, ExtractorGate, Extractors,
    FrameProvider, ObjectDetector, PersonSignature, SampledFrame, TransportSignature,
};
use sightline_core::infrastructure::jobs::types::{JobId, JobRecord};
use sightline_core::Sightline;

pub fn ts(value: &str) -> Timestamp {
    Timestamp::new(value)
}

pub fn range(start: &str, end: &str) -> TimeRange {
    TimeRange::new(start, end)
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default_with_dir(PathBuf::from("."));
    config.jobs.worker_pool_size = 2;
    config.search.batch_size = 2;
    config.extractor.timeout_secs = 5;
    config
}

/// Embeds every image to the same unit vector and text to a fixed query
/// vector, so candidate similarities are fully controlled by the vectors
/// tests store directly.
pub struct UnitEmbedder;

#[async_trait]
impl EmbeddingExtractor for UnitEmbedder {
    async fn embed_image(&self, _image: &[u8]) -> Result<Vec<f32>, ExtractorError> {
        Ok(vec![1.0, 0.0, 0.0, 0.0])
    }

    async fn embed_text(&self, _text: &str) -> Result<Vec<f32>, ExtractorError> {
        Ok(vec![1.0, 0.0, 0.0, 0.0])
    }
}

/// Fails every text embedding; image embeddings still work.
pub struct FailingTextEmbedder;

#[async_trait]
impl EmbeddingExtractor for FailingTextEmbedder {
    async fn embed_image(&self, _image: &[u8]) -> Result<Vec<f32>, ExtractorError> {
        Ok(vec![1.0, 0.0, 0.0, 0.0])
    }

    async fn embed_text(&self, _text: &str) -> Result<Vec<f32>, ExtractorError> {
        Err(ExtractorError::Failed("text model unavailable".to_string()))
    }
}

/// Returns the same scripted detections for every frame.
pub struct StaticDetector {
    pub detections: Vec<Detection>,
}

#[async_trait]
impl ObjectDetector for StaticDetector {
    async fn detect(&self, _image: &[u8]) -> Result<Vec<Detection>, ExtractorError> {
        Ok(self.detections.clone())
    }
}

pub struct StaticAttributes {
    pub transport: TransportSignature,
    pub person: PersonSignature,
}

impl Default for StaticAttributes {
    fn default() -> Self {
        Self {
            transport: TransportSignature::default(),
            person: PersonSignature::default(),
        }
    }
}

#[async_trait]
impl AttributeExtractor for StaticAttributes {
    async fn transport_attributes(
        &self,
        _crop: &[u8],
    ) -> Result<TransportSignature, ExtractorError> {
        Ok(self.transport.clone())
    }

    async fn person_attributes(&self, _crop: &[u8]) -> Result<PersonSignature, ExtractorError> {
        Ok(self.person.clone())
    }
}

/// Two-phase gate: the test waits for `entered`, does its thing, then adds a
/// permit to `release` to let the provider continue.
pub struct BlockGate {
    pub entered: Semaphore,
    pub release: Semaphore,
}

impl BlockGate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            entered: Semaphore::new(0),
            release: Semaphore::new(0),
        })
    }

    pub async fn wait_entered(&self) {
        self.entered.acquire().await.expect("gate closed").forget();
    }

    pub fn open(&self) {
        self.release.add_permits(1);
    }
}

/// Samples one frame per second of the requested range. Optionally fails
/// ranges starting at or after a boundary, and can block on its first call
/// so tests can interleave cancellation deterministically.
pub struct StepFrameProvider {
    pub calls: AtomicUsize,
    pub frames_served: AtomicUsize,
    pub fail_from: Option<Timestamp>,
    pub block_first: Option<Arc<BlockGate>>,
    blocked_once: AtomicUsize,
}

impl StepFrameProvider {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            frames_served: AtomicUsize::new(0),
            fail_from: None,
            block_first: None,
            blocked_once: AtomicUsize::new(0),
        }
    }

    pub fn failing_from(at: &str) -> Self {
        let mut provider = Self::new();
        provider.fail_from = Some(ts(at));
        provider
    }

    pub fn blocking(gate: Arc<BlockGate>) -> Self {
        let mut provider = Self::new();
        provider.block_first = Some(gate);
        provider
    }
}

#[async_trait]
impl FrameProvider for StepFrameProvider {
    async fn frames(
        &self,
        _source_id: &str,
        range: &TimeRange,
    ) -> Result<Vec<SampledFrame>, ExtractorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.block_first {
            if self.blocked_once.fetch_add(1, Ordering::SeqCst) == 0 {
                gate.entered.add_permits(1);
                gate.release
                    .acquire()
                    .await
                    .expect("gate closed")
                    .forget();
            }
        }

        if let Some(fail_from) = &self.fail_from {
            if range.start_at >= *fail_from {
                return Err(ExtractorError::Failed("decoder error".to_string()));
            }
        }

        let duration = range
            .duration_secs()
            .map_err(|err| ExtractorError::Failed(err.to_string()))?;
        let count = duration.floor() as usize;

        let frames = (0..count)
            .map(|index| SampledFrame {
                timestamp_sec: index as f64,
                image: vec![index as u8],
            })
            .collect::<Vec<_>>();
        self.frames_served.fetch_add(frames.len(), Ordering::SeqCst);
        Ok(frames)
    }
}

pub struct ExtractorsBuilder {
    embedder: Arc<dyn EmbeddingExtractor>,
    detector: Arc<dyn ObjectDetector>,
    attributes: Arc<dyn AttributeExtractor>,
    frames: Arc<dyn FrameProvider>,
}

impl ExtractorsBuilder {
    pub fn new() -> Self {
        Self {
            embedder: Arc::new(UnitEmbedder),
            detector: Arc::new(StaticDetector {
                detections: Vec::new(),
            }),
            attributes: Arc::new(StaticAttributes::default()),
            frames: Arc::new(StepFrameProvider::new()),
        }
    }

    pub fn embedder(mut self, embedder: Arc<dyn EmbeddingExtractor>) -> Self {
        self.embedder = embedder;
        self
    }

    pub fn detector(mut self, detector: Arc<dyn ObjectDetector>) -> Self {
        self.detector = detector;
        self
    }

    pub fn attributes(mut self, attributes: Arc<dyn AttributeExtractor>) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn frames(mut self, frames: Arc<dyn FrameProvider>) -> Self {
        self.frames = frames;
        self
    }

    pub fn build(self) -> Extractors {
        Extractors {
            embedder: self.embedder,
            detector: self.detector,
            attributes: self.attributes,
            frames: self.frames,
            gate: ExtractorGate::new(4, Duration::from_secs(5)),
        }
    }
}

pub async fn in_memory_core(extractors: Extractors) -> Sightline {
    Sightline::new_in_memory(test_config(), extractors)
        .await
        .expect("in-memory core")
}

/// Insert one frame carrying a single object with the given embedding,
/// returning `(frame_id, object_id)`.
pub async fn seed_object(
    store: &Store,
    source_id: &str,
    at: &str,
    timestamp_sec: f64,
    vector: Vec<f32>,
    object_type: ObjectType,
    track_id: Option<i64>,
    attributes: ObjectAttributes,
) -> (String, String) {
    let frame_id = Uuid::new_v4();
    let object_id = Uuid::new_v4();

    let bundle = FrameBundle {
        frame: Frame {
            id: frame_id,
            source_id: source_id.to_string(),
            timestamp_sec,
            at: ts(at),
        },
        frame_embedding: None,
        objects: vec![ObjectBundle {
            object: SceneObject {
                id: object_id,
                frame_id,
                object_type,
                bbox: BBox {
                    x: 0,
                    y: 0,
                    width: 10,
                    height: 10,
                },
                track_id,
            },
            attributes,
            embedding: Some(vector),
        }],
    };
    store.insert_frame_bundle(&bundle).await.expect("seed object");

    (frame_id.to_string(), object_id.to_string())
}

/// Insert one frame with a frame-level embedding and no objects.
pub async fn seed_frame(
    store: &Store,
    source_id: &str,
    at: &str,
    timestamp_sec: f64,
    vector: Vec<f32>,
) -> String {
    let frame_id = Uuid::new_v4();
    let bundle = FrameBundle {
        frame: Frame {
            id: frame_id,
            source_id: source_id.to_string(),
            timestamp_sec,
            at: ts(at),
        },
        frame_embedding: Some(vector),
        objects: Vec::new(),
    };
    store.insert_frame_bundle(&bundle).await.expect("seed frame");
    frame_id.to_string()
}

/// A unit-norm vector whose cosine against `[1, 0, 0, 0]` is exactly
/// `similarity`.
pub fn vector_with_similarity(similarity: f32) -> Vec<f32> {
    vec![similarity, (1.0 - similarity * similarity).sqrt(), 0.0, 0.0]
}

/// Poll the persisted record until the job reaches a terminal status.
pub async fn wait_terminal(core: &Sightline, job_id: JobId) -> JobRecord {
    for _ in 0..500 {
        let record = core.job_status(job_id).await.expect("job status");
        if record.status.is_terminal() {
            return record;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {job_id} did not reach a terminal status in time");
}

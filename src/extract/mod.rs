//! External feature-extraction interfaces.
//!
//! The ML models (image/text embedding, object detection, attribute
//! extraction) and the video frame decoder live outside this crate. They are
//! consumed as pure async functions behind these traits; implementations are
//! free to call out to an inference backend, a subprocess, or a fixture in
//! tests.
//!
//! All calls from job bodies go through [`ExtractorGate`], which bounds
//! in-flight extractor concurrency and applies a per-call timeout. A timed
//! out call fails only its unit of work.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;

use crate::domain::{BBox, HsvColor, ObjectType, TimeRange};

#[derive(Debug, Clone, Error)]
pub enum ExtractorError {
    #[error("extractor call failed: {0}")]
    Failed(String),

    #[error("extractor call timed out")]
    Timeout,
}

/// Maps images and free text into the shared 512-dimensional vector space.
#[async_trait]
pub trait EmbeddingExtractor: Send + Sync {
    async fn embed_image(&self, image: &[u8]) -> Result<Vec<f32>, ExtractorError>;
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, ExtractorError>;
}

/// One detection on a frame: where it is, what it is, and the crop the
/// attribute pipeline will consume.
#[derive(Debug, Clone)]
pub struct Detection {
    pub bbox: BBox,
    pub object_type: ObjectType,
    pub track_id: Option<i64>,
    pub crop: Vec<u8>,
}

#[async_trait]
pub trait ObjectDetector: Send + Sync {
    async fn detect(&self, image: &[u8]) -> Result<Vec<Detection>, ExtractorError>;
}

/// Visual attributes of a transport crop.
#[derive(Debug, Clone, Default)]
pub struct TransportSignature {
    pub color: Option<HsvColor>,
    /// Raw plate text as read by OCR, not yet normalized.
    pub plate_text: Option<String>,
}

/// Visual attributes of a person crop.
#[derive(Debug, Clone, Default)]
pub struct PersonSignature {
    pub upper: Option<HsvColor>,
    pub lower: Option<HsvColor>,
}

#[async_trait]
pub trait AttributeExtractor: Send + Sync {
    async fn transport_attributes(&self, crop: &[u8])
        -> Result<TransportSignature, ExtractorError>;
    async fn person_attributes(&self, crop: &[u8]) -> Result<PersonSignature, ExtractorError>;
}

/// A sampled frame: opaque image bytes plus its position (seconds) relative
/// to the start of the requested range.
#[derive(Debug, Clone)]
pub struct SampledFrame {
    pub timestamp_sec: f64,
    pub image: Vec<u8>,
}

/// Decodes and samples frames for a sub-range of a source feed.
#[async_trait]
pub trait FrameProvider: Send + Sync {
    async fn frames(
        &self,
        source_id: &str,
        range: &TimeRange,
    ) -> Result<Vec<SampledFrame>, ExtractorError>;
}

/// Shared admission gate for all extractor calls.
#[derive(Clone)]
pub struct ExtractorGate {
    semaphore: Arc<Semaphore>,
    timeout: Duration,
}

impl ExtractorGate {
    pub fn new(max_concurrent: usize, timeout: Duration) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            timeout,
        }
    }

    /// Run one extractor call under the gate. Waits for an admission slot,
    /// then bounds the call itself with the configured timeout.
    pub async fn run<T, F>(&self, call: F) -> Result<T, ExtractorError>
    where
        F: Future<Output = Result<T, ExtractorError>>,
    {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| ExtractorError::Failed("extractor gate closed".to_string()))?;

        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ExtractorError::Timeout),
        }
    }
}

/// The full extraction surface handed to job engines.
#[derive(Clone)]
pub struct Extractors {
    pub embedder: Arc<dyn EmbeddingExtractor>,
    pub detector: Arc<dyn ObjectDetector>,
    pub attributes: Arc<dyn AttributeExtractor>,
    pub frames: Arc<dyn FrameProvider>,
    pub gate: ExtractorGate,
}

impl Extractors {
    pub fn new(
        embedder: Arc<dyn EmbeddingExtractor>,
        detector: Arc<dyn ObjectDetector>,
        attributes: Arc<dyn AttributeExtractor>,
        frames: Arc<dyn FrameProvider>,
        config: &crate::config::ExtractorConfig,
    ) -> Self {
        Self {
            embedder,
            detector,
            attributes,
            frames,
            gate: ExtractorGate::new(config.max_concurrent, Duration::from_secs(config.timeout_secs)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn gate_times_out_slow_calls() {
        let gate = ExtractorGate::new(1, Duration::from_millis(20));
        let result: Result<(), _> = gate
            .run(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(ExtractorError::Timeout)));
    }

    #[tokio::test]
    async fn gate_passes_fast_calls_through() {
        let gate = ExtractorGate::new(2, Duration::from_secs(1));
        let result = gate.run(async { Ok(42u32) }).await;
        assert_eq!(result.unwrap(), 42);
    }
}

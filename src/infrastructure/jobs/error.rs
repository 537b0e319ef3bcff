//! Job error taxonomy.
//!
//! Every path through a job body ends in a persisted terminal status; none
//! of these variants crosses the job boundary silently.

use thiserror::Error;

use crate::domain::ValidationError;
use crate::extract::ExtractorError;
use crate::infrastructure::store::StoreError;

#[derive(Debug, Error)]
pub enum JobError {
    /// Rejected at submission; no job row is created.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// An extractor call failed or timed out.
    #[error("extraction failed: {0}")]
    Extractor(#[from] ExtractorError),

    /// A store unit failed after exhausting its retry budget.
    #[error("store failure: {0}")]
    Store(#[from] StoreError),

    /// Observed cooperatively; ends in CANCELLED, not FAILED.
    #[error("job cancelled")]
    Cancelled,

    #[error("job not found: {0}")]
    NotFound(String),
}

pub type JobResult<T> = Result<T, JobError>;

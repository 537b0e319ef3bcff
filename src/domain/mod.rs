//! Domain types shared by the store and the job engines.

pub mod embedding;
pub mod frame;
pub mod query;
pub mod timestamp;

pub use embedding::{Embedding, EmbeddingEntityType, EmbeddingOwner, EMBEDDING_DIM};
pub use frame::{
    BBox, Frame, HsvColor, ObjectType, PersonAttributes, SceneObject, TransportAttributes,
};
pub use query::{parse_query, ParsedQuery};
pub use timestamp::{merge_span, missing_ranges, TimeMapper, TimeRange, Timestamp};

use thiserror::Error;

/// Rejected at submission; a job row is never created for these.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("malformed timestamp: {0}")]
    MalformedTimestamp(String),

    #[error("range end must be greater than start: {0} .. {1}")]
    InvertedRange(String, String),

    #[error("at least one time range is required")]
    EmptyRangeSet,

    #[error("unknown source: {0}")]
    UnknownSource(String),

    #[error("query text is empty")]
    EmptyQuery,

    #[error("job is not in a cancellable state: {0}")]
    NotCancellable(String),
}

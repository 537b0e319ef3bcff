//! Embedding vectors and their owning entity.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Dimension of every vector produced by the embedding extractor.
pub const EMBEDDING_DIM: usize = 512;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum EmbeddingEntityType {
    Frame,
    Object,
}

/// The entity an embedding belongs to. Exactly one owner, by construction;
/// the store mirrors this as two nullable columns under a CHECK constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmbeddingOwner {
    Frame(Uuid),
    Object(Uuid),
}

impl EmbeddingOwner {
    pub fn entity_type(&self) -> EmbeddingEntityType {
        match self {
            Self::Frame(_) => EmbeddingEntityType::Frame,
            Self::Object(_) => EmbeddingEntityType::Object,
        }
    }

    pub fn frame_id(&self) -> Option<Uuid> {
        match self {
            Self::Frame(id) => Some(*id),
            Self::Object(_) => None,
        }
    }

    pub fn object_id(&self) -> Option<Uuid> {
        match self {
            Self::Object(id) => Some(*id),
            Self::Frame(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub id: Uuid,
    pub owner: EmbeddingOwner,
    pub vector: Vec<f32>,
}

impl Embedding {
    pub fn for_frame(frame_id: Uuid, vector: Vec<f32>) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner: EmbeddingOwner::Frame(frame_id),
            vector,
        }
    }

    pub fn for_object(object_id: Uuid, vector: Vec<f32>) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner: EmbeddingOwner::Object(object_id),
            vector,
        }
    }
}

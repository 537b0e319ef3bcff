//! Frame bundle persistence.
//!
//! One frame's worth of rows (frame, objects, attributes, embeddings) is the
//! transactional unit of vectorization: either the whole bundle lands or
//! none of it does.

use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, TransactionTrait,
};
use uuid::Uuid;

use super::{Store, StoreError};
use crate::domain::{Embedding, Frame, SceneObject, TimeRange};
use crate::infrastructure::database::entities::{
    embeddings, frames, objects, person_attrs, transport_attrs,
};

/// Attribute payload for one detected object, matching its type.
#[derive(Debug, Clone)]
pub enum ObjectAttributes {
    Transport {
        color_hsv: String,
        license_plate: Option<String>,
    },
    Person {
        upper_color_hsv: Option<String>,
        lower_color_hsv: Option<String>,
    },
}

#[derive(Debug, Clone)]
pub struct ObjectBundle {
    pub object: SceneObject,
    pub attributes: ObjectAttributes,
    pub embedding: Option<Vec<f32>>,
}

/// Everything extracted from a single frame.
#[derive(Debug, Clone)]
pub struct FrameBundle {
    pub frame: Frame,
    pub frame_embedding: Option<Vec<f32>>,
    pub objects: Vec<ObjectBundle>,
}

impl Store {
    pub async fn insert_frame_bundle(&self, bundle: &FrameBundle) -> Result<(), StoreError> {
        self.retried("insert_frame_bundle", || async {
            let txn = self.conn.begin().await?;

            frames::ActiveModel {
                id: Set(bundle.frame.id.to_string()),
                source_id: Set(bundle.frame.source_id.clone()),
                timestamp_sec: Set(bundle.frame.timestamp_sec),
                at: Set(bundle.frame.at.as_str().to_string()),
            }
            .insert(&txn)
            .await?;

            if let Some(vector) = &bundle.frame_embedding {
                insert_embedding(&txn, &Embedding::for_frame(bundle.frame.id, vector.clone()))
                    .await?;
            }

            for ob in &bundle.objects {
                objects::ActiveModel {
                    id: Set(ob.object.id.to_string()),
                    frame_id: Set(ob.object.frame_id.to_string()),
                    object_type: Set(ob.object.object_type.to_string()),
                    bbox_x: Set(ob.object.bbox.x),
                    bbox_y: Set(ob.object.bbox.y),
                    bbox_width: Set(ob.object.bbox.width),
                    bbox_height: Set(ob.object.bbox.height),
                    track_id: Set(ob.object.track_id),
                }
                .insert(&txn)
                .await?;

                match &ob.attributes {
                    ObjectAttributes::Transport {
                        color_hsv,
                        license_plate,
                    } => {
                        transport_attrs::ActiveModel {
                            id: Set(Uuid::new_v4().to_string()),
                            object_id: Set(ob.object.id.to_string()),
                            color_hsv: Set(color_hsv.clone()),
                            license_plate: Set(license_plate.clone()),
                        }
                        .insert(&txn)
                        .await?;
                    }
                    ObjectAttributes::Person {
                        upper_color_hsv,
                        lower_color_hsv,
                    } => {
                        person_attrs::ActiveModel {
                            id: Set(Uuid::new_v4().to_string()),
                            object_id: Set(ob.object.id.to_string()),
                            upper_color_hsv: Set(upper_color_hsv.clone()),
                            lower_color_hsv: Set(lower_color_hsv.clone()),
                        }
                        .insert(&txn)
                        .await?;
                    }
                }

                if let Some(vector) = &ob.embedding {
                    insert_embedding(&txn, &Embedding::for_object(ob.object.id, vector.clone()))
                        .await?;
                }
            }

            txn.commit().await?;
            Ok(())
        })
        .await
    }

    pub async fn count_frames_in_range(
        &self,
        source_id: &str,
        range: &TimeRange,
    ) -> Result<u64, StoreError> {
        Ok(frames::Entity::find()
            .filter(frames::Column::SourceId.eq(source_id))
            .filter(frames::Column::At.gte(range.start_at.as_str()))
            .filter(frames::Column::At.lt(range.end_at.as_str()))
            .count(&self.conn)
            .await?)
    }

    pub async fn frames_in_range(
        &self,
        source_id: &str,
        range: &TimeRange,
    ) -> Result<Vec<frames::Model>, StoreError> {
        Ok(frames::Entity::find()
            .filter(frames::Column::SourceId.eq(source_id))
            .filter(frames::Column::At.gte(range.start_at.as_str()))
            .filter(frames::Column::At.lt(range.end_at.as_str()))
            .order_by_asc(frames::Column::At)
            .all(&self.conn)
            .await?)
    }
}

async fn insert_embedding(
    txn: &sea_orm::DatabaseTransaction,
    embedding: &Embedding,
) -> Result<(), StoreError> {
    embeddings::ActiveModel {
        id: Set(embedding.id.to_string()),
        entity_type: Set(embedding.owner.entity_type().to_string()),
        frame_id: Set(embedding.owner.frame_id().map(|id| id.to_string())),
        object_id: Set(embedding.owner.object_id().map(|id| id.to_string())),
        vector: Set(serde_json::to_string(&embedding.vector)?),
    }
    .insert(txn)
    .await?;
    Ok(())
}

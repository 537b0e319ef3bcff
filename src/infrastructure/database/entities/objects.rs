//! Object entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "objects")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub frame_id: String,
    /// "PERSON" or "TRANSPORT"
    #[sea_orm(column_name = "type")]
    pub object_type: String,
    pub bbox_x: i32,
    pub bbox_y: i32,
    pub bbox_width: i32,
    pub bbox_height: i32,
    /// Detector track identity, when tracking is available.
    pub track_id: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::frames::Entity",
        from = "Column::FrameId",
        to = "super::frames::Column::Id"
    )]
    Frames,
    #[sea_orm(has_one = "super::transport_attrs::Entity")]
    TransportAttrs,
    #[sea_orm(has_one = "super::person_attrs::Entity")]
    PersonAttrs,
    #[sea_orm(has_many = "super::embeddings::Entity")]
    Embeddings,
}

impl Related<super::frames::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Frames.def()
    }
}

impl Related<super::transport_attrs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TransportAttrs.def()
    }
}

impl Related<super::person_attrs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PersonAttrs.def()
    }
}

impl Related<super::embeddings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Embeddings.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

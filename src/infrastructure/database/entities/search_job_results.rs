//! Search job result entity: the final ranked hit list of a search job.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "search_job_results")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub job_id: String,
    pub frame_id: String,
    /// Null for frame-level hits.
    pub object_id: Option<String>,
    pub rank: i32,
    pub final_score: f64,
    pub clip_score: f64,
    pub color_score: f64,
    pub plate_score: f64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::search_jobs::Entity",
        from = "Column::JobId",
        to = "super::search_jobs::Column::Id"
    )]
    SearchJobs,
    #[sea_orm(
        belongs_to = "super::frames::Entity",
        from = "Column::FrameId",
        to = "super::frames::Column::Id"
    )]
    Frames,
}

impl Related<super::search_jobs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SearchJobs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

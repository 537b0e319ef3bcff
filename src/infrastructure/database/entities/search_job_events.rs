//! Search job event entity: live per-track running score, emitted while the
//! job is still scoring so pollers can observe partial results.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "search_job_events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub job_id: String,
    pub track_id: Option<i64>,
    pub object_id: Option<String>,
    /// Maximum score observed for the track so far.
    pub score: f64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::search_jobs::Entity",
        from = "Column::JobId",
        to = "super::search_jobs::Column::Id"
    )]
    SearchJobs,
}

impl Related<super::search_jobs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SearchJobs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

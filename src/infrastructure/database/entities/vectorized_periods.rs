//! Vectorized period entity
//!
//! One row per fully vectorized `[start_at, end_at)` span of a source.
//! Non-overlap within a source is maintained by the period tracker's
//! merge-on-insert; the unique index covers the exact tuple.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vectorized_periods")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub source_id: String,
    pub start_at: String,
    pub end_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

//! Vectorized period rows.
//!
//! `insert_merged_period` is the only writer and keeps the per-source period
//! set disjoint: inside one transaction it collects every stored period that
//! overlaps or touches the new range, deletes them, and inserts their union.

use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QueryOrder,
    TransactionTrait,
};
use uuid::Uuid;

use super::{Store, StoreError};
use crate::domain::{merge_span, TimeRange};
use crate::infrastructure::database::entities::vectorized_periods;

impl Store {
    /// All periods of a source, ordered by `start_at`.
    pub async fn periods_for_source(&self, source_id: &str) -> Result<Vec<TimeRange>, StoreError> {
        let rows = vectorized_periods::Entity::find()
            .filter(vectorized_periods::Column::SourceId.eq(source_id))
            .order_by_asc(vectorized_periods::Column::StartAt)
            .all(&self.conn)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| TimeRange::new(row.start_at, row.end_at))
            .collect())
    }

    /// Record a completed range, merging with any overlapping or adjacent
    /// periods so the invariant "no two periods of a source overlap" holds
    /// after every write. Returns the merged span actually stored.
    pub async fn insert_merged_period(
        &self,
        source_id: &str,
        range: &TimeRange,
    ) -> Result<TimeRange, StoreError> {
        if range.is_empty() {
            return Ok(range.clone());
        }

        self.retried("insert_merged_period", || async {
            let txn = self.conn.begin().await?;

            let absorbed = vectorized_periods::Entity::find()
                .filter(vectorized_periods::Column::SourceId.eq(source_id))
                .filter(vectorized_periods::Column::StartAt.lte(range.end_at.as_str()))
                .filter(vectorized_periods::Column::EndAt.gte(range.start_at.as_str()))
                .all(&txn)
                .await?;

            let spans: Vec<TimeRange> = absorbed
                .iter()
                .map(|row| TimeRange::new(row.start_at.clone(), row.end_at.clone()))
                .collect();
            let merged = merge_span(range, &spans);

            if !absorbed.is_empty() {
                let ids: Vec<String> = absorbed.iter().map(|row| row.id.clone()).collect();
                vectorized_periods::Entity::delete_many()
                    .filter(vectorized_periods::Column::Id.is_in(ids))
                    .exec(&txn)
                    .await?;
            }

            vectorized_periods::ActiveModel {
                id: Set(Uuid::new_v4().to_string()),
                source_id: Set(source_id.to_string()),
                start_at: Set(merged.start_at.as_str().to_string()),
                end_at: Set(merged.end_at.as_str().to_string()),
            }
            .insert(&txn)
            .await?;

            txn.commit().await?;
            Ok(merged)
        })
        .await
    }
}

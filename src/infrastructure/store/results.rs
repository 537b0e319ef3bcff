//! Search result and event persistence.

use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, TransactionTrait,
};
use uuid::Uuid;

use super::{Store, StoreError};
use crate::infrastructure::database::entities::{search_job_events, search_job_results};

/// A ranked hit about to be persisted for a search job.
#[derive(Debug, Clone)]
pub struct NewSearchResult {
    pub frame_id: String,
    pub object_id: Option<String>,
    pub rank: i32,
    pub final_score: f64,
    pub clip_score: f64,
    pub color_score: f64,
    pub plate_score: f64,
}

impl Store {
    /// Swap the job's result set: delete whatever partial set a previous
    /// pass wrote, insert the new ranked rows, all in one transaction.
    pub async fn replace_search_results(
        &self,
        job_id: &str,
        rows: &[NewSearchResult],
    ) -> Result<(), StoreError> {
        self.retried("replace_search_results", || async {
            let txn = self.conn.begin().await?;

            search_job_results::Entity::delete_many()
                .filter(search_job_results::Column::JobId.eq(job_id))
                .exec(&txn)
                .await?;

            for row in rows {
                search_job_results::ActiveModel {
                    id: Set(Uuid::new_v4().to_string()),
                    job_id: Set(job_id.to_string()),
                    frame_id: Set(row.frame_id.clone()),
                    object_id: Set(row.object_id.clone()),
                    rank: Set(row.rank),
                    final_score: Set(row.final_score),
                    clip_score: Set(row.clip_score),
                    color_score: Set(row.color_score),
                    plate_score: Set(row.plate_score),
                }
                .insert(&txn)
                .await?;
            }

            txn.commit().await?;
            Ok(())
        })
        .await
    }

    pub async fn search_results(
        &self,
        job_id: &str,
    ) -> Result<Vec<search_job_results::Model>, StoreError> {
        Ok(search_job_results::Entity::find()
            .filter(search_job_results::Column::JobId.eq(job_id))
            .order_by_asc(search_job_results::Column::Rank)
            .all(&self.conn)
            .await?)
    }

    /// Keep one event row per track (or per untracked object), raised to the
    /// maximum score observed so far.
    pub async fn upsert_track_event(
        &self,
        job_id: &str,
        track_id: Option<i64>,
        object_id: Option<&str>,
        score: f64,
    ) -> Result<(), StoreError> {
        let mut query = search_job_events::Entity::find()
            .filter(search_job_events::Column::JobId.eq(job_id));

        query = match (track_id, object_id) {
            (Some(track), _) => query.filter(search_job_events::Column::TrackId.eq(track)),
            (None, Some(object)) => query
                .filter(search_job_events::Column::TrackId.is_null())
                .filter(search_job_events::Column::ObjectId.eq(object)),
            (None, None) => query
                .filter(search_job_events::Column::TrackId.is_null())
                .filter(search_job_events::Column::ObjectId.is_null()),
        };

        if let Some(existing) = query.one(&self.conn).await? {
            if score > existing.score {
                let mut active = existing.into_active_model();
                active.score = Set(score);
                active.object_id = Set(object_id.map(str::to_string));
                active.update(&self.conn).await?;
            }
            return Ok(());
        }

        search_job_events::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            job_id: Set(job_id.to_string()),
            track_id: Set(track_id),
            object_id: Set(object_id.map(str::to_string)),
            score: Set(score),
        }
        .insert(&self.conn)
        .await?;
        Ok(())
    }

    pub async fn search_events(
        &self,
        job_id: &str,
    ) -> Result<Vec<search_job_events::Model>, StoreError> {
        Ok(search_job_events::Entity::find()
            .filter(search_job_events::Column::JobId.eq(job_id))
            .order_by_desc(search_job_events::Column::Score)
            .all(&self.conn)
            .await?)
    }
}

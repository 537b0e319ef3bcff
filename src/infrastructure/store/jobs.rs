//! Job record persistence.
//!
//! Status transitions are monotonic at the store level: once a row is in a
//! terminal status it is never rewritten, whatever a late writer asks for.
//! Progress only moves forward.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, EntityTrait, IntoActiveModel, QueryOrder};
use tracing::debug;

use super::{Store, StoreError};
use crate::domain::TimeRange;
use crate::infrastructure::database::entities::{search_jobs, vectorization_jobs};
use crate::infrastructure::jobs::types::JobStatus;

impl Store {
    pub async fn create_vectorization_job(
        &self,
        id: &str,
        source_id: &str,
        ranges: &[TimeRange],
    ) -> Result<vectorization_jobs::Model, StoreError> {
        let now = Utc::now();
        let model = vectorization_jobs::ActiveModel {
            id: Set(id.to_string()),
            source_id: Set(source_id.to_string()),
            ranges: Set(serde_json::to_string(ranges)?),
            status: Set(JobStatus::Pending.to_string()),
            progress: Set(0.0),
            error: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };
        Ok(model.insert(&self.conn).await?)
    }

    pub async fn vectorization_job(
        &self,
        id: &str,
    ) -> Result<Option<vectorization_jobs::Model>, StoreError> {
        Ok(vectorization_jobs::Entity::find_by_id(id)
            .one(&self.conn)
            .await?)
    }

    pub async fn list_vectorization_jobs(
        &self,
    ) -> Result<Vec<vectorization_jobs::Model>, StoreError> {
        Ok(vectorization_jobs::Entity::find()
            .order_by_desc(vectorization_jobs::Column::CreatedAt)
            .all(&self.conn)
            .await?)
    }

    /// Raise the persisted progress; a value below the stored one is
    /// ignored so external pollers never observe progress going backwards.
    pub async fn advance_vectorization_progress(
        &self,
        id: &str,
        progress: f64,
    ) -> Result<(), StoreError> {
        let Some(current) = self.vectorization_job(id).await? else {
            return Err(StoreError::NotFound(format!("vectorization job {id}")));
        };
        if progress <= current.progress {
            return Ok(());
        }
        let mut active = current.into_active_model();
        active.progress = Set(progress.min(1.0));
        active.updated_at = Set(Utc::now());
        active.update(&self.conn).await?;
        Ok(())
    }

    /// Move a vectorization job to `status`. Terminal rows are left
    /// untouched and returned as-is.
    pub async fn transition_vectorization_status(
        &self,
        id: &str,
        status: JobStatus,
        error: Option<&str>,
    ) -> Result<vectorization_jobs::Model, StoreError> {
        let Some(current) = self.vectorization_job(id).await? else {
            return Err(StoreError::NotFound(format!("vectorization job {id}")));
        };

        let current_status = parse_status(&current.status)?;
        if current_status.is_terminal() {
            debug!(job_id = id, status = %current.status, "ignoring transition on terminal job");
            return Ok(current);
        }

        let mut active = current.into_active_model();
        active.status = Set(status.to_string());
        active.error = Set(error.map(str::to_string));
        active.updated_at = Set(Utc::now());
        Ok(active.update(&self.conn).await?)
    }

    pub async fn create_search_job(
        &self,
        id: &str,
        title: &str,
        text_query: &str,
        source_id: &str,
        range: &TimeRange,
    ) -> Result<search_jobs::Model, StoreError> {
        let model = search_jobs::ActiveModel {
            id: Set(id.to_string()),
            title: Set(title.to_string()),
            text_query: Set(text_query.to_string()),
            source_id: Set(source_id.to_string()),
            start_at: Set(range.start_at.as_str().to_string()),
            end_at: Set(range.end_at.as_str().to_string()),
            progress: Set(0.0),
            status: Set(JobStatus::Pending.to_string()),
            error: Set(None),
        };
        Ok(model.insert(&self.conn).await?)
    }

    pub async fn search_job(&self, id: &str) -> Result<Option<search_jobs::Model>, StoreError> {
        Ok(search_jobs::Entity::find_by_id(id).one(&self.conn).await?)
    }

    pub async fn list_search_jobs(&self) -> Result<Vec<search_jobs::Model>, StoreError> {
        Ok(search_jobs::Entity::find()
            .order_by_desc(search_jobs::Column::Id)
            .all(&self.conn)
            .await?)
    }

    pub async fn advance_search_progress(&self, id: &str, progress: f64) -> Result<(), StoreError> {
        let Some(current) = self.search_job(id).await? else {
            return Err(StoreError::NotFound(format!("search job {id}")));
        };
        if progress <= current.progress {
            return Ok(());
        }
        let mut active = current.into_active_model();
        active.progress = Set(progress.min(1.0));
        active.update(&self.conn).await?;
        Ok(())
    }

    pub async fn transition_search_status(
        &self,
        id: &str,
        status: JobStatus,
        error: Option<&str>,
    ) -> Result<search_jobs::Model, StoreError> {
        let Some(current) = self.search_job(id).await? else {
            return Err(StoreError::NotFound(format!("search job {id}")));
        };

        let current_status = parse_status(&current.status)?;
        if current_status.is_terminal() {
            debug!(job_id = id, status = %current.status, "ignoring transition on terminal job");
            return Ok(current);
        }

        let mut active = current.into_active_model();
        active.status = Set(status.to_string());
        active.error = Set(error.map(str::to_string));
        Ok(active.update(&self.conn).await?)
    }
}

pub(crate) fn parse_status(raw: &str) -> Result<JobStatus, StoreError> {
    raw.parse::<JobStatus>()
        .map_err(|_| StoreError::Corrupt(format!("unknown job status: {raw}")))
}

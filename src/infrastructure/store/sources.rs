//! Source and task reference tables.

use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use uuid::Uuid;

use super::{Store, StoreError};
use crate::infrastructure::database::entities::{sources, tasks};

impl Store {
    /// Register a source, returning the existing row when the external id is
    /// already known.
    pub async fn ensure_source(&self, source_id: &str) -> Result<sources::Model, StoreError> {
        if let Some(existing) = self.find_source(source_id).await? {
            return Ok(existing);
        }

        let model = sources::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            source_id: Set(source_id.to_string()),
        };
        Ok(model.insert(&self.conn).await?)
    }

    pub async fn find_source(&self, source_id: &str) -> Result<Option<sources::Model>, StoreError> {
        Ok(sources::Entity::find()
            .filter(sources::Column::SourceId.eq(source_id))
            .one(&self.conn)
            .await?)
    }

    pub async fn list_sources(&self) -> Result<Vec<sources::Model>, StoreError> {
        Ok(sources::Entity::find()
            .order_by_asc(sources::Column::SourceId)
            .all(&self.conn)
            .await?)
    }

    pub async fn create_task(
        &self,
        name: &str,
        source_id: &str,
        start_at: &str,
        end_at: &str,
    ) -> Result<tasks::Model, StoreError> {
        let model = tasks::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            name: Set(name.to_string()),
            source_id: Set(source_id.to_string()),
            start_at: Set(start_at.to_string()),
            end_at: Set(end_at.to_string()),
        };
        Ok(model.insert(&self.conn).await?)
    }

    pub async fn list_tasks_for_source(
        &self,
        source_id: &str,
    ) -> Result<Vec<tasks::Model>, StoreError> {
        Ok(tasks::Entity::find()
            .filter(tasks::Column::SourceId.eq(source_id))
            .order_by_asc(tasks::Column::StartAt)
            .all(&self.conn)
            .await?)
    }
}

use async_trait::async_trait;
use sqlx::SqlitePool;

use super::TaskStore;
use crate::db::repository;
use crate::error::StoreError;
use crate::models::{NewTaskRequest, Task, UpdateTaskRequest};

/// Task Store bound to one owner over a local pool.
pub struct SqliteTaskStore {
    db: SqlitePool,
    owner_id: String,
}

impl SqliteTaskStore {
    pub fn new(db: SqlitePool, owner_id: impl Into<String>) -> Self {
        Self {
            db,
            owner_id: owner_id.into(),
        }
    }
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    async fn list_tasks(&self) -> Result<Vec<Task>, StoreError> {
        Ok(repository::fetch_tasks(&self.db, &self.owner_id).await?)
    }

    async fn create_task(&self, req: &NewTaskRequest) -> Result<Task, StoreError> {
        req.validate()?;
        Ok(repository::insert_task(&self.db, &self.owner_id, req.clone()).await?)
    }

    async fn update_task(&self, id: &str, req: &UpdateTaskRequest) -> Result<Task, StoreError> {
        let current = repository::find_task(&self.db, &self.owner_id, id)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        req.validate(&current)?;

        repository::update_task(&self.db, &self.owner_id, id, req.clone())
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn delete_task(&self, id: &str) -> Result<(), StoreError> {
        if repository::delete_task(&self.db, &self.owner_id, id).await? {
            Ok(())
        } else {
            Err(StoreError::NotFound(id.to_string()))
        }
    }

    async fn mark_reminder_sent(&self, id: &str) -> Result<(), StoreError> {
        if repository::mark_reminder_sent(&self.db, &self.owner_id, id).await? {
            Ok(())
        } else {
            Err(StoreError::NotFound(id.to_string()))
        }
    }
}

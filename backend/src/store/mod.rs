//! Task Store access for the reminder side.
//!
//! The reminder engine only sees the [`TaskStore`] trait. [`HttpTaskStore`]
//! talks to the TaskMaster HTTP API with a bearer credential;
//! [`SqliteTaskStore`] serves the same operations straight from a pool for
//! an in-process owner.

mod http;
mod sqlite;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{NewTaskRequest, Task, UpdateTaskRequest};

pub use http::HttpTaskStore;
pub use sqlite::SqliteTaskStore;

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn list_tasks(&self) -> Result<Vec<Task>, StoreError>;
    async fn create_task(&self, req: &NewTaskRequest) -> Result<Task, StoreError>;
    async fn update_task(&self, id: &str, req: &UpdateTaskRequest) -> Result<Task, StoreError>;
    async fn delete_task(&self, id: &str) -> Result<(), StoreError>;
    async fn mark_reminder_sent(&self, id: &str) -> Result<(), StoreError>;
}

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::debug;

use super::TaskStore;
use crate::error::StoreError;
use crate::models::{NewTaskRequest, Task, UpdateTaskRequest};

pub struct HttpTaskStore {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpTaskStore {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self, StoreError> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Response, StoreError> {
        let response = request.bearer_auth(&self.token).send().await?;
        let status = response.status();
        debug!("task store {} -> {}", what, status);

        match status {
            s if s.is_success() => Ok(response),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(StoreError::Unauthorized),
            StatusCode::NOT_FOUND => Err(StoreError::NotFound(what.to_string())),
            StatusCode::BAD_REQUEST | StatusCode::CONFLICT => {
                let body = response.text().await.unwrap_or_default();
                Err(StoreError::Rejected(body))
            }
            _ => {
                let body = response.text().await.unwrap_or_default();
                Err(StoreError::Status {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }
}

#[async_trait]
impl TaskStore for HttpTaskStore {
    async fn list_tasks(&self) -> Result<Vec<Task>, StoreError> {
        let response = self
            .send(self.client.get(self.url("/tasks")), "list tasks")
            .await?;
        Ok(response.json().await?)
    }

    async fn create_task(&self, req: &NewTaskRequest) -> Result<Task, StoreError> {
        let response = self
            .send(self.client.post(self.url("/tasks")).json(req), "create task")
            .await?;
        Ok(response.json().await?)
    }

    async fn update_task(&self, id: &str, req: &UpdateTaskRequest) -> Result<Task, StoreError> {
        let response = self
            .send(
                self.client.put(self.url(&format!("/tasks/{id}"))).json(req),
                id,
            )
            .await?;
        Ok(response.json().await?)
    }

    async fn delete_task(&self, id: &str) -> Result<(), StoreError> {
        self.send(self.client.delete(self.url(&format!("/tasks/{id}"))), id)
            .await?;
        Ok(())
    }

    async fn mark_reminder_sent(&self, id: &str) -> Result<(), StoreError> {
        self.send(
            self.client
                .post(self.url(&format!("/tasks/{id}/reminder-sent"))),
            id,
        )
        .await?;
        Ok(())
    }
}

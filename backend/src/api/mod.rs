use axum::Json;
use axum::extract::Path;
use axum::extract::rejection::JsonRejection;
use axum::routing::{post, put};
use axum::{Router, extract::State, http::StatusCode, routing::get};
use serde_json::{Value, json};
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::Owner;
use crate::db::repository;
use crate::error::{AppError, TaskRuleError};
use crate::models::*;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/tasks", get(list_tasks).post(create_task))
        .route("/tasks/{id}", put(update_task).delete(delete_task))
        .route("/tasks/{id}/reminder-sent", post(mark_reminder_sent))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(StatusCode::OK)
}

async fn list_tasks(
    State(state): State<AppState>,
    Owner(owner): Owner,
) -> Result<Json<Vec<Task>>, AppError> {
    let tasks = repository::fetch_tasks(&state.db, &owner).await?;
    Ok(Json(tasks))
}

async fn create_task(
    State(state): State<AppState>,
    Owner(owner): Owner,
    payload: Result<Json<NewTaskRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Task>), AppError> {
    let Json(req) = payload.map_err(|e| {
        debug!("rejected task body: {}", e.body_text());
        TaskRuleError::MissingFields
    })?;
    req.validate()?;

    let task = repository::insert_task(&state.db, &owner, req).await?;
    info!(task_id = %task.id, "task created");
    Ok((StatusCode::CREATED, Json(task)))
}

async fn update_task(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<String>,
    Json(req): Json<UpdateTaskRequest>,
) -> Result<Json<Task>, AppError> {
    let current = repository::find_task(&state.db, &owner, &id)
        .await?
        .ok_or(AppError::NotFound)?;
    req.validate(&current)?;

    let task = repository::update_task(&state.db, &owner, &id, req)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(task))
}

async fn delete_task(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    if repository::delete_task(&state.db, &owner, &id).await? {
        Ok(Json(json!({ "message": "Task deleted successfully" })))
    } else {
        Err(AppError::NotFound)
    }
}

async fn mark_reminder_sent(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    if Uuid::parse_str(&id).is_err() {
        return Err(AppError::BadRequest("Invalid task ID".to_string()));
    }

    if repository::mark_reminder_sent(&state.db, &owner, &id).await? {
        Ok(Json(json!({ "success": true })))
    } else {
        Err(AppError::NotFound)
    }
}

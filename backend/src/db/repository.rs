use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::{NewTaskRequest, Task, UpdateTaskRequest};

const TASK_COLUMNS: &str = "id, owner_id, title, description, priority, status, reminder_time, created_at, reminder_sent";

pub async fn fetch_tasks(db: &SqlitePool, owner_id: &str) -> Result<Vec<Task>, sqlx::Error> {
    sqlx::query_as::<_, Task>(&format!(
        "SELECT {TASK_COLUMNS} FROM tasks WHERE owner_id = ? ORDER BY created_at DESC"
    ))
    .bind(owner_id)
    .fetch_all(db)
    .await
}

pub async fn find_task(
    db: &SqlitePool,
    owner_id: &str,
    id: &str,
) -> Result<Option<Task>, sqlx::Error> {
    sqlx::query_as::<_, Task>(&format!(
        "SELECT {TASK_COLUMNS} FROM tasks WHERE id = ? AND owner_id = ?"
    ))
    .bind(id)
    .bind(owner_id)
    .fetch_optional(db)
    .await
}

pub async fn insert_task(
    db: &SqlitePool,
    owner_id: &str,
    req: NewTaskRequest,
) -> Result<Task, sqlx::Error> {
    let task = Task {
        id: Uuid::new_v4().to_string(),
        owner_id: owner_id.to_string(),
        title: req.title,
        description: req.description.unwrap_or_default(),
        priority: req.priority.unwrap_or_default(),
        status: Default::default(),
        reminder_time: req.reminder_time,
        created_at: Utc::now(),
        reminder_sent: false,
    };

    sqlx::query(
        r#"
        INSERT INTO tasks
            (id, owner_id, title, description, priority, status,
            reminder_time, created_at, reminder_sent)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0)
        "#,
    )
    .bind(&task.id)
    .bind(&task.owner_id)
    .bind(&task.title)
    .bind(&task.description)
    .bind(task.priority)
    .bind(task.status)
    .bind(task.reminder_time)
    .bind(task.created_at)
    .execute(db)
    .await?;

    Ok(task)
}

/// Applies the present fields of `req`. Returns `None` when the task is not the owner's.
pub async fn update_task(
    db: &SqlitePool,
    owner_id: &str,
    id: &str,
    req: UpdateTaskRequest,
) -> Result<Option<Task>, sqlx::Error> {
    let mut current = match find_task(db, owner_id, id).await? {
        Some(t) => t,
        None => return Ok(None),
    };

    if let Some(title) = req.title {
        current.title = title;
    }
    if let Some(description) = req.description {
        current.description = description;
    }
    if let Some(priority) = req.priority {
        current.priority = priority;
    }
    if let Some(status) = req.status {
        current.status = status;
    }
    if let Some(reminder_time) = req.reminder_time {
        current.reminder_time = reminder_time;
    }

    sqlx::query(
        r#"
        UPDATE tasks
        SET title = ?1,
            description = ?2,
            priority = ?3,
            status = ?4,
            reminder_time = ?5
        WHERE id = ?6 AND owner_id = ?7
        "#,
    )
    .bind(&current.title)
    .bind(&current.description)
    .bind(current.priority)
    .bind(current.status)
    .bind(current.reminder_time)
    .bind(id)
    .bind(owner_id)
    .execute(db)
    .await?;

    Ok(Some(current))
}

pub async fn delete_task(db: &SqlitePool, owner_id: &str, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM tasks WHERE id = ?1 AND owner_id = ?2")
        .bind(id)
        .bind(owner_id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}

/// Sets the reminder-sent flag. The flag is never cleared.
pub async fn mark_reminder_sent(
    db: &SqlitePool,
    owner_id: &str,
    id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE tasks SET reminder_sent = 1 WHERE id = ?1 AND owner_id = ?2")
        .bind(id)
        .bind(owner_id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}

use chrono::{Duration, Utc};
use dotenvy::dotenv;
use reqwest::Client;
use serde::Deserialize;
use std::env;

fn is_dry_run() -> bool {
    !std::env::args().any(|a| a == "--apply")
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedTask {
    id: String,
    title: String,
    reminder_time: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    let token = env::var("TASKMASTER_TOKEN")?;
    let api_url = env::var("TASKMASTER_API_URL")
        .unwrap_or_else(|_| "http://127.0.0.1:3000".to_string());

    let reminder_time = Utc::now() + Duration::minutes(1);
    let body = serde_json::json!({
        "title": "Test Task - Due in 1 minute",
        "description": "This is a test task to verify notifications work",
        "priority": "high",
        "reminderTime": reminder_time.to_rfc3339(),
    });

    if is_dry_run() {
        println!("[DRY RUN] Would POST {}/tasks {}", api_url.trim_end_matches('/'), body);
        return Ok(());
    }

    let client = Client::new();
    let created: CreatedTask = client
        .post(format!("{}/tasks", api_url.trim_end_matches('/')))
        .bearer_auth(&token)
        .json(&body)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    println!(
        "Created task {} \"{}\" due at {}",
        created.id, created.title, created.reminder_time
    );

    Ok(())
}

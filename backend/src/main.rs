use std::sync::Arc;

use tracing::{info, warn};

use taskmaster::api::router;
use taskmaster::auth::StaticTokenVerifier;
use taskmaster::config::ServerConfig;
use taskmaster::db;
use taskmaster::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    taskmaster::init_tracing("taskmaster=debug");

    let config = ServerConfig::new_from_env()?;
    if config.tokens.is_empty() {
        warn!("TASKMASTER_TOKENS is empty; every request will be rejected");
    }

    let pool = db::connect(&config.database_url).await?;

    let state = AppState {
        db: pool.clone(),
        tokens: Arc::new(StaticTokenVerifier::new(config.tokens.clone())),
    };

    let app = router(state);

    info!("listening on http://{}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

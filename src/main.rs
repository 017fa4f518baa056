mod app;
mod auth;
mod config;
mod db;
mod email;
mod error;
mod extract;
mod images;
mod projects;
mod state;
mod storage;
mod users;
mod validation;

#[cfg(test)]
mod test_support;

use crate::config::AppConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "devport=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = AppConfig::from_env()?;
    tracing::info!(env = ?config.env, "configuration loaded");

    let db = db::connect(&config.database_url).await?;
    db::migrate(&db).await?;

    let state = AppState::init(config, db).await?;
    app::serve(app::build_app(state)).await
}

mod app;
mod auth;
mod config;
mod db;
mod email_config;
mod error;
mod inventory;
mod notifications;
mod products;
mod reports;
mod response;
mod state;
mod transactions;
mod users;

use crate::{config::AppConfig, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "stockroom=debug,axum=info,tower_http=info,sqlx=warn".to_string());
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
    let (host, port) = (config.host.clone(), config.port);
    let app_state = AppState::init(config).await?;

    if app_state.config.daily_summary_enabled {
        notifications::summary::spawn_scheduler(app_state.clone());
    }

    let app = app::build_app(app_state);
    app::serve(app, &host, port).await
}

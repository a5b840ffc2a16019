mod app;
mod auth;
mod config;
mod db;
mod error;
mod generation;
mod images;
mod memory;
mod nutrition;
mod pantry;
mod recipes;
mod recommendations;
mod seed;
mod sessions;
mod state;
mod storage;
#[cfg(test)]
mod testing;

use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "cookpath=debug,axum=info,tower_http=info".to_string());
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

    let app_state = AppState::init().await?;

    if app_state.config.seed_sample_data {
        if let Err(e) = seed::seed_sample_data(&app_state).await {
            tracing::warn!(error = %e, "sample data seeding failed; continuing");
        }
    }

    app::serve(app::build_app(app_state)).await
}

use std::sync::Arc;

mod app;
mod auth;
mod config;
mod db;
mod error;
mod response;
mod state;
#[cfg(test)]
mod testing;
mod todos;

use crate::{
    auth::repo::PgUserStore, config::AppConfig, state::AppState, todos::repo::PgTodoStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "todo_api=debug,axum=info,tower_http=info".to_string());
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

    let config = Arc::new(AppConfig::from_env()?);

    let db = db::connect(&config).await?;
    db::migrate(&db).await?;

    let state = AppState::from_parts(
        config.clone(),
        Arc::new(PgUserStore::new(db.clone())),
        Arc::new(PgTodoStore::new(db.clone())),
    );

    let app = app::build_app(state)?;
    let served = app::serve(app, &config.host, config.port).await;

    db.close().await;
    tracing::info!("database pool closed");
    served
}

use std::sync::Arc;

use tower_sessions::session_store::ExpiredDeletion;
use tower_sessions_sqlx_store::PostgresStore;

mod admin;
mod app;
mod config;
mod db;
mod errors;
mod mailer;
mod state;
mod waitlist;

use crate::{config::AppConfig, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "waitlist=debug,axum=info,tower_http=info".to_string());
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
    let pool = db::connect(&config.database)?;

    // Keep serving without a database; requests report the failure instead.
    match db::ensure_schema(&pool).await {
        Ok(()) => tracing::info!("database schema ready"),
        Err(e) => tracing::error!(error = %e, "database initialization failed; continuing"),
    }

    let sessions = PostgresStore::new(pool.clone());
    if let Err(e) = sessions.migrate().await {
        tracing::error!(error = %e, "session table migration failed; continuing");
    }
    let deletion = sessions.clone();
    tokio::spawn(async move {
        if let Err(e) = deletion
            .continuously_delete_expired(tokio::time::Duration::from_secs(60 * 10))
            .await
        {
            tracing::error!(error = %e, "expired session cleanup stopped");
        }
    });

    let state = AppState::init(config, pool)?;
    let app = app::build_app(state, sessions)?;
    app::serve(app).await
}

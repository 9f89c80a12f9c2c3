use std::str::FromStr;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    PgPool,
};

use crate::config::DatabaseConfig;

/// Builds the connection pool. Connections are opened on first use, so an
/// unreachable database shows up per request rather than at startup.
pub fn connect(config: &DatabaseConfig) -> anyhow::Result<PgPool> {
    let options = match &config.url {
        Some(url) => PgConnectOptions::from_str(url.expose_secret())?,
        None => {
            let mut options = PgConnectOptions::new()
                .host(&config.host)
                .port(config.port);
            if let Some(user) = &config.user {
                options = options.username(user);
            }
            if let Some(password) = &config.password {
                options = options.password(password.expose_secret());
            }
            if let Some(database) = &config.database {
                options = options.database(database);
            }
            options
        }
    };

    Ok(PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect_lazy_with(options))
}

/// Creates the `waitlist_users` table if it is missing.
pub async fn ensure_schema(db: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS waitlist_users (
            id SERIAL PRIMARY KEY,
            name VARCHAR(255) NOT NULL,
            email VARCHAR(255) UNIQUE NOT NULL,
            phone VARCHAR(50),
            beta_tester BOOLEAN NOT NULL DEFAULT FALSE,
            ambassador BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    )
    .execute(db)
    .await?;
    Ok(())
}

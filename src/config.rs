use anyhow::Context;
use secrecy::SecretString;

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: Option<SecretString>,
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<SecretString>,
    pub database: Option<String>,
    pub max_connections: u32,
}

/// SMTP settings. Absent when `MAIL_USERNAME` is unset.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    pub sender: String,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub secret: SecretString,
    pub ttl_hours: i64,
    pub cookie_secure: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub mail: Option<MailConfig>,
    pub admin_password: Option<SecretString>,
    pub session: SessionConfig,
    pub frontend_origin: String,
}

const DEFAULT_SESSION_SECRET: &str = "supersecretkey";

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database = DatabaseConfig {
            url: optional("DATABASE_URL").map(SecretString::from),
            host: optional("PG_HOST").unwrap_or_else(|| "localhost".into()),
            port: parsed("PG_PORT", 5432)?,
            user: optional("PG_USER"),
            password: optional("PG_PASSWORD").map(SecretString::from),
            database: optional("PG_DATABASE"),
            max_connections: parsed("DB_MAX_CONNECTIONS", 10)?,
        };

        let mail = match optional("MAIL_USERNAME") {
            Some(username) => Some(MailConfig {
                server: optional("MAIL_SERVER").unwrap_or_else(|| "smtp.gmail.com".into()),
                port: parsed("MAIL_PORT", 587)?,
                password: SecretString::from(optional("MAIL_PASSWORD").unwrap_or_default()),
                sender: optional("MAIL_DEFAULT_SENDER").unwrap_or_else(|| username.clone()),
                username,
            }),
            None => {
                tracing::warn!("MAIL_USERNAME not set; confirmation emails are disabled");
                None
            }
        };

        let admin_password = optional("ADMIN_PASSWORD").map(SecretString::from);
        if admin_password.is_none() {
            tracing::warn!("ADMIN_PASSWORD not set; admin login will always be rejected");
        }

        let secret = optional("SECRET_KEY").unwrap_or_else(|| {
            tracing::warn!("SECRET_KEY not set; falling back to the built-in development secret");
            DEFAULT_SESSION_SECRET.into()
        });
        let session = SessionConfig {
            secret: SecretString::from(secret),
            ttl_hours: parsed("SESSION_TTL_HOURS", 4)?,
            cookie_secure: parsed("SESSION_COOKIE_SECURE", true)?,
        };

        Ok(Self {
            database,
            mail,
            admin_password,
            session,
            frontend_origin: optional("FRONTEND_ORIGIN")
                .unwrap_or_else(|| "https://kxo.vercel.app".into()),
        })
    }
}

/// Reads a variable, treating an empty value as unset.
fn optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn parsed<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        None => Ok(default),
    }
}

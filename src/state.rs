use crate::config::AppConfig;
use crate::mailer::{DisabledNotifier, Notifier, SmtpNotifier};
use crate::waitlist::repo::{PgWaitlistRepo, WaitlistRepo};
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub waitlist: Arc<dyn WaitlistRepo>,
    pub notifier: Arc<dyn Notifier>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn init(config: Arc<AppConfig>, db: PgPool) -> anyhow::Result<Self> {
        let waitlist = Arc::new(PgWaitlistRepo::new(db)) as Arc<dyn WaitlistRepo>;

        let notifier = match &config.mail {
            Some(mail) => Arc::new(SmtpNotifier::new(mail)?) as Arc<dyn Notifier>,
            None => Arc::new(DisabledNotifier) as Arc<dyn Notifier>,
        };

        Ok(Self::from_parts(waitlist, notifier, config))
    }

    pub fn from_parts(
        waitlist: Arc<dyn WaitlistRepo>,
        notifier: Arc<dyn Notifier>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            waitlist,
            notifier,
            config,
        }
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> AppConfig {
    use crate::config::{DatabaseConfig, SessionConfig};
    use secrecy::SecretString;

    AppConfig {
        database: DatabaseConfig {
            url: None,
            host: "localhost".into(),
            port: 5432,
            user: None,
            password: None,
            database: None,
            max_connections: 1,
        },
        mail: None,
        admin_password: Some(SecretString::from("letmein".to_string())),
        session: SessionConfig {
            secret: SecretString::from("test-secret".to_string()),
            ttl_hours: 4,
            cookie_secure: false,
        },
        frontend_origin: "http://localhost:5173".into(),
    }
}

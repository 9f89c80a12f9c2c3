use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;

use crate::waitlist::repo_types::{NewEntry, WaitlistEntry};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("email already exists")]
    DuplicateEmail,
    #[error("database unavailable: {0}")]
    Unavailable(#[source] sqlx::Error),
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for RepoError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                RepoError::DuplicateEmail
            }
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed => RepoError::Unavailable(e),
            other => RepoError::Database(other),
        }
    }
}

#[async_trait]
pub trait WaitlistRepo: Send + Sync {
    /// Stores a signup. A taken email yields `RepoError::DuplicateEmail`.
    async fn insert(&self, entry: &NewEntry) -> Result<WaitlistEntry, RepoError>;
    /// All signups, newest first.
    async fn list(&self) -> Result<Vec<WaitlistEntry>, RepoError>;
}

#[derive(Clone)]
pub struct PgWaitlistRepo {
    db: PgPool,
}

impl PgWaitlistRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl WaitlistRepo for PgWaitlistRepo {
    async fn insert(&self, entry: &NewEntry) -> Result<WaitlistEntry, RepoError> {
        let row = sqlx::query_as::<_, WaitlistEntry>(
            r#"
            INSERT INTO waitlist_users (name, email, phone, beta_tester, ambassador)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, email, phone, beta_tester, ambassador, created_at
            "#,
        )
        .bind(&entry.name)
        .bind(&entry.email)
        .bind(&entry.phone)
        .bind(entry.beta_tester)
        .bind(entry.ambassador)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn list(&self) -> Result<Vec<WaitlistEntry>, RepoError> {
        let rows = sqlx::query_as::<_, WaitlistEntry>(
            r#"
            SELECT id, name, email, phone, beta_tester, ambassador, created_at
            FROM waitlist_users
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }
}

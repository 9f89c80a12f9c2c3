use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

/// Row of `waitlist_users`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WaitlistEntry {
    pub id: i32,
    pub name: String,
    pub email: String,             // unique across the table
    pub phone: Option<String>,
    pub beta_tester: bool,
    pub ambassador: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime, // set by the database on insert
}

/// Validated signup, ready to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub beta_tester: bool,
    pub ambassador: bool,
}

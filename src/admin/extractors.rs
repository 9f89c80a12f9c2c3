use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower_sessions::Session;
use tracing::warn;

use crate::errors::ApiError;

/// Session key holding the admin flag.
pub const ADMIN_AUTHENTICATED: &str = "admin_authenticated";

pub const UNAUTHORIZED_ACCESS: &str = "Unauthorized access";

/// The caller's session, viewed as the admin capability bit.
#[derive(Clone)]
pub struct AdminSession(Session);

impl AdminSession {
    /// Sets the flag under a fresh session id.
    pub async fn grant(&self) -> Result<(), ApiError> {
        self.0.cycle_id().await?;
        self.0.insert(ADMIN_AUTHENTICATED, true).await?;
        Ok(())
    }

    /// False when the flag is absent, expired or unreadable.
    pub async fn is_authenticated(&self) -> bool {
        match self.0.get::<bool>(ADMIN_AUTHENTICATED).await {
            Ok(flag) => flag.unwrap_or(false),
            Err(e) => {
                warn!(error = %e, "failed to read admin flag from session");
                false
            }
        }
    }

    /// Clears the flag. A session without it is left untouched so anonymous
    /// logouts do not create store records.
    pub async fn revoke(&self) -> Result<(), ApiError> {
        if self.0.get::<bool>(ADMIN_AUTHENTICATED).await?.is_some() {
            self.0.remove::<bool>(ADMIN_AUTHENTICATED).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AdminSession
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Set by SessionManagerLayer
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(ApiError::Unauthorized(UNAUTHORIZED_ACCESS))?;
        Ok(Self(session))
    }
}

/// Guard for admin-only routes: rejects with 401 before the handler runs.
pub async fn require_admin(admin: AdminSession, request: Request, next: Next) -> Response {
    if !admin.is_authenticated().await {
        warn!(path = %request.uri().path(), "admin route without session");
        return ApiError::Unauthorized(UNAUTHORIZED_ACCESS).into_response();
    }
    next.run(request).await
}

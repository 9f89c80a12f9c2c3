use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use secrecy::ExposeSecret;
use tracing::{info, instrument, warn};

use crate::{
    admin::{
        dto::{LoginRequest, LoginResponse, VerifyResponse},
        extractors::AdminSession,
    },
    errors::ApiError,
    state::AppState,
    waitlist::dto::ApiResponse,
};

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin-login", post(login))
        .route("/admin-verify", get(verify))
        .route("/admin-logout", post(logout))
}

#[instrument(skip(state, admin, payload))]
pub async fn login(
    State(state): State<AppState>,
    admin: AdminSession,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    let password = payload
        .password
        .filter(|p| !p.is_empty())
        .ok_or(ApiError::Validation("Password required"))?;

    // Plain comparison against the configured secret; there is no hashed store.
    let matches = state
        .config
        .admin_password
        .as_ref()
        .is_some_and(|expected| expected.expose_secret() == password);

    if !matches {
        warn!("admin login rejected");
        return Err(ApiError::Unauthorized("Invalid password"));
    }

    admin.grant().await?;
    info!("admin logged in");
    Ok(Json(LoginResponse {
        success: true,
        message: "Login successful",
        is_admin: true,
    }))
}

#[instrument(skip(admin))]
pub async fn verify(admin: AdminSession) -> Json<VerifyResponse> {
    Json(VerifyResponse {
        authenticated: admin.is_authenticated().await,
    })
}

#[instrument(skip(admin))]
pub async fn logout(admin: AdminSession) -> Result<Json<ApiResponse<()>>, ApiError> {
    admin.revoke().await?;
    info!("admin logged out");
    Ok(Json(ApiResponse::message("Logged out")))
}

use axum::{
    extract::{rejection::JsonRejection, State},
    middleware,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    admin::extractors::require_admin,
    errors::ApiError,
    mailer::dispatch_confirmation,
    state::AppState,
    waitlist::{
        dto::{ApiResponse, HealthResponse, JoinRequest},
        repo::RepoError,
        repo_types::WaitlistEntry,
        services::{validate_signup, MISSING_FIELDS},
    },
};

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/join-waitlist", post(join_waitlist))
        .route("/health", get(health))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/waitlist", get(list_waitlist))
        .route_layer(middleware::from_fn(require_admin))
}

#[instrument(skip(state, payload))]
pub async fn join_waitlist(
    State(state): State<AppState>,
    payload: Result<Json<JoinRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    let Some(entry) = validate_signup(payload) else {
        warn!("signup missing name or email");
        return Err(ApiError::Validation(MISSING_FIELDS));
    };

    let stored = match state.waitlist.insert(&entry).await {
        Ok(row) => row,
        Err(RepoError::DuplicateEmail) => {
            warn!(email = %entry.email, "email already on waitlist");
            return Err(ApiError::DuplicateEmail);
        }
        Err(e) => {
            return Err(ApiError::from_repo(
                e,
                "An error occurred. Please try again.",
            ))
        }
    };

    info!(id = stored.id, email = %stored.email, "new waitlist signup");
    dispatch_confirmation(state.notifier.clone(), stored.name, stored.email);

    Ok(Json(ApiResponse::message("Successfully joined waitlist!")))
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        message: "KanairoXO API is running",
    })
}

#[instrument(skip(state))]
pub async fn list_waitlist(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<WaitlistEntry>>>, ApiError> {
    let rows = state
        .waitlist
        .list()
        .await
        .map_err(|e| ApiError::from_repo(e, "Failed to fetch waitlist"))?;
    info!(count = rows.len(), "waitlist fetched");
    Ok(Json(ApiResponse::data(rows)))
}

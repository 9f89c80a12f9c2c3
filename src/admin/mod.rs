use crate::state::AppState;
use axum::Router;

mod dto;
pub mod extractors;
pub mod handlers;
pub mod session;

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::admin_routes())
}

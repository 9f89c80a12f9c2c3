//! Cookie session setup for the admin flag.
//!
//! The frontend lives on another site and sends credentialed requests, so the
//! cookie is `SameSite=None` and must be `Secure` outside local development.

use axum::Router;
use secrecy::ExposeSecret;
use sha2::{Digest, Sha512};
use tower_sessions::{
    cookie::{time::Duration, Key, SameSite},
    Expiry, SessionManagerLayer, SessionStore,
};

use crate::config::SessionConfig;

pub const SESSION_COOKIE_NAME: &str = "kxo_session";

/// Derives the 64-byte cookie signing key from the configured secret, which
/// may be any length.
pub fn signing_key(secret: &str) -> Key {
    let digest = Sha512::digest(secret.as_bytes());
    Key::from(digest.as_slice())
}

/// Wraps `router` in a session layer backed by `store`.
pub fn with_sessions<S>(router: Router, store: S, config: &SessionConfig) -> Router
where
    S: SessionStore + Clone,
{
    let layer = SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(Duration::hours(config.ttl_hours)))
        .with_same_site(SameSite::None)
        .with_secure(config.cookie_secure)
        .with_http_only(true)
        .with_path("/")
        .with_signed(signing_key(config.secret.expose_secret()));

    router.layer(layer)
}

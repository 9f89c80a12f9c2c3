use std::net::SocketAddr;

use anyhow::Context;
use axum::{
    http::{header, HeaderValue, Method},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tower_sessions::SessionStore;

use crate::admin::session::with_sessions;
use crate::state::AppState;
use crate::{admin, waitlist};

/// Credentialed CORS for the single configured frontend origin.
fn cors_layer(origin: &str) -> anyhow::Result<CorsLayer> {
    let origin = HeaderValue::from_str(origin)
        .with_context(|| format!("invalid FRONTEND_ORIGIN {origin:?}"))?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]))
}

pub fn build_app<S>(state: AppState, sessions: S) -> anyhow::Result<Router>
where
    S: SessionStore + Clone,
{
    let cors = cors_layer(&state.config.frontend_origin)?;
    let config = state.config.clone();

    let api = Router::new()
        .nest(
            "/api",
            Router::new()
                .merge(waitlist::router())
                .merge(admin::router()),
        )
        .with_state(state);

    Ok(with_sessions(api, sessions, &config.session)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        status = tracing::field::Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        ))
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tokio::sync::mpsc::UnboundedReceiver;
    use tower::ServiceExt;
    use tower_sessions::MemoryStore;

    use super::*;
    use crate::mailer::recording::RecordingNotifier;
    use crate::state::test_config;
    use crate::waitlist::repo::memory::{InMemoryWaitlist, UnreachableWaitlist};
    use crate::waitlist::repo::WaitlistRepo;

    struct Harness {
        app: Router,
        repo: Arc<InMemoryWaitlist>,
        sent: UnboundedReceiver<(String, String)>,
    }

    fn harness_with(fail_mail: bool) -> Harness {
        let repo = Arc::new(InMemoryWaitlist::default());
        let (notifier, sent) = RecordingNotifier::new(fail_mail);
        let state = AppState::from_parts(
            repo.clone() as Arc<dyn WaitlistRepo>,
            Arc::new(notifier),
            Arc::new(test_config()),
        );
        let app = build_app(state, MemoryStore::default()).unwrap();
        Harness { app, repo, sent }
    }

    fn harness() -> Harness {
        harness_with(false)
    }

    async fn call(app: &Router, req: Request<Body>) -> Response {
        app.clone().oneshot(req).await.unwrap()
    }

    fn post_json(uri: &str, body: Value, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header("cookie", cookie);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header("cookie", cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_json(res: Response) -> Value {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    /// `name=value` part of the session Set-Cookie header.
    fn session_cookie(res: &Response) -> String {
        res.headers()
            .get_all("set-cookie")
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with("kxo_session="))
            .and_then(|v| v.split(';').next())
            .expect("session cookie")
            .to_string()
    }

    async fn login(app: &Router, password: &str) -> Response {
        call(app, post_json("/api/admin-login", json!({ "password": password }), None)).await
    }

    #[tokio::test]
    async fn health_is_always_ok() {
        let h = harness();
        let res = call(&h.app, get("/api/health", None)).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = body_json(res).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["message"], "KanairoXO API is running");
    }

    #[tokio::test]
    async fn join_stores_entry_and_sends_confirmation() {
        let mut h = harness();
        let res = call(
            &h.app,
            post_json("/api/join-waitlist", json!({ "name": "Ana", "email": "ana@x.com" }), None),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = body_json(res).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Successfully joined waitlist!");
        assert_eq!(h.repo.count_email("ana@x.com"), 1);

        let sent = tokio::time::timeout(Duration::from_secs(1), h.sent.recv())
            .await
            .unwrap();
        assert_eq!(sent, Some(("Ana".to_string(), "ana@x.com".to_string())));
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_once_stored() {
        let h = harness();
        let req = || {
            post_json(
                "/api/join-waitlist",
                json!({ "name": "Ana", "email": "ana@x.com", "betaTester": true }),
                None,
            )
        };
        assert_eq!(call(&h.app, req()).await.status(), StatusCode::OK);

        let res = call(&h.app, req()).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body = body_json(res).await;
        assert_eq!(body["success"], false);
        assert!(body["message"].as_str().unwrap().starts_with("Email already exists"));
        assert_eq!(h.repo.count_email("ana@x.com"), 1);
    }

    #[tokio::test]
    async fn join_accepts_null_or_stringly_flags() {
        let h = harness();
        for body in [
            json!({ "name": "Ana", "email": "ana@x.com", "betaTester": null }),
            json!({ "name": "Ben", "email": "ben@x.com", "ambassador": "true" }),
        ] {
            let res = call(&h.app, post_json("/api/join-waitlist", body, None)).await;
            assert_eq!(res.status(), StatusCode::OK);
        }
        assert_eq!(h.repo.len(), 2);

        let res = login(&h.app, "letmein").await;
        let cookie = session_cookie(&res);
        let body = body_json(call(&h.app, get("/api/waitlist", Some(&cookie))).await).await;
        let rows = body["data"].as_array().unwrap();
        let ben = rows.iter().find(|r| r["email"] == "ben@x.com").unwrap();
        assert_eq!(ben["ambassador"], true);
        let ana = rows.iter().find(|r| r["email"] == "ana@x.com").unwrap();
        assert_eq!(ana["beta_tester"], false);
    }

    #[tokio::test]
    async fn join_without_required_fields_writes_nothing() {
        let h = harness();
        for body in [
            json!({ "email": "ana@x.com" }),
            json!({ "name": "Ana" }),
            json!({ "name": "", "email": "ana@x.com" }),
        ] {
            let res = call(&h.app, post_json("/api/join-waitlist", body, None)).await;
            assert_eq!(res.status(), StatusCode::BAD_REQUEST);
            assert_eq!(body_json(res).await["message"], "Name and email are required");
        }

        let res = call(
            &h.app,
            Request::builder()
                .method("POST")
                .uri("/api/join-waitlist")
                .header("content-type", "application/json")
                .body(Body::from("not json"))
                .unwrap(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(h.repo.len(), 0);
    }

    #[tokio::test]
    async fn mail_failure_does_not_affect_signup() {
        let mut h = harness_with(true);
        let res = call(
            &h.app,
            post_json("/api/join-waitlist", json!({ "name": "Ana", "email": "ana@x.com" }), None),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(h.repo.len(), 1);
        let attempted = tokio::time::timeout(Duration::from_secs(1), h.sent.recv())
            .await
            .unwrap();
        assert!(attempted.is_some());
    }

    #[tokio::test]
    async fn storage_failure_is_a_generic_500() {
        let (notifier, _sent) = RecordingNotifier::new(false);
        let state = AppState::from_parts(
            Arc::new(UnreachableWaitlist),
            Arc::new(notifier),
            Arc::new(test_config()),
        );
        let app = build_app(state, MemoryStore::default()).unwrap();

        let res = call(
            &app,
            post_json("/api/join-waitlist", json!({ "name": "Ana", "email": "ana@x.com" }), None),
        )
        .await;
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(res).await["message"], "Database connection failed");

        let res = login(&app, "letmein").await;
        let cookie = session_cookie(&res);
        let res = call(&app, get("/api/waitlist", Some(&cookie))).await;
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(res).await["message"], "Failed to fetch waitlist");
    }

    #[tokio::test]
    async fn waitlist_requires_admin_session() {
        let h = harness();
        call(
            &h.app,
            post_json("/api/join-waitlist", json!({ "name": "Ana", "email": "ana@x.com" }), None),
        )
        .await;

        let res = call(&h.app, get("/api/waitlist", None)).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(res).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Unauthorized access");
    }

    #[tokio::test]
    async fn admin_lists_entries_newest_first() {
        let h = harness();
        for (name, email) in [("Ana", "ana@x.com"), ("Ben", "ben@x.com")] {
            let res = call(
                &h.app,
                post_json("/api/join-waitlist", json!({ "name": name, "email": email }), None),
            )
            .await;
            assert_eq!(res.status(), StatusCode::OK);
        }

        let res = login(&h.app, "letmein").await;
        let cookie = session_cookie(&res);
        let res = call(&h.app, get("/api/waitlist", Some(&cookie))).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = body_json(res).await;
        assert_eq!(body["success"], true);
        let rows = body["data"].as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["email"], "ben@x.com");
        assert_eq!(rows[1]["email"], "ana@x.com");
        assert_eq!(rows[1]["beta_tester"], false);
        assert!(rows[1]["created_at"].is_string());
    }

    #[tokio::test]
    async fn login_verify_logout_cycle() {
        let h = harness();
        let res = login(&h.app, "letmein").await;
        assert_eq!(res.status(), StatusCode::OK);
        let cookie = session_cookie(&res);
        let body = body_json(res).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["isAdmin"], true);
        assert_eq!(body["message"], "Login successful");

        let res = call(&h.app, get("/api/admin-verify", Some(&cookie))).await;
        assert_eq!(body_json(res).await["authenticated"], true);

        let res = call(&h.app, post_json("/api/admin-logout", json!({}), Some(&cookie))).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res).await["message"], "Logged out");

        let res = call(&h.app, get("/api/admin-verify", Some(&cookie))).await;
        assert_eq!(body_json(res).await["authenticated"], false);

        let res = call(&h.app, get("/api/waitlist", Some(&cookie))).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn logout_without_session_is_ok() {
        let h = harness();
        let res = call(&h.app, post_json("/api/admin-logout", json!({}), None)).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().get("set-cookie").is_none());
        assert_eq!(body_json(res).await["success"], true);
    }

    #[tokio::test]
    async fn session_cookie_allows_cross_site_credentials_for_four_hours() {
        use tower_sessions::cookie::{
            time::{Duration as CookieDuration, OffsetDateTime},
            Cookie, SameSite,
        };

        let mut config = test_config();
        config.session.cookie_secure = true;
        let (notifier, _sent) = RecordingNotifier::new(false);
        let state = AppState::from_parts(
            Arc::new(InMemoryWaitlist::default()),
            Arc::new(notifier),
            Arc::new(config),
        );
        let app = build_app(state, MemoryStore::default()).unwrap();

        let res = login(&app, "letmein").await;
        assert_eq!(res.status(), StatusCode::OK);
        let raw = res
            .headers()
            .get_all("set-cookie")
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with("kxo_session="))
            .expect("session cookie")
            .to_string();
        let cookie = Cookie::parse(raw).unwrap();

        assert_eq!(cookie.same_site(), Some(SameSite::None));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.path(), Some("/"));

        let lifetime = cookie
            .max_age()
            .or_else(|| {
                cookie
                    .expires_datetime()
                    .map(|at| at - OffsetDateTime::now_utc())
            })
            .expect("cookie lifetime");
        assert!((lifetime - CookieDuration::hours(4)).abs() < CookieDuration::minutes(1));
    }

    #[tokio::test]
    async fn wrong_password_never_sets_the_flag() {
        let h = harness();
        let res = login(&h.app, "wrong").await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert!(res.headers().get("set-cookie").is_none());
        let body = body_json(res).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Invalid password");

        let res = call(&h.app, get("/api/admin-verify", None)).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res).await["authenticated"], false);
    }

    #[tokio::test]
    async fn login_requires_password() {
        let h = harness();
        let res = call(&h.app, post_json("/api/admin-login", json!({}), None)).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(res).await["message"], "Password required");
    }

    #[tokio::test]
    async fn login_is_rejected_when_no_password_is_configured() {
        let mut config = test_config();
        config.admin_password = None;
        let (notifier, _sent) = RecordingNotifier::new(false);
        let state = AppState::from_parts(
            Arc::new(InMemoryWaitlist::default()),
            Arc::new(notifier),
            Arc::new(config),
        );
        let app = build_app(state, MemoryStore::default()).unwrap();
        assert_eq!(login(&app, "letmein").await.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn cors_allows_only_the_frontend_origin_with_credentials() {
        let h = harness();
        let preflight = |origin: &str| {
            Request::builder()
                .method("OPTIONS")
                .uri("/api/admin-login")
                .header("origin", origin)
                .header("access-control-request-method", "POST")
                .body(Body::empty())
                .unwrap()
        };

        let res = call(&h.app, preflight("http://localhost:5173")).await;
        let headers = res.headers();
        assert_eq!(
            headers.get("access-control-allow-origin").unwrap(),
            "http://localhost:5173"
        );
        assert_eq!(headers.get("access-control-allow-credentials").unwrap(), "true");

        // A fixed origin is always echoed; the browser rejects the mismatch.
        let res = call(&h.app, preflight("https://evil.example")).await;
        let allowed = res.headers().get("access-control-allow-origin");
        assert_ne!(allowed, Some(&HeaderValue::from_static("https://evil.example")));
        assert_eq!(allowed.unwrap(), "http://localhost:5173");
    }

    #[test]
    fn invalid_frontend_origin_is_a_config_error() {
        assert!(cors_layer("bad\norigin").is_err());
    }
}

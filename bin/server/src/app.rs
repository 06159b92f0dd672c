//! Router assembly.

use axum::{
    Json, Router,
    middleware,
    response::{Html, IntoResponse},
    routing::get,
};
use tower_http::trace::TraceLayer;

use crate::auth::{self, AppState, CurrentUser, require_login};

/// Builds the application router.
///
/// Every route in `protected` goes through the login gate. The login,
/// callback and logout routes are mounted at the paths from the gate
/// settings.
///
/// # Panics
///
/// Panics if `protected` has no routes, or if the settings were not checked
/// with [`validate_routes`](crate::config::validate_routes).
pub fn router(state: AppState, protected: Router<AppState>) -> Router {
    let settings = state.gate.settings();
    let login_path = settings.login_path.clone();
    let callback_path = settings.provider.callback_path.clone();
    let logout_path = settings.logout_path.clone();

    let gated =
        protected.route_layer(middleware::from_fn_with_state(state.clone(), require_login));

    let mut router = Router::new()
        .merge(gated)
        .route(&callback_path, get(auth::login))
        .route(&logout_path, get(auth::logout));

    if login_path != callback_path {
        router = router.route(&login_path, get(auth::login));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

/// Demo routes served by the binary.
pub fn demo_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/profile", get(profile))
}

async fn home(CurrentUser(user): CurrentUser) -> impl IntoResponse {
    let name = user
        .get("name")
        .or_else(|| user.get("email"))
        .or_else(|| user.get("sub"))
        .and_then(|value| value.as_str())
        .unwrap_or("there");

    Html(format!(
        "<p>Hello, {}.</p><p><a href=\"/profile\">Profile</a></p>",
        escape(name)
    ))
}

async fn profile(CurrentUser(user): CurrentUser) -> impl IntoResponse {
    Json(user)
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::sessions::MemorySessionStore;
    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{Request, Response, StatusCode, header},
    };
    use axum_extra::extract::cookie::Key;
    use gatehouse_access::{
        AuthGate, AuthenticatedUser, Authorization, PendingAuthorization, ProviderOverrides,
        Settings, SettingsOverrides, Strategy, StrategyError, resolve,
    };
    use gatehouse_core::SessionId;
    use serde_json::json;
    use std::sync::Arc;
    use tower::ServiceExt;

    const CSRF: &str = "csrf-1";

    struct FakeStrategy;

    #[async_trait]
    impl Strategy for FakeStrategy {
        fn begin(&self) -> Result<Authorization, StrategyError> {
            Ok(Authorization {
                url: format!("https://idp.example.com/authorize?state={CSRF}"),
                pending: PendingAuthorization {
                    csrf_token: CSRF.to_string(),
                    pkce_verifier: "verifier".to_string(),
                    nonce: "nonce".to_string(),
                },
            })
        }

        async fn exchange(
            &self,
            code: &str,
            _pending: &PendingAuthorization,
        ) -> Result<AuthenticatedUser, StrategyError> {
            if code == "good" {
                Ok(AuthenticatedUser::from_value(json!({
                    "sub": "auth0|42",
                    "name": "Alice <admin>",
                })))
            } else {
                Err(StrategyError::TokenExchange {
                    details: "invalid_grant".to_string(),
                })
            }
        }
    }

    struct Harness {
        app: Router,
        store: Arc<MemorySessionStore>,
        cookie: Option<String>,
    }

    impl Harness {
        fn new(overrides: SettingsOverrides) -> Self {
            Self::with_session_minutes(overrides, 60)
        }

        fn with_session_minutes(overrides: SettingsOverrides, duration_minutes: i64) -> Self {
            let settings = resolve(&Settings::builtin(), &ProviderOverrides::default(), &overrides);
            let store = Arc::new(MemorySessionStore::new());
            let state = AppState::new(
                AuthGate::new(settings),
                Arc::new(FakeStrategy),
                store.clone(),
                SessionConfig {
                    duration_minutes,
                    secure_cookies: false,
                    ..SessionConfig::default()
                },
                Key::generate(),
            );
            let protected = Router::new()
                .route("/secret", get(|| async { "classified" }))
                .merge(demo_routes());

            Self {
                app: router(state, protected),
                store,
                cookie: None,
            }
        }

        async fn get(&mut self, uri: &str) -> Response<Body> {
            let mut request = Request::builder().method("GET").uri(uri);
            if let Some(cookie) = &self.cookie {
                request = request.header(header::COOKIE, cookie);
            }
            let response = self
                .app
                .clone()
                .oneshot(request.body(Body::empty()).expect("request"))
                .await
                .expect("infallible");

            if let Some(cookie) = session_cookie(&response) {
                self.cookie = Some(cookie);
            }
            response
        }

        async fn sign_in(&mut self, uri: &str) -> Response<Body> {
            self.get(uri).await;
            self.get("/login").await;
            self.get(&format!("/callback?code=good&state={CSRF}")).await
        }
    }

    fn session_cookie(response: &Response<Body>) -> Option<String> {
        response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find(|value| value.starts_with("session="))
            .and_then(|value| value.split(';').next())
            .map(str::to_string)
    }

    fn location(response: &Response<Body>) -> &str {
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .expect("redirect has a location")
    }

    async fn body_text(response: Response<Body>) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        String::from_utf8(bytes.to_vec()).expect("utf-8")
    }

    #[tokio::test]
    async fn anonymous_request_is_redirected_to_login() {
        let mut harness = Harness::new(SettingsOverrides::default());

        let response = harness.get("/secret?page=2").await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/login");
        assert!(harness.cookie.is_some());
        assert_eq!(harness.store.len().await, 1);
    }

    #[tokio::test]
    async fn login_redirects_to_provider() {
        let mut harness = Harness::new(SettingsOverrides::default());
        harness.get("/secret").await;

        let response = harness.get("/login").await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(location(&response).starts_with("https://idp.example.com/authorize"));
    }

    #[tokio::test]
    async fn successful_callback_returns_to_captured_path() {
        let mut harness = Harness::new(SettingsOverrides::default());
        let denied_cookie = {
            harness.get("/secret?page=2").await;
            harness.cookie.clone()
        };

        harness.get("/login").await;
        let response = harness.get(&format!("/callback?code=good&state={CSRF}")).await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/secret?page=2");
        assert_ne!(harness.cookie, denied_cookie, "session id rotates on login");
        assert_eq!(harness.store.len().await, 1);

        let response = harness.get("/secret").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "classified");
    }

    #[tokio::test]
    async fn callback_without_capture_uses_default_return_path() {
        let mut harness = Harness::new(SettingsOverrides::default());

        harness.get("/login").await;
        let response = harness.get(&format!("/callback?code=good&state={CSRF}")).await;

        assert_eq!(location(&response), "/");
    }

    #[tokio::test]
    async fn failed_exchange_redirects_to_failure_path_and_keeps_capture() {
        let mut harness = Harness::new(SettingsOverrides {
            failure_path: Some("/denied".to_string()),
            ..Default::default()
        });
        harness.get("/secret").await;
        harness.get("/login").await;

        let response = harness.get(&format!("/callback?code=bad&state={CSRF}")).await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/denied");

        harness.get("/login").await;
        let response = harness.get(&format!("/callback?code=good&state={CSRF}")).await;
        assert_eq!(location(&response), "/secret");
    }

    #[tokio::test]
    async fn forged_state_fails_login() {
        let mut harness = Harness::new(SettingsOverrides::default());
        harness.get("/secret").await;
        harness.get("/login").await;

        let response = harness.get("/callback?code=good&state=forged").await;

        assert_eq!(location(&response), "/login");
        let response = harness.get("/secret").await;
        assert_eq!(location(&response), "/login");
    }

    #[tokio::test]
    async fn provider_error_fails_login() {
        let mut harness = Harness::new(SettingsOverrides::default());
        harness.get("/login").await;

        let response = harness
            .get("/callback?error=access_denied&error_description=User%20denied%20access")
            .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/login");
    }

    #[tokio::test]
    async fn callback_without_pending_login_fails() {
        let mut harness = Harness::new(SettingsOverrides::default());

        let response = harness.get(&format!("/callback?code=good&state={CSRF}")).await;

        assert_eq!(location(&response), "/login");
    }

    #[tokio::test]
    async fn shared_login_and_callback_path() {
        let mut harness = Harness::new(SettingsOverrides {
            login_path: Some("/callback".to_string()),
            ..Default::default()
        });

        let response = harness.get("/secret").await;
        assert_eq!(location(&response), "/callback");

        let response = harness.get("/callback").await;
        assert!(location(&response).starts_with("https://idp.example.com/"));

        let response = harness.get(&format!("/callback?code=good&state={CSRF}")).await;
        assert_eq!(location(&response), "/secret");
    }

    #[tokio::test]
    async fn logout_returns_session_to_anonymous() {
        let mut harness = Harness::new(SettingsOverrides::default());
        harness.sign_in("/secret").await;

        let response = harness.get("/logout").await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");
        assert!(harness.store.is_empty().await);

        let response = harness.get("/secret").await;
        assert_eq!(location(&response), "/login");
    }

    #[tokio::test]
    async fn tampered_cookie_is_treated_as_anonymous() {
        let mut harness = Harness::new(SettingsOverrides::default());
        harness.sign_in("/secret").await;
        harness.cookie = Some(format!("session={}", SessionId::new()));

        let response = harness.get("/secret").await;

        assert_eq!(location(&response), "/login");
    }

    #[tokio::test]
    async fn profile_route_exposes_session_user() {
        let mut harness = Harness::new(SettingsOverrides::default());
        harness.sign_in("/profile").await;

        let response = harness.get("/profile").await;

        assert_eq!(response.status(), StatusCode::OK);
        let profile: serde_json::Value =
            serde_json::from_str(&body_text(response).await).expect("json");
        assert_eq!(profile["sub"], "auth0|42");
    }

    #[tokio::test]
    async fn home_page_escapes_profile_name() {
        let mut harness = Harness::new(SettingsOverrides::default());
        harness.sign_in("/").await;

        let response = harness.get("/").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Alice &lt;admin&gt;"));
    }

    #[tokio::test]
    async fn expired_session_cannot_complete_login() {
        let mut harness = Harness::with_session_minutes(SettingsOverrides::default(), 0);

        let response = harness.sign_in("/secret").await;

        assert_eq!(location(&response), "/login");
        let response = harness.get("/secret").await;
        assert_eq!(location(&response), "/login");
    }
}

//! The gate as axum middleware, and an extractor for the signed-in user.

use axum::{
    extract::{FromRequestParts, OriginalUri, Request, State},
    http::{StatusCode, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::SignedCookieJar;
use gatehouse_access::{AuthenticatedUser, Decision};

use super::AppState;
use crate::error::AuthError;

/// Puts the routes it layers behind the login gate.
///
/// Authenticated requests continue with a [`CurrentUser`] in their extensions.
/// Anything else has its path and query captured in the session and is
/// redirected to the login path.
pub async fn require_login(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let mut record = state.load_session(&jar).await?;
    let hooks = state.gate.hooks();
    let mut session = record.state(hooks);

    let original_path = original_path(&request);

    match state.gate.evaluate(&original_path, &mut session) {
        Decision::PassThrough => {
            if let Some(user) = session.user() {
                request.extensions_mut().insert(CurrentUser(user.clone()));
            }
            Ok(next.run(request).await)
        }
        Decision::RedirectToLogin(login_path) => {
            record.store_state(&session, hooks);
            let jar = state.save_session(jar, &record).await?;
            Ok((jar, Redirect::to(&login_path)).into_response())
        }
    }
}

/// Path and query of the request as the client sent it, before any nesting
/// stripped a prefix.
///
/// A path starting with `//` or `/\` would come back out of the session as a
/// protocol-relative redirect to another host, so it is captured as `/`.
fn original_path(request: &Request) -> String {
    let uri = request
        .extensions()
        .get::<OriginalUri>()
        .map(|original| &original.0)
        .unwrap_or_else(|| request.uri());

    let path = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());

    if path.starts_with("//") || path.starts_with("/\\") {
        tracing::warn!(path = %path, "refusing to capture protocol-relative path");
        return "/".to_string();
    }

    path.to_string()
}

/// Extractor for the user on a route behind [`require_login`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<CurrentUser>().cloned().ok_or_else(|| {
            tracing::error!(
                path = %parts.uri.path(),
                "CurrentUser used on a route without require_login"
            );
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request(uri: &str) -> Request {
        axum::http::Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request")
    }

    #[test]
    fn path_and_query_are_captured() {
        assert_eq!(original_path(&request("/reports?page=2")), "/reports?page=2");
    }

    #[test]
    fn protocol_relative_path_is_captured_as_root() {
        assert_eq!(original_path(&request("//evil.example")), "/");
        assert_eq!(original_path(&request("//evil.example/login?x=1")), "/");
    }

    #[test]
    fn original_uri_wins_over_nested_uri() {
        let mut req = request("/inner");
        req.extensions_mut()
            .insert(OriginalUri("/outer/inner?tab=1".parse().expect("uri")));

        assert_eq!(original_path(&req), "/outer/inner?tab=1");
    }

    #[test]
    fn protocol_relative_original_uri_is_captured_as_root() {
        let mut req = request("/inner");
        req.extensions_mut()
            .insert(OriginalUri("//evil.example/inner".parse().expect("uri")));

        assert_eq!(original_path(&req), "/");
    }
}

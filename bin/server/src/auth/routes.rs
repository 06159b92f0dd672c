//! Authentication routes for login, callback, and logout.

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::SignedCookieJar;
use axum_extra::extract::cookie::Cookie;
use gatehouse_access::{AuthenticatedUser, PendingAuthorization, StrategyError};
use serde::Deserialize;

use super::{AppState, SESSION_COOKIE, session_id};
use crate::error::AuthError;
use crate::sessions::SessionRecord;

/// Query parameters the provider may send back to the callback.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

impl CallbackQuery {
    fn is_callback(&self) -> bool {
        self.code.is_some() || self.error.is_some()
    }
}

/// Login entry point and provider callback.
///
/// Mounted at both the login path and the callback path, which may be the
/// same. Without `code` or `error` in the query it starts a login by sending
/// the user to the provider; otherwise it finishes one.
pub async fn login(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
    jar: SignedCookieJar,
) -> Result<Response, AuthError> {
    let record = state.load_session(&jar).await?;

    if query.is_callback() {
        callback(state, query, jar, record).await
    } else {
        begin(state, jar, record).await
    }
}

async fn begin(
    state: AppState,
    jar: SignedCookieJar,
    mut record: SessionRecord,
) -> Result<Response, AuthError> {
    let authorization = match state.strategy.begin() {
        Ok(authorization) => authorization,
        Err(e) => {
            tracing::warn!(error = %e, "could not start login");
            let session = record.state(state.gate.hooks());
            let redirect = state.gate.fail_login(&session);
            return Ok(Redirect::to(redirect.target()).into_response());
        }
    };

    record.set_pending(authorization.pending);
    let jar = state.save_session(jar, &record).await?;

    Ok((jar, Redirect::to(&authorization.url)).into_response())
}

async fn callback(
    state: AppState,
    query: CallbackQuery,
    jar: SignedCookieJar,
    mut record: SessionRecord,
) -> Result<Response, AuthError> {
    let hooks = *state.gate.hooks();
    let mut session = record.state(&hooks);
    let pending = record.take_pending();

    match exchange(&state, &query, pending).await {
        Ok(profile) => {
            session.establish((hooks.verify)(profile));
            let redirect = state.gate.complete_login(&mut session)?;

            record.store_state(&session, &hooks);
            let previous = record.rotate_id();
            let jar = state.save_session(jar, &record).await?;
            state.sessions.delete(&previous).await?;

            tracing::info!(session_id = %record.id(), "user signed in");
            Ok((jar, Redirect::to(redirect.target())).into_response())
        }
        Err(e) => {
            tracing::warn!(error = %e, "login failed");
            let redirect = state.gate.fail_login(&session);

            // The pending authorization is single use; the capture stays.
            let jar = state.save_session(jar, &record).await?;
            Ok((jar, Redirect::to(redirect.target())).into_response())
        }
    }
}

async fn exchange(
    state: &AppState,
    query: &CallbackQuery,
    pending: Option<PendingAuthorization>,
) -> Result<AuthenticatedUser, StrategyError> {
    if let Some(error) = &query.error {
        return Err(StrategyError::Provider {
            error: error.clone(),
            description: query.error_description.clone(),
        });
    }

    let pending = pending.ok_or(StrategyError::NoPendingAuthorization)?;
    pending.verify_state(query.state.as_deref().unwrap_or_default())?;

    let code = query.code.as_deref().unwrap_or_default();
    state.strategy.exchange(code, &pending).await
}

/// Signs the user out by deleting their session.
pub async fn logout(
    State(state): State<AppState>,
    jar: SignedCookieJar,
) -> Result<impl IntoResponse, AuthError> {
    if let Some(id) = session_id(&jar) {
        state.sessions.delete(&id).await?;
        tracing::info!(session_id = %id, "user signed out");
    }

    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    let target = state.gate.settings().default_return_path.clone();

    Ok((jar, Redirect::to(&target)))
}

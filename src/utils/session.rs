//! Shared session resolution.
//!
//! The provider's standard session read is unreliable in this deployment:
//! the canonical cookie does not always survive the trip through the edge
//! middleware, so a valid session can arrive under a differently-named
//! cookie. Every authenticated handler therefore resolves the caller in two
//! steps: the standard read first, then a manual decode of the first cookie
//! whose name contains `auth-token`, re-establishing the session from the
//! raw token pair. Total failure is a plain 401.

use actix_web::HttpRequest;

use crate::error::ApiError;
use crate::models::auth_model::{AuthCookie, AuthUser};
use crate::provider::{Provider, SessionTokens};

/// Substring that marks a session cookie regardless of project ref.
pub const AUTH_COOKIE_MARKER: &str = "auth-token";

/// Token pair from the canonical cookie, used to scope the per-request
/// provider client. `None` when the cookie is absent or undecodable; the
/// resolver's fallback still gets its chance later.
pub fn session_from_request(req: &HttpRequest, cookie_name: &str) -> Option<SessionTokens> {
    let cookie = req.cookie(cookie_name)?;
    let blob: AuthCookie = serde_json::from_str(cookie.value()).ok()?;
    if blob.access_token.is_empty() {
        return None;
    }
    Some(SessionTokens {
        access_token: blob.access_token,
        refresh_token: blob.refresh_token,
    })
}

/// Produces the authenticated account for a request, or `Unauthorized`.
pub async fn resolve_user(
    req: &HttpRequest,
    provider: &dyn Provider,
) -> Result<AuthUser, ApiError> {
    match provider.current_user().await {
        Ok(Some(user)) => return Ok(user),
        Ok(None) => {}
        Err(err) => log::debug!("standard session read failed: {err}"),
    }

    // Fallback: only the first auth-token cookie is considered, and a parse
    // failure is terminal.
    let cookies = req.cookies().map_err(|_| ApiError::unauthorized())?;
    let Some(cookie) = cookies.iter().find(|c| c.name().contains(AUTH_COOKIE_MARKER)) else {
        return Err(ApiError::unauthorized());
    };
    let blob: AuthCookie = serde_json::from_str(cookie.value()).map_err(|err| {
        log::debug!("auth cookie parse failed: {err}");
        ApiError::unauthorized()
    })?;
    if blob.access_token.is_empty() {
        return Err(ApiError::unauthorized());
    }
    match provider
        .set_session(&blob.access_token, &blob.refresh_token)
        .await
    {
        Ok(session) => {
            log::debug!("session re-established from cookie for {}", session.user.id);
            Ok(session.user)
        }
        Err(err) => {
            log::debug!("session re-establishment failed: {err}");
            Err(ApiError::unauthorized())
        }
    }
}

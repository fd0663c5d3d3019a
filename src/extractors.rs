use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::auth::cookies::{cookie_value, MalformedCookie};
use crate::auth::session::SessionStore;
use crate::error::AppError;
use crate::state::AppState;

/// Identity established by the session cookie. Every protected handler takes
/// one of these; holding it means the caller presented a live session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: String,
    pub username: String,
}

/// Resolve a session token into an identity.
/// Absent, unknown and expired tokens all come back as `Unauthorized`.
pub async fn authenticate(
    sessions: &SessionStore,
    token: Option<&str>,
) -> Result<AuthenticatedUser, AppError> {
    let token = token.ok_or(AppError::Unauthorized)?;
    let session = sessions
        .resolve(token)
        .await
        .ok_or(AppError::Unauthorized)?;

    Ok(AuthenticatedUser {
        id: session.user_id,
        username: session.username,
    })
}

/// Extractor that requires authentication.
/// Returns 401 if no valid session found.
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // A garbled cookie header is just another missing credential here
        let token = cookie_value(&parts.headers, &state.config.auth.cookie_name)
            .ok()
            .flatten();
        authenticate(&state.sessions, token).await
    }
}

/// The raw session token, without resolving it.
/// Missing cookie is 401, an unreadable cookie header is 400.
pub struct SessionCookie(pub String);

impl FromRequestParts<AppState> for SessionCookie {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match cookie_value(&parts.headers, &state.config.auth.cookie_name) {
            Ok(Some(token)) => Ok(SessionCookie(token.to_string())),
            Ok(None) => Err(AppError::Unauthorized),
            Err(MalformedCookie) => Err(AppError::BadRequest("Malformed cookie".into())),
        }
    }
}

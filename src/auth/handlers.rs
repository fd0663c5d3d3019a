use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::auth::cookies::{clear_session_cookie, session_cookie};
use crate::auth::issuer::CredentialIssuer;
use crate::error::{AppError, AppResult};
use crate::extractors::SessionCookie;
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

// -- Handlers --

/// POST /sign-in — check credentials and set a fresh session cookie
pub async fn sign_in(
    State(state): State<AppState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> AppResult<Response> {
    let Json(credentials) =
        payload.map_err(|_| AppError::BadRequest("Invalid request body".into()))?;

    let issued = CredentialIssuer::new(state.repo.as_ref(), &state.sessions)
        .sign_in(&credentials.username, &credentials.password)
        .await?;

    Ok((
        StatusCode::OK,
        [(
            header::SET_COOKIE,
            session_cookie(
                &state.config.auth.cookie_name,
                &issued.token,
                issued.expires_at,
            ),
        )],
        "Signed in successfully",
    )
        .into_response())
}

/// POST /logout — drop the session and clear the cookie
pub async fn logout(
    State(state): State<AppState>,
    SessionCookie(token): SessionCookie,
) -> AppResult<Response> {
    CredentialIssuer::new(state.repo.as_ref(), &state.sessions)
        .logout(&token)
        .await;
    tracing::info!("Session closed");

    Ok((
        StatusCode::OK,
        [(
            header::SET_COOKIE,
            clear_session_cookie(&state.config.auth.cookie_name),
        )],
        "Logged out",
    )
        .into_response())
}

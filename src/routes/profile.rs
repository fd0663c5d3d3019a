use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

use crate::auth::cookies::session_cookie;
use crate::auth::CredentialIssuer;
use crate::db::models::User;
use crate::db::repository::ProfileUpdate;
use crate::error::{AppError, AppResult};
use crate::extractors::AuthenticatedUser;
use crate::state::AppState;

// --- Request bodies ---

#[derive(Deserialize)]
pub struct CreateProfileRequest {
    pub name: String,
    pub password: String,
    #[serde(default)]
    pub avatar: String,
}

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub avatar: String,
}

impl UpdateProfileRequest {
    /// Empty strings mean "leave unchanged". Names are trimmed like at sign-up.
    fn into_update(self) -> ProfileUpdate {
        let name = self.name.trim();
        ProfileUpdate {
            name: (!name.is_empty()).then(|| name.to_string()),
            avatar: (!self.avatar.trim().is_empty()).then_some(self.avatar),
        }
    }
}

// --- Router ---

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/profile",
        post(create_profile).get(get_profile).patch(update_profile),
    )
}

// --- Handlers ---

/// POST /profile — sign up; also opens a session
async fn create_profile(
    State(state): State<AppState>,
    payload: Result<Json<CreateProfileRequest>, JsonRejection>,
) -> AppResult<Response> {
    let Json(req) = payload.map_err(|_| AppError::BadRequest("Invalid request body".into()))?;

    let user = User::new(req.name, req.password, req.avatar);
    let issued = CredentialIssuer::new(state.repo.as_ref(), &state.sessions)
        .sign_up(user)
        .await?;

    Ok((
        StatusCode::CREATED,
        [(
            header::SET_COOKIE,
            session_cookie(
                &state.config.auth.cookie_name,
                &issued.token,
                issued.expires_at,
            ),
        )],
        "Account created successfully",
    )
        .into_response())
}

/// GET /profile — the caller's own user document
async fn get_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<User>> {
    let profile = state.repo.find_user_by_id(&user.id).await?;
    Ok(Json(profile))
}

/// PATCH /profile — change name and/or avatar
async fn update_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    payload: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> AppResult<Response> {
    let Json(req) =
        payload.map_err(|_| AppError::BadRequest("Invalid request payload".into()))?;

    let update = req.into_update();
    if update.is_empty() {
        return Err(AppError::BadRequest("No update fields provided".into()));
    }

    state.repo.update_profile(&user.id, &update).await?;
    tracing::info!("Profile {} updated", user.id);

    Ok((StatusCode::OK, "Profile updated successfully").into_response())
}

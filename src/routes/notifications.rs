use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::db::models::Notification;
use crate::error::AppResult;
use crate::extractors::AuthenticatedUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/notifications", get(list_notifications))
}

/// GET /notifications — notifications produced by the caller's likes
async fn list_notifications(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<Notification>>> {
    let notifications = state.repo.find_notifications_by_liker(&user.id).await?;
    Ok(Json(notifications))
}

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::db::models::{Notification, Post};
use crate::db::repository::UserSet;
use crate::error::{AppError, AppResult};
use crate::extractors::AuthenticatedUser;
use crate::likes::LikeWorkflow;
use crate::state::AppState;

const MAX_CONTENT_LEN: usize = 2000;

// --- Forms ---

#[derive(Deserialize)]
pub struct CreatePostRequest {
    pub content: String,
}

// --- Router ---

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts", post(create_post).get(list_my_posts))
        .route("/posts/liked", get(list_liked_posts))
        .route("/posts/{id}/like", post(like_post))
}

// --- Handlers ---

/// POST /posts — publish a post as the caller
async fn create_post(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    payload: Result<Json<CreatePostRequest>, JsonRejection>,
) -> AppResult<Json<Post>> {
    let Json(req) = payload.map_err(|_| AppError::BadRequest("Failed to decode json".into()))?;

    let content = req.content.trim().to_string();
    if content.is_empty() {
        return Err(AppError::BadRequest("Post content cannot be empty".into()));
    }
    if content.chars().count() > MAX_CONTENT_LEN {
        return Err(AppError::BadRequest(format!(
            "Post content must be {} characters or less",
            MAX_CONTENT_LEN
        )));
    }

    let post = Post::new(&user.id, content);
    state.repo.insert_post(&post).await?;
    state
        .repo
        .add_to_user_set(&user.id, UserSet::Posts, &post.id)
        .await?;

    Ok(Json(post))
}

/// GET /posts — posts written by the caller
async fn list_my_posts(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<Post>>> {
    let posts = state.repo.find_posts_by_author(&user.id).await?;
    Ok(Json(posts))
}

/// GET /posts/liked — posts the caller has liked
async fn list_liked_posts(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<Post>>> {
    let posts = state.repo.find_liked_posts(&user.id).await?;
    Ok(Json(posts))
}

/// POST /posts/{id}/like — like a post; returns the notification it produced
async fn like_post(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> AppResult<Json<Notification>> {
    let post_id = uuid::Uuid::parse_str(&id)
        .map_err(|_| AppError::BadRequest("Invalid post ID".into()))?
        .to_string();

    let notification = LikeWorkflow::new(state.repo.as_ref())
        .like(&user.id, &post_id)
        .await?;

    Ok(Json(notification))
}

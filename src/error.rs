use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::auth::session::SessionError;
use crate::db::RepositoryError;
use crate::likes::LikeError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found")]
    NotFound,

    /// No credential, or a credential that does not resolve to a live session.
    #[error("Unauthorized")]
    Unauthorized,

    /// Sign-in failure. Unknown user and wrong password look the same.
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Post is already liked by you")]
    AlreadyLiked,

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Repository error: {0}")]
    Repository(RepositoryError),

    #[error("Like failed: {0}")]
    LikeFailed(LikeError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

impl From<RepositoryError> for AppError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound(_) => AppError::NotFound,
            RepositoryError::Conflict(msg) => AppError::Conflict(msg),
            unavailable @ (RepositoryError::Timeout(_) | RepositoryError::Pool(_)) => {
                AppError::Unavailable(unavailable.to_string())
            }
            other => AppError::Repository(other),
        }
    }
}

impl From<LikeError> for AppError {
    fn from(e: LikeError) -> Self {
        match e {
            LikeError::AlreadyLiked => AppError::AlreadyLiked,
            LikeError::UserNotFound | LikeError::PostNotFound => AppError::NotFound,
            failed @ LikeError::Failed { .. } => AppError::LikeFailed(failed),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string()),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "Invalid username or password".to_string(),
            ),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::AlreadyLiked => (
                StatusCode::CONFLICT,
                "Post is already liked by you".to_string(),
            ),
            AppError::Unavailable(msg) => {
                tracing::error!("Store unavailable: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Service unavailable".to_string(),
                )
            }
            AppError::Repository(e) => {
                tracing::error!("Repository error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::LikeFailed(e) => {
                tracing::error!("Like failed: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::Session(e) => {
                tracing::error!("Session error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, message).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

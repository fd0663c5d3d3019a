pub mod auth;
pub mod notifications;
pub mod posts;
pub mod profile;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// The full HTTP surface with request tracing.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(auth::router())
        .merge(profile::router())
        .merge(posts::router())
        .merge(notifications::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// Library exports so integration tests can drive the forum's domain layer
// directly.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod forum;
pub mod routes;
pub mod state;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// The full HTTP surface, ready to serve.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::feed::index))
        .route("/posts", get(routes::feed::posts))
        .merge(routes::auth::router())
        .route(
            "/post/create",
            get(routes::posts::create_page).post(routes::posts::create),
        )
        .route(
            "/edit-post",
            get(routes::posts::edit_page).post(routes::posts::edit),
        )
        .route("/post/delete", delete(routes::posts::delete))
        .route("/comment", post(routes::comments::create))
        .route("/comment/delete", delete(routes::comments::delete))
        .route("/like", post(routes::votes::cast))
        .route("/static/{*path}", get(routes::assets::serve))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

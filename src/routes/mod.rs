pub mod assets;
pub mod auth;
pub mod comments;
pub mod home;
pub mod posts;
pub mod views;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::state::AppState;
use crate::uploads;

/// Room for the non-file multipart fields on top of the image itself.
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

/// The complete application router.
pub fn router(state: AppState) -> Router {
    let upload_limit = state.images.max_bytes() + FORM_OVERHEAD_BYTES;

    Router::new()
        .route("/", get(home::index))
        .route("/post", get(posts::post_page))
        .route(
            "/create_post",
            post(posts::create_post).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/like", post(posts::like))
        .route("/dislike", post(posts::dislike))
        .route("/my_posts", get(posts::my_posts))
        .route("/liked_posts", get(posts::liked_posts))
        .route("/create_comment", post(comments::create_comment))
        .route("/like_comment", post(comments::like_comment))
        .route("/dislike_comment", post(comments::dislike_comment))
        .route("/ui/{*path}", get(assets::serve))
        .route("/uploads/{file}", get(uploads::serve))
        .merge(auth::router())
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found() -> AppError {
    AppError::NotFound
}

async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

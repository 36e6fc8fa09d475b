use axum::extract::State;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use serde::Deserialize;

use crate::db::models::{Polarity, Target};
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateCommentForm {
    pub post_id: String,
    pub content: String,
}

#[derive(Deserialize)]
pub struct CommentReactionForm {
    pub comment_id: String,
}

/// POST /create_comment
pub async fn create_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<CreateCommentForm>,
) -> AppResult<Response> {
    state
        .comments
        .create(&form.post_id, &user.id, &form.content)?;
    Ok(redirect_to_post(&form.post_id))
}

/// POST /like_comment
pub async fn like_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<CommentReactionForm>,
) -> AppResult<Response> {
    react_to_comment(&state, &user, &form.comment_id, Polarity::Like)
}

/// POST /dislike_comment
pub async fn dislike_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<CommentReactionForm>,
) -> AppResult<Response> {
    react_to_comment(&state, &user, &form.comment_id, Polarity::Dislike)
}

fn react_to_comment(
    state: &AppState,
    user: &CurrentUser,
    comment_id: &str,
    polarity: Polarity,
) -> AppResult<Response> {
    let post_id = state
        .comments
        .parent_post(comment_id)?
        .ok_or(AppError::NotFound)?;
    state
        .reactions
        .react(&user.id, &Target::Comment(comment_id.to_string()), polarity)?;
    Ok(redirect_to_post(&post_id))
}

// Only called with ids that were just found in the database
fn redirect_to_post(post_id: &str) -> Response {
    Redirect::to(&format!("/post?id={}", post_id)).into_response()
}

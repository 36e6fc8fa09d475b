use askama::Template;
use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use serde::Deserialize;

use crate::content::posts::{NewPost, PostFilter};
use crate::db::models::{Category, Polarity, Target};
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, MaybeUser};
use crate::routes::home::Html;
use crate::routes::views::{comment_views, post_cards, CommentView, PostCard};
use crate::state::AppState;
use crate::uploads;

// --- Templates ---

#[derive(Template)]
#[template(path = "pages/post.html")]
pub struct PostTemplate {
    pub post: PostCard,
    pub comments: Vec<CommentView>,
    pub username: Option<String>,
    pub logged_in: bool,
}

#[derive(Template)]
#[template(path = "pages/posts.html")]
pub struct PostsTemplate {
    pub title: String,
    pub posts: Vec<PostCard>,
    pub categories: Vec<Category>,
    pub username: Option<String>,
    pub logged_in: bool,
}

// --- Forms ---

#[derive(Deserialize)]
pub struct PostQuery {
    pub id: Option<String>,
}

#[derive(Deserialize)]
pub struct ReactionForm {
    pub post_id: String,
}

// --- Handlers ---

/// GET /post?id=: a post with its comments.
pub async fn post_page(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Query(query): Query<PostQuery>,
) -> AppResult<Html<PostTemplate>> {
    let post_id = query
        .id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::validation("Missing post ID"))?;

    let post = state.posts.get(&post_id)?;
    let post = post_cards(&state.reactions, user.as_ref(), vec![post])?
        .pop()
        .ok_or(AppError::NotFound)?;
    let comments = state.comments.for_post(&post_id)?;
    let comments = comment_views(&state.reactions, user.as_ref(), comments)?;

    Ok(Html(PostTemplate {
        post,
        comments,
        logged_in: user.is_some(),
        username: user.map(|u| u.username),
    }))
}

/// POST /create_post: multipart: content, categories (repeated), optional image.
pub async fn create_post(
    State(state): State<AppState>,
    user: CurrentUser,
    mut multipart: Multipart,
) -> AppResult<Response> {
    let max_bytes = state.images.max_bytes();
    let mut new_post = NewPost::default();
    let mut image: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_bytes))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "content" => {
                new_post.content = field
                    .text()
                    .await
                    .map_err(|e| multipart_error(e, max_bytes))?;
            }
            "categories" | "categories[]" => {
                let category = field
                    .text()
                    .await
                    .map_err(|e| multipart_error(e, max_bytes))?;
                if !category.trim().is_empty() {
                    new_post.categories.push(category);
                }
            }
            "image" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| multipart_error(e, max_bytes))?;
                // Browsers send an empty part when no file was chosen
                if !bytes.is_empty() {
                    image = Some(bytes.to_vec());
                }
            }
            _ => {}
        }
    }

    new_post.validate()?;

    if let Some(bytes) = image {
        new_post.image_path = Some(state.images.save(&bytes).await?);
    }

    let saved_image = new_post.image_path.clone();
    if let Err(e) = state.posts.create(&user.id, new_post) {
        if let Some(path) = saved_image {
            state.images.discard(&path).await;
        }
        return Err(e);
    }

    Ok(Redirect::to("/").into_response())
}

/// POST /like
pub async fn like(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Form(form): Form<ReactionForm>,
) -> AppResult<Response> {
    react_to_post(&state, &user, &headers, &form.post_id, Polarity::Like)
}

/// POST /dislike
pub async fn dislike(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Form(form): Form<ReactionForm>,
) -> AppResult<Response> {
    react_to_post(&state, &user, &headers, &form.post_id, Polarity::Dislike)
}

fn react_to_post(
    state: &AppState,
    user: &CurrentUser,
    headers: &HeaderMap,
    post_id: &str,
    polarity: Polarity,
) -> AppResult<Response> {
    state
        .reactions
        .react(&user.id, &Target::Post(post_id.to_string()), polarity)?;
    Ok(back_to_referer(headers))
}

/// GET /my_posts
pub async fn my_posts(State(state): State<AppState>, user: CurrentUser) -> AppResult<Response> {
    let filter = PostFilter::AuthoredBy(user.id.clone());
    render_post_list(&state, user, "My Posts", &filter)
}

/// GET /liked_posts
pub async fn liked_posts(State(state): State<AppState>, user: CurrentUser) -> AppResult<Response> {
    let filter = PostFilter::LikedBy(user.id.clone());
    render_post_list(&state, user, "Liked Posts", &filter)
}

fn render_post_list(
    state: &AppState,
    user: CurrentUser,
    title: &str,
    filter: &PostFilter,
) -> AppResult<Response> {
    let posts = state.posts.list(filter)?;
    let posts = post_cards(&state.reactions, Some(&user), posts)?;
    let categories = state.categories.all()?;

    Ok(Html(PostsTemplate {
        title: title.to_string(),
        posts,
        categories,
        username: Some(user.username),
        logged_in: true,
    })
    .into_response())
}

// --- Helpers ---

/// Send the browser back where the form was submitted from.
pub(crate) fn back_to_referer(headers: &HeaderMap) -> Response {
    let target = headers
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .unwrap_or("/");
    Redirect::to(target).into_response()
}

fn multipart_error(e: MultipartError, max_bytes: usize) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        uploads::too_large(max_bytes)
    } else {
        AppError::validation(format!("Invalid form data: {}", e.body_text()))
    }
}

use askama::Template;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::content::posts::PostFilter;
use crate::db::models::Category;
use crate::error::AppResult;
use crate::extractors::MaybeUser;
use crate::routes::views::{post_cards, PostCard};
use crate::state::AppState;

#[derive(Template)]
#[template(path = "pages/index.html")]
pub struct IndexTemplate {
    pub posts: Vec<PostCard>,
    pub categories: Vec<Category>,
    pub username: Option<String>,
    pub logged_in: bool,
    pub selected_category: String,
}

/// Wrapper to render askama templates as axum responses
pub struct Html<T: Template>(pub T);

impl<T: Template> IntoResponse for Html<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(body) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                body,
            )
                .into_response(),
            Err(e) => {
                tracing::error!("Template render error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
            }
        }
    }
}

#[derive(Deserialize)]
pub struct IndexQuery {
    pub category: Option<String>,
}

/// GET /: every post, newest first, optionally narrowed to one category.
pub async fn index(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Query(query): Query<IndexQuery>,
) -> AppResult<Html<IndexTemplate>> {
    let filter = PostFilter::from_category_param(query.category.as_deref());
    let posts = state.posts.list(&filter)?;
    let posts = post_cards(&state.reactions, user.as_ref(), posts)?;
    let categories = state.categories.all()?;

    // Highlight the active filter whether it was given by id or by name
    let selected_category = match &filter {
        PostFilter::Category(key) => state
            .categories
            .resolve(key)?
            .map(|c| c.id)
            .unwrap_or_default(),
        _ => String::new(),
    };

    Ok(Html(IndexTemplate {
        posts,
        categories,
        logged_in: user.is_some(),
        username: user.map(|u| u.username),
        selected_category,
    }))
}

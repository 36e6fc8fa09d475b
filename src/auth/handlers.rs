use askama::Template;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{AppendHeaders, IntoResponse, Redirect, Response};
use axum::Form;
use serde::Deserialize;

use crate::config::AuthConfig;
use crate::error::{AppError, AppResult};
use crate::extractors::{session_token, MaybeUser};
use crate::routes::home::Html;
use crate::state::AppState;

// -- Templates --

#[derive(Template)]
#[template(path = "pages/register.html")]
pub struct RegisterTemplate {
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "pages/login.html")]
pub struct LoginTemplate {
    pub error: Option<String>,
}

// -- Request types --

#[derive(Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

// -- Cookie helpers --

fn session_cookie(auth: &AuthConfig, token: &str) -> String {
    let max_age_secs = auth.session_hours * 3600;
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        auth.cookie_name, token, max_age_secs
    )
}

fn clear_session_cookie(auth: &AuthConfig) -> String {
    format!(
        "{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0",
        auth.cookie_name
    )
}

fn logged_in_redirect(auth: &AuthConfig, token: &str) -> Response {
    (
        AppendHeaders([(header::SET_COOKIE, session_cookie(auth, token))]),
        Redirect::to("/"),
    )
        .into_response()
}

// -- Registration --

/// GET /register
pub async fn register_page(MaybeUser(user): MaybeUser) -> Response {
    if user.is_some() {
        return Redirect::to("/").into_response();
    }
    Html(RegisterTemplate { error: None }).into_response()
}

/// POST /register: create the account and log it straight in.
pub async fn register(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> AppResult<Response> {
    match state
        .credentials
        .register(&form.email, &form.username, &form.password)
    {
        Ok(registration) => Ok(logged_in_redirect(
            &state.config.auth,
            &registration.session_token,
        )),
        Err(AppError::Validation(msg)) => Ok((
            StatusCode::BAD_REQUEST,
            Html(RegisterTemplate { error: Some(msg) }),
        )
            .into_response()),
        Err(e) => Err(e),
    }
}

// -- Login / logout --

/// GET /login
pub async fn login_page(MaybeUser(user): MaybeUser) -> Response {
    if user.is_some() {
        return Redirect::to("/").into_response();
    }
    Html(LoginTemplate { error: None }).into_response()
}

/// POST /login
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    match state.credentials.authenticate(&form.email, &form.password) {
        Ok(token) => Ok(logged_in_redirect(&state.config.auth, &token)),
        Err(AppError::InvalidCredentials) => Ok((
            StatusCode::BAD_REQUEST,
            Html(LoginTemplate {
                error: Some(AppError::InvalidCredentials.to_string()),
            }),
        )
            .into_response()),
        Err(e) => Err(e),
    }
}

/// POST /logout: drop the server-side token and expire the cookie.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Response> {
    if let Some(token) = session_token(&headers, &state.config.auth.cookie_name) {
        state.sessions.revoke(token)?;
    }

    Ok((
        AppendHeaders([(header::SET_COOKIE, clear_session_cookie(&state.config.auth))]),
        Redirect::to("/"),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_cookie_carries_name_and_lifetime() {
        let auth = AuthConfig::default();
        let cookie = session_cookie(&auth, "abc");
        assert!(cookie.starts_with("session_token=abc;"));
        assert!(cookie.contains("Max-Age=86400"));
        assert!(cookie.contains("HttpOnly"));
    }

    #[test]
    fn clear_cookie_expires_immediately() {
        let auth = AuthConfig::default();
        assert!(clear_session_cookie(&auth).contains("Max-Age=0"));
    }
}

use askama::Template;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;

use crate::auth::{self, identity};
use crate::error::{AppError, AppResult};
use crate::extractors::{MaybeUser, SessionToken};
use crate::routes::Html;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", get(register_page).post(register))
        .route("/login", get(login_page).post(login))
        .route("/logout", get(logout).post(logout))
}

#[derive(Template)]
#[template(path = "pages/register.html")]
pub struct RegisterTemplate {
    pub error: String,
    pub username: String,
    pub email: String,
}

#[derive(Template)]
#[template(path = "pages/login.html")]
pub struct LoginTemplate {
    pub error: String,
    pub email: String,
}

#[derive(Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// GET /register — already-authenticated users go straight to the feed.
pub async fn register_page(maybe_user: MaybeUser) -> Response {
    if maybe_user.0.is_some() {
        return Redirect::to("/posts").into_response();
    }
    Html(RegisterTemplate {
        error: String::new(),
        username: String::new(),
        email: String::new(),
    })
    .into_response()
}

/// POST /register — on success 303 to /login; on failure re-render the
/// form with the entered values and the specific reason.
pub async fn register(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> AppResult<Response> {
    match identity::register(&state.db, &form.username, &form.email, &form.password) {
        Ok(user_id) => {
            tracing::info!(user_id, username = %form.username, "user registered");
            Ok(Redirect::to("/login").into_response())
        }
        Err(AppError::InvalidInput(msg)) => Ok(render_register(StatusCode::BAD_REQUEST, msg, form)),
        Err(AppError::Conflict(msg)) => Ok(render_register(StatusCode::CONFLICT, msg, form)),
        Err(e) => Err(e),
    }
}

fn render_register(status: StatusCode, error: String, form: RegisterForm) -> Response {
    (
        status,
        Html(RegisterTemplate {
            error,
            username: form.username,
            email: form.email,
        })
        .into_response(),
    )
        .into_response()
}

/// GET /login
pub async fn login_page(maybe_user: MaybeUser) -> Response {
    if maybe_user.0.is_some() {
        return Redirect::to("/posts").into_response();
    }
    Html(LoginTemplate {
        error: String::new(),
        email: String::new(),
    })
    .into_response()
}

/// POST /login — sets the session cookie on success. Unknown email and
/// wrong password render the same 401 message.
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    let token = match identity::login(
        &state.db,
        &form.email,
        &form.password,
        state.config.auth.session_hours,
    ) {
        Ok(Some(token)) => token,
        Ok(None) => {
            return Ok(render_login(
                StatusCode::UNAUTHORIZED,
                identity::BAD_CREDENTIALS.into(),
                form.email,
            ))
        }
        Err(AppError::InvalidInput(msg)) => {
            return Ok(render_login(StatusCode::BAD_REQUEST, msg, form.email))
        }
        Err(e) => return Err(e),
    };

    let cookie = auth::session_cookie(
        &token,
        state.config.auth.session_hours,
        state.config.auth.secure_cookies,
    );
    Ok((
        [(header::SET_COOKIE, cookie)],
        Redirect::to("/posts"),
    )
        .into_response())
}

fn render_login(status: StatusCode, error: String, email: String) -> Response {
    (status, Html(LoginTemplate { error, email }).into_response()).into_response()
}

/// GET/POST /logout — drops the session row and expires the cookie.
/// Idempotent; always lands on /login.
pub async fn logout(State(state): State<AppState>, token: SessionToken) -> AppResult<Response> {
    if let Some(token) = token.0 {
        identity::logout(&state.db, &token)?;
    }
    Ok((
        [(header::SET_COOKIE, auth::clear_session_cookie())],
        Redirect::to("/login"),
    )
        .into_response())
}

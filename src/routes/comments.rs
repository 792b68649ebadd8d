use axum::extract::State;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::forum::comments::{self, check_content};
use crate::routes::posts_redirect;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub post_id: String,
    #[serde(default)]
    pub content: String,
    pub redirect_category: Option<String>,
}

#[derive(Deserialize)]
pub struct DeleteCommentRequest {
    pub comment_id: i64,
    pub redirect_category: Option<String>,
}

/// POST /comment — content rule violations bounce back to the feed with a
/// machine-readable error code, keeping the active category filter.
pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<CommentForm>,
) -> AppResult<Response> {
    let post_id: i64 = form
        .post_id
        .parse()
        .map_err(|_| AppError::InvalidInput("Invalid post ID".into()))?;

    if !crate::db::post_exists(&state.db, post_id)? {
        return Err(AppError::InvalidInput("Post not found".into()));
    }

    if let Err(rejection) = check_content(&form.content) {
        let mut url = format!("/posts?error={}", rejection.code());
        if let Some(category) = form.redirect_category.as_deref().filter(|c| !c.is_empty()) {
            url.push_str("&category=");
            url.push_str(category);
        }
        return Ok(Redirect::to(&url).into_response());
    }

    comments::create(&state.db, user.id, post_id, &form.content)?;
    Ok(posts_redirect(form.redirect_category.as_deref()).into_response())
}

/// DELETE /comment/delete — JSON body, author-only; votes on the comment
/// go with it.
pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    axum::Json(req): axum::Json<DeleteCommentRequest>,
) -> AppResult<Response> {
    comments::delete(&state.db, user.id, req.comment_id)?;
    Ok(posts_redirect(req.redirect_category.as_deref()).into_response())
}

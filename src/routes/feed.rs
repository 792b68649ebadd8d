use askama::Template;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use serde::Deserialize;

use crate::db::models::Category;
use crate::error::AppResult;
use crate::extractors::MaybeUser;
use crate::forum::catalog;
use crate::forum::comments::CommentRejection;
use crate::forum::feed::{self, FeedPost, Filter};
use crate::routes::Html;
use crate::state::AppState;

#[derive(Template)]
#[template(path = "pages/posts.html")]
pub struct PostsTemplate {
    pub logged_in: bool,
    pub current_user: String,
    pub posts: Vec<FeedPost>,
    pub categories: Vec<Category>,
    pub filter: String,
    pub category_filter: String,
    pub error: String,
}

#[derive(Deserialize)]
pub struct FeedParams {
    #[serde(default)]
    pub filter: String,
    pub category: Option<String>,
    pub error: Option<String>,
}

/// GET / — the root just forwards to the feed.
pub async fn index() -> Redirect {
    Redirect::to("/posts")
}

/// GET /posts — the feed with optional filter/category narrowing and an
/// optional error code from a bounced comment submission.
pub async fn posts(
    State(state): State<AppState>,
    maybe_user: MaybeUser,
    Query(params): Query<FeedParams>,
) -> AppResult<Response> {
    let viewer = maybe_user.0;
    let filter = Filter::from_query(&params.filter);

    let posts = feed::load(
        &state.db,
        viewer.as_ref().map(|u| u.id),
        filter,
        params.category.as_deref(),
    )?;
    let categories = catalog::list(&state.db)?;

    let error = params
        .error
        .as_deref()
        .map(|code| {
            CommentRejection::message(code)
                .unwrap_or("An error occurred.")
                .to_string()
        })
        .unwrap_or_default();

    Ok(Html(PostsTemplate {
        logged_in: viewer.is_some(),
        current_user: viewer.map(|u| u.username).unwrap_or_default(),
        posts,
        categories,
        filter: params.filter,
        category_filter: params.category.unwrap_or_default(),
        error,
    })
    .into_response())
}

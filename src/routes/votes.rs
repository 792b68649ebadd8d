use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Form;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::forum::votes::{self, VoteTarget};
use crate::routes::posts_redirect;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct VoteForm {
    #[serde(default)]
    pub is_like: String,
    pub post_id: Option<String>,
    pub comment_id: Option<String>,
    pub redirect_category: Option<String>,
}

/// POST /like — tri-state toggle on a post or a comment; exactly one of
/// the two ids must be present.
pub async fn cast(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<VoteForm>,
) -> AppResult<Response> {
    let post_id = parse_optional_id(form.post_id.as_deref(), "post")?;
    let comment_id = parse_optional_id(form.comment_id.as_deref(), "comment")?;
    let target = VoteTarget::from_ids(post_id, comment_id)?;
    let is_like = form.is_like == "true";

    votes::cast(&state.db, user.id, target, is_like)?;
    Ok(posts_redirect(form.redirect_category.as_deref()).into_response())
}

fn parse_optional_id(value: Option<&str>, kind: &str) -> AppResult<Option<i64>> {
    match value {
        None | Some("") => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| AppError::InvalidInput(format!("Invalid {} ID", kind))),
    }
}

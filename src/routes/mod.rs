pub mod assets;
pub mod auth;
pub mod comments;
pub mod feed;
pub mod posts;
pub mod votes;

use askama::Template;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};

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

/// 303 back to the feed, keeping the active category filter when a form
/// carried one.
pub fn posts_redirect(category: Option<&str>) -> Redirect {
    match category {
        Some(name) if !name.is_empty() => Redirect::to(&format!("/posts?category={}", name)),
        _ => Redirect::to("/posts"),
    }
}

/// A checkbox entry for the create/edit forms.
#[derive(Debug, Clone)]
pub struct CategoryOption {
    pub id: i64,
    pub name: String,
    pub checked: bool,
}

pub fn category_options(
    categories: Vec<crate::db::models::Category>,
    selected: &[i64],
) -> Vec<CategoryOption> {
    categories
        .into_iter()
        .map(|c| CategoryOption {
            checked: selected.contains(&c.id),
            id: c.id,
            name: c.name,
        })
        .collect()
}

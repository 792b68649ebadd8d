use askama::Template;
use axum::extract::{Multipart, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::forum::catalog;
use crate::forum::posts::{self, PostInput, CONTENT_WRAP_WORDS, TITLE_WRAP_WORDS};
use crate::forum::uploads::ImageUpload;
use crate::forum::word_wrap;
use crate::routes::{category_options, posts_redirect, CategoryOption, Html};
use crate::state::AppState;

#[derive(Template)]
#[template(path = "pages/create_post.html")]
pub struct CreatePostTemplate {
    pub categories: Vec<CategoryOption>,
    pub error: String,
    pub title: String,
    pub content: String,
    pub category_filter: String,
}

#[derive(Template)]
#[template(path = "pages/edit_post.html")]
pub struct EditPostTemplate {
    pub post_id: i64,
    pub categories: Vec<CategoryOption>,
    pub error: String,
    pub title: String,
    pub content: String,
    pub image_path: String,
    pub category_filter: String,
}

#[derive(Deserialize)]
pub struct CreatePageParams {
    pub category: Option<String>,
}

#[derive(Deserialize)]
pub struct EditParams {
    pub id: i64,
    pub category: Option<String>,
}

#[derive(Deserialize)]
pub struct DeletePostRequest {
    pub post_id: i64,
    pub redirect_category: Option<String>,
}

/// Fields collected from the multipart create/edit form.
struct PostForm {
    input: PostInput,
    redirect_category: Option<String>,
    image: Option<ImageUpload>,
}

async fn read_post_form(mut multipart: Multipart) -> AppResult<PostForm> {
    let mut title = String::new();
    let mut content = String::new();
    let mut category_ids = Vec::new();
    let mut redirect_category = None;
    let mut image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Malformed form: {}", e)))?
    {
        match field.name().unwrap_or_default() {
            "title" => {
                title = field
                    .text()
                    .await
                    .map_err(|e| AppError::InvalidInput(e.to_string()))?
            }
            "content" => {
                content = field
                    .text()
                    .await
                    .map_err(|e| AppError::InvalidInput(e.to_string()))?
            }
            "categories" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::InvalidInput(e.to_string()))?;
                // An unchecked "No category" option posts an empty value
                if value.is_empty() {
                    continue;
                }
                let id: i64 = value
                    .parse()
                    .map_err(|_| AppError::InvalidInput("Invalid category selected.".into()))?;
                category_ids.push(id);
            }
            "redirect_category" => {
                redirect_category = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| AppError::InvalidInput(e.to_string()))?,
                )
            }
            "image" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::InvalidInput(format!("Failed to read image: {}", e)))?;
                // Browsers submit an empty image part when nothing was picked
                if filename.is_empty() && data.is_empty() {
                    continue;
                }
                image = Some(ImageUpload {
                    filename,
                    data: data.to_vec(),
                });
            }
            _ => {}
        }
    }

    Ok(PostForm {
        input: PostInput {
            title,
            content,
            category_ids,
        },
        redirect_category,
        image,
    })
}

/// GET /post/create
pub async fn create_page(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(params): Query<CreatePageParams>,
) -> AppResult<Response> {
    let categories = category_options(catalog::list(&state.db)?, &[]);
    Ok(Html(CreatePostTemplate {
        categories,
        error: String::new(),
        title: String::new(),
        content: String::new(),
        category_filter: params.category.unwrap_or_default(),
    })
    .into_response())
}

/// POST /post/create — multipart form with optional image. Validation
/// failures re-render the form with the entered (wrapped) values.
pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    multipart: Multipart,
) -> AppResult<Response> {
    let form = read_post_form(multipart).await?;

    match posts::create(
        &state.db,
        &state.config.storage.uploads,
        user.id,
        &form.input,
        form.image.as_ref(),
    ) {
        Ok(post_id) => {
            tracing::info!(post_id, user_id = user.id, "post created");
            Ok(posts_redirect(form.redirect_category.as_deref()).into_response())
        }
        Err(AppError::InvalidInput(msg)) => {
            let categories =
                category_options(catalog::list(&state.db)?, &form.input.category_ids);
            Ok((
                StatusCode::BAD_REQUEST,
                Html(CreatePostTemplate {
                    categories,
                    error: msg,
                    title: word_wrap(&form.input.title, TITLE_WRAP_WORDS),
                    content: word_wrap(&form.input.content, CONTENT_WRAP_WORDS),
                    category_filter: form.redirect_category.unwrap_or_default(),
                })
                .into_response(),
            )
                .into_response())
        }
        Err(e) => Err(e),
    }
}

/// GET /edit-post?id=n — author-only edit form, pre-filled.
pub async fn edit_page(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<EditParams>,
) -> AppResult<Response> {
    let (post, selected) = posts::load(&state.db, params.id)?.ok_or(AppError::NotFound)?;
    if post.user_id != user.id {
        return Err(AppError::Forbidden);
    }

    let categories = category_options(catalog::list(&state.db)?, &selected);
    Ok(Html(EditPostTemplate {
        post_id: post.id,
        categories,
        error: String::new(),
        title: post.title,
        content: post.content,
        image_path: post.image_path.unwrap_or_default(),
        category_filter: params.category.unwrap_or_default(),
    })
    .into_response())
}

/// POST /edit-post?id=n
pub async fn edit(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<EditParams>,
    multipart: Multipart,
) -> AppResult<Response> {
    let form = read_post_form(multipart).await?;

    match posts::edit(
        &state.db,
        &state.config.storage.uploads,
        user.id,
        params.id,
        &form.input,
        form.image.as_ref(),
    ) {
        Ok(()) => Ok(posts_redirect(form.redirect_category.as_deref()).into_response()),
        Err(AppError::InvalidInput(msg)) => {
            let image_path = posts::load(&state.db, params.id)?
                .and_then(|(p, _)| p.image_path)
                .unwrap_or_default();
            let categories =
                category_options(catalog::list(&state.db)?, &form.input.category_ids);
            Ok((
                StatusCode::BAD_REQUEST,
                Html(EditPostTemplate {
                    post_id: params.id,
                    categories,
                    error: msg,
                    title: word_wrap(&form.input.title, TITLE_WRAP_WORDS),
                    content: word_wrap(&form.input.content, CONTENT_WRAP_WORDS),
                    image_path,
                    category_filter: form.redirect_category.unwrap_or_default(),
                })
                .into_response(),
            )
                .into_response())
        }
        Err(e) => Err(e),
    }
}

/// DELETE /post/delete — JSON body, author-only, cascading.
pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    axum::Json(req): axum::Json<DeletePostRequest>,
) -> AppResult<Response> {
    posts::delete(&state.db, user.id, req.post_id)?;
    tracing::info!(post_id = req.post_id, user_id = user.id, "post deleted");
    Ok(posts_redirect(req.redirect_category.as_deref()).into_response())
}

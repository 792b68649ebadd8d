use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use rust_embed::Embed;

use crate::state::AppState;

#[derive(Embed)]
#[folder = "assets/"]
struct Assets;

/// GET /static/{*path} — bundled CSS/JS come from the embedded assets;
/// `uploads/...` falls through to the uploads directory on disk.
pub async fn serve(State(state): State<AppState>, Path(path): Path<String>) -> Response {
    if let Some(name) = path.strip_prefix("uploads/") {
        return serve_upload(&state, name).await;
    }

    match Assets::get(&path) {
        Some(file) => {
            let mime = mime_guess::from_path(&path).first_or_octet_stream();
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, mime.as_ref().to_string()),
                    (header::CACHE_CONTROL, "public, max-age=86400".to_string()),
                ],
                file.data.to_vec(),
            )
                .into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn serve_upload(state: &AppState, name: &str) -> Response {
    // Upload filenames are flat `<user>_<ts>.<ext>`; anything with a path
    // separator is not ours to serve.
    if name.is_empty() || name.contains('/') || name.contains("..") {
        return StatusCode::NOT_FOUND.into_response();
    }

    let path = state.config.storage.uploads.join(name);
    match tokio::fs::read(&path).await {
        Ok(data) => {
            let mime = mime_guess::from_path(name).first_or_octet_stream();
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, mime.as_ref().to_string())],
                data,
            )
                .into_response()
        }
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}

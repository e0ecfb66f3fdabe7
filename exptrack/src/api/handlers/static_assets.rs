//! HTTP handlers for static asset serving.

use axum::{
    http::{StatusCode, Uri, header},
    response::{Html, IntoResponse, Response},
};
use tracing::{debug, instrument};

use crate::static_assets;

/// Map a request path onto an embedded file name. The front end links its assets under
/// `/static/`, which is the embed root.
fn asset_path(uri: &Uri) -> &str {
    let path = uri.path().trim_start_matches('/');
    let path = path.strip_prefix("static/").unwrap_or(path);

    if path.is_empty() || path.ends_with('/') { "index.html" } else { path }
}

fn cache_control(path: &str) -> &'static str {
    // Avatars never change between releases; pages and scripts may
    if mime_guess::from_path(path).first().is_some_and(|mime| mime.type_() == mime_guess::mime::IMAGE) {
        "public, max-age=86400"
    } else {
        "no-cache"
    }
}

/// Serve embedded static assets with SPA fallback
#[instrument(skip_all, fields(path = %uri.path()))]
pub async fn serve_embedded_asset(uri: Uri) -> Response {
    let path = asset_path(&uri);

    if let Some(content) = static_assets::Assets::get(path) {
        let mime = mime_guess::from_path(path).first_or_octet_stream();

        return (
            [(header::CONTENT_TYPE, mime.as_ref().to_string()), (header::CACHE_CONTROL, cache_control(path).to_string())],
            content.data.into_owned(),
        )
            .into_response();
    }

    // Unknown API routes and paths that look like files are genuinely missing
    if path.starts_with("api/") || path.rsplit('/').next().is_some_and(|name| name.contains('.')) {
        return StatusCode::NOT_FOUND.into_response();
    }

    spa_fallback(uri).await.into_response()
}

/// SPA fallback handler - serves index.html for client-side routes
#[instrument(err)]
pub async fn spa_fallback(uri: Uri) -> Result<Html<String>, StatusCode> {
    debug!("Hitting SPA fallback for: {}", uri.path());

    if let Some(index) = static_assets::Assets::get("index.html") {
        let content = String::from_utf8_lossy(&index.data).to_string();
        Ok(Html(content))
    } else {
        Err(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

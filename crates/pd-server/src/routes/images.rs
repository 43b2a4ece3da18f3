//! Image serving route handler.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use pd_core::Error;
use tokio_util::io::ReaderStream;

use crate::context::AppContext;
use crate::error::AppError;

/// Plain-text body returned for unknown identifiers.
pub const NOT_FOUND_MESSAGE: &str = "Image non trouvée";

/// GET /i/{id}
///
/// Streams the stored file back with a content type inferred from its
/// extension. Unknown identifiers get a plain-text 404.
pub async fn get_image(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let store = ctx.store.clone();
    let lookup = tokio::task::spawn_blocking(move || store.locate(&id))
        .await
        .map_err(|e| Error::Internal(format!("lookup task failed: {e}")))?;

    let image = match lookup {
        Ok(image) => image,
        Err(Error::NotFound { .. }) => return Ok(image_not_found()),
        Err(e) => return Err(e.into()),
    };

    // Open the file and stream it back
    let file = match tokio::fs::File::open(&image.path).await {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(image_not_found()),
        Err(e) => return Err(Error::from(e).into()),
    };
    let len = file.metadata().await.map(|m| m.len()).ok();

    let stream = ReaderStream::new(file);
    let mut response = (
        StatusCode::OK,
        [
            (header::CACHE_CONTROL, "public, max-age=31536000, immutable"),
            (header::CONTENT_TYPE, content_type_for(image.extension())),
        ],
        Body::from_stream(stream),
    )
        .into_response();

    if let Some(len) = len {
        response
            .headers_mut()
            .insert(header::CONTENT_LENGTH, header::HeaderValue::from(len));
    }

    Ok(response)
}

fn image_not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        NOT_FOUND_MESSAGE,
    )
        .into_response()
}

/// MIME type for a stored file extension (dot included, any case).
pub fn content_type_for(extension: &str) -> &'static str {
    let ext = extension.trim_start_matches('.').to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" | "jpe" | "jfif" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "tif" | "tiff" => "image/tiff",
        "heic" => "image/heic",
        "heif" => "image/heif",
        _ => "application/octet-stream",
    }
}

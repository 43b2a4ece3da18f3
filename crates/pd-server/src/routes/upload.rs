//! Image upload handler.

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::http::{header, HeaderMap};
use axum::Json;
use bytes::Bytes;
use pd_core::config::Config;
use pd_core::{Error, ImageId};
use serde::Serialize;

use crate::context::AppContext;
use crate::error::AppError;
use crate::middleware::request_id::RequestId;

/// Multipart field carrying the uploaded file.
pub const FILE_FIELD: &str = "image";

/// User-facing text for rejected content types.
pub const INVALID_FILE_MESSAGE: &str = "Fichier non valide";

/// Body of a successful `POST /upload`.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub id: ImageId,
    pub url: String,
}

struct FilePart {
    filename: String,
    content_type: String,
    data: Bytes,
}

/// POST /upload
///
/// Expects a multipart form whose `image` part holds the file. Responds with
/// the new identifier and an absolute retrieval URL.
pub async fn upload_image(
    State(ctx): State<AppContext>,
    request_id: RequestId,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let multipart = multipart.map_err(|rejection| {
        AppError::from(Error::Validation(format!(
            "expected a multipart form: {}",
            rejection.body_text()
        )))
        .with_request_id(request_id.to_string())
    })?;

    let part = read_file_part(multipart)
        .await
        .map_err(|e| e.with_request_id(request_id.to_string()))?;

    let store = ctx.store.clone();
    let FilePart {
        filename,
        content_type,
        data,
    } = part;

    let id = tokio::task::spawn_blocking(move || store.put(&data, &filename, &content_type))
        .await
        .map_err(|e| Error::Internal(format!("upload task failed: {e}")))
        .and_then(|result| result)
        .map_err(|e| {
            let err = match e {
                Error::InvalidContentType { .. } => {
                    AppError::new(e).with_message(INVALID_FILE_MESSAGE)
                }
                other => AppError::new(other),
            };
            err.with_request_id(request_id.to_string())
        })?;

    let url = format!("{}/i/{id}", base_url(&ctx.config, &headers));

    Ok(Json(UploadResponse {
        success: true,
        id,
        url,
    }))
}

/// Pull the file part out of the form, skipping any other fields.
async fn read_file_part(mut multipart: Multipart) -> Result<FilePart, AppError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let data = field.bytes().await?;

        return Ok(FilePart {
            filename,
            content_type,
            data,
        });
    }

    Err(Error::Validation(format!("missing '{FILE_FIELD}' file field")).into())
}

/// Scheme and host clients should use to reach this server.
///
/// `server.public_url` wins; otherwise the forwarded headers set by a
/// reverse proxy, then the `Host` header.
pub fn base_url(config: &Config, headers: &HeaderMap) -> String {
    if let Some(ref url) = config.server.public_url {
        return url.trim_end_matches('/').to_string();
    }

    let scheme = first_value(headers, "x-forwarded-proto").unwrap_or("http");
    let host = first_value(headers, "x-forwarded-host")
        .or_else(|| first_value(headers, header::HOST.as_str()))
        .unwrap_or("localhost");

    format!("{scheme}://{host}")
}

fn first_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

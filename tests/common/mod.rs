//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which opens an upload store in a temporary
//! directory and builds the full router around it. The [`with_server`]
//! constructor starts Axum on a random port for HTTP-level testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;

use axum::body::Body;
use axum::http::{header, Request};
use axum::Router;
use http_body_util::BodyExt;
use pd_core::config::Config;
use pd_server::context::AppContext;
use pd_server::router::build_router;
use tempfile::TempDir;

/// Multipart boundary used by [`multipart_request`].
pub const BOUNDARY: &str = "----pixdrop-test-boundary";

/// Seventeen bytes that start like a JFIF file.
pub const JPEG_17: &[u8] = b"\xFF\xD8\xFF\xE0\x00\x10JFIF\x00\x01\x01\x00\x00\x01\xFF";

/// Test harness wrapping a fully-constructed [`AppContext`] backed by a
/// temporary upload directory.
pub struct TestHarness {
    pub ctx: AppContext,
    pub dir: TempDir,
}

impl TestHarness {
    /// Create a new harness with default configuration.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create a new harness with a custom configuration. The upload
    /// directory is always replaced with a fresh temporary one.
    pub fn with_config(mut config: Config) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        config.storage.upload_dir = dir.path().join("uploads");
        config.keepalive.enabled = false;

        let store = pd_server::open_store(&config).expect("failed to open store");
        let ctx = AppContext::new(config, store);

        Self { ctx, dir }
    }

    /// Router without static file serving.
    pub fn router(&self) -> Router {
        build_router(self.ctx.clone(), None)
    }

    /// Directory the store writes into.
    pub fn upload_dir(&self) -> &Path {
        self.ctx.store.dir()
    }

    /// Sorted names of the files in the upload directory.
    pub fn stored_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.upload_dir())
            .expect("upload dir missing")
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    /// Start an Axum server on a random port and return the harness together
    /// with the bound socket address.
    pub async fn with_server() -> (Self, SocketAddr) {
        let harness = Self::new();
        let app = harness.router();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (harness, addr)
    }
}

/// Build a `POST /upload` request with a single file part.
pub fn multipart_request(
    field: &str,
    filename: &str,
    content_type: Option<&str>,
    data: &[u8],
) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n")
            .as_bytes(),
    );
    if let Some(ct) = content_type {
        body.extend_from_slice(format!("Content-Type: {ct}\r\n").as_bytes());
    }
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::post("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header(header::HOST, "img.test")
        .body(Body::from(body))
        .unwrap()
}

/// Collect a response body into bytes.
pub async fn body_bytes(body: Body) -> Vec<u8> {
    body.collect().await.unwrap().to_bytes().to_vec()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(body: Body) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(body).await).unwrap()
}

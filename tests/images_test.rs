//! Integration tests for image retrieval and health routes.

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use common::{body_bytes, body_json, multipart_request, TestHarness, JPEG_17};
use tower::ServiceExt;

async fn upload(h: &TestHarness, filename: &str, mime: &str, data: &[u8]) -> String {
    let response = h
        .router()
        .oneshot(multipart_request("image", filename, Some(mime), data))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response.into_body()).await["id"]
        .as_str()
        .unwrap()
        .to_string()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn get_image_returns_uploaded_bytes() {
    let h = TestHarness::new();
    let id = upload(&h, "cat.jpg", "image/jpeg", JPEG_17).await;

    let response = h.router().oneshot(get(&format!("/i/{id}"))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/jpeg"
    );
    assert_eq!(
        response.headers().get(header::CONTENT_LENGTH).unwrap(),
        "17"
    );
    assert_eq!(body_bytes(response.into_body()).await, JPEG_17);
}

#[tokio::test]
async fn get_image_infers_type_from_uppercase_extension() {
    let h = TestHarness::new();
    let id = upload(&h, "photo.PNG", "image/png", b"\x89PNG fake").await;

    let response = h.router().oneshot(get(&format!("/i/{id}"))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/png"
    );
}

#[tokio::test]
async fn get_image_not_found_is_plain_text() {
    let h = TestHarness::new();

    let response = h.router().oneshot(get("/i/ffffffff")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response
        .headers()
        .get(header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/plain"));

    let body = body_bytes(response.into_body()).await;
    assert_eq!(String::from_utf8(body).unwrap(), "Image non trouvée");
}

#[tokio::test]
async fn get_image_with_extension_in_path_is_not_found() {
    let h = TestHarness::new();
    let id = upload(&h, "cat.jpg", "image/jpeg", JPEG_17).await;

    let response = h
        .router()
        .oneshot(get(&format!("/i/{id}.jpg")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn get_image_finds_files_added_outside_the_server() {
    let h = TestHarness::new();
    std::fs::write(h.upload_dir().join("cafebabe.gif"), b"GIF89a").unwrap();

    let response = h.router().oneshot(get("/i/cafebabe")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/gif"
    );
    assert_eq!(body_bytes(response.into_body()).await, b"GIF89a");
}

#[tokio::test]
async fn responses_carry_request_id() {
    let h = TestHarness::new();

    let response = h
        .router()
        .oneshot(
            Request::get("/i/00000000")
                .header("x-request-id", "req-42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.headers().get("x-request-id").unwrap(), "req-42");

    let response = h.router().oneshot(get("/health")).await.unwrap();
    assert!(response.headers().get("x-request-id").is_some());
}

#[tokio::test]
async fn health_reports_image_count() {
    let h = TestHarness::new();
    upload(&h, "a.jpg", "image/jpeg", b"a").await;
    upload(&h, "b.jpg", "image/jpeg", b"b").await;

    let response = h.router().oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response.into_body()).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["images"], 2);
}

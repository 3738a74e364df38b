// SPDX-License-Identifier: MIT OR Apache-2.0
//! Gist provider tests against a mock HTTP server.

use serde_json::json;
use sre_storage::{BlobMetadata, GistProvider, StorageError, StorageProvider};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn provider(server: &MockServer) -> GistProvider {
    GistProvider::with_api_base("token-under-test", server.uri()).unwrap()
}

#[tokio::test]
async fn upload_returns_gist_uri() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/gists"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "abc123"})))
        .mount(&server)
        .await;

    let uri = provider(&server)
        .await
        .upload(br#"{"result":{}}"#, &BlobMetadata::for_order("order-1"))
        .await
        .unwrap();
    assert_eq!(uri, "gist://abc123");
}

#[tokio::test]
async fn download_unwraps_first_file_content() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gists/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "abc123",
            "files": {
                "order-1.json": {"content": "{\"result\":{\"n\":1}}"},
            },
        })))
        .mount(&server)
        .await;

    let p = provider(&server).await;
    let bytes = p.download("gist://abc123").await.unwrap();
    assert_eq!(bytes, br#"{"result":{"n":1}}"#);
    assert!(p.exists("gist://abc123").await);
}

#[tokio::test]
async fn missing_gist_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gists/nope"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let p = provider(&server).await;
    assert!(matches!(
        p.download("gist://nope").await,
        Err(StorageError::NotFound { .. })
    ));
    assert!(!p.exists("gist://nope").await);
}

#[tokio::test]
async fn malformed_uri_resolves_false() {
    let server = MockServer::start().await;
    let p = provider(&server).await;
    assert!(!p.exists("file:///tmp/x.json").await);
    assert!(!p.exists("gist://").await);
}

#[tokio::test]
async fn upload_requires_order_id() {
    let server = MockServer::start().await;
    let p = provider(&server).await;
    let meta = BlobMetadata {
        order_id: String::new(),
        content_type: "application/json".into(),
        timestamp: String::new(),
    };
    assert!(matches!(
        p.upload(b"{}", &meta).await,
        Err(StorageError::MetadataIncomplete)
    ));
}
